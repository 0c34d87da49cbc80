//! Temporaries, labels and the generator that hands them out.

mod names;

use std::fmt::{self, Display, Formatter};

pub use names::Names;

/// A temporary: an abstract register holding one value.
///
/// Virtual temporaries are created on demand by the back end and end up in
/// whatever machine register the allocator picks. Machine-register temporaries
/// name a fixed register of the target; the allocator treats them as
/// precolored and never moves them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Temp {
    /// A generated temporary.
    Virtual(usize),
    /// A machine register of the target.
    Register(&'static str),
}
impl Temp {
    pub fn is_register(&self) -> bool {
        matches!(self, Self::Register(_))
    }
}
impl Display for Temp {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Virtual(id) => write!(f, "t{}", id),
            Self::Register(name) => write!(f, "${}", name),
        }
    }
}

/// A symbolic code address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Label {
    /// A label with a fixed name, such as a function entry point.
    Named(String),
    /// A generated label. Rendered with a leading `.` so it never collides with a named one.
    Generated(usize),
}
impl Label {
    pub fn named<S: Into<String>>(name: S) -> Self {
        Self::Named(name.into())
    }
}
impl Display for Label {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::Generated(id) => write!(f, ".L{}", id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_labels_never_render_like_named_ones() {
        assert_eq!("L1", Label::named("L1").to_string());
        assert_eq!(".L1", Label::Generated(1).to_string());
    }
}
