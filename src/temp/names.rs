use std::sync::atomic::{AtomicUsize, Ordering};

use super::{Label, Temp};

/// Generates unique temporaries and labels.
///
/// One generator is shared by every fragment of a program. The counters are
/// atomic, so fragments may be compiled on separate threads through a shared
/// reference without ever seeing the same name twice.
#[derive(Debug, Default)]
pub struct Names {
    temps: AtomicUsize,
    labels: AtomicUsize,
}

impl Names {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates a new unique temporary.
    pub fn next_temp(&self) -> Temp {
        Temp::Virtual(self.temps.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Generates a new unique label.
    pub fn next_label(&self) -> Label {
        Label::Generated(self.labels.fetch_add(1, Ordering::Relaxed) + 1)
    }

    /// Restart both counters. Only test harnesses should call this, to get the
    /// same names on every run.
    pub fn reset(&mut self) {
        *self.temps.get_mut() = 0;
        *self.labels.get_mut() = 0;
    }
}
