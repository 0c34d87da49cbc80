pub use log::{debug, info, trace};

pub use crate::error::{invariant, BackendError, Result};
