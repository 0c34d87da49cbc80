use thiserror::Error;

pub type Result<T> = std::result::Result<T, BackendError>;

/// An internal compiler error raised by one of the back-end stages.
///
/// None of these are user-facing: each one means an earlier stage handed us
/// something malformed, or the target cannot express what was asked of it.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("internal invariant violated: {0}")]
    Invariant(String),
    #[error("target supports only {supported} call arguments, but got {given}")]
    TooManyArguments { supported: usize, given: usize },
    #[error("register allocation did not converge after {rounds} rounds")]
    NonConvergence { rounds: usize },
}

/// Construct a new invariant violation result.
pub fn invariant<S, M: Into<String>>(message: M) -> Result<S> {
    Err(BackendError::Invariant(message.into()))
}
