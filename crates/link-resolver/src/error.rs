//! Error types for link resolution

/// Errors from link resolution.
///
/// Timeouts are deliberately absent: a timed-out resolution yields a partial
/// `Resolution` carrying the best-known URL, not an error. Only failures with
/// nothing useful to return (bad input, transport breakage) surface here.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("input URL must not be empty")]
    EmptyInput,

    #[error("transport failure while resolving: {0}")]
    Transport(String),
}

/// Result alias for resolution operations.
pub type Result<T> = std::result::Result<T, Error>;
