//! Lock manager error types.

use thiserror::Error;

/// Lock acquisition and release failures.
#[derive(Debug, Error)]
pub enum LockError {
    /// The lock stayed contended for the whole timeout budget. Callers
    /// should surface a "please wait" to their caller.
    #[error("Timed out acquiring lock {key} after {attempts} attempts")]
    AcquisitionTimeout { key: String, attempts: u32 },

    /// A release was presented with a token that no longer owns the
    /// lock. Logged and non-fatal; indicates a logic bug or a TTL race.
    #[error("Release token mismatch for lock {key}")]
    ReleaseMismatch { key: String },
}

/// Result type for lock operations.
pub type LockResult<T> = Result<T, LockError>;
