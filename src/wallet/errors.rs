//! Wallet collaborator error types.

use thiserror::Error;

use crate::game::entities::{Chips, UserId};

/// Wallet errors
#[derive(Debug, Error)]
pub enum WalletError {
    /// Not enough chips to cover an authorization
    #[error("Insufficient balance for user {user_id}: available {available}, required {required}")]
    InsufficientBalance {
        user_id: UserId,
        available: Chips,
        required: Chips,
    },

    /// No wallet exists for the user
    #[error("Wallet not found for user {0}")]
    WalletNotFound(UserId),

    /// The ledger backend failed
    #[error("Ledger unavailable: {0}")]
    Unavailable(String),
}

/// Result type for wallet operations.
pub type WalletResult<T> = Result<T, WalletError>;
