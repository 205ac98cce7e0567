//! Gateway error taxonomy.
//!
//! Two layers: [`ErrorKind`] is the structured rejection reason handed
//! to the presentation layer (expected user-input conditions and
//! transient "try again" states), while [`EngineError`] covers
//! infrastructure failures that abort the request outright.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::StoreError;
use crate::wallet::WalletError;

/// Structured rejection reasons. Every rejected action carries one;
/// nothing is ever silently dropped.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// No hand is running in this chat.
    NoActiveGame,
    /// The requester is not the player whose turn it is.
    TurnMismatch,
    /// The action was issued against an outdated UI render.
    StaleAction,
    /// The player's action lock stayed contended; try again.
    ActionLockTimeout,
    /// The CAS retry budget was exhausted; try again.
    ConcurrentUpdateFailure,
    /// The player has no chips left to commit.
    InsufficientFunds,
    /// A hand needs at least two seated players.
    NotEnoughPlayers,
    /// All seats are taken.
    TableFull,
    /// A hand is already running in this chat.
    HandInProgress,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let repr = match self {
            Self::NoActiveGame => "no active game",
            Self::TurnMismatch => "not your turn",
            Self::StaleAction => "stale action",
            Self::ActionLockTimeout => "action in progress, please wait",
            Self::ConcurrentUpdateFailure => "concurrent update, please retry",
            Self::InsufficientFunds => "insufficient funds",
            Self::NotEnoughPlayers => "not enough players",
            Self::TableFull => "table is full",
            Self::HandInProgress => "a hand is already running",
        };
        write!(f, "{repr}")
    }
}

/// Infrastructure failures. The current request fails closed: any
/// in-memory mutation that was not confirmed persisted is treated as
/// not having happened.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Backing store unavailable
    #[error("Backing store unavailable: {0}")]
    BackingStore(#[from] StoreError),

    /// Wallet collaborator failure
    #[error("Wallet ledger failure: {0}")]
    Wallet(#[from] WalletError),
}

/// Result type for gateway operations.
pub type EngineResult<T> = Result<T, EngineError>;
