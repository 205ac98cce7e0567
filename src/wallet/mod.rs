//! Wallet/ledger collaborator.
//!
//! The engine moves chips through this seam but does not implement
//! balance storage: bets are authorized (escrowed) per hand, approved
//! (spent) when the hand settles, cancelled (refunded) when a hand is
//! aborted, and winnings deposited back.

pub mod errors;
pub mod ledger;

use async_trait::async_trait;

use crate::game::entities::{Chips, UserId};
pub use errors::{WalletError, WalletResult};
pub use ledger::MemoryLedger;

/// Chip custody operations the engine requires of its host.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    /// Spendable balance.
    async fn value(&self, user_id: UserId) -> WalletResult<Chips>;

    /// Escrow `amount` against one hand. Fails without moving anything
    /// if the balance does not cover it.
    async fn authorize(&self, user_id: UserId, game_id: &str, amount: Chips) -> WalletResult<()>;

    /// Settle the escrow for a finished hand (the chips were spent into
    /// the pot).
    async fn approve(&self, user_id: UserId, game_id: &str) -> WalletResult<()>;

    /// Refund the escrow for an aborted hand.
    async fn cancel(&self, user_id: UserId, game_id: &str) -> WalletResult<()>;

    /// Refund part of an escrow. Used to undo a single authorization
    /// when the optimistic save it backed lost the version race.
    async fn release(&self, user_id: UserId, game_id: &str, amount: Chips) -> WalletResult<()>;

    /// Credit winnings.
    async fn deposit(&self, user_id: UserId, amount: Chips) -> WalletResult<()>;
}
