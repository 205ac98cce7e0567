//! Durable per-chat snapshot storage with optimistic concurrency.
//!
//! The store owns the version counter: it increments on every
//! successful conditional save and never moves otherwise. The CAS alone
//! is safe under arbitrary concurrent callers; callers still hold the
//! action or stage lock before saving, because the CAS prevents
//! corruption, not re-derivation of stale decisions.

pub mod errors;
pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::game::entities::{ChatId, GameSnapshot};
pub use errors::{StoreError, StoreResult};
pub use memory::MemoryGameStore;
pub use postgres::PgGameStore;

/// Versioned snapshot storage.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Current snapshot and version for a chat; atomically creates an
    /// empty snapshot at version 0 if none exists.
    async fn load_with_version(&self, chat_id: ChatId) -> StoreResult<(GameSnapshot, u64)>;

    /// Persist `snapshot` only if the stored version still equals
    /// `expected_version`, incrementing it on success. Returns `false`
    /// (and writes nothing) on a version conflict, the expected signal
    /// to reload and retry.
    async fn save_with_version_check(
        &self,
        chat_id: ChatId,
        snapshot: &GameSnapshot,
        expected_version: u64,
    ) -> StoreResult<bool>;

    /// Chats with a persisted snapshot, for maintenance sweeps.
    async fn active_chat_ids(&self) -> StoreResult<Vec<ChatId>>;
}
