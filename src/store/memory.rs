//! In-memory store for tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::errors::StoreResult;
use super::GameStore;
use crate::game::entities::{ChatId, GameSnapshot};

/// Mutex-guarded map with the same CAS semantics as the durable store.
#[derive(Default)]
pub struct MemoryGameStore {
    games: Mutex<HashMap<ChatId, (GameSnapshot, u64)>>,
}

impl MemoryGameStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GameStore for MemoryGameStore {
    async fn load_with_version(&self, chat_id: ChatId) -> StoreResult<(GameSnapshot, u64)> {
        let mut games = self.games.lock().expect("game map poisoned");
        let (snapshot, version) = games
            .entry(chat_id)
            .or_insert_with(|| (GameSnapshot::new(), 0));
        let mut snapshot = snapshot.clone();
        snapshot.version = *version;
        Ok((snapshot, *version))
    }

    async fn save_with_version_check(
        &self,
        chat_id: ChatId,
        snapshot: &GameSnapshot,
        expected_version: u64,
    ) -> StoreResult<bool> {
        let mut games = self.games.lock().expect("game map poisoned");
        let (stored, version) = games
            .entry(chat_id)
            .or_insert_with(|| (GameSnapshot::new(), 0));
        if *version != expected_version {
            log::debug!(
                "Version conflict saving chat {chat_id}: expected {expected_version}, current {version}"
            );
            return Ok(false);
        }
        *version += 1;
        *stored = snapshot.clone();
        stored.version = *version;
        Ok(true)
    }

    async fn active_chat_ids(&self) -> StoreResult<Vec<ChatId>> {
        let games = self.games.lock().expect("game map poisoned");
        Ok(games.keys().copied().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_load_creates_empty_snapshot_at_version_zero() {
        let store = MemoryGameStore::new();
        let (snapshot, version) = store.load_with_version(7).await.unwrap();
        assert_eq!(version, 0);
        assert!(snapshot.players.is_empty());
        assert_eq!(store.active_chat_ids().await.unwrap(), vec![7]);
    }

    #[tokio::test]
    async fn save_increments_version_exactly_once() {
        let store = MemoryGameStore::new();
        let (mut snapshot, version) = store.load_with_version(7).await.unwrap();
        snapshot.pot = 100;

        assert!(store.save_with_version_check(7, &snapshot, version).await.unwrap());
        let (reloaded, version) = store.load_with_version(7).await.unwrap();
        assert_eq!(version, 1);
        assert_eq!(reloaded.pot, 100);
    }

    #[tokio::test]
    async fn stale_save_is_rejected_without_writing() {
        let store = MemoryGameStore::new();
        let (mut snapshot, version) = store.load_with_version(7).await.unwrap();
        snapshot.pot = 100;
        assert!(store.save_with_version_check(7, &snapshot, version).await.unwrap());

        // A second writer still holding the old version must fail.
        snapshot.pot = 999;
        assert!(!store.save_with_version_check(7, &snapshot, version).await.unwrap());
        let (reloaded, version) = store.load_with_version(7).await.unwrap();
        assert_eq!(version, 1);
        assert_eq!(reloaded.pot, 100);
    }
}
