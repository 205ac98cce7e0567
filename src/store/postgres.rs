//! Postgres-backed store: JSONB snapshot plus an optimistic `version`
//! column updated with `WHERE version = $expected`.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS game_snapshots (
//!     chat_id    BIGINT PRIMARY KEY,
//!     snapshot   JSONB NOT NULL,
//!     version    BIGINT NOT NULL DEFAULT 0,
//!     updated_at TIMESTAMP NOT NULL DEFAULT NOW()
//! );
//! ```

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::errors::StoreResult;
use super::GameStore;
use crate::game::entities::{ChatId, GameSnapshot};

#[derive(Clone)]
pub struct PgGameStore {
    pool: Arc<PgPool>,
}

impl PgGameStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GameStore for PgGameStore {
    async fn load_with_version(&self, chat_id: ChatId) -> StoreResult<(GameSnapshot, u64)> {
        // Insert-if-absent keeps first use atomic under concurrent
        // loaders; ON CONFLICT makes the losing writer a no-op.
        let empty = serde_json::to_value(GameSnapshot::new())?;
        sqlx::query(
            "INSERT INTO game_snapshots (chat_id, snapshot, version)
             VALUES ($1, $2, 0)
             ON CONFLICT (chat_id) DO NOTHING",
        )
        .bind(chat_id)
        .bind(&empty)
        .execute(self.pool.as_ref())
        .await?;

        let row = sqlx::query("SELECT snapshot, version FROM game_snapshots WHERE chat_id = $1")
            .bind(chat_id)
            .fetch_one(self.pool.as_ref())
            .await?;

        let version = row.get::<i64, _>("version") as u64;
        let mut snapshot: GameSnapshot = serde_json::from_value(row.get("snapshot"))?;
        snapshot.version = version;
        Ok((snapshot, version))
    }

    async fn save_with_version_check(
        &self,
        chat_id: ChatId,
        snapshot: &GameSnapshot,
        expected_version: u64,
    ) -> StoreResult<bool> {
        let payload = serde_json::to_value(snapshot)?;
        let result = sqlx::query(
            "UPDATE game_snapshots
             SET snapshot = $2, version = version + 1, updated_at = NOW()
             WHERE chat_id = $1 AND version = $3",
        )
        .bind(chat_id)
        .bind(&payload)
        .bind(expected_version as i64)
        .execute(self.pool.as_ref())
        .await?;

        let saved = result.rows_affected() == 1;
        if !saved {
            log::debug!(
                "Version conflict saving chat {chat_id}: expected {expected_version}"
            );
        }
        Ok(saved)
    }

    async fn active_chat_ids(&self) -> StoreResult<Vec<ChatId>> {
        let rows = sqlx::query("SELECT chat_id FROM game_snapshots ORDER BY chat_id ASC")
            .fetch_all(self.pool.as_ref())
            .await?;
        Ok(rows.into_iter().map(|row| row.get("chat_id")).collect())
    }
}
