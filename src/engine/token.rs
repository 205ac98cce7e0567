//! Action tokens: stale-click detection for chat UIs.
//!
//! Every rendered action prompt embeds a token bound to the snapshot's
//! UI-visible counter. By the time a press arrives the game may have
//! moved on (another player acted, the street advanced, the hand
//! ended); a token minted against the old render then no longer
//! matches and the press is rejected as stale instead of being applied
//! to state the user never saw.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::entities::{GameSnapshot, GameState};

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ActionToken {
    /// The snapshot's `callback_version` at render time.
    pub game_version: u64,
    /// The street at render time.
    pub stage: GameState,
    /// Uniqueness salt so two renders of the same state differ.
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

impl ActionToken {
    /// Mint a token for the given snapshot, valid for `ttl`.
    pub fn issue(snapshot: &GameSnapshot, ttl: std::time::Duration) -> Self {
        let ttl = Duration::from_std(ttl).unwrap_or_else(|_| Duration::seconds(60));
        Self {
            game_version: snapshot.callback_version,
            stage: snapshot.state,
            nonce: Uuid::new_v4().to_string(),
            expires_at: Utc::now() + ttl,
        }
    }

    /// Serialize for embedding in callback payloads. The format is
    /// opaque to callers.
    pub fn encode(&self) -> String {
        // Serialization of this struct cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a token previously produced by [`encode`](Self::encode).
    /// Malformed input is treated the same as a stale token.
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Whether the token still describes what the user is looking at.
    pub fn matches(&self, snapshot: &GameSnapshot) -> bool {
        self.game_version == snapshot.callback_version
            && self.stage == snapshot.state
            && !self.is_expired(Utc::now())
    }
}
