//! Engine configuration with environment-derived defaults.

use std::time::Duration;

use crate::game::constants::DEFAULT_SMALL_BLIND;
use crate::game::entities::Chips;
use crate::retry::RetryPolicy;

/// Tunables for the coordination engine. Every wait in the engine traces
/// back to one of these bounds.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// TTL on action locks; a crashed holder self-heals after this.
    pub action_lock_ttl: Duration,
    /// TTL on table and stage locks.
    pub table_lock_ttl: Duration,
    /// Budget for acquiring the stage lock before giving up.
    pub stage_lock_timeout: Duration,
    /// Backoff schedule for contended action-lock acquisition.
    pub lock_retry: RetryPolicy,
    /// CAS retry ceiling before surfacing `ConcurrentUpdateFailure`.
    pub cas_retry_limit: u32,
    /// Lifetime of issued action tokens.
    pub action_token_ttl: Duration,
    pub small_blind: Chips,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            action_lock_ttl: Duration::from_secs(10),
            table_lock_ttl: Duration::from_secs(15),
            stage_lock_timeout: Duration::from_secs(5),
            lock_retry: RetryPolicy::default(),
            cas_retry_limit: 3,
            action_token_ttl: Duration::from_secs(60),
            small_blind: DEFAULT_SMALL_BLIND,
        }
    }
}

impl EngineConfig {
    /// Build a config from the environment, falling back to defaults for
    /// anything unset or unparsable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let action_lock_ttl_secs = std::env::var("ACTION_LOCK_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.action_lock_ttl.as_secs());

        let table_lock_ttl_secs = std::env::var("TABLE_LOCK_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.table_lock_ttl.as_secs());

        let stage_lock_timeout_secs = std::env::var("STAGE_LOCK_TIMEOUT_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.stage_lock_timeout.as_secs());

        let cas_retry_limit = std::env::var("CAS_RETRY_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.cas_retry_limit);

        let action_token_ttl_secs = std::env::var("ACTION_TOKEN_TTL_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.action_token_ttl.as_secs());

        let small_blind = std::env::var("SMALL_BLIND")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.small_blind);

        Self {
            action_lock_ttl: Duration::from_secs(action_lock_ttl_secs),
            table_lock_ttl: Duration::from_secs(table_lock_ttl_secs),
            stage_lock_timeout: Duration::from_secs(stage_lock_timeout_secs),
            lock_retry: defaults.lock_retry,
            cas_retry_limit,
            action_token_ttl: Duration::from_secs(action_token_ttl_secs),
            small_blind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_bounds() {
        let config = EngineConfig::default();
        assert_eq!(config.action_lock_ttl, Duration::from_secs(10));
        assert_eq!(config.cas_retry_limit, 3);
        assert_eq!(config.small_blind, DEFAULT_SMALL_BLIND);
    }
}
