//! # Poker Sync
//!
//! A concurrency-safe coordination engine for many simultaneous
//! turn-based poker games, one per chat.
//!
//! Chat platforms deliver player input as concurrent callbacks with
//! at-least-once semantics: the same button press can arrive twice, two
//! players can act in the same instant, and a press can describe a game
//! state that no longer exists. This library serializes all of that into
//! exactly-once, in-turn game mutations.
//!
//! ## Core Modules
//!
//! - [`engine`]: The action gateway: validation, idempotency, locking
//!   and persistence for every mutation
//! - [`locks`]: Keyed TTL locks with bounded retry and misuse monitoring
//! - [`store`]: Versioned snapshot storage with optimistic concurrency
//! - [`game`]: Cards, snapshots, hand ranking and pot resolution
//! - [`wallet`]: The chip-custody seam the engine drives but does not own
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use poker_sync::config::EngineConfig;
//! use poker_sync::engine::ActionGateway;
//! use poker_sync::game::Evaluator;
//! use poker_sync::locks::LockManager;
//! use poker_sync::store::MemoryGameStore;
//! use poker_sync::wallet::MemoryLedger;
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = EngineConfig::from_env();
//! let gateway = ActionGateway::new(
//!     Arc::new(MemoryGameStore::default()),
//!     Arc::new(LockManager::new(config.lock_retry)),
//!     Arc::new(MemoryLedger::default()),
//!     Arc::new(Evaluator),
//!     config,
//! );
//!
//! gateway.join_table(1, 100).await?;
//! gateway.join_table(1, 101).await?;
//! let outcome = gateway.start_hand(1).await?;
//! assert!(outcome.accepted);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod game;
pub mod locks;
pub mod retry;
pub mod store;
pub mod wallet;

pub use config::EngineConfig;
pub use engine::{ActionGateway, ActionOutcome, ActionRequest, ActionToken, PlayerAction};
pub use game::{GameSnapshot, GameState};
pub use locks::LockManager;
pub use store::GameStore;
pub use wallet::WalletLedger;
