//! Multi-granularity mutual exclusion for per-chat game state.
//!
//! Three lock kinds serialize work on a chat, acquired in a fixed order
//! so circular wait is structurally impossible:
//!
//! - **Table** locks cover seating changes (join/leave).
//! - **Stage** locks cover multi-step operations touching several
//!   players at once (dealing, street advancement).
//! - **Action** locks cover one player acting in one chat.
//!
//! All locks are TTL-bounded: a crashed holder self-heals after expiry.

pub mod errors;
pub mod manager;

pub use errors::{LockError, LockResult};
pub use manager::{AcquireStats, LockGuard, LockKey, LockManager, LockMetrics, LockToken};
