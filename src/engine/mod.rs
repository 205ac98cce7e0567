//! Action gateway: validation, idempotency, locking and persistence for
//! every game-state mutation.

pub mod errors;
pub mod gateway;
pub mod outcome;
pub mod token;

pub use errors::{EngineError, EngineResult, ErrorKind};
pub use gateway::{ActionGateway, ActionRequest, PlayerAction};
pub use outcome::{ActionOutcome, RecordedOutcome};
pub use token::ActionToken;
