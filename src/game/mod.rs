//! Game domain: cards, snapshots, hand ranking and pot resolution.

pub mod constants;
pub mod entities;
pub mod hand;
pub mod settlement;

pub use entities::{
    Card, ChatId, Chips, Deck, GameSnapshot, GameState, PlayerState, PlayerStatus, Suit, UserId,
};
pub use hand::{Evaluator, HandRanker, Score};
pub use settlement::{PotShare, PotTier, resolve};
