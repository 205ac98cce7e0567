//! Game-wide constants.

use super::entities::Chips;

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Hole cards dealt to each player.
pub const HOLE_CARDS: usize = 2;

/// Community cards on a complete board.
pub const BOARD_SIZE: usize = 5;

/// Minimum players required to start a hand.
pub const MIN_PLAYERS: usize = 2;

/// Maximum seats per chat.
pub const MAX_PLAYERS: usize = 8;

/// Default small blind; the big blind is twice this.
pub const DEFAULT_SMALL_BLIND: Chips = 10;

/// Size of the per-chat idempotency window.
pub const MAX_PROCESSED_CALLBACKS: usize = 64;
