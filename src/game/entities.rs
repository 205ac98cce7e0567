//! Core game entities: cards, players, and the per-chat snapshot.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

use super::constants::{BOARD_SIZE, DECK_SIZE, HOLE_CARDS, MAX_PROCESSED_CALLBACKS};
use crate::engine::outcome::RecordedOutcome;

/// Chat identifier as delivered by the messaging platform.
pub type ChatId = i64;

/// User identifier as delivered by the messaging platform.
pub type UserId = i64;

/// Whole chips. All bets, pots and balances are integral.
pub type Chips = i64;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

/// Placeholder for card values (2u8..=14u8, ace high).
pub type Value = u8;

/// A card is a tuple of a value and a suit.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Card(pub Value, pub Suit);

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            14 => "A",
            11 => "J",
            12 => "Q",
            13 => "K",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

/// Remaining cards of the current hand, dealt from the back.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// A full 52-card deck, shuffled.
    pub fn shuffled() -> Self {
        let mut cards = Vec::with_capacity(DECK_SIZE);
        for value in 2u8..=14u8 {
            for suit in [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart] {
                cards.push(Card(value, suit));
            }
        }
        cards.shuffle(&mut rand::rng());
        Self { cards }
    }

    pub fn deal_card(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self { cards: Vec::new() }
    }
}

/// Lifecycle of a single hand within a chat.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum GameState {
    Waiting,
    PreFlop,
    Flop,
    Turn,
    River,
    Finished,
}

impl GameState {
    /// Whether a betting round is in progress and player actions apply.
    pub fn is_active_round(self) -> bool {
        matches!(
            self,
            Self::PreFlop | Self::Flop | Self::Turn | Self::River
        )
    }

    /// The street following this one, if any.
    pub fn next_street(self) -> Option<Self> {
        match self {
            Self::PreFlop => Some(Self::Flop),
            Self::Flop => Some(Self::Turn),
            Self::Turn => Some(Self::River),
            _ => None,
        }
    }

    /// Number of board cards visible on this street.
    pub fn board_cards(self) -> usize {
        match self {
            Self::Waiting | Self::PreFlop => 0,
            Self::Flop => 3,
            Self::Turn => 4,
            Self::River | Self::Finished => BOARD_SIZE,
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Waiting => "waiting",
            Self::PreFlop => "pre-flop",
            Self::Flop => "flop",
            Self::Turn => "turn",
            Self::River => "river",
            Self::Finished => "finished",
        };
        write!(f, "{repr}")
    }
}

/// For players that are in a hand.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PlayerStatus {
    // Player can still act this hand.
    Active,
    // Player forfeited their bets for the hand.
    Folded,
    // Player committed their whole balance.
    AllIn,
}

/// Per-seat state, owned exclusively by the enclosing [`GameSnapshot`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct PlayerState {
    pub user_id: UserId,
    pub seat_index: usize,
    pub cards: Vec<Card>,
    /// Chips committed in the current betting round.
    pub round_rate: Chips,
    /// Chips committed across the whole hand.
    pub total_bet: Chips,
    pub status: PlayerStatus,
    /// Reset at the start of each betting round.
    pub has_acted: bool,
    /// The player left mid-hand. The seat is kept (so pot accounting
    /// stays intact) and vacated at the next reset.
    #[serde(default)]
    pub departed: bool,
}

impl PlayerState {
    pub fn new(user_id: UserId, seat_index: usize) -> Self {
        Self {
            user_id,
            seat_index,
            cards: Vec::with_capacity(HOLE_CARDS),
            round_rate: 0,
            total_bet: 0,
            status: PlayerStatus::Active,
            has_acted: false,
            departed: false,
        }
    }

    /// Clear per-hand state while keeping the seat.
    pub fn reset(&mut self) {
        self.cards.clear();
        self.round_rate = 0;
        self.total_bet = 0;
        self.status = PlayerStatus::Active;
        self.has_acted = false;
    }

    /// Whether the player still holds a claim on the pot.
    pub fn is_contender(&self) -> bool {
        matches!(self.status, PlayerStatus::Active | PlayerStatus::AllIn)
    }
}

/// An idempotency record for one delivered callback.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ProcessedCallback {
    pub callback_id: String,
    pub outcome: RecordedOutcome,
}

/// The shared per-chat game state. Exactly one snapshot exists per chat;
/// it is created on first use and reset (not destroyed) at hand end.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct GameSnapshot {
    /// Identifier of the current hand, used to key wallet authorizations.
    pub game_id: String,
    pub state: GameState,
    /// Ordered by seat; seat index is identity within the hand.
    pub players: Vec<PlayerState>,
    pub pot: Chips,
    pub max_round_rate: Chips,
    pub dealer_index: usize,
    pub current_player_index: usize,
    pub deck: Deck,
    pub table_cards: Vec<Card>,
    /// Optimistic-concurrency counter. Owned by the store; application
    /// code never mutates it.
    pub version: u64,
    /// UI-visible state counter. Bumped by the engine on every visible
    /// mutation; action tokens bind to it.
    pub callback_version: u64,
    /// Bounded idempotency window, oldest first.
    pub processed_callbacks: VecDeque<ProcessedCallback>,
}

impl Default for GameSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl GameSnapshot {
    /// An empty snapshot waiting for players.
    pub fn new() -> Self {
        Self {
            game_id: uuid::Uuid::new_v4().to_string(),
            state: GameState::Waiting,
            players: Vec::new(),
            pot: 0,
            max_round_rate: 0,
            dealer_index: 0,
            current_player_index: 0,
            deck: Deck::default(),
            table_cards: Vec::new(),
            version: 0,
            callback_version: 0,
            processed_callbacks: VecDeque::new(),
        }
    }

    pub fn player_by_user(&self, user_id: UserId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.user_id == user_id)
    }

    pub fn current_player(&self) -> Option<&PlayerState> {
        self.players.get(self.current_player_index)
    }

    /// Look up a recorded callback delivery.
    pub fn processed_callback(&self, callback_id: &str) -> Option<&ProcessedCallback> {
        self.processed_callbacks
            .iter()
            .find(|c| c.callback_id == callback_id)
    }

    /// Record a callback delivery, evicting the oldest entry once the
    /// window is full.
    pub fn record_callback(&mut self, callback_id: &str, outcome: RecordedOutcome) {
        if let Some(existing) = self
            .processed_callbacks
            .iter_mut()
            .find(|c| c.callback_id == callback_id)
        {
            existing.outcome = outcome;
            return;
        }
        while self.processed_callbacks.len() >= MAX_PROCESSED_CALLBACKS {
            self.processed_callbacks.pop_front();
        }
        self.processed_callbacks.push_back(ProcessedCallback {
            callback_id: callback_id.to_string(),
            outcome,
        });
    }

    /// Seat index of the next player after `from` matching `pred`,
    /// scanning clockwise. Returns `from` if no other seat matches.
    pub fn next_seat_where<F>(&self, from: usize, pred: F) -> usize
    where
        F: Fn(&PlayerState) -> bool,
    {
        let n = self.players.len();
        if n == 0 {
            return from;
        }
        for offset in 1..=n {
            let idx = (from + offset) % n;
            if pred(&self.players[idx]) {
                return idx;
            }
        }
        from
    }

    /// Reset to a fresh hand, keeping seated players and the idempotency
    /// window. The store-owned version is left untouched.
    pub fn reset_for_next_hand(&mut self) {
        self.game_id = uuid::Uuid::new_v4().to_string();
        self.state = GameState::Waiting;
        self.pot = 0;
        self.max_round_rate = 0;
        self.deck = Deck::default();
        self.table_cards.clear();
        self.players.retain(|p| !p.departed);
        for (seat, player) in self.players.iter_mut().enumerate() {
            player.reset();
            player.seat_index = seat;
        }
        if !self.players.is_empty() {
            self.dealer_index %= self.players.len();
            self.current_player_index %= self.players.len();
        } else {
            self.dealer_index = 0;
            self.current_player_index = 0;
        }
        self.callback_version += 1;
    }
}
