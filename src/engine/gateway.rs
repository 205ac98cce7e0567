//! The action gateway: the single entry point through which player
//! input reaches game state.
//!
//! Every mutation follows the same protocol: claim the callback id in
//! the idempotency window (its own optimistic save), take the
//! appropriate lock, re-load, validate against fresh state, apply, and
//! persist with a version check. Wallet escrow for a bet is taken
//! before the save and released again if the save loses the version
//! race; settlement payouts run only after the final state is
//! confirmed persisted. A request that cannot complete fails closed:
//! nothing it did not persist is observable afterwards.

use std::sync::Arc;

use super::errors::{EngineError, EngineResult, ErrorKind};
use super::outcome::{ActionOutcome, RecordedOutcome};
use super::token::ActionToken;
use crate::config::EngineConfig;
use crate::game::constants::{BOARD_SIZE, HOLE_CARDS, MAX_PLAYERS, MIN_PLAYERS};
use crate::game::entities::{
    ChatId, Chips, Deck, GameSnapshot, GameState, PlayerState, PlayerStatus, UserId,
};
use crate::game::hand::HandRanker;
use crate::game::settlement::{self, PotShare, PotTier};
use crate::locks::LockManager;
use crate::store::GameStore;
use crate::wallet::{WalletError, WalletLedger};

/// A player's move in the current betting round.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PlayerAction {
    Fold,
    Check,
    Call,
    /// Raise by this much on top of the current call amount.
    Raise(Chips),
    AllIn,
}

fn action_tag(action: PlayerAction) -> &'static str {
    match action {
        PlayerAction::Fold => "fold",
        PlayerAction::Check => "check",
        PlayerAction::Call => "call",
        PlayerAction::Raise(_) => "raise",
        PlayerAction::AllIn => "all_in",
    }
}

/// One delivered button press.
#[derive(Clone, Debug)]
pub struct ActionRequest {
    pub chat_id: ChatId,
    pub user_id: UserId,
    /// Platform-assigned delivery id; the idempotency key.
    pub callback_id: String,
    pub token: ActionToken,
    pub action: PlayerAction,
}

/// The hand-ending transfer plan. Built while mutating the snapshot,
/// executed against the wallet only after the snapshot is persisted.
struct Settlement {
    tiers: Vec<PotTier>,
    /// Everyone whose escrow for this hand is now spent.
    participants: Vec<UserId>,
}

enum Applied {
    Accepted {
        /// Chips escrowed for this attempt; released if the save fails.
        authorized: Chips,
        settlement: Option<Settlement>,
    },
    Rejected(ErrorKind),
}

/// Serializes and validates all game-state mutations for every chat.
pub struct ActionGateway {
    store: Arc<dyn GameStore>,
    locks: Arc<LockManager>,
    wallets: Arc<dyn WalletLedger>,
    ranker: Arc<dyn HandRanker>,
    config: EngineConfig,
}

impl ActionGateway {
    pub fn new(
        store: Arc<dyn GameStore>,
        locks: Arc<LockManager>,
        wallets: Arc<dyn WalletLedger>,
        ranker: Arc<dyn HandRanker>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            locks,
            wallets,
            ranker,
            config,
        }
    }

    /// Current snapshot for rendering. Read-only; takes no locks.
    pub async fn snapshot(&self, chat_id: ChatId) -> EngineResult<GameSnapshot> {
        let (game, _) = self.store.load_with_version(chat_id).await?;
        Ok(game)
    }

    /// Mint a token for embedding in the action prompt rendered from
    /// `snapshot`.
    pub fn issue_token(&self, snapshot: &GameSnapshot) -> ActionToken {
        ActionToken::issue(snapshot, self.config.action_token_ttl)
    }

    /// Process one player action end to end.
    pub async fn apply_action(&self, request: &ActionRequest) -> EngineResult<ActionOutcome> {
        if let Some(outcome) = self.claim_callback(request).await? {
            return Ok(outcome);
        }

        let acquired = self
            .locks
            .action_lock_guard_with_retry(
                request.chat_id,
                request.user_id,
                action_tag(request.action),
                self.config.action_lock_ttl,
            )
            .await;
        let (guard, stats) = match acquired {
            Ok(acquired) => acquired,
            Err(_) => {
                self.settle_callback(request, ErrorKind::ActionLockTimeout)
                    .await?;
                return Ok(ActionOutcome::rejected(ErrorKind::ActionLockTimeout));
            }
        };
        if stats.attempts > 1 {
            log::info!(
                "Action lock for chat {} user {} contended: {} attempts, {:?} waited",
                request.chat_id,
                request.user_id,
                stats.attempts,
                stats.wait_time,
            );
        }

        let result = self.apply_action_locked(request).await;
        guard.release();
        result
    }

    /// Claim the callback id before doing any work. A redelivery that
    /// arrives later finds the record and replays it instead of acting
    /// twice. Returns the ready outcome for duplicates and early
    /// rejections, `None` when the claim is ours to process.
    async fn claim_callback(
        &self,
        request: &ActionRequest,
    ) -> EngineResult<Option<ActionOutcome>> {
        for _ in 0..self.config.cas_retry_limit {
            let (mut game, version) = self.store.load_with_version(request.chat_id).await?;
            if let Some(recorded) = game.processed_callback(&request.callback_id) {
                log::info!(
                    "Duplicate callback {} for chat {}, replaying recorded outcome",
                    request.callback_id,
                    request.chat_id,
                );
                return Ok(Some(ActionOutcome::replayed(&recorded.outcome)));
            }
            if !game.state.is_active_round() {
                return Ok(Some(ActionOutcome::rejected(ErrorKind::NoActiveGame)));
            }
            game.record_callback(&request.callback_id, RecordedOutcome::provisional());
            if self
                .store
                .save_with_version_check(request.chat_id, &game, version)
                .await?
            {
                return Ok(None);
            }
        }
        Ok(Some(ActionOutcome::rejected(
            ErrorKind::ConcurrentUpdateFailure,
        )))
    }

    /// Upgrade this request's provisional record to a settled rejection,
    /// best effort. A version conflict here is harmless: the record
    /// stays provisional and redeliveries still replay a rejection-free
    /// placeholder rather than re-acting.
    async fn settle_callback(
        &self,
        request: &ActionRequest,
        reason: ErrorKind,
    ) -> EngineResult<()> {
        let (mut game, version) = self.store.load_with_version(request.chat_id).await?;
        if game.processed_callback(&request.callback_id).is_some() {
            game.record_callback(&request.callback_id, RecordedOutcome::settled_reject(reason));
            if !self
                .store
                .save_with_version_check(request.chat_id, &game, version)
                .await?
            {
                log::debug!(
                    "Left callback {} provisional for chat {} after version conflict",
                    request.callback_id,
                    request.chat_id,
                );
            }
        }
        Ok(())
    }

    /// Steps under the action lock: load fresh, validate, apply, save
    /// with version check, retry the whole cycle on conflict.
    async fn apply_action_locked(&self, request: &ActionRequest) -> EngineResult<ActionOutcome> {
        for attempt in 0..self.config.cas_retry_limit {
            let (mut game, version) = self.store.load_with_version(request.chat_id).await?;
            let game_id = game.game_id.clone();
            match self.validate_and_apply(&mut game, request).await? {
                Applied::Rejected(reason) => {
                    game.record_callback(
                        &request.callback_id,
                        RecordedOutcome::settled_reject(reason),
                    );
                    if self
                        .store
                        .save_with_version_check(request.chat_id, &game, version)
                        .await?
                    {
                        log::info!(
                            "Rejected {} from user {} in chat {}: {reason}",
                            action_tag(request.action),
                            request.user_id,
                            request.chat_id,
                        );
                        return Ok(ActionOutcome::rejected(reason));
                    }
                }
                Applied::Accepted {
                    authorized,
                    settlement,
                } => {
                    game.record_callback(&request.callback_id, RecordedOutcome::settled_accept());
                    let saved = self
                        .store
                        .save_with_version_check(request.chat_id, &game, version)
                        .await;
                    match saved {
                        Ok(true) => {
                            if let Some(settlement) = &settlement {
                                self.pay_out(&game_id, settlement).await?;
                            }
                            return Ok(ActionOutcome::accepted(
                                game,
                                settlement.map(|s| s.tiers),
                            ));
                        }
                        Ok(false) => {
                            // Lost the version race after escrowing the
                            // bet. Undo the escrow, then revalidate
                            // from fresh state.
                            if authorized > 0 {
                                self.wallets
                                    .release(request.user_id, &game_id, authorized)
                                    .await?;
                            }
                            log::debug!(
                                "Version conflict applying action in chat {}, attempt {}",
                                request.chat_id,
                                attempt + 1,
                            );
                        }
                        Err(err) => {
                            // The save never happened, so the bet it
                            // backed never happened either: give the
                            // escrow back before surfacing the outage.
                            if authorized > 0 {
                                self.wallets
                                    .release(request.user_id, &game_id, authorized)
                                    .await?;
                            }
                            return Err(err.into());
                        }
                    }
                }
            }
        }
        self.settle_callback(request, ErrorKind::ConcurrentUpdateFailure)
            .await?;
        Ok(ActionOutcome::rejected(ErrorKind::ConcurrentUpdateFailure))
    }

    /// Validate the request against `game` and mutate it in place.
    /// Validation happens before any mutation, so a rejection leaves the
    /// snapshot untouched apart from the callback record the caller
    /// writes.
    async fn validate_and_apply(
        &self,
        game: &mut GameSnapshot,
        request: &ActionRequest,
    ) -> EngineResult<Applied> {
        if !game.state.is_active_round() {
            return Ok(Applied::Rejected(ErrorKind::NoActiveGame));
        }
        let Some(seat) = game
            .players
            .iter()
            .position(|p| p.user_id == request.user_id)
        else {
            return Ok(Applied::Rejected(ErrorKind::TurnMismatch));
        };
        if seat != game.current_player_index
            || game.players[seat].status != PlayerStatus::Active
        {
            return Ok(Applied::Rejected(ErrorKind::TurnMismatch));
        }
        if !request.token.matches(game) {
            return Ok(Applied::Rejected(ErrorKind::StaleAction));
        }

        let game_id = game.game_id.clone();
        let to_call = game.max_round_rate - game.players[seat].round_rate;
        let mut authorized = 0;

        match request.action {
            PlayerAction::Fold => {
                game.players[seat].status = PlayerStatus::Folded;
            }
            action => {
                let balance = self.wallets.value(request.user_id).await?;
                // A broke player can still check behind; every other
                // action commits chips they do not have.
                if balance == 0 && !matches!(action, PlayerAction::Check) {
                    return Ok(Applied::Rejected(ErrorKind::InsufficientFunds));
                }
                let desired = match action {
                    PlayerAction::Check | PlayerAction::Call => to_call,
                    PlayerAction::Raise(amount) => to_call + amount.max(0),
                    PlayerAction::AllIn => balance,
                    PlayerAction::Fold => unreachable!(),
                };
                // A bet past the balance becomes an all-in for whatever
                // is left.
                let delta = desired.min(balance);
                if desired > 0 && delta == 0 {
                    return Ok(Applied::Rejected(ErrorKind::InsufficientFunds));
                }
                if delta > 0 {
                    match self.wallets.authorize(request.user_id, &game_id, delta).await {
                        Ok(()) => authorized = delta,
                        Err(WalletError::InsufficientBalance { .. }) => {
                            return Ok(Applied::Rejected(ErrorKind::InsufficientFunds));
                        }
                        Err(err) => return Err(EngineError::Wallet(err)),
                    }
                }
                let player = &mut game.players[seat];
                player.round_rate += delta;
                player.total_bet += delta;
                game.pot += delta;
                if matches!(action, PlayerAction::AllIn) || delta < desired || delta == balance {
                    player.status = PlayerStatus::AllIn;
                }
            }
        }
        game.players[seat].has_acted = true;

        // A raise reopens the round for everyone still able to act.
        let new_rate = game.players[seat].round_rate;
        if new_rate > game.max_round_rate {
            game.max_round_rate = new_rate;
            for (idx, player) in game.players.iter_mut().enumerate() {
                if idx != seat && player.status == PlayerStatus::Active {
                    player.has_acted = false;
                }
            }
        }

        let settlement = self.advance(game);
        game.callback_version += 1;
        Ok(Applied::Accepted {
            authorized,
            settlement,
        })
    }

    /// Move the game forward after an applied action: pass the turn,
    /// advance streets while nobody can act, or end the hand.
    fn advance(&self, game: &mut GameSnapshot) -> Option<Settlement> {
        if !betting_round_complete(game) {
            game.current_player_index = game
                .next_seat_where(game.current_player_index, |p| {
                    p.status == PlayerStatus::Active
                });
            return None;
        }
        loop {
            let contenders = game.players.iter().filter(|p| p.is_contender()).count();
            if contenders <= 1 || game.state.next_street().is_none() {
                return Some(self.finalize(game));
            }
            advance_street(game);
            if !betting_round_complete(game) {
                return None;
            }
        }
    }

    /// End the hand: run out the board if a showdown is needed, rank,
    /// and build the transfer plan. Wallet calls happen later, once the
    /// finished snapshot is persisted.
    fn finalize(&self, game: &mut GameSnapshot) -> Settlement {
        let contenders = game.players.iter().filter(|p| p.is_contender()).count();
        if contenders >= 2 {
            while game.table_cards.len() < BOARD_SIZE {
                match game.deck.deal_card() {
                    Some(card) => game.table_cards.push(card),
                    None => break,
                }
            }
        }
        let mut tiers = settlement::resolve(
            &game.players,
            &game.table_cards,
            game.dealer_index,
            self.ranker.as_ref(),
        );
        // A contender who never put chips in wins nothing from the
        // split; if they are the only claim left, hand them the pot
        // rather than stranding it.
        if tiers.is_empty()
            && game.pot > 0
            && let Some(player) = game.players.iter().find(|p| p.is_contender())
        {
            tiers.push(PotTier {
                amount: game.pot,
                winners: vec![PotShare {
                    user_id: player.user_id,
                    seat_index: player.seat_index,
                    amount: game.pot,
                }],
            });
        }
        game.state = GameState::Finished;
        let participants = game
            .players
            .iter()
            .filter(|p| p.total_bet > 0)
            .map(|p| p.user_id)
            .collect();
        log::info!(
            "Hand {} finished: pot {} split into {} tier(s)",
            game.game_id,
            game.pot,
            tiers.len(),
        );
        Settlement {
            tiers,
            participants,
        }
    }

    /// Execute a settlement against the wallet. Escrows become spends,
    /// winners get deposits.
    async fn pay_out(&self, game_id: &str, settlement: &Settlement) -> EngineResult<()> {
        for user_id in &settlement.participants {
            self.wallets.approve(*user_id, game_id).await?;
        }
        for tier in &settlement.tiers {
            for share in &tier.winners {
                self.wallets.deposit(share.user_id, share.amount).await?;
            }
        }
        Ok(())
    }

    /// Seat a player. Idempotent: joining a table you already sit at
    /// succeeds without a write. Joining mid-hand seats the player
    /// folded; they are dealt in from the next hand.
    pub async fn join_table(&self, chat_id: ChatId, user_id: UserId) -> EngineResult<ActionOutcome> {
        let Some(guard) =
            self.locks
                .table_lock_guard(chat_id, "join", self.config.table_lock_ttl)
        else {
            return Ok(ActionOutcome::rejected(ErrorKind::ActionLockTimeout));
        };
        let result = self.join_table_locked(chat_id, user_id).await;
        guard.release();
        result
    }

    async fn join_table_locked(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> EngineResult<ActionOutcome> {
        for _ in 0..self.config.cas_retry_limit {
            let (mut game, version) = self.store.load_with_version(chat_id).await?;
            if let Some(player) = game.players.iter_mut().find(|p| p.user_id == user_id) {
                if !player.departed {
                    return Ok(ActionOutcome::accepted(game, None));
                }
                // Rejoining before the seat was swept.
                player.departed = false;
                game.callback_version += 1;
                if self
                    .store
                    .save_with_version_check(chat_id, &game, version)
                    .await?
                {
                    return Ok(ActionOutcome::accepted(game, None));
                }
                continue;
            }
            if game.players.len() >= MAX_PLAYERS {
                return Ok(ActionOutcome::rejected(ErrorKind::TableFull));
            }
            let seat = game.players.len();
            let mut player = PlayerState::new(user_id, seat);
            if game.state.is_active_round() {
                player.status = PlayerStatus::Folded;
            }
            game.players.push(player);
            game.callback_version += 1;
            if self
                .store
                .save_with_version_check(chat_id, &game, version)
                .await?
            {
                log::info!("User {user_id} joined chat {chat_id} at seat {seat}");
                return Ok(ActionOutcome::accepted(game, None));
            }
        }
        Ok(ActionOutcome::rejected(ErrorKind::ConcurrentUpdateFailure))
    }

    /// Unseat a player. Mid-hand the seat is folded and flagged, and
    /// vacated at the next reset so pot accounting stays intact; between
    /// hands the seat is removed immediately.
    pub async fn leave_table(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> EngineResult<ActionOutcome> {
        let Some(guard) =
            self.locks
                .table_lock_guard(chat_id, "leave", self.config.table_lock_ttl)
        else {
            return Ok(ActionOutcome::rejected(ErrorKind::ActionLockTimeout));
        };
        let result = self.leave_table_locked(chat_id, user_id).await;
        guard.release();
        result
    }

    async fn leave_table_locked(
        &self,
        chat_id: ChatId,
        user_id: UserId,
    ) -> EngineResult<ActionOutcome> {
        for _ in 0..self.config.cas_retry_limit {
            let (mut game, version) = self.store.load_with_version(chat_id).await?;
            let game_id = game.game_id.clone();
            let Some(pos) = game.players.iter().position(|p| p.user_id == user_id) else {
                // Not seated: leaving is a no-op.
                return Ok(ActionOutcome::accepted(game, None));
            };

            let mut settlement = None;
            if game.state.is_active_round() {
                let was_turn = pos == game.current_player_index
                    && game.players[pos].status == PlayerStatus::Active;
                game.players[pos].status = PlayerStatus::Folded;
                game.players[pos].departed = true;
                if was_turn {
                    settlement = self.advance(&mut game);
                }
            } else {
                game.players.remove(pos);
                for (seat, player) in game.players.iter_mut().enumerate() {
                    player.seat_index = seat;
                }
                if game.players.is_empty() {
                    game.dealer_index = 0;
                    game.current_player_index = 0;
                } else {
                    game.dealer_index %= game.players.len();
                    game.current_player_index %= game.players.len();
                }
            }
            game.callback_version += 1;

            if self
                .store
                .save_with_version_check(chat_id, &game, version)
                .await?
            {
                log::info!("User {user_id} left chat {chat_id}");
                if let Some(settlement) = &settlement {
                    self.pay_out(&game_id, settlement).await?;
                }
                return Ok(ActionOutcome::accepted(game, settlement.map(|s| s.tiers)));
            }
        }
        Ok(ActionOutcome::rejected(ErrorKind::ConcurrentUpdateFailure))
    }

    /// Deal a new hand: rotate the dealer, shuffle, deal hole cards, and
    /// post blinds. Runs under the stage lock because it is a multi-step
    /// mutation no action may interleave with.
    pub async fn start_hand(&self, chat_id: ChatId) -> EngineResult<ActionOutcome> {
        let Ok(guard) = self
            .locks
            .stage_lock_guard(chat_id, self.config.stage_lock_timeout)
            .await
        else {
            return Ok(ActionOutcome::rejected(ErrorKind::ActionLockTimeout));
        };
        let result = self.start_hand_locked(chat_id).await;
        guard.release();
        result
    }

    async fn start_hand_locked(&self, chat_id: ChatId) -> EngineResult<ActionOutcome> {
        for _ in 0..self.config.cas_retry_limit {
            let (mut game, version) = self.store.load_with_version(chat_id).await?;
            if game.state == GameState::Finished {
                game.reset_for_next_hand();
            }
            if game.state != GameState::Waiting {
                return Ok(ActionOutcome::rejected(ErrorKind::HandInProgress));
            }
            if game.players.len() < MIN_PLAYERS {
                return Ok(ActionOutcome::rejected(ErrorKind::NotEnoughPlayers));
            }

            let game_id = game.game_id.clone();
            let seats = game.players.len();
            game.dealer_index = (game.dealer_index + 1) % seats;
            game.deck = Deck::shuffled();
            let (players, deck) = (&mut game.players, &mut game.deck);
            for player in players.iter_mut() {
                player.cards.clear();
                for _ in 0..HOLE_CARDS {
                    if let Some(card) = deck.deal_card() {
                        player.cards.push(card);
                    }
                }
            }

            let small_blind = self.config.small_blind;
            let big_blind = small_blind * 2;
            let sb_seat = game
                .next_seat_where(game.dealer_index, |p| p.status == PlayerStatus::Active);
            let bb_seat = game.next_seat_where(sb_seat, |p| p.status == PlayerStatus::Active);

            let mut escrowed: Vec<(UserId, Chips)> = Vec::new();
            for (seat, amount) in [(sb_seat, small_blind), (bb_seat, big_blind)] {
                match self.post_blind(&mut game, &game_id, seat, amount).await {
                    Ok(posted) if posted > 0 => {
                        escrowed.push((game.players[seat].user_id, posted));
                    }
                    Ok(_) => {}
                    Err(err) => {
                        self.refund_escrow(&game_id, &escrowed).await?;
                        return Err(err);
                    }
                }
            }

            game.max_round_rate = game
                .players
                .iter()
                .map(|p| p.round_rate)
                .max()
                .unwrap_or(0);
            game.current_player_index =
                game.next_seat_where(bb_seat, |p| p.status == PlayerStatus::Active);
            game.state = GameState::PreFlop;
            game.callback_version += 1;

            match self
                .store
                .save_with_version_check(chat_id, &game, version)
                .await
            {
                Ok(true) => {
                    log::info!("Hand {game_id} started in chat {chat_id} with {seats} players");
                    return Ok(ActionOutcome::accepted(game, None));
                }
                Ok(false) => {
                    self.refund_escrow(&game_id, &escrowed).await?;
                }
                Err(err) => {
                    // Unpersisted blinds are refunded before the outage
                    // surfaces.
                    self.refund_escrow(&game_id, &escrowed).await?;
                    return Err(err.into());
                }
            }
        }
        Ok(ActionOutcome::rejected(ErrorKind::ConcurrentUpdateFailure))
    }

    /// Post a blind, clamped to the player's balance. A short-stacked
    /// poster goes all-in for what they have.
    async fn post_blind(
        &self,
        game: &mut GameSnapshot,
        game_id: &str,
        seat: usize,
        amount: Chips,
    ) -> EngineResult<Chips> {
        let user_id = game.players[seat].user_id;
        let balance = self.wallets.value(user_id).await?;
        let mut posted = amount.min(balance);
        if posted > 0 {
            match self.wallets.authorize(user_id, game_id, posted).await {
                Ok(()) => {}
                Err(WalletError::InsufficientBalance { .. }) => posted = 0,
                Err(err) => return Err(EngineError::Wallet(err)),
            }
        }
        let player = &mut game.players[seat];
        player.round_rate += posted;
        player.total_bet += posted;
        game.pot += posted;
        if posted < amount {
            player.status = PlayerStatus::AllIn;
        }
        Ok(posted)
    }

    async fn refund_escrow(
        &self,
        game_id: &str,
        escrowed: &[(UserId, Chips)],
    ) -> EngineResult<()> {
        for (user_id, amount) in escrowed {
            self.wallets.release(*user_id, game_id, *amount).await?;
        }
        Ok(())
    }

    /// Reset every finished chat back to `Waiting`, keeping seats.
    /// Returns the number of chats reset. Safe to run from multiple
    /// processes: the stage lock and the version check make losing
    /// sweepers no-ops.
    pub async fn sweep_finished_games(&self) -> EngineResult<usize> {
        let mut reset = 0;
        for chat_id in self.store.active_chat_ids().await? {
            let (game, _) = self.store.load_with_version(chat_id).await?;
            if game.state != GameState::Finished {
                continue;
            }
            let Ok(guard) = self
                .locks
                .stage_lock_guard(chat_id, self.config.stage_lock_timeout)
                .await
            else {
                continue;
            };
            // Re-read under the lock; another sweeper may have won.
            let (mut game, version) = self.store.load_with_version(chat_id).await?;
            if game.state == GameState::Finished {
                game.reset_for_next_hand();
                if self
                    .store
                    .save_with_version_check(chat_id, &game, version)
                    .await?
                {
                    reset += 1;
                }
            }
            guard.release();
        }
        if reset > 0 {
            log::info!("Swept {reset} finished game(s) back to waiting");
        }
        Ok(reset)
    }
}

/// Whether the current betting round has no further action pending.
/// All-in and folded players never owe action; a lone active player is
/// done once their bet covers the highest all-in.
fn betting_round_complete(game: &GameSnapshot) -> bool {
    let contenders = game.players.iter().filter(|p| p.is_contender()).count();
    if contenders <= 1 {
        return true;
    }
    let actives: Vec<&PlayerState> = game
        .players
        .iter()
        .filter(|p| p.status == PlayerStatus::Active)
        .collect();
    match actives.len() {
        0 => true,
        1 => actives[0].round_rate >= game.max_round_rate,
        _ => actives
            .iter()
            .all(|p| p.has_acted && p.round_rate >= game.max_round_rate),
    }
}

/// Deal the next street and open a fresh betting round.
fn advance_street(game: &mut GameSnapshot) {
    let Some(next) = game.state.next_street() else {
        return;
    };
    game.state = next;
    let needed = next.board_cards();
    while game.table_cards.len() < needed {
        match game.deck.deal_card() {
            Some(card) => game.table_cards.push(card),
            None => break,
        }
    }
    game.max_round_rate = 0;
    for player in &mut game.players {
        player.round_rate = 0;
        player.has_acted = false;
    }
    game.current_player_index = game
        .next_seat_where(game.dealer_index, |p| p.status == PlayerStatus::Active);
    log::debug!("Chat advanced to {} ({} board cards)", game.state, needed);
}
