//! End-to-end gateway behavior under concurrency: duplicate callback
//! deliveries, racing actors, abandoned locks and full hands played to
//! showdown.

use std::sync::Arc;
use std::time::Duration;

use poker_sync::config::EngineConfig;
use poker_sync::engine::{ActionGateway, ActionRequest, ErrorKind, PlayerAction};
use poker_sync::game::entities::{ChatId, Chips, GameState, UserId};
use poker_sync::game::hand::Evaluator;
use poker_sync::locks::LockManager;
use poker_sync::retry::RetryPolicy;
use poker_sync::store::MemoryGameStore;
use poker_sync::wallet::{MemoryLedger, WalletLedger};

const CHAT: ChatId = 77;
const STACK: Chips = 1_000;

struct Fixture {
    gateway: Arc<ActionGateway>,
    locks: Arc<LockManager>,
    ledger: Arc<MemoryLedger>,
}

fn fixture(users: &[UserId]) -> Fixture {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut ledger = MemoryLedger::new(STACK);
    for user in users {
        ledger = ledger.with_balance(*user, STACK);
    }
    let ledger = Arc::new(ledger);
    let locks = Arc::new(LockManager::new(RetryPolicy {
        max_attempts: 4,
        base_delay: Duration::from_millis(20),
        multiplier: 2.0,
        max_delay: Duration::from_millis(100),
        jitter_ratio: 0.0,
    }));
    let gateway = Arc::new(ActionGateway::new(
        Arc::new(MemoryGameStore::default()),
        locks.clone(),
        ledger.clone(),
        Arc::new(Evaluator),
        EngineConfig::default(),
    ));
    Fixture {
        gateway,
        locks,
        ledger,
    }
}

async fn seat_and_deal(fixture: &Fixture, users: &[UserId]) {
    for user in users {
        assert!(fixture.gateway.join_table(CHAT, *user).await.unwrap().accepted);
    }
    assert!(fixture.gateway.start_hand(CHAT).await.unwrap().accepted);
}

async fn total_chips(ledger: &MemoryLedger, users: &[UserId]) -> Chips {
    let mut total = 0;
    for user in users {
        total += ledger.value(*user).await.unwrap();
    }
    total
}

#[tokio::test]
async fn duplicate_delivery_applies_exactly_once() {
    let users = [1, 2];
    let fixture = fixture(&users);
    seat_and_deal(&fixture, &users).await;

    let game = fixture.gateway.snapshot(CHAT).await.unwrap();
    let actor = game.current_player().unwrap().user_id;
    let request = ActionRequest {
        chat_id: CHAT,
        user_id: actor,
        callback_id: "delivery-1".into(),
        token: fixture.gateway.issue_token(&game),
        action: PlayerAction::Call,
    };

    // The platform redelivers the same callback concurrently.
    let (first, second) = tokio::join!(
        fixture.gateway.apply_action(&request),
        fixture.gateway.apply_action(&request),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_ne!(first.duplicate, second.duplicate, "exactly one delivery applies");
    let applied = if first.duplicate { &second } else { &first };
    assert!(applied.accepted);

    // The call moved exactly one increment of chips into the pot.
    let after = fixture.gateway.snapshot(CHAT).await.unwrap();
    assert_eq!(after.pot, 40);
    assert_eq!(after.player_by_user(actor).unwrap().round_rate, 20);
}

#[tokio::test]
async fn racing_presses_from_one_render_apply_at_most_once() {
    let users = [1, 2, 3];
    let fixture = fixture(&users);
    seat_and_deal(&fixture, &users).await;

    let game = fixture.gateway.snapshot(CHAT).await.unwrap();
    let actor = game.current_player().unwrap().user_id;
    let pot_before = game.pot;
    let owed = game.max_round_rate - game.player_by_user(actor).unwrap().round_rate;

    // Distinct deliveries (different callback ids) of presses made
    // against the same render: only one may change the game.
    let mut handles = Vec::new();
    for i in 0..4 {
        let gateway = fixture.gateway.clone();
        let token = fixture.gateway.issue_token(&game);
        handles.push(tokio::spawn(async move {
            gateway
                .apply_action(&ActionRequest {
                    chat_id: CHAT,
                    user_id: actor,
                    callback_id: format!("press-{i}"),
                    token,
                    action: PlayerAction::Call,
                })
                .await
                .unwrap()
        }));
    }

    let mut accepted = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        if outcome.accepted && !outcome.duplicate {
            accepted += 1;
        } else if !outcome.accepted {
            assert!(matches!(
                outcome.reason,
                Some(ErrorKind::StaleAction)
                    | Some(ErrorKind::TurnMismatch)
                    | Some(ErrorKind::ActionLockTimeout)
                    | Some(ErrorKind::ConcurrentUpdateFailure)
            ));
        }
    }
    assert_eq!(accepted, 1);

    let after = fixture.gateway.snapshot(CHAT).await.unwrap();
    assert_eq!(after.pot, pot_before + owed);
    assert_eq!(after.player_by_user(actor).unwrap().round_rate, 20);
}

#[tokio::test]
async fn out_of_turn_actor_is_rejected_not_interleaved() {
    let users = [1, 2, 3];
    let fixture = fixture(&users);
    seat_and_deal(&fixture, &users).await;

    let game = fixture.gateway.snapshot(CHAT).await.unwrap();
    let in_turn = game.current_player().unwrap().user_id;
    let out_of_turn = *users.iter().find(|u| **u != in_turn).unwrap();

    let outcome = fixture
        .gateway
        .apply_action(&ActionRequest {
            chat_id: CHAT,
            user_id: out_of_turn,
            callback_id: "early-press".into(),
            token: fixture.gateway.issue_token(&game),
            action: PlayerAction::Call,
        })
        .await
        .unwrap();

    assert!(!outcome.accepted);
    assert_eq!(outcome.reason, Some(ErrorKind::TurnMismatch));
    // The rejection itself is recorded: a redelivery replays it.
    let replay = fixture
        .gateway
        .apply_action(&ActionRequest {
            chat_id: CHAT,
            user_id: out_of_turn,
            callback_id: "early-press".into(),
            token: fixture.gateway.issue_token(&game),
            action: PlayerAction::Call,
        })
        .await
        .unwrap();
    assert!(replay.duplicate);
    assert!(!replay.accepted);
}

#[tokio::test]
async fn abandoned_action_lock_self_heals() {
    let users = [1, 2];
    let fixture = fixture(&users);
    seat_and_deal(&fixture, &users).await;

    let game = fixture.gateway.snapshot(CHAT).await.unwrap();
    let actor = game.current_player().unwrap().user_id;

    // Simulated crash: a holder takes the actor's lock and never
    // releases it. Its short TTL expires inside the gateway's retry
    // window, so the action still goes through.
    let _abandoned = fixture
        .locks
        .acquire_action_lock(CHAT, actor, "crashed", Duration::from_millis(30))
        .unwrap();

    let outcome = fixture
        .gateway
        .apply_action(&ActionRequest {
            chat_id: CHAT,
            user_id: actor,
            callback_id: "after-crash".into(),
            token: fixture.gateway.issue_token(&game),
            action: PlayerAction::Call,
        })
        .await
        .unwrap();

    assert!(outcome.accepted);
    assert!(fixture.locks.metrics().expired_reclaims >= 1);
}

/// Play the current hand to completion with passive actions (call when
/// facing a bet, check otherwise). Returns the finished snapshot.
async fn play_out(fixture: &Fixture) -> poker_sync::game::GameSnapshot {
    for step in 0.. {
        assert!(step < 64, "hand did not converge");
        let game = fixture.gateway.snapshot(CHAT).await.unwrap();
        if game.state == GameState::Finished {
            return game;
        }
        let actor = game.current_player().unwrap();
        let owed = game.max_round_rate - actor.round_rate;
        let action = if owed > 0 {
            PlayerAction::Call
        } else {
            PlayerAction::Check
        };
        let outcome = fixture
            .gateway
            .apply_action(&ActionRequest {
                chat_id: CHAT,
                user_id: actor.user_id,
                callback_id: format!("step-{step}"),
                token: fixture.gateway.issue_token(&game),
                action,
            })
            .await
            .unwrap();
        assert!(outcome.accepted, "passive action rejected: {:?}", outcome.reason);
    }
    unreachable!()
}

#[tokio::test]
async fn hand_played_to_showdown_conserves_chips() {
    let users = [1, 2, 3];
    let fixture = fixture(&users);
    assert_eq!(total_chips(&fixture.ledger, &users).await, 3 * STACK);
    seat_and_deal(&fixture, &users).await;

    let finished = play_out(&fixture).await;

    assert_eq!(finished.state, GameState::Finished);
    assert_eq!(finished.table_cards.len(), 5);
    // Everyone called to the big blind and checked down.
    assert_eq!(finished.pot, 60);
    assert!(finished.players.iter().all(|p| p.total_bet == 20));
    // Winnings equal the pot: no chips created or destroyed.
    assert_eq!(total_chips(&fixture.ledger, &users).await, 3 * STACK);
}

#[tokio::test]
async fn consecutive_hands_rotate_the_dealer() {
    let users = [1, 2, 3];
    let fixture = fixture(&users);
    seat_and_deal(&fixture, &users).await;
    let first_dealer = fixture.gateway.snapshot(CHAT).await.unwrap().dealer_index;

    play_out(&fixture).await;
    assert_eq!(fixture.gateway.sweep_finished_games().await.unwrap(), 1);
    assert!(fixture.gateway.start_hand(CHAT).await.unwrap().accepted);

    let second_dealer = fixture.gateway.snapshot(CHAT).await.unwrap().dealer_index;
    assert_eq!(second_dealer, (first_dealer + 1) % users.len());
}

#[tokio::test]
async fn short_stack_call_becomes_an_all_in() {
    let users = [1, 2];
    let fixture = fixture(&users);
    seat_and_deal(&fixture, &users).await;

    let game = fixture.gateway.snapshot(CHAT).await.unwrap();
    let actor = game.current_player().unwrap().user_id;

    // Drain the actor's wallet down to less than the call amount.
    let balance = fixture.ledger.value(actor).await.unwrap();
    fixture
        .ledger
        .authorize(actor, "drain", balance - 5)
        .await
        .unwrap();

    let outcome = fixture
        .gateway
        .apply_action(&ActionRequest {
            chat_id: CHAT,
            user_id: actor,
            callback_id: "short-call".into(),
            token: fixture.gateway.issue_token(&game),
            action: PlayerAction::Call,
        })
        .await
        .unwrap();

    assert!(outcome.accepted);
    let after = outcome.new_state.unwrap();
    let player = after.player_by_user(actor).unwrap();
    assert_eq!(
        player.status,
        poker_sync::game::PlayerStatus::AllIn,
        "a call past the balance clamps to an all-in"
    );
    assert_eq!(
        player.total_bet,
        game.player_by_user(actor).unwrap().total_bet + 5
    );
    // With one player all-in and the other covering, the board runs out
    // and the hand settles in the same action.
    assert_eq!(after.state, GameState::Finished);
}

#[tokio::test]
async fn independent_chats_never_contend() {
    let users = [1, 2];
    let fixture = fixture(&users);

    let mut handles = Vec::new();
    for chat in 0..8i64 {
        let gateway = fixture.gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway.join_table(chat, 1).await.unwrap();
            gateway.join_table(chat, 2).await.unwrap();
            gateway.start_hand(chat).await.unwrap()
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().accepted);
    }
    assert_eq!(fixture.locks.metrics().contention, 0);
}
