//! Action outcomes, both the caller-facing kind and the compact form
//! persisted in the idempotency window.

use serde::{Deserialize, Serialize};

use super::errors::ErrorKind;
use crate::game::entities::GameSnapshot;
use crate::game::settlement::PotTier;

/// The persisted trace of one callback delivery. Small on purpose: it
/// lives inside the snapshot and rides every save.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Serialize)]
pub struct RecordedOutcome {
    pub accepted: bool,
    pub reason: Option<ErrorKind>,
    /// False while the claim is provisional (recorded before the action
    /// was applied), true once the final outcome is known.
    pub settled: bool,
}

impl RecordedOutcome {
    /// The claim written before processing starts. A redelivery that
    /// finds this knows the original request is still in flight.
    pub fn provisional() -> Self {
        Self {
            accepted: false,
            reason: None,
            settled: false,
        }
    }

    pub fn settled_accept() -> Self {
        Self {
            accepted: true,
            reason: None,
            settled: true,
        }
    }

    pub fn settled_reject(reason: ErrorKind) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            settled: true,
        }
    }
}

/// What the gateway reports back for one request.
#[derive(Clone, Debug)]
pub struct ActionOutcome {
    pub accepted: bool,
    pub reason: Option<ErrorKind>,
    /// The persisted snapshot after the mutation, when one happened.
    pub new_state: Option<GameSnapshot>,
    /// Present only when this action ended the hand.
    pub pot_tiers: Option<Vec<PotTier>>,
    /// The callback id was already processed; this outcome replays the
    /// recorded one without re-applying anything.
    pub duplicate: bool,
}

impl ActionOutcome {
    pub fn accepted(new_state: GameSnapshot, pot_tiers: Option<Vec<PotTier>>) -> Self {
        Self {
            accepted: true,
            reason: None,
            new_state: Some(new_state),
            pot_tiers,
            duplicate: false,
        }
    }

    pub fn rejected(reason: ErrorKind) -> Self {
        Self {
            accepted: false,
            reason: Some(reason),
            new_state: None,
            pot_tiers: None,
            duplicate: false,
        }
    }

    /// Replay a previously recorded delivery.
    pub fn replayed(recorded: &RecordedOutcome) -> Self {
        Self {
            accepted: recorded.accepted,
            reason: recorded.reason,
            new_state: None,
            pot_tiers: None,
            duplicate: true,
        }
    }
}
