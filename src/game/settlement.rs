//! Pure betting resolution: committed bets plus hand scores in, pot
//! tiers out. No I/O and no locks; callers invoke this while already
//! holding whatever locks the surrounding operation needs.

use std::collections::BTreeMap;

use super::entities::{Card, Chips, PlayerState, UserId};
use super::hand::{HandRanker, Score};

/// One winner's cut of a pot tier.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PotShare {
    pub user_id: UserId,
    pub seat_index: usize,
    pub amount: Chips,
}

/// A portion of the total pot and the contenders it was paid to.
#[derive(Clone, Debug, Eq, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct PotTier {
    pub amount: Chips,
    pub winners: Vec<PotShare>,
}

/// Resolve a finished hand into pot tiers.
///
/// Contenders (ACTIVE or ALL_IN players) are grouped by hand score and
/// paid best group first: the remaining pot is split proportionally to
/// each member's total bet, with every share capped at
/// `total_bet * player_count`; capped excess flows to the next group.
/// Fractional chips go to the largest remainders first, ties broken by
/// seat order starting left of the dealer. Any residue left after all
/// groups is granted to the best-scoring group so the tier amounts
/// always sum to the pot.
///
/// Folded players' chips stay in the pot but folded players never win.
/// With no contenders at all the result is empty.
pub fn resolve(
    players: &[PlayerState],
    table_cards: &[Card],
    dealer_index: usize,
    ranker: &dyn HandRanker,
) -> Vec<PotTier> {
    let n = players.len();
    if n == 0 {
        return Vec::new();
    }
    let total_pot: Chips = players.iter().map(|p| p.total_bet).sum();

    // Group contenders by score, best first.
    let mut groups: BTreeMap<Score, Vec<usize>> = BTreeMap::new();
    for (idx, player) in players.iter().enumerate() {
        if player.is_contender() && player.total_bet > 0 {
            let score = ranker.score(&player.cards, table_cards);
            groups.entry(score).or_default().push(idx);
        }
    }
    if groups.is_empty() {
        return Vec::new();
    }

    let seat_priority =
        |idx: usize| (players[idx].seat_index + n - (dealer_index + 1) % n) % n;

    let mut remaining = total_pot;
    let mut group_payouts: Vec<Vec<(usize, Chips)>> = Vec::new();

    for (_, mut members) in groups.into_iter().rev() {
        members.sort_by_key(|&idx| seat_priority(idx));
        let group_total: Chips = members.iter().map(|&idx| players[idx].total_bet).sum();
        if group_total <= 0 {
            continue;
        }

        let allocations = proportional_split(remaining, &members, players, group_total);
        let mut payouts = Vec::with_capacity(members.len());
        let mut paid: Chips = 0;
        for (&idx, allocation) in members.iter().zip(allocations) {
            let cap = players[idx].total_bet * n as Chips;
            let share = allocation.min(cap);
            paid += share;
            payouts.push((idx, share));
        }
        remaining -= paid;
        group_payouts.push(payouts);
    }

    // Caps can strand chips when even the best contenders are covered
    // many times over by folded bets; hand the residue to the top group.
    if remaining > 0
        && let Some(top) = group_payouts.first_mut()
    {
        let count = top.len() as Chips;
        let base = remaining / count;
        let mut leftover = remaining - base * count;
        for (_, share) in top.iter_mut() {
            *share += base;
            if leftover > 0 {
                *share += 1;
                leftover -= 1;
            }
        }
    }

    let mut tiers: Vec<PotTier> = group_payouts
        .into_iter()
        .filter_map(|payouts| {
            let amount: Chips = payouts.iter().map(|&(_, share)| share).sum();
            if amount <= 0 {
                return None;
            }
            let winners = payouts
                .into_iter()
                .filter(|&(_, share)| share > 0)
                .map(|(idx, share)| PotShare {
                    user_id: players[idx].user_id,
                    seat_index: players[idx].seat_index,
                    amount: share,
                })
                .collect();
            Some(PotTier { amount, winners })
        })
        .collect();
    tiers.sort_by_key(|tier| tier.amount);
    tiers
}

/// Split `amount` across `members` proportionally to their total bets,
/// assigning leftover chips to the largest fractional remainders first
/// (members are already in seat-priority order, which breaks ties).
fn proportional_split(
    amount: Chips,
    members: &[usize],
    players: &[PlayerState],
    group_total: Chips,
) -> Vec<Chips> {
    let mut shares = Vec::with_capacity(members.len());
    let mut fractions: Vec<(usize, i128)> = Vec::with_capacity(members.len());
    let mut allocated: Chips = 0;
    for (pos, &idx) in members.iter().enumerate() {
        let product = i128::from(amount) * i128::from(players[idx].total_bet);
        let base = (product / i128::from(group_total)) as Chips;
        fractions.push((pos, product % i128::from(group_total)));
        shares.push(base);
        allocated += base;
    }
    let mut leftover = amount - allocated;
    fractions.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    for (pos, _) in fractions {
        if leftover == 0 {
            break;
        }
        shares[pos] += 1;
        leftover -= 1;
    }
    shares
}
