//! Hand ranking for showdown settlement.
//!
//! The default [`Evaluator`] scores the best five-card hand out of the
//! player's hole cards and the board. Scores are base-15 positional so
//! that a more significant card (the pair card, say) always outweighs
//! any combination of kickers.

use super::entities::{Card, Value};

/// Comparable strength of a hand. Higher wins.
pub type Score = u64;

const HAND_RANK_MULTIPLIER: Score = 15u64.pow(5);

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Rank {
    HighCard = 1,
    OnePair = 2,
    TwoPair = 3,
    ThreeOfAKind = 4,
    Straight = 5,
    Flush = 6,
    FullHouse = 7,
    FourOfAKind = 8,
    StraightFlush = 9,
    RoyalFlush = 10,
}

/// The seam the betting resolver ranks hands through; injectable so
/// settlement can be tested with fixed scores.
pub trait HandRanker: Send + Sync {
    /// Score the best hand available from `hole_cards` plus
    /// `table_cards`. Must be a pure function of its inputs.
    fn score(&self, hole_cards: &[Card], table_cards: &[Card]) -> Score;
}

/// Exhaustive 5-of-7 evaluator.
#[derive(Clone, Copy, Debug, Default)]
pub struct Evaluator;

impl HandRanker for Evaluator {
    fn score(&self, hole_cards: &[Card], table_cards: &[Card]) -> Score {
        let mut all: Vec<Card> = Vec::with_capacity(hole_cards.len() + table_cards.len());
        all.extend_from_slice(hole_cards);
        all.extend_from_slice(table_cards);
        if all.len() < 5 {
            return 0;
        }

        let n = all.len();
        let mut best: Score = 0;
        for a in 0..n - 4 {
            for b in a + 1..n - 3 {
                for c in b + 1..n - 2 {
                    for d in c + 1..n - 1 {
                        for e in d + 1..n {
                            let mut hand = [all[a], all[b], all[c], all[d], all[e]];
                            hand.sort_by(|x, y| y.0.cmp(&x.0));
                            let (score, _) = score_five(&hand);
                            if score > best {
                                best = score;
                            }
                        }
                    }
                }
            }
        }
        best
    }
}

impl Evaluator {
    /// Rank of the best five-card hand, for presentation layers.
    pub fn best_rank(&self, hole_cards: &[Card], table_cards: &[Card]) -> Rank {
        let mut all: Vec<Card> = Vec::with_capacity(hole_cards.len() + table_cards.len());
        all.extend_from_slice(hole_cards);
        all.extend_from_slice(table_cards);
        if all.len() < 5 {
            return Rank::HighCard;
        }

        let n = all.len();
        let mut best: (Score, Rank) = (0, Rank::HighCard);
        for a in 0..n - 4 {
            for b in a + 1..n - 3 {
                for c in b + 1..n - 2 {
                    for d in c + 1..n - 1 {
                        for e in d + 1..n {
                            let mut hand = [all[a], all[b], all[c], all[d], all[e]];
                            hand.sort_by(|x, y| y.0.cmp(&x.0));
                            let scored = score_five(&hand);
                            if scored.0 > best.0 {
                                best = scored;
                            }
                        }
                    }
                }
            }
        }
        best.1
    }
}

/// Score a five-card hand sorted by descending value.
fn score_five(hand: &[Card; 5]) -> (Score, Rank) {
    let values: Vec<Value> = hand.iter().map(|c| c.0).collect();
    let is_flush = hand.iter().all(|c| c.1 == hand[0].1);
    let mut is_straight = values.windows(2).all(|w| w[0] - w[1] == 1);

    // A-5 wheel: the ace plays low and ranks under a 6-high straight.
    let mut kickers = values.clone();
    if values == [14, 5, 4, 3, 2] {
        is_straight = true;
        kickers = vec![5, 4, 3, 2, 1];
    }

    if is_straight && is_flush {
        let rank = if values == [14, 13, 12, 11, 10] {
            Rank::RoyalFlush
        } else {
            Rank::StraightFlush
        };
        return (positional_score(&kickers, rank), rank);
    }

    let (counts, keys) = group_by_value(&values);
    let rank = match counts.as_slice() {
        [1, 4] => Rank::FourOfAKind,
        [2, 3] => Rank::FullHouse,
        _ if is_flush => Rank::Flush,
        _ if is_straight => Rank::Straight,
        [1, 1, 3] => Rank::ThreeOfAKind,
        [1, 2, 2] => Rank::TwoPair,
        [1, 1, 1, 2] => Rank::OnePair,
        _ => Rank::HighCard,
    };

    match rank {
        Rank::Flush | Rank::Straight | Rank::HighCard => (positional_score(&kickers, rank), rank),
        _ => (positional_score(&keys, rank), rank),
    }
}

/// Base-15 positional score: earlier values carry more weight.
fn positional_score(values: &[Value], rank: Rank) -> Score {
    let mut score = HAND_RANK_MULTIPLIER * rank as Score;
    let mut power = values.len() as u32 - 1;
    for &value in values {
        score += Score::from(value) * 15u64.pow(power);
        power = power.wrapping_sub(1);
    }
    score
}

/// Group card values by multiplicity. Returns the multiplicities in
/// ascending order and the values ordered by importance (multiplicity,
/// then value, descending).
fn group_by_value(values: &[Value]) -> (Vec<usize>, Vec<Value>) {
    let mut groups: Vec<(Value, usize)> = Vec::new();
    for &value in values {
        match groups.iter_mut().find(|(v, _)| *v == value) {
            Some((_, count)) => *count += 1,
            None => groups.push((value, 1)),
        }
    }
    let mut counts: Vec<usize> = groups.iter().map(|&(_, c)| c).collect();
    counts.sort_unstable();
    groups.sort_by(|a, b| (b.1, b.0).cmp(&(a.1, a.0)));
    let keys = groups.into_iter().map(|(v, _)| v).collect();
    (counts, keys)
}
