//! Scoring engine: category scores, availability, and totals.
//!
//! Everything here is a pure function of its arguments.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::dice::{Dice, face_counts};
use crate::{Category, Scorecard};

pub const FULL_HOUSE_SCORE: u16 = 25;
pub const SMALL_STRAIGHT_SCORE: u16 = 30;
pub const LARGE_STRAIGHT_SCORE: u16 = 40;
pub const YAHTZEE_SCORE: u16 = 50;

/// Upper-section total needed for the bonus.
pub const UPPER_BONUS_THRESHOLD: u16 = 63;
pub const UPPER_BONUS: u16 = 35;

/// Score `dice` would earn in `category`.
///
/// Full house requires two *distinct* faces (a triple and a pair), so
/// five of a kind scores 0 here. Unrolled dice (value 0) never match a
/// face and contribute nothing.
pub fn score(dice: &Dice, category: Category) -> u16 {
    let counts = face_counts(dice);
    let faces = &counts[1..];
    let sum: u16 = dice.iter().map(|&d| u16::from(d)).sum();

    match category {
        Category::Ones
        | Category::Twos
        | Category::Threes
        | Category::Fours
        | Category::Fives
        | Category::Sixes => {
            let face = category.face().unwrap_or(0);
            u16::from(counts[usize::from(face)]) * u16::from(face)
        }
        Category::ThreeOfAKind => {
            if faces.iter().any(|&c| c >= 3) { sum } else { 0 }
        }
        Category::FourOfAKind => {
            if faces.iter().any(|&c| c >= 4) { sum } else { 0 }
        }
        Category::FullHouse => {
            let triple = faces.iter().any(|&c| c == 3);
            let pair = faces.iter().any(|&c| c == 2);
            if triple && pair { FULL_HOUSE_SCORE } else { 0 }
        }
        Category::SmallStraight => {
            if has_run(&counts, 4) { SMALL_STRAIGHT_SCORE } else { 0 }
        }
        Category::LargeStraight => {
            if has_run(&counts, 5) { LARGE_STRAIGHT_SCORE } else { 0 }
        }
        Category::Yahtzee => {
            if faces.iter().any(|&c| c == 5) { YAHTZEE_SCORE } else { 0 }
        }
        Category::Chance => sum,
    }
}

/// `len` consecutive faces each present at least once.
fn has_run(counts: &[u8; 7], len: usize) -> bool {
    (1..=7 - len).any(|start| counts[start..start + len].iter().all(|&c| c >= 1))
}

/// Scores `dice` would earn in every category still open on `scorecard`.
///
/// Iteration order of the returned map is the declared category order.
pub fn available_scores(dice: &Dice, scorecard: &Scorecard) -> BTreeMap<Category, u16> {
    scorecard
        .unfilled()
        .map(|c| (c, score(dice, c)))
        .collect()
}

/// Derived totals of a scorecard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub upper: u16,
    pub bonus: u16,
    pub lower: u16,
    pub grand: u16,
}

/// Sums the filled entries of `scorecard`. Unfilled entries count as 0.
pub fn totals(scorecard: &Scorecard) -> Totals {
    let (upper, lower) = scorecard
        .filled()
        .fold((0u16, 0u16), |(upper, lower), (cat, s)| {
            if cat.is_upper() {
                (upper + s, lower)
            } else {
                (upper, lower + s)
            }
        });
    let bonus = if upper >= UPPER_BONUS_THRESHOLD { UPPER_BONUS } else { 0 };
    Totals {
        upper,
        bonus,
        lower,
        grand: upper + bonus + lower,
    }
}
