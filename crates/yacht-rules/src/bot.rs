//! Automated player heuristics.
//!
//! Three independent decisions, each a pure function of the hand and the
//! bot's own scorecard, plus [`play_turn`] which strings them together into
//! a full turn. This is a greedy heuristic, not an optimal strategy.

use rand::Rng;

use crate::dice::{Dice, HeldMask, MAX_ROLLS, face_counts};
use crate::game::{Game, RollOutcome, ScoreOutcome};
use crate::scoring::{available_scores, score};
use crate::{Category, RuleError, Scorecard};

/// Order in which categories are given up when nothing on the table
/// scores. Cheap upper boxes go first, then the long shots, and chance is
/// kept as the last resort.
pub const SACRIFICE_ORDER: [Category; Category::COUNT] = [
    Category::Ones,
    Category::Twos,
    Category::Threes,
    Category::Fours,
    Category::Fives,
    Category::Sixes,
    Category::Yahtzee,
    Category::LargeStraight,
    Category::FourOfAKind,
    Category::SmallStraight,
    Category::FullHouse,
    Category::ThreeOfAKind,
    Category::Chance,
];

/// Picks the category to score `dice` in.
///
/// Yahtzee and large straight are taken whenever they score. Otherwise the
/// highest available score wins, ties going to the earlier category. If
/// every open category would score 0, the first open entry of
/// [`SACRIFICE_ORDER`] is burned. Returns `None` only for a complete card.
pub fn choose_category(dice: &Dice, scorecard: &Scorecard) -> Option<Category> {
    for priority in [Category::Yahtzee, Category::LargeStraight] {
        if !scorecard.is_filled(priority) && score(dice, priority) > 0 {
            return Some(priority);
        }
    }

    let available = available_scores(dice, scorecard);
    let mut best: Option<(Category, u16)> = None;
    for (cat, points) in available {
        if best.is_none_or(|(_, top)| points > top) {
            best = Some((cat, points));
        }
    }

    match best {
        Some((cat, points)) if points > 0 => Some(cat),
        Some(_) => SACRIFICE_ORDER
            .into_iter()
            .find(|c| !scorecard.is_filled(*c)),
        None => None,
    }
}

/// The face with the most dice, ties going to the higher face.
/// `None` for an unrolled hand.
fn largest_group(dice: &Dice) -> Option<(u8, u8)> {
    let counts = face_counts(dice);
    (1..=6u8)
        .map(|face| (face, counts[usize::from(face)]))
        .filter(|(_, count)| *count > 0)
        .max_by_key(|(face, count)| (*count, *face))
}

/// Holds every die of the largest group.
pub fn choose_holds(dice: &Dice) -> HeldMask {
    let mut mask = [false; 5];
    if let Some((face, _)) = largest_group(dice) {
        for (held, die) in mask.iter_mut().zip(dice) {
            *held = *die == face;
        }
    }
    mask
}

/// Decides whether another roll is worth it.
///
/// Never rerolls once out of rolls, or when the hand already makes a
/// yahtzee or large straight. Otherwise rerolls unless the dice kept by
/// [`choose_holds`] form three of a kind or better. Whether that pattern
/// still has an open category is left to [`choose_category`], which
/// sacrifices if it must.
pub fn should_reroll(dice: &Dice, _scorecard: &Scorecard, roll_count: u8) -> bool {
    if roll_count >= MAX_ROLLS {
        return false;
    }
    if roll_count == 0 {
        return true;
    }
    if score(dice, Category::Yahtzee) > 0 || score(dice, Category::LargeStraight) > 0 {
        return false;
    }

    largest_group(dice).is_none_or(|(_, count)| count < 3)
}

/// Everything a bot did during one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BotTurn {
    pub rolls: Vec<RollOutcome>,
    pub outcome: ScoreOutcome,
}

/// Plays the current seat's whole turn: roll, reroll while
/// [`should_reroll`] says so (holding per [`choose_holds`]), then score per
/// [`choose_category`].
///
/// On error the game may be partially advanced; callers run this on a
/// working copy and only keep it on success.
pub fn play_turn<R: Rng + ?Sized>(game: &mut Game, rng: &mut R) -> Result<BotTurn, RuleError> {
    let seat = game.turn().seat;
    let mut rolls = Vec::new();

    if game.turn().roll_count == 0 {
        rolls.push(game.roll(seat, rng)?);
    }

    loop {
        let turn = game.turn();
        let card = game.scorecard(seat).ok_or(RuleError::GameFinished)?;
        if !should_reroll(&turn.hand.dice, card, turn.roll_count) {
            break;
        }
        let holds = choose_holds(&turn.hand.dice);
        game.set_held(seat, holds)?;
        rolls.push(game.roll(seat, rng)?);
    }

    let dice = game.turn().hand.dice;
    let card = game.scorecard(seat).ok_or(RuleError::GameFinished)?;
    let category = choose_category(&dice, card).ok_or(RuleError::GameFinished)?;
    let outcome = game.score(seat, category)?;

    Ok(BotTurn { rolls, outcome })
}
