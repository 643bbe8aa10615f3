//! Turn state machine for one game.
//!
//! [`Game`] owns the turn (current seat, round, dice, roll count), one
//! [`Scorecard`] per seat, and the final ranking once everyone is done.
//! Seats are positions in the room's player list; mapping a seat to a
//! player's identity is the caller's business.
//!
//! Every operation validates first and mutates second, so an `Err` always
//! leaves the game exactly as it was.
//!
//! ```text
//!   AwaitingRoll ──roll──→ AwaitingRollOrCategory ──roll──→ AwaitingCategory
//!        ↑                        │                                │
//!        └────────── score / skip (next seat) ─────────────────────┘
//!                                 │
//!                                 ▼ (every scorecard complete)
//!                              Finished
//! ```

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::dice::{DICE_COUNT, HeldMask, MAX_ROLLS};
use crate::scoring::{available_scores, score, totals};
use crate::{Category, Hand, RuleError, Scorecard};

/// Number of rounds in a game: one per category.
pub const ROUNDS: u8 = Category::COUNT as u8;

/// The part of the game that changes on every action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Seat whose turn it is.
    pub seat: usize,
    /// 1-based round, at most [`ROUNDS`].
    pub round: u8,
    pub hand: Hand,
    /// Rolls used this turn, 0 to [`MAX_ROLLS`].
    pub roll_count: u8,
}

impl Turn {
    fn opening(seat: usize, round: u8) -> Self {
        Self {
            seat,
            round,
            hand: Hand::unrolled(),
            roll_count: 0,
        }
    }
}

/// Where the current turn stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// No roll yet; the only move is to roll.
    AwaitingRoll,
    /// Rolled at least once with rolls left: roll again, hold, or score.
    AwaitingRollOrCategory,
    /// Out of rolls; must score.
    AwaitingCategory,
    Finished,
}

/// One line of the final ranking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub seat: usize,
    /// 1 for the winner. Tied totals still get distinct ranks.
    pub rank: usize,
    pub grand_total: u16,
}

/// Result of a successful roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub seat: usize,
    pub hand: Hand,
    pub roll_count: u8,
    /// What each open category would score with this hand.
    pub available: BTreeMap<Category, u16>,
}

/// Result of a score or skip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreOutcome {
    /// Seat that scored.
    pub seat: usize,
    pub category: Category,
    pub score: u16,
    /// Seat to act next. Equal to `seat` once the game is finished.
    pub next_seat: usize,
    /// Round after the action.
    pub round: u8,
    pub finished: bool,
    pub ranking: Option<Vec<Standing>>,
}

/// A game in progress (or finished).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Game {
    turn: Turn,
    scorecards: Vec<Scorecard>,
    ranking: Option<Vec<Standing>>,
}

impl Game {
    /// Starts a game for `seats` players: seat 0, round 1, unrolled dice.
    ///
    /// # Errors
    /// [`RuleError::NoPlayers`] if `seats` is 0.
    pub fn new(seats: usize) -> Result<Self, RuleError> {
        if seats == 0 {
            return Err(RuleError::NoPlayers);
        }
        Ok(Self {
            turn: Turn::opening(0, 1),
            scorecards: vec![Scorecard::new(); seats],
            ranking: None,
        })
    }

    pub fn turn(&self) -> &Turn {
        &self.turn
    }

    pub fn seats(&self) -> usize {
        self.scorecards.len()
    }

    pub fn scorecards(&self) -> &[Scorecard] {
        &self.scorecards
    }

    pub fn scorecard(&self, seat: usize) -> Option<&Scorecard> {
        self.scorecards.get(seat)
    }

    /// Final standings, best first. `None` until the game finishes.
    pub fn ranking(&self) -> Option<&[Standing]> {
        self.ranking.as_deref()
    }

    pub fn winner(&self) -> Option<usize> {
        self.ranking().and_then(|r| r.first()).map(|s| s.seat)
    }

    pub fn is_finished(&self) -> bool {
        self.ranking.is_some()
    }

    pub fn phase(&self) -> TurnPhase {
        if self.is_finished() {
            return TurnPhase::Finished;
        }
        match self.turn.roll_count {
            0 => TurnPhase::AwaitingRoll,
            n if n < MAX_ROLLS => TurnPhase::AwaitingRollOrCategory,
            _ => TurnPhase::AwaitingCategory,
        }
    }

    /// Rerolls every unheld die for `seat`.
    ///
    /// # Errors
    /// - [`RuleError::GameFinished`]
    /// - [`RuleError::NotYourTurn`] if `seat` is not current
    /// - [`RuleError::RollLimitReached`] after three rolls
    pub fn roll<R: Rng + ?Sized>(
        &mut self,
        seat: usize,
        rng: &mut R,
    ) -> Result<RollOutcome, RuleError> {
        self.check_turn(seat)?;
        if self.turn.roll_count >= MAX_ROLLS {
            return Err(RuleError::RollLimitReached);
        }

        self.turn.hand.roll(rng);
        self.turn.roll_count += 1;

        Ok(RollOutcome {
            seat,
            hand: self.turn.hand,
            roll_count: self.turn.roll_count,
            available: available_scores(&self.turn.hand.dice, &self.scorecards[seat]),
        })
    }

    /// Replaces every held flag at once.
    ///
    /// Before the first roll only an all-clear mask is accepted (there is
    /// nothing to hold yet), and it is a no-op.
    pub fn set_held(&mut self, seat: usize, held: HeldMask) -> Result<HeldMask, RuleError> {
        self.check_turn(seat)?;
        if self.turn.roll_count == 0 {
            if held.iter().any(|h| *h) {
                return Err(RuleError::NotRolled);
            }
            return Ok(self.turn.hand.held);
        }
        self.turn.hand.held = held;
        Ok(held)
    }

    /// Flips the held flag on one die.
    ///
    /// # Errors
    /// - [`RuleError::NotYourTurn`], [`RuleError::GameFinished`]
    /// - [`RuleError::NotRolled`] before the first roll
    /// - [`RuleError::DieOutOfRange`] for `die >= 5`
    pub fn toggle_hold(&mut self, seat: usize, die: usize) -> Result<HeldMask, RuleError> {
        self.check_turn(seat)?;
        if self.turn.roll_count == 0 {
            return Err(RuleError::NotRolled);
        }
        if die >= DICE_COUNT {
            return Err(RuleError::DieOutOfRange(die));
        }
        self.turn.hand.toggle(die);
        Ok(self.turn.hand.held)
    }

    /// Writes the current hand's score for `category` and ends the turn.
    ///
    /// # Errors
    /// - [`RuleError::NotYourTurn`], [`RuleError::GameFinished`]
    /// - [`RuleError::NotRolled`] before the first roll
    /// - [`RuleError::CategoryFilled`] if `seat` already used `category`
    pub fn score(&mut self, seat: usize, category: Category) -> Result<ScoreOutcome, RuleError> {
        self.check_turn(seat)?;
        if self.turn.roll_count == 0 {
            return Err(RuleError::NotRolled);
        }
        if self.scorecards[seat].is_filled(category) {
            return Err(RuleError::CategoryFilled(category));
        }
        let points = score(&self.turn.hand.dice, category);
        self.commit(category, points)
    }

    /// Charges the current seat a zero in its first open category and ends
    /// the turn. Used when the player ran out of time; works at any roll
    /// count.
    pub fn skip(&mut self) -> Result<ScoreOutcome, RuleError> {
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }
        let category = self.scorecards[self.turn.seat]
            .first_unfilled()
            .ok_or(RuleError::GameFinished)?;
        self.commit(category, 0)
    }

    fn check_turn(&self, seat: usize) -> Result<(), RuleError> {
        if self.is_finished() {
            return Err(RuleError::GameFinished);
        }
        if seat != self.turn.seat {
            return Err(RuleError::NotYourTurn {
                expected: self.turn.seat,
                actual: seat,
            });
        }
        Ok(())
    }

    /// Shared tail of `score` and `skip`. The category is known to be open.
    fn commit(&mut self, category: Category, points: u16) -> Result<ScoreOutcome, RuleError> {
        let seat = self.turn.seat;
        self.scorecards[seat].fill(category, points)?;

        if self.scorecards.iter().all(Scorecard::is_complete) {
            let ranking = self.rank();
            self.ranking = Some(ranking.clone());
            return Ok(ScoreOutcome {
                seat,
                category,
                score: points,
                next_seat: seat,
                round: self.turn.round,
                finished: true,
                ranking: Some(ranking),
            });
        }

        let next = (seat + 1) % self.seats();
        let round = if next == 0 { self.turn.round + 1 } else { self.turn.round };
        self.turn = Turn::opening(next, round);

        Ok(ScoreOutcome {
            seat,
            category,
            score: points,
            next_seat: next,
            round,
            finished: false,
            ranking: None,
        })
    }

    /// Grand totals, descending. The sort is stable, so equal totals keep
    /// seat order and the earlier seat ranks higher.
    fn rank(&self) -> Vec<Standing> {
        let mut totals: Vec<(usize, u16)> = self
            .scorecards
            .iter()
            .enumerate()
            .map(|(seat, card)| (seat, totals(card).grand))
            .collect();
        totals.sort_by(|a, b| b.1.cmp(&a.1));
        totals
            .into_iter()
            .enumerate()
            .map(|(i, (seat, grand_total))| Standing {
                seat,
                rank: i + 1,
                grand_total,
            })
            .collect()
    }

    /// Test and replay helper: places `dice` on the table as if they had
    /// just been rolled, consuming one roll. Every face must be 1 to 6, so
    /// the hand is one the RNG could have produced.
    #[doc(hidden)]
    pub fn force_roll(&mut self, seat: usize, dice: crate::Dice) -> Result<RollOutcome, RuleError> {
        self.check_turn(seat)?;
        if let Some(&bad) = dice.iter().find(|d| !(1..=6).contains(*d)) {
            return Err(RuleError::InvalidFace(bad));
        }
        if self.turn.roll_count >= MAX_ROLLS {
            return Err(RuleError::RollLimitReached);
        }
        self.turn.hand = Hand {
            dice,
            held: self.turn.hand.held,
        };
        self.turn.roll_count += 1;
        Ok(RollOutcome {
            seat,
            hand: self.turn.hand,
            roll_count: self.turn.roll_count,
            available: available_scores(&dice, &self.scorecards[seat]),
        })
    }
}
