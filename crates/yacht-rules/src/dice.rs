//! Dice hand: five die values plus a held flag per die.
//!
//! A value of `0` means the die has not been rolled this turn. Only
//! [`Hand::roll`] produces non-zero values, and it is only ever called by
//! the room authority with its own RNG.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of dice in a hand.
pub const DICE_COUNT: usize = 5;

/// Maximum number of rolls a player gets per turn.
pub const MAX_ROLLS: u8 = 3;

/// Raw die values, `0` for unrolled.
pub type Dice = [u8; DICE_COUNT];

/// Per-die flags; a held die keeps its value on the next roll.
pub type HeldMask = [bool; DICE_COUNT];

/// The dice on the table for the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Hand {
    pub dice: Dice,
    pub held: HeldMask,
}

impl Hand {
    /// A fresh, unrolled hand with nothing held.
    pub fn unrolled() -> Self {
        Self::default()
    }

    /// A hand showing `dice` with nothing held. Handy for tests and for
    /// replaying a committed roll on an observer.
    pub fn from_dice(dice: Dice) -> Self {
        Self {
            dice,
            held: [false; DICE_COUNT],
        }
    }

    /// Returns `true` once every die shows a face (1–6).
    pub fn is_rolled(&self) -> bool {
        self.dice.iter().all(|d| (1..=6).contains(d))
    }

    /// Rerolls every die that is not held. Held dice keep their value.
    pub fn roll<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        for (die, held) in self.dice.iter_mut().zip(self.held) {
            if !held {
                *die = rng.random_range(1..=6);
            }
        }
    }

    /// Flips the held flag of die `index` and returns the new value.
    ///
    /// The caller is responsible for range-checking `index`.
    pub(crate) fn toggle(&mut self, index: usize) -> bool {
        self.held[index] = !self.held[index];
        self.held[index]
    }
}

/// Counts how many dice show each face. Index 0 counts unrolled dice, so
/// `counts[f]` is the number of dice showing face `f`.
pub fn face_counts(dice: &Dice) -> [u8; 7] {
    let mut counts = [0u8; 7];
    for &d in dice {
        counts[usize::from(d.min(6))] += 1;
    }
    counts
}
