//! The thirteen scoring categories.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::RuleError;

/// A scoring slot on the scorecard.
///
/// Closed set: six upper categories (one per face) followed by seven
/// pattern categories. The declaration order is significant. It is the
/// order `Skip` fills in, the tie-break order for the bot, and the index
/// used by [`Scorecard`](crate::Scorecard).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub enum Category {
    Ones,
    Twos,
    Threes,
    Fours,
    Fives,
    Sixes,
    ThreeOfAKind,
    FourOfAKind,
    FullHouse,
    SmallStraight,
    LargeStraight,
    Yahtzee,
    Chance,
}

impl Category {
    /// Number of categories on a scorecard.
    pub const COUNT: usize = 13;

    /// Every category in declared order.
    pub const ALL: [Category; Self::COUNT] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
        Category::ThreeOfAKind,
        Category::FourOfAKind,
        Category::FullHouse,
        Category::SmallStraight,
        Category::LargeStraight,
        Category::Yahtzee,
        Category::Chance,
    ];

    /// The upper section, indexed by `face - 1`.
    pub const UPPER: [Category; 6] = [
        Category::Ones,
        Category::Twos,
        Category::Threes,
        Category::Fours,
        Category::Fives,
        Category::Sixes,
    ];

    /// Position in [`Category::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_upper(self) -> bool {
        self.face().is_some()
    }

    /// The die face an upper category counts, `None` for lower categories.
    pub fn face(self) -> Option<u8> {
        match self {
            Category::Ones => Some(1),
            Category::Twos => Some(2),
            Category::Threes => Some(3),
            Category::Fours => Some(4),
            Category::Fives => Some(5),
            Category::Sixes => Some(6),
            Category::ThreeOfAKind
            | Category::FourOfAKind
            | Category::FullHouse
            | Category::SmallStraight
            | Category::LargeStraight
            | Category::Yahtzee
            | Category::Chance => None,
        }
    }

    /// The upper category counting `face`, if `face` is 1–6.
    pub fn for_face(face: u8) -> Option<Category> {
        match face {
            1..=6 => Some(Self::UPPER[usize::from(face) - 1]),
            _ => None,
        }
    }

    /// Wire name, identical to the serde representation.
    pub fn name(self) -> &'static str {
        match self {
            Category::Ones => "ones",
            Category::Twos => "twos",
            Category::Threes => "threes",
            Category::Fours => "fours",
            Category::Fives => "fives",
            Category::Sixes => "sixes",
            Category::ThreeOfAKind => "threeOfAKind",
            Category::FourOfAKind => "fourOfAKind",
            Category::FullHouse => "fullHouse",
            Category::SmallStraight => "smallStraight",
            Category::LargeStraight => "largeStraight",
            Category::Yahtzee => "yahtzee",
            Category::Chance => "chance",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = RuleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| RuleError::UnknownCategory(s.to_string()))
    }
}
