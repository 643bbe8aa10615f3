//! Error types for the rules layer.

use crate::{Category, MAX_ROLLS};

/// A move the rules do not allow. Returning one of these guarantees the
/// game state was not touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RuleError {
    /// Someone other than the current seat tried to act.
    #[error("seat {actual} acted out of turn (current seat is {expected})")]
    NotYourTurn { expected: usize, actual: usize },

    /// The current seat already used all of its rolls.
    #[error("roll limit of {} reached", MAX_ROLLS)]
    RollLimitReached,

    /// Holding or scoring needs at least one roll this turn.
    #[error("dice have not been rolled this turn")]
    NotRolled,

    #[error("category {0} is already filled")]
    CategoryFilled(Category),

    #[error("die index {0} out of range")]
    DieOutOfRange(usize),

    /// A die face outside 1 to 6.
    #[error("die face {0} is not between 1 and 6")]
    InvalidFace(u8),

    /// Every scorecard is complete; the turn is frozen.
    #[error("game is already finished")]
    GameFinished,

    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("a game needs at least one player")]
    NoPlayers,
}
