//! Per-player scorecard.

use serde::{Deserialize, Serialize};

use crate::{Category, RuleError};

/// One player's record of filled and unfilled categories.
///
/// Entries are write-once: [`Scorecard::fill`] rejects a category that
/// already holds a score instead of overwriting it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Scorecard {
    entries: [Option<u16>; Category::COUNT],
}

impl Scorecard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The score written for `category`, or `None` if still open.
    pub fn get(&self, category: Category) -> Option<u16> {
        self.entries[category.index()]
    }

    pub fn is_filled(&self, category: Category) -> bool {
        self.get(category).is_some()
    }

    /// Writes `score` into `category`.
    ///
    /// # Errors
    /// [`RuleError::CategoryFilled`] if the category already has a score.
    pub fn fill(&mut self, category: Category, score: u16) -> Result<(), RuleError> {
        let slot = &mut self.entries[category.index()];
        if slot.is_some() {
            return Err(RuleError::CategoryFilled(category));
        }
        *slot = Some(score);
        Ok(())
    }

    /// Open categories in declared order.
    pub fn unfilled(&self) -> impl Iterator<Item = Category> + '_ {
        Category::ALL.into_iter().filter(|c| !self.is_filled(*c))
    }

    /// The first open category in declared order. This is what a timed-out
    /// turn gets charged to.
    pub fn first_unfilled(&self) -> Option<Category> {
        self.unfilled().next()
    }

    /// `(category, score)` for every filled entry, in declared order.
    pub fn filled(&self) -> impl Iterator<Item = (Category, u16)> + '_ {
        Category::ALL
            .into_iter()
            .filter_map(|c| self.get(c).map(|s| (c, s)))
    }

    pub fn filled_count(&self) -> usize {
        self.entries.iter().filter(|e| e.is_some()).count()
    }

    pub fn is_complete(&self) -> bool {
        self.entries.iter().all(Option::is_some)
    }
}
