//! Game rules for Yacht, a five-dice category game for 2–4 players.
//!
//! Everything in this crate is synchronous and free of I/O. The room layer
//! drives it, persists its state, and decides who is allowed to act.
//!
//! # Key types
//!
//! - [`Category`] — the thirteen scoring slots
//! - [`Hand`] — five dice plus held flags
//! - [`Scorecard`] — one player's write-once category scores
//! - [`Game`] — the turn state machine (roll, hold, score, skip)
//! - [`bot`] — heuristics for automated players
//!
//! # Example
//!
//! ```rust
//! use yacht_rules::{Category, Game, scoring};
//!
//! let mut game = Game::new(2).unwrap();
//! game.force_roll(0, [5, 5, 5, 5, 5]).unwrap();
//! let out = game.score(0, Category::Yahtzee).unwrap();
//! assert_eq!(out.score, scoring::YAHTZEE_SCORE);
//! assert_eq!(out.next_seat, 1);
//! ```

pub mod bot;
mod category;
mod dice;
mod error;
mod game;
mod scorecard;
pub mod scoring;

pub use category::Category;
pub use dice::{DICE_COUNT, Dice, Hand, HeldMask, MAX_ROLLS, face_counts};
pub use error::RuleError;
pub use game::{Game, ROUNDS, RollOutcome, ScoreOutcome, Standing, Turn, TurnPhase};
pub use scorecard::Scorecard;
pub use scoring::{Totals, available_scores, score, totals};
