//! Room transitions: validated changes to a [`RoomSnapshot`] copy.
//!
//! Each transition checks membership, room status, and (through the rules
//! engine) turn ownership before touching anything it keeps. On `Err` the
//! copy is thrown away by the caller, so nothing is ever written for a
//! rejected command. On `Ok` the caller compare-and-swaps the copy and
//! broadcasts the returned events.
//!
//! A transition that returns no events changed nothing and is not written.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use yacht_protocol::{PlayerId, RankedPlayer, RoomEvent};
use yacht_rules::{Category, Game, Hand, HeldMask, ScoreOutcome, bot, totals};

use crate::{BotTurnKey, Player, RoomError, RoomSnapshot, RoomStatus};

/// What a transition produced: the caller's answer plus the events to
/// broadcast once the change is committed.
#[derive(Debug)]
pub(crate) struct Applied<T> {
    pub value: T,
    pub events: Vec<RoomEvent>,
}

impl<T> Applied<T> {
    fn new(value: T, events: Vec<RoomEvent>) -> Self {
        Self { value, events }
    }
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameStarted {
    /// Player indices in seat order.
    pub turn_order: Vec<usize>,
    pub first_player_index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollReply {
    pub player_index: usize,
    pub hand: Hand,
    pub roll_count: u8,
    /// What each open category would score with this hand.
    pub available: BTreeMap<Category, u16>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreReply {
    pub player_index: usize,
    pub category: Category,
    pub score: u16,
    pub next_player_index: usize,
    pub round: u8,
    pub finished: bool,
    /// Final standings, best first, once `finished`.
    pub ranking: Option<Vec<RankedPlayer>>,
}

// ---------------------------------------------------------------------------
// Transitions
// ---------------------------------------------------------------------------

impl RoomSnapshot {
    /// Seats a new player (or bot) at the end of the list.
    pub(crate) fn join(
        &mut self,
        id: PlayerId,
        name: String,
        is_bot: bool,
        max_players: usize,
    ) -> Result<Applied<usize>, RoomError> {
        if !self.status.is_joinable() {
            return Err(RoomError::NotJoinable(self.code.clone(), self.status));
        }
        if self.player(id).is_some() {
            return Err(RoomError::AlreadyInRoom(id, self.code.clone()));
        }
        if self.players.len() >= max_players {
            return Err(RoomError::RoomFull(self.code.clone()));
        }

        let index = self.next_index;
        self.next_index += 1;
        self.players.push(Player {
            id,
            index,
            name: name.clone(),
            is_bot,
            is_connected: true,
        });

        Ok(Applied::new(
            index,
            vec![RoomEvent::PlayerJoined {
                player_index: index,
                name,
                is_bot,
            }],
        ))
    }

    /// In the lobby the player is removed. Once seats are fixed they stay,
    /// marked disconnected. Returns whether the player was removed.
    pub(crate) fn leave(&mut self, id: PlayerId) -> Result<Applied<bool>, RoomError> {
        let seat = self.member_seat(id)?;

        let removed = self.status.is_joinable();
        let player_index = if removed {
            self.players.remove(seat).index
        } else {
            let player = &mut self.players[seat];
            player.is_connected = false;
            player.index
        };

        Ok(Applied::new(
            removed,
            vec![RoomEvent::PlayerLeft {
                player_index,
                removed,
            }],
        ))
    }

    /// Closes the lobby and deals every seat an empty scorecard.
    pub(crate) fn start(&mut self, min_players: usize) -> Result<Applied<GameStarted>, RoomError> {
        if !self.status.can_transition_to(RoomStatus::Playing) {
            return Err(self.wrong_status(RoomStatus::Lobby));
        }
        if self.players.len() < min_players {
            return Err(RoomError::NotEnoughPlayers {
                needed: min_players,
                have: self.players.len(),
            });
        }

        let game = Game::new(self.players.len())?;
        let first_player_index = self.index_at(game.turn().seat).unwrap_or_default();
        self.game = Some(game);
        self.status = RoomStatus::Playing;

        let started = GameStarted {
            turn_order: self.turn_order(),
            first_player_index,
        };
        let event = RoomEvent::GameStart {
            turn_order: started.turn_order.clone(),
            first_player_index,
        };
        Ok(Applied::new(started, vec![event]))
    }

    /// Rolls the unheld dice for `id`, replacing the held mask first when
    /// one is given.
    pub(crate) fn roll<R: Rng + ?Sized>(
        &mut self,
        id: PlayerId,
        held: Option<HeldMask>,
        rng: &mut R,
    ) -> Result<Applied<RollReply>, RoomError> {
        let seat = self.member_seat(id)?;
        let player_index = self.players[seat].index;
        let game = self.game_mut()?;

        if let Some(mask) = held {
            game.set_held(seat, mask)?;
        }
        let out = game.roll(seat, rng)?;

        let event = RoomEvent::DiceRoll {
            player_index,
            dice: out.hand.dice,
            held: out.hand.held,
            roll_count: out.roll_count,
        };
        let reply = RollReply {
            player_index,
            hand: out.hand,
            roll_count: out.roll_count,
            available: out.available,
        };
        Ok(Applied::new(reply, vec![event]))
    }

    pub(crate) fn toggle_hold(&mut self, id: PlayerId, die: usize) -> Result<Applied<HeldMask>, RoomError> {
        let seat = self.member_seat(id)?;
        let player_index = self.players[seat].index;
        let held = self.game_mut()?.toggle_hold(seat, die)?;

        Ok(Applied::new(held, vec![RoomEvent::HoldChanged { player_index, held }]))
    }

    pub(crate) fn select_category(
        &mut self,
        id: PlayerId,
        category: Category,
    ) -> Result<Applied<ScoreReply>, RoomError> {
        let seat = self.member_seat(id)?;
        let out = self.game_mut()?.score(seat, category)?;
        Ok(self.after_score(out, false, Vec::new()))
    }

    /// Charges whoever is current a zero. Only the turn timer calls this.
    pub(crate) fn skip(&mut self) -> Result<Applied<ScoreReply>, RoomError> {
        let out = self.game_mut()?.skip()?;
        Ok(self.after_score(out, true, Vec::new()))
    }

    /// Plays a whole bot turn if `key` still names the current turn.
    ///
    /// A stale key yields `None` and no events, so nothing is written.
    pub(crate) fn bot_turn<R: Rng + ?Sized>(
        &mut self,
        key: BotTurnKey,
        rng: &mut R,
    ) -> Result<Applied<Option<ScoreReply>>, RoomError> {
        if self.pending_bot_turn() != Some(key) {
            return Ok(Applied::new(None, Vec::new()));
        }
        let player_index = self.index_at(key.seat).unwrap_or_default();
        let turn = bot::play_turn(self.game_mut()?, rng)?;

        let mut events = vec![RoomEvent::BotTurn {
            player_index,
            round: key.round,
        }];
        events.extend(turn.rolls.iter().map(|roll| RoomEvent::DiceRoll {
            player_index,
            dice: roll.hand.dice,
            held: roll.hand.held,
            roll_count: roll.roll_count,
        }));

        let applied = self.after_score(turn.outcome, false, events);
        Ok(Applied::new(Some(applied.value), applied.events))
    }

    // -- helpers ----------------------------------------------------------

    fn member_seat(&self, id: PlayerId) -> Result<usize, RoomError> {
        self.seat_of(id)
            .ok_or_else(|| RoomError::NotInRoom(id, self.code.clone()))
    }

    fn wrong_status(&self, expected: RoomStatus) -> RoomError {
        RoomError::WrongStatus {
            code: self.code.clone(),
            expected,
            actual: self.status,
        }
    }

    /// The running (or finished) game. A finished game is still returned so
    /// the rules engine reports `GameFinished` itself.
    fn game_mut(&mut self) -> Result<&mut Game, RoomError> {
        if self.status == RoomStatus::Lobby {
            return Err(self.wrong_status(RoomStatus::Playing));
        }
        let code = self.code.clone();
        let status = self.status;
        self.game.as_mut().ok_or(RoomError::WrongStatus {
            code,
            expected: RoomStatus::Playing,
            actual: status,
        })
    }

    /// Turns a rules-level outcome into the reply and events, closing the
    /// room when the last scorecard filled up.
    fn after_score(
        &mut self,
        out: ScoreOutcome,
        timed_out: bool,
        mut events: Vec<RoomEvent>,
    ) -> Applied<ScoreReply> {
        let player_index = self.index_at(out.seat).unwrap_or_default();
        let next_player_index = self.index_at(out.next_seat).unwrap_or_default();

        if timed_out {
            events.push(RoomEvent::TurnTimeout {
                player_index,
                category: out.category,
                next_player_index,
                round: out.round,
                finished: out.finished,
            });
        } else {
            let card_totals = self
                .game
                .as_ref()
                .and_then(|g| g.scorecard(out.seat))
                .map(totals)
                .unwrap_or_default();
            events.push(RoomEvent::ScoreUpdate {
                player_index,
                category: out.category,
                score: out.score,
                totals: card_totals,
                next_player_index,
                round: out.round,
                finished: out.finished,
            });
        }

        let ranking = out.ranking.as_ref().map(|standings| {
            standings
                .iter()
                .map(|s| RankedPlayer {
                    player_index: self.index_at(s.seat).unwrap_or_default(),
                    rank: s.rank,
                    grand_total: s.grand_total,
                })
                .collect::<Vec<_>>()
        });

        match &ranking {
            Some(ranking) => {
                self.status = RoomStatus::Finished;
                events.push(RoomEvent::GameEnd {
                    ranking: ranking.clone(),
                    winner_index: ranking.first().map(|r| r.player_index).unwrap_or_default(),
                });
            }
            None => events.push(RoomEvent::TurnChange {
                player_index: next_player_index,
                round: out.round,
            }),
        }

        Applied::new(
            ScoreReply {
                player_index,
                category: out.category,
                score: out.score,
                next_player_index,
                round: out.round,
                finished: out.finished,
                ranking,
            },
            events,
        )
    }
}
