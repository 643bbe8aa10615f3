//! Identity types shared by every layer.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// A unique identifier for a player, human or bot.
///
/// Newtype over `u64` so it can't be mixed up with a seat or a player
/// index. `#[serde(transparent)]` keeps it a plain number on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// The short code players type to find a room, e.g. `K7QX2M`.
///
/// Always [`RoomCode::LEN`] characters from [`RoomCode::ALPHABET`].
/// Construct through [`FromStr`] (validating) or [`RoomCode::from_indices`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    pub const LEN: usize = 6;

    /// Uppercase letters and digits minus the easily confused `0 O 1 I`.
    pub const ALPHABET: &'static [u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

    /// Builds a code from positions into [`Self::ALPHABET`] (taken modulo
    /// its length). The room layer feeds this from its RNG.
    pub fn from_indices(indices: [usize; Self::LEN]) -> Self {
        let code = indices
            .iter()
            .map(|i| char::from(Self::ALPHABET[i % Self::ALPHABET.len()]))
            .collect();
        Self(code)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RoomCode {
    type Err = ProtocolError;

    /// Accepts lowercase input; codes are compared uppercase.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let valid = upper.len() == Self::LEN
            && upper.bytes().all(|b| Self::ALPHABET.contains(&b));
        if !valid {
            return Err(ProtocolError::InvalidRoomCode(s.to_string()));
        }
        Ok(Self(upper))
    }
}

impl TryFrom<String> for RoomCode {
    type Error = ProtocolError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}
