use core::fmt;
use serde::{Deserialize, Serialize};

use crate::*;

/// Starting life, validated to lie in `MIN..=MAX`.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Life(u8);

impl Life {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 9;

    pub const fn new(life: u8) -> Result<Self> {
        if life >= Self::MIN && life <= Self::MAX {
            Ok(Self(life))
        } else {
            Err(GameError::LifeOutOfRange(life))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }
}

impl Default for Life {
    fn default() -> Self {
        Self(3)
    }
}

impl TryFrom<u8> for Life {
    type Error = GameError;

    fn try_from(life: u8) -> Result<Self> {
        Self::new(life)
    }
}

impl From<Life> for u8 {
    fn from(life: Life) -> Self {
        life.0
    }
}

impl fmt::Display for Life {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// The player's chosen difficulty and starting life.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub difficulty: Difficulty,
    pub life: Life,
}

impl Settings {
    /// Validates raw user input from a settings form.
    pub fn new(difficulty: &str, life: u8) -> Result<Self> {
        Ok(Self {
            difficulty: difficulty.parse()?,
            life: Life::new(life)?,
        })
    }

    pub fn profile(&self) -> DifficultyProfile {
        self.difficulty.profile()
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| GameError::InvalidSettings(err.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|err| GameError::InvalidSettings(err.to_string()))
    }
}
