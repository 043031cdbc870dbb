use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::*;

/// Named difficulty levels, in catalog order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    #[default]
    Noob,
    Ez,
    Casual,
    Pro,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Self::Noob, Self::Ez, Self::Casual, Self::Pro];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Noob => "NOOB",
            Self::Ez => "EZ",
            Self::Casual => "CASUAL",
            Self::Pro => "PRO",
        }
    }

    pub const fn profile(self) -> DifficultyProfile {
        match self {
            Self::Noob => DifficultyProfile::NOOB,
            Self::Ez => DifficultyProfile::EZ,
            Self::Casual => DifficultyProfile::CASUAL,
            Self::Pro => DifficultyProfile::PRO,
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Difficulty {
    type Err = GameError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|difficulty| difficulty.name().eq_ignore_ascii_case(name))
            .ok_or_else(|| GameError::UnknownDifficulty(name.to_owned()))
    }
}

/// Grid size, mole count and speed-up rate for one difficulty level.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DifficultyProfile {
    pub difficulty: Difficulty,
    pub length: Coord,
    pub max_moles: u8,
    pub timer_change_rate: f64,
}

impl DifficultyProfile {
    pub const NOOB: Self = Self::new(Difficulty::Noob, 3, 1, 0.05);
    pub const EZ: Self = Self::new(Difficulty::Ez, 5, 2, 0.07);
    pub const CASUAL: Self = Self::new(Difficulty::Casual, 7, 3, 0.10);
    pub const PRO: Self = Self::new(Difficulty::Pro, 11, 5, 0.15);

    const fn new(difficulty: Difficulty, length: Coord, max_moles: u8, timer_change_rate: f64) -> Self {
        Self {
            difficulty,
            length,
            max_moles,
            timer_change_rate,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.difficulty.name()
    }

    pub const fn total_cells(&self) -> CellCount {
        area(self.length)
    }
}

impl Default for DifficultyProfile {
    fn default() -> Self {
        Difficulty::default().profile()
    }
}

impl From<Difficulty> for DifficultyProfile {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.profile()
    }
}
