use thiserror::Error;

use crate::{Coord, Coord2};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Unknown difficulty: {0:?}")]
    UnknownDifficulty(String),
    #[error("Life must be between 1 and 9, got {0}")]
    LifeOutOfRange(u8),
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
    #[error("Coordinates {coord:?} out of bounds for grid of length {length}")]
    CoordOutOfBounds { coord: Coord2, length: Coord },
}

impl GameError {
    /// Errors raised by the settings layer before a session starts.
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::UnknownDifficulty(_) | Self::LifeOutOfRange(_) | Self::InvalidSettings(_)
        )
    }
}

pub type Result<T> = core::result::Result<T, GameError>;
