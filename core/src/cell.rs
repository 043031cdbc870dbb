use serde::{Deserialize, Serialize};

/// State of a single grid cell.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellState {
    /// A mole is showing and has not been struck.
    Open,
    /// No mole, or a mole that has already been struck.
    #[default]
    Closed,
}

impl CellState {
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }

    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}
