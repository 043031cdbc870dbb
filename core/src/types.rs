use std::collections::BTreeSet;

/// Single coordinate axis used for grid length and positions.
pub type Coord = u8;

/// Count type used for scores, penalties and cell totals.
pub type CellCount = u32;

/// Two-dimensional coordinates `(row, col)`.
pub type Coord2 = (Coord, Coord);

/// Pairwise distinct coordinates, ordered row-major.
pub type CoordSet = BTreeSet<Coord2>;

pub trait ToNdIndex {
    type Output;
    fn to_nd_index(self) -> Self::Output;
}

impl ToNdIndex for Coord2 {
    type Output = [usize; 2];

    fn to_nd_index(self) -> Self::Output {
        [self.0.into(), self.1.into()]
    }
}

pub const fn in_bounds((row, col): Coord2, length: Coord) -> bool {
    row < length && col < length
}

pub const fn area(length: Coord) -> CellCount {
    let length = length as CellCount;
    length.saturating_mul(length)
}
