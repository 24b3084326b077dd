use crate::foundation::error::{LcdError, LcdResult};

/// Character rows on the display.
pub const ROWS: usize = 4;
/// Character columns on the display.
pub const COLS: usize = 8;
pub const CELLS: usize = ROWS * COLS;

/// Pixels per glyph row (low bits of each pattern byte).
pub const CELL_WIDTH: u32 = 5;
/// Pattern bytes per glyph.
pub const CELL_HEIGHT: usize = 8;
pub const CELL_PIXELS: u32 = CELL_WIDTH * CELL_HEIGHT as u32;
pub const ROW_MASK: u8 = (1 << CELL_WIDTH) - 1;

/// Programmable glyph slots provided by the controller.
pub const MAX_SLOTS: usize = 8;

/// Bytes in one source frame: one byte per pixel row per cell, cells in grid order.
pub const FRAME_BYTES: usize = CELLS * CELL_HEIGHT;

/// Controller address of the first pattern-memory row.
pub const PATTERN_BASE: u8 = 40;
const PATTERN_END: u8 = PATTERN_BASE + (MAX_SLOTS * CELL_HEIGHT) as u8; // exclusive
const ROW_BASES: [u8; ROWS] = [0, 10, 20, 30];

/// One display cell, numbered `row * COLS + col`.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct Position(u8);

impl Position {
    pub fn new(index: usize) -> LcdResult<Self> {
        if index >= CELLS {
            return Err(LcdError::out_of_range(index as i32));
        }
        Ok(Self(index as u8))
    }

    pub fn from_row_col(row: usize, col: usize) -> LcdResult<Self> {
        if row >= ROWS || col >= COLS {
            return Err(LcdError::validation(format!(
                "cell ({row}, {col}) is outside the {ROWS}x{COLS} grid"
            )));
        }
        Ok(Self((row * COLS + col) as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    pub fn row(self) -> usize {
        self.index() / COLS
    }

    pub fn col(self) -> usize {
        self.index() % COLS
    }

    /// The cell immediately to the left on the same row.
    pub fn left(self) -> Option<Self> {
        (self.col() > 0).then(|| Self(self.0 - 1))
    }

    pub fn all() -> impl Iterator<Item = Position> {
        (0..CELLS as u8).map(Self)
    }

    /// Controller address of this cell (rows start at 0, 10, 20, 30).
    pub fn device_address(self) -> u8 {
        ROW_BASES[self.row()] + self.col() as u8
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.device_address())
    }
}

/// Index of a programmable glyph slot.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct SlotIndex(u8);

impl SlotIndex {
    pub fn new(index: usize) -> LcdResult<Self> {
        if index >= MAX_SLOTS {
            return Err(LcdError::validation(format!(
                "glyph slot {index} exceeds the {MAX_SLOTS} available"
            )));
        }
        Ok(Self(index as u8))
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }

    /// Controller address of pattern row `row` of this slot.
    pub fn pattern_address(self, row: u8) -> Address {
        Address::Pattern { slot: self, row }
    }
}

impl std::fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decoded controller cursor address.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Cell(Position),
    Pattern { slot: SlotIndex, row: u8 },
}

impl Address {
    /// Decode a raw controller address. Rows occupy 0-7, 10-17, 20-27 and 30-37;
    /// pattern memory occupies 40-103. Everything else is `OutOfRange`.
    pub fn decode(address: u8) -> LcdResult<Self> {
        if (PATTERN_BASE..PATTERN_END).contains(&address) {
            let offset = address - PATTERN_BASE;
            return Ok(Self::Pattern {
                slot: SlotIndex(offset / CELL_HEIGHT as u8),
                row: offset % CELL_HEIGHT as u8,
            });
        }
        for (row, base) in ROW_BASES.iter().enumerate() {
            if (*base..*base + COLS as u8).contains(&address) {
                return Ok(Self::Cell(Position((row * COLS) as u8 + address - base)));
            }
        }
        Err(LcdError::out_of_range(address))
    }

    pub fn device_address(self) -> u8 {
        match self {
            Self::Cell(pos) => pos.device_address(),
            Self::Pattern { slot, row } => PATTERN_BASE + slot.0 * CELL_HEIGHT as u8 + row,
        }
    }
}

/// Fixed cyclic order in which cells are considered for updates. Spreads
/// consecutive updates across the panel instead of sweeping it row by row.
pub const VISIT_ORDER: [Position; CELLS] = {
    const RAW: [u8; CELLS] = [
        10, 29, 17, 13, 26, 0, 20, 7, 9, 31, 4, 24, 22, 2, 27, 15, 18, 6, 16, 3, 30, 11, 23, 25,
        5, 8, 21, 1, 28, 14, 19, 12,
    ];
    let mut out = [Position(0); CELLS];
    let mut i = 0;
    while i < CELLS {
        out[i] = Position(RAW[i]);
        i += 1;
    }
    out
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visit_order_is_a_permutation() {
        let mut seen = [false; CELLS];
        for pos in VISIT_ORDER {
            assert!(!seen[pos.index()], "{pos:?} visited twice");
            seen[pos.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn device_addresses_roundtrip_for_cells_and_patterns() {
        for pos in Position::all() {
            let addr = pos.device_address();
            assert_eq!(Address::decode(addr).unwrap(), Address::Cell(pos));
        }
        let slot = SlotIndex::new(7).unwrap();
        let addr = slot.pattern_address(7);
        assert_eq!(addr.device_address(), 103);
        assert_eq!(Address::decode(103).unwrap(), addr);
    }

    #[test]
    fn gaps_between_rows_are_out_of_range() {
        for bad in [8u8, 9, 18, 19, 28, 38, 39, 104, 255] {
            assert!(matches!(
                Address::decode(bad),
                Err(LcdError::OutOfRange { .. })
            ));
        }
    }

    #[test]
    fn left_stops_at_row_start() {
        let p = Position::from_row_col(1, 0).unwrap();
        assert_eq!(p.left(), None);
        let q = Position::from_row_col(1, 3).unwrap();
        assert_eq!(q.left(), Some(Position::from_row_col(1, 2).unwrap()));
        assert_eq!(q.device_address(), 13);
    }
}
