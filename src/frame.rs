use crate::foundation::core::{Address, CELL_HEIGHT, CELLS, FRAME_BYTES, Position, ROW_MASK};
use crate::foundation::error::{LcdError, LcdResult};

/// The pattern of one cell: `CELL_HEIGHT` rows, each holding `CELL_WIDTH`
/// pixels in its low bits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct CellPattern(pub [u8; CELL_HEIGHT]);

impl CellPattern {
    pub const BLANK: Self = Self([0; CELL_HEIGHT]);
    pub const LIT: Self = Self([ROW_MASK; CELL_HEIGHT]);

    /// Clamp every row to the valid pixel mask.
    pub fn masked(self) -> Self {
        Self(self.0.map(|row| row & ROW_MASK))
    }

    /// All rows read as one little-endian integer, first row lowest.
    pub fn bits(self) -> u64 {
        u64::from_le_bytes(self.0)
    }

    pub fn rows(&self) -> &[u8; CELL_HEIGHT] {
        &self.0
    }
}

impl From<[u8; CELL_HEIGHT]> for CellPattern {
    fn from(rows: [u8; CELL_HEIGHT]) -> Self {
        Self(rows)
    }
}

/// A full display's worth of cell patterns. Used both for source frames and
/// for the modeled state of the physical panel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    data: Box<[u8; FRAME_BYTES]>,
}

impl Default for Grid {
    fn default() -> Self {
        Self::blank()
    }
}

impl Grid {
    pub fn blank() -> Self {
        Self {
            data: Box::new([0; FRAME_BYTES]),
        }
    }

    /// Build a grid from one raw frame. Rows are masked to the pixel width.
    pub fn from_bytes(bytes: &[u8]) -> LcdResult<Self> {
        let data: [u8; FRAME_BYTES] = bytes.try_into().map_err(|_| {
            LcdError::validation(format!(
                "frame must be exactly {FRAME_BYTES} bytes, got {}",
                bytes.len()
            ))
        })?;
        Ok(Self {
            data: Box::new(data.map(|b| b & ROW_MASK)),
        })
    }

    pub fn as_bytes(&self) -> &[u8; FRAME_BYTES] {
        &self.data
    }

    pub fn cell(&self, pos: Position) -> CellPattern {
        let off = pos.index() * CELL_HEIGHT;
        let mut rows = [0u8; CELL_HEIGHT];
        rows.copy_from_slice(&self.data[off..off + CELL_HEIGHT]);
        CellPattern(rows)
    }

    /// Read the cell at a raw controller address. Pattern-memory and
    /// unmapped addresses are `OutOfRange` since they hold no cell.
    pub fn cell_at(&self, address: u8) -> LcdResult<CellPattern> {
        match Address::decode(address)? {
            Address::Cell(pos) => Ok(self.cell(pos)),
            Address::Pattern { .. } => Err(LcdError::out_of_range(address)),
        }
    }

    pub fn write_cell(&mut self, pattern: CellPattern, pos: Position) {
        let off = pos.index() * CELL_HEIGHT;
        self.data[off..off + CELL_HEIGHT].copy_from_slice(&pattern.masked().0);
    }

    /// Total differing pixels against another grid.
    pub fn delta(&self, other: &Grid) -> u32 {
        Position::all()
            .map(|pos| crate::pattern::delta(self.cell(pos), other.cell(pos)))
            .sum()
    }

    pub fn cells(&self) -> impl Iterator<Item = (Position, CellPattern)> + '_ {
        Position::all().map(move |pos| (pos, self.cell(pos)))
    }
}

const _: () = assert!(FRAME_BYTES == CELLS * CELL_HEIGHT);
