use crate::foundation::core::{Address, CELLS, MAX_SLOTS, Position, ROW_MASK, SlotIndex};
use crate::foundation::error::{LcdError, LcdResult};
use crate::frame::{CellPattern, Grid};
use crate::opcode::{Opcode, disassemble};

/// What the physical panel shows after a given opcode prefix.
///
/// Cells showing a glyph slot follow later writes to that slot's pattern
/// memory, as on the real controller.
#[derive(Clone, Debug)]
pub struct DisplayModel {
    grid: Grid,
    patterns: [CellPattern; MAX_SLOTS],
    shown: [Option<SlotIndex>; CELLS],
    cursor: u8,
}

impl Default for DisplayModel {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayModel {
    /// A cleared panel with the cursor on the first cell.
    pub fn new() -> Self {
        Self {
            grid: Grid::blank(),
            patterns: [CellPattern::BLANK; MAX_SLOTS],
            shown: [None; CELLS],
            cursor: 0,
        }
    }

    /// Replay a whole byte stream onto a cleared panel.
    pub fn replay(bytes: &[u8]) -> LcdResult<Self> {
        let mut model = Self::new();
        for op in disassemble(bytes)? {
            model.apply(op)?;
        }
        Ok(model)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Raw controller address of the cursor.
    pub fn cursor(&self) -> u8 {
        self.cursor
    }

    /// The cell under the cursor, if the cursor addresses one.
    pub fn cursor_cell(&self) -> Option<Position> {
        match Address::decode(self.cursor) {
            Ok(Address::Cell(pos)) => Some(pos),
            _ => None,
        }
    }

    pub fn slot_pattern(&self, slot: SlotIndex) -> CellPattern {
        self.patterns[slot.index()]
    }

    /// The glyph slot a cell currently displays.
    pub fn shown_slot(&self, pos: Position) -> Option<SlotIndex> {
        self.shown[pos.index()]
    }

    pub fn apply(&mut self, op: Opcode) -> LcdResult<()> {
        match op {
            Opcode::Nop | Opcode::HideCursor | Opcode::EntryIncrement => {}
            Opcode::Clear => *self = Self {
                patterns: self.patterns,
                ..Self::new()
            },
            Opcode::SetAddress(addr) => self.cursor = addr.device_address(),
            Opcode::Blank | Opcode::Lit => {
                let (pattern, row_bits) = if op == Opcode::Lit {
                    (CellPattern::LIT, ROW_MASK)
                } else {
                    (CellPattern::BLANK, 0)
                };
                match Address::decode(self.cursor)? {
                    Address::Cell(pos) => {
                        self.grid.write_cell(pattern, pos);
                        self.shown[pos.index()] = None;
                    }
                    Address::Pattern { slot, row } => self.write_pattern_row(slot, row, row_bits),
                }
            }
            Opcode::PatternRow(bits) => match Address::decode(self.cursor)? {
                Address::Pattern { slot, row } => self.write_pattern_row(slot, row, bits),
                Address::Cell(pos) => {
                    return Err(LcdError::validation(format!(
                        "pattern row written to cell {pos} instead of pattern memory"
                    )));
                }
            },
            Opcode::ShowSlot(slot) => match Address::decode(self.cursor)? {
                Address::Cell(pos) => {
                    self.grid.write_cell(self.patterns[slot.index()], pos);
                    self.shown[pos.index()] = Some(slot);
                }
                Address::Pattern { .. } => {
                    return Err(LcdError::validation(format!(
                        "glyph slot {slot} shown while the cursor addresses pattern memory"
                    )));
                }
            },
        }
        if op.advances_cursor() {
            self.cursor = self.cursor.saturating_add(1);
        }
        Ok(())
    }

    fn write_pattern_row(&mut self, slot: SlotIndex, row: u8, bits: u8) {
        let pattern = &mut self.patterns[slot.index()];
        pattern.0[usize::from(row)] = bits & ROW_MASK;
        let pattern = *pattern;
        for pos in Position::all() {
            if self.shown[pos.index()] == Some(slot) {
                self.grid.write_cell(pattern, pos);
            }
        }
    }
}
