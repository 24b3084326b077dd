//! Wire codec for the playback device's one-byte command set.
//!
//! | byte          | mnemonic      | effect                                         |
//! |---------------|---------------|------------------------------------------------|
//! | `0x00..=0x07` | `CG0`..`CG7`  | show glyph slot at cursor, cursor advances     |
//! | `0x08`        | `INI`         | no-op filler                                   |
//! | `0x09`        | `CLR`         | clear panel, cursor to `D00`                   |
//! | `0x0A`        | `CUR`         | hide hardware cursor                           |
//! | `0x0B`        | `EIN`         | entry mode increment                           |
//! | `0x20`        | `BLK`         | all-blank cell, cursor advances                |
//! | `0x40..=0x5F` | `B00`..`B31`  | one glyph pattern row, cursor advances         |
//! | `0x60..=0x7F` | `D00`..`E27`  | cursor to a cell, one block of eight per row   |
//! | `0x80..=0xBF` | `C00`..`C63`  | cursor to a pattern-memory row                 |
//! | `0xFF`        | `FUL`         | all-lit cell, cursor advances                  |

use std::io::Write;

use crate::foundation::core::{
    Address, CELL_HEIGHT, CELLS, MAX_SLOTS, Position, ROW_MASK, SlotIndex,
};
use crate::foundation::error::{LcdError, LcdResult};
use crate::pattern::Solid;

const SHOW_SLOT_BASE: u8 = 0x00;
const NOP: u8 = 0x08;
const CLEAR: u8 = 0x09;
const HIDE_CURSOR: u8 = 0x0a;
const ENTRY_INCREMENT: u8 = 0x0b;
const BLANK: u8 = 0x20;
const PATTERN_ROW_BASE: u8 = 0x40;
const CELL_BASE: u8 = 0x60;
const PATTERN_ADDR_BASE: u8 = 0x80;
const LIT: u8 = 0xff;

const PATTERN_ROWS: u8 = (MAX_SLOTS * CELL_HEIGHT) as u8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Opcode {
    ShowSlot(SlotIndex),
    Nop,
    Clear,
    HideCursor,
    EntryIncrement,
    Blank,
    Lit,
    PatternRow(u8),
    SetAddress(Address),
}

/// Commands the player needs before the encoded body.
pub const INIT_HEADER: [Opcode; 4] = [
    Opcode::Nop,
    Opcode::HideCursor,
    Opcode::EntryIncrement,
    Opcode::Clear,
];

impl Opcode {
    pub fn solid(solid: Solid) -> Self {
        match solid {
            Solid::Blank => Self::Blank,
            Solid::Lit => Self::Lit,
        }
    }

    pub fn encode(self) -> u8 {
        match self {
            Self::ShowSlot(slot) => SHOW_SLOT_BASE + slot.index() as u8,
            Self::Nop => NOP,
            Self::Clear => CLEAR,
            Self::HideCursor => HIDE_CURSOR,
            Self::EntryIncrement => ENTRY_INCREMENT,
            Self::Blank => BLANK,
            Self::Lit => LIT,
            Self::PatternRow(bits) => PATTERN_ROW_BASE | (bits & ROW_MASK),
            Self::SetAddress(Address::Cell(pos)) => CELL_BASE + pos.index() as u8,
            Self::SetAddress(Address::Pattern { slot, row }) => {
                PATTERN_ADDR_BASE + slot.index() as u8 * CELL_HEIGHT as u8 + row
            }
        }
    }

    pub fn decode(byte: u8) -> LcdResult<Self> {
        let op = match byte {
            0x00..=0x07 => Self::ShowSlot(SlotIndex::new(usize::from(byte - SHOW_SLOT_BASE))?),
            NOP => Self::Nop,
            CLEAR => Self::Clear,
            HIDE_CURSOR => Self::HideCursor,
            ENTRY_INCREMENT => Self::EntryIncrement,
            BLANK => Self::Blank,
            LIT => Self::Lit,
            0x40..=0x5f => Self::PatternRow(byte - PATTERN_ROW_BASE),
            0x60..=0x7f => Self::SetAddress(Address::Cell(Position::new(usize::from(
                byte - CELL_BASE,
            ))?)),
            0x80..=0xbf => {
                let offset = byte - PATTERN_ADDR_BASE;
                debug_assert!(offset < PATTERN_ROWS);
                let slot = SlotIndex::new(usize::from(offset) / CELL_HEIGHT)?;
                Self::SetAddress(slot.pattern_address(offset % CELL_HEIGHT as u8))
            }
            _ => return Err(LcdError::Decode { byte }),
        };
        Ok(op)
    }

    /// Whether the device cursor moves forward after executing this opcode.
    pub fn advances_cursor(self) -> bool {
        matches!(
            self,
            Self::ShowSlot(_) | Self::Blank | Self::Lit | Self::PatternRow(_)
        )
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ShowSlot(slot) => write!(f, "CG{slot}"),
            Self::Nop => f.write_str("INI"),
            Self::Clear => f.write_str("CLR"),
            Self::HideCursor => f.write_str("CUR"),
            Self::EntryIncrement => f.write_str("EIN"),
            Self::Blank => f.write_str("BLK"),
            Self::Lit => f.write_str("FUL"),
            Self::PatternRow(bits) => write!(f, "B{:02}", bits & ROW_MASK),
            Self::SetAddress(Address::Cell(pos)) => {
                // Rows 1/3 and 2/4 share a command prefix on the controller.
                let prefix = if pos.row() % 2 == 0 { 'D' } else { 'E' };
                let base = if pos.row() >= 2 { 20 } else { 0 };
                write!(f, "{prefix}{:02}", base + pos.col())
            }
            Self::SetAddress(Address::Pattern { slot, row }) => {
                write!(f, "C{:02}", slot.index() * CELL_HEIGHT + usize::from(*row))
            }
        }
    }
}

/// One listing entry: an opcode plus an optional annotation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListingLine {
    pub opcode: Opcode,
    pub comment: Option<String>,
}

/// Serializes opcodes and counts the bytes sent.
#[derive(Clone, Debug, Default)]
pub struct Emitter {
    bytes: Vec<u8>,
    listing: Option<Vec<ListingLine>>,
}

impl Emitter {
    pub fn new(keep_listing: bool) -> Self {
        Self {
            bytes: Vec::new(),
            listing: keep_listing.then(Vec::new),
        }
    }

    pub fn emit(&mut self, opcode: Opcode, comment: Option<String>) {
        self.bytes.push(opcode.encode());
        if let Some(listing) = self.listing.as_mut() {
            listing.push(ListingLine { opcode, comment });
        }
    }

    pub fn bytes_sent(&self) -> u64 {
        self.bytes.len() as u64
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn listing(&self) -> Option<&[ListingLine]> {
        self.listing.as_deref()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Write the assembler-style listing, one `MNEMONIC +` line per opcode.
    pub fn write_listing(&self, mut w: impl Write) -> LcdResult<()> {
        use anyhow::Context as _;
        let Some(listing) = self.listing.as_ref() else {
            return Err(LcdError::validation("emitter was created without a listing"));
        };
        for op in INIT_HEADER {
            writeln!(w, "{op} +").context("write listing")?;
        }
        for line in listing {
            let res = match &line.comment {
                Some(c) => writeln!(w, "{} + # {c}", line.opcode),
                None => writeln!(w, "{} +", line.opcode),
            };
            res.context("write listing")?;
        }
        Ok(())
    }
}

/// Prefix the init header and, with `pad`, fill the rest of the device with
/// no-ops. A body that would overflow `capacity` is cut at the last opcode
/// that fits; every prefix of the stream replays correctly.
pub fn assemble_program(body: &[u8], capacity: usize, pad: bool) -> Vec<u8> {
    let header: Vec<u8> = INIT_HEADER.iter().map(|op| op.encode()).collect();
    let room = capacity.saturating_sub(header.len());
    if body.len() > room {
        tracing::warn!(
            body = body.len(),
            room,
            "encoded body exceeds device capacity, truncating"
        );
    }
    let mut out = header;
    out.extend_from_slice(&body[..body.len().min(room)]);
    if pad && out.len() < capacity {
        out.resize(capacity, NOP);
    }
    out
}

/// Parse a whole byte stream into opcodes.
pub fn disassemble(bytes: &[u8]) -> LcdResult<Vec<Opcode>> {
    bytes.iter().map(|b| Opcode::decode(*b)).collect()
}

const _: () = assert!(CELL_BASE as usize + CELLS <= PATTERN_ADDR_BASE as usize);
