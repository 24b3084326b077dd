//! lcdplay turns a pre-rasterized monochrome video into a byte stream of
//! one-byte display commands for a 4x8 character LCD with eight programmable
//! glyph slots, under a fixed output-size budget.
//!
//! # Pipeline overview
//!
//! 1. **Load**: raw or gzip frame stream -> `Vec<Grid>` ([`read_frames`])
//! 2. **Encode**: `Encoder::run` repeatedly picks the single most useful update
//!    for the current target frame and emits its opcodes
//! 3. **Assemble**: init header + encoded body (+ optional no-op padding)
//!    ([`assemble_program`])
//!
//! The encoder is a greedy, deterministic scheduler. Playback time is derived
//! purely from the number of bytes emitted: the player consumes bytes at a
//! constant rate, so byte `b` of a budget `B` shows frame `n * b / B`.
//!
//! Every prefix of the emitted stream replays correctly; [`DisplayModel`]
//! replays a stream and reports what the panel shows.
#![forbid(unsafe_code)]

mod cache;
mod display;
mod encoder;
mod foundation;
mod frame;
mod opcode;
mod pacing;
mod pattern;
mod source;

pub use cache::SlotCache;
pub use display::DisplayModel;
pub use encoder::{Decision, EncodeStats, Encoder, EncoderConfig, Step};
pub use foundation::core::{
    Address, CELL_HEIGHT, CELL_PIXELS, CELL_WIDTH, CELLS, COLS, FRAME_BYTES, MAX_SLOTS,
    PATTERN_BASE, Position, ROW_MASK, ROWS, SlotIndex, VISIT_ORDER,
};
pub use foundation::error::{LcdError, LcdResult};
pub use frame::{CellPattern, Grid};
pub use opcode::{Emitter, INIT_HEADER, ListingLine, Opcode, assemble_program, disassemble};
pub use pacing::{FrameSequence, Pacer};
pub use pattern::{Solid, classify_solid, delta, popcount};
pub use source::{parse_frames, read_frames, read_frames_file};
