use crate::foundation::error::{LcdError, LcdResult};
use crate::frame::Grid;

/// Maps output progress (bytes emitted) onto playback progress (source frame),
/// assuming the player consumes bytes at a constant rate for the whole budget.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacer {
    num_frames: u64,
    budget: u64,
}

impl Pacer {
    pub fn new(num_frames: u64, budget: u64) -> LcdResult<Self> {
        if budget == 0 {
            return Err(LcdError::validation("byte budget must be non-zero"));
        }
        Ok(Self { num_frames, budget })
    }

    pub fn num_frames(self) -> u64 {
        self.num_frames
    }

    pub fn budget(self) -> u64 {
        self.budget
    }

    /// `floor(num_frames * bytes_sent / budget)`.
    pub fn frame_index_for(self, bytes_sent: u64) -> u64 {
        let idx = u128::from(self.num_frames) * u128::from(bytes_sent) / u128::from(self.budget);
        u64::try_from(idx).unwrap_or(u64::MAX)
    }
}

/// The source frames plus one replicated copy of the last one. Reads past the
/// end clamp to that copy, so lookahead of any depth stays in bounds.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    frames: Vec<Grid>,
    real_len: usize,
}

impl FrameSequence {
    pub fn new(mut frames: Vec<Grid>) -> Self {
        let real_len = frames.len();
        let last = frames.last().cloned().unwrap_or_default();
        frames.push(last);
        Self { frames, real_len }
    }

    /// Number of real (non-replicated) frames.
    pub fn len(&self) -> usize {
        self.real_len
    }

    pub fn is_empty(&self) -> bool {
        self.real_len == 0
    }

    /// Highest index that reads a distinct stored frame; every later index
    /// reads the same grid.
    pub fn last_index(&self) -> u64 {
        self.real_len as u64
    }

    /// Frame at `index`. Indices past the replicated tail clamp to the last
    /// frame; an empty sequence reads as a blank grid.
    pub fn get(&self, index: u64) -> &Grid {
        let i = usize::try_from(index).unwrap_or(usize::MAX).min(self.real_len);
        &self.frames[i]
    }
}
