use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::Context as _;
use flate2::read::GzDecoder;

use crate::foundation::core::FRAME_BYTES;
use crate::foundation::error::{LcdError, LcdResult};
use crate::frame::Grid;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Split a decompressed frame stream into grids. A trailing partial frame is
/// rejected rather than silently dropped.
pub fn parse_frames(bytes: &[u8]) -> LcdResult<Vec<Grid>> {
    if !bytes.len().is_multiple_of(FRAME_BYTES) {
        return Err(LcdError::validation(format!(
            "frame stream of {} bytes is not a multiple of {FRAME_BYTES}",
            bytes.len()
        )));
    }
    bytes.chunks_exact(FRAME_BYTES).map(Grid::from_bytes).collect()
}

/// Read every frame from `r`, inflating it first if it is gzip-compressed.
pub fn read_frames(mut r: impl Read) -> LcdResult<Vec<Grid>> {
    let mut raw = Vec::new();
    r.read_to_end(&mut raw).context("read frame stream")?;
    if raw.starts_with(&GZIP_MAGIC) {
        let mut inflated = Vec::new();
        GzDecoder::new(raw.as_slice())
            .read_to_end(&mut inflated)
            .context("inflate gzip frame stream")?;
        raw = inflated;
    }
    parse_frames(&raw)
}

pub fn read_frames_file(path: &Path) -> LcdResult<Vec<Grid>> {
    let f = File::open(path).with_context(|| format!("open frames '{}'", path.display()))?;
    let frames = read_frames(BufReader::new(f))?;
    tracing::debug!(path = %path.display(), frames = frames.len(), "loaded frames");
    Ok(frames)
}
