use crate::cache::SlotCache;
use crate::display::DisplayModel;
use crate::foundation::core::{
    Address, CELL_PIXELS, CELLS, MAX_SLOTS, Position, SlotIndex, VISIT_ORDER,
};
use crate::foundation::error::{LcdError, LcdResult};
use crate::frame::{CellPattern, Grid};
use crate::opcode::{Emitter, INIT_HEADER, Opcode};
use crate::pacing::{FrameSequence, Pacer};
use crate::pattern::{Solid, classify_solid, delta, popcount};

/// Tuning for one encode run. Defaults target a 32 KiB EEPROM player.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EncoderConfig {
    /// Device storage in bytes.
    pub capacity: u64,
    /// Bytes held back for the init header.
    pub reserved: u64,
    /// Pixels a cell may deviate and still count as solid or unchanged.
    pub tolerance: u32,
    /// Glyph slots the encoder may use.
    pub slots: usize,
    /// Bytes of output to look ahead when picking the frame to draw towards.
    pub forecast_offset: u64,
    /// Frames after the forecast checked for a cell turning solid.
    pub lookahead_frames: usize,
    /// An evicted cell is filled lit when its forecast has more lit pixels than this.
    pub majority: u32,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            capacity: 32768,
            reserved: 5,
            tolerance: 4,
            slots: MAX_SLOTS,
            forecast_offset: 10,
            lookahead_frames: 3,
            majority: CELL_PIXELS / 2,
        }
    }
}

impl EncoderConfig {
    pub fn validate(&self) -> LcdResult<()> {
        if self.capacity <= self.reserved {
            return Err(LcdError::validation(
                "capacity must be larger than the reserved region",
            ));
        }
        if self.reserved < INIT_HEADER.len() as u64 {
            return Err(LcdError::validation(format!(
                "reserved region must hold the {}-byte init header",
                INIT_HEADER.len()
            )));
        }
        if self.slots == 0 || self.slots > MAX_SLOTS {
            return Err(LcdError::validation(format!(
                "slots must be in 1..={MAX_SLOTS}"
            )));
        }
        if self.tolerance >= CELL_PIXELS / 2 {
            // Blank and lit would overlap.
            return Err(LcdError::validation(format!(
                "tolerance must be below {}",
                CELL_PIXELS / 2
            )));
        }
        if self.majority > CELL_PIXELS {
            return Err(LcdError::validation(format!(
                "majority must be at most {CELL_PIXELS}"
            )));
        }
        Ok(())
    }

    /// Bytes available to the encoded body.
    pub fn budget(&self) -> u64 {
        self.capacity.saturating_sub(self.reserved)
    }
}

/// What one scheduler step decided.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Decision {
    /// Wrote a solid literal at the cursor, freeing any slot the cell held.
    SolidFix {
        position: Position,
        solid: Solid,
        released: Option<SlotIndex>,
    },
    /// Moved the cursor to the start of a run of cells needing solid fixes.
    Seek { position: Position },
    /// Reprogrammed the slot already bound to a cell.
    Refresh { position: Position, slot: SlotIndex },
    /// Bound a free slot to a cell and drew it there.
    Assign { position: Position, slot: SlotIndex },
    /// Filled the oldest bound cell with a solid and rebound its slot.
    Evict {
        evicted: Position,
        fill: Solid,
        position: Position,
        slot: SlotIndex,
    },
    /// Nothing worth changing; emitted a no-op.
    Idle,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Step {
    pub decision: Decision,
    /// Bytes this step emitted, always at least one.
    pub bytes: u64,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
pub struct EncodeStats {
    pub frames: u64,
    pub frame_advances: u64,
    pub steps: u64,
    pub bytes: u64,
    pub solid_fixes: u64,
    pub seeks: u64,
    pub refreshes: u64,
    pub assigns: u64,
    pub evictions: u64,
    pub idles: u64,
}

impl EncodeStats {
    fn record(&mut self, step: &Step) {
        self.steps += 1;
        self.bytes += step.bytes;
        match step.decision {
            Decision::SolidFix { .. } => self.solid_fixes += 1,
            Decision::Seek { .. } => self.seeks += 1,
            Decision::Refresh { .. } => self.refreshes += 1,
            Decision::Assign { .. } => self.assigns += 1,
            Decision::Evict { .. } => self.evictions += 1,
            Decision::Idle => self.idles += 1,
        }
    }
}

/// Greedy scheduler turning a frame sequence into device opcodes.
///
/// Each [`Encoder::step`] emits the opcodes for one decision and updates the
/// modeled panel; [`Encoder::advance`] moves the target frame forward as the
/// byte count grows. [`Encoder::run`] alternates the two until the source is
/// exhausted.
#[derive(Debug)]
pub struct Encoder {
    cfg: EncoderConfig,
    frames: FrameSequence,
    pacer: Pacer,
    display: DisplayModel,
    cache: SlotCache,
    emitter: Emitter,
    scan: usize,
    frame: u64,
    stats: EncodeStats,
}

impl Encoder {
    pub fn new(frames: Vec<Grid>, cfg: EncoderConfig) -> LcdResult<Self> {
        cfg.validate()?;
        let frames = FrameSequence::new(frames);
        let pacer = Pacer::new(frames.len() as u64, cfg.budget())?;
        let cache = SlotCache::new(cfg.slots)?;
        let stats = EncodeStats {
            frames: frames.len() as u64,
            ..EncodeStats::default()
        };
        Ok(Self {
            cfg,
            frames,
            pacer,
            display: DisplayModel::new(),
            cache,
            emitter: Emitter::new(false),
            scan: 0,
            frame: 0,
            stats,
        })
    }

    /// Record an annotated listing alongside the bytes.
    pub fn with_listing(mut self, keep: bool) -> Self {
        self.emitter = Emitter::new(keep);
        self
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.cfg
    }

    pub fn bytes_sent(&self) -> u64 {
        self.emitter.bytes_sent()
    }

    pub fn frame_index(&self) -> u64 {
        self.frame
    }

    pub fn target(&self) -> &Grid {
        self.frames.get(self.frame)
    }

    pub fn display(&self) -> &DisplayModel {
        &self.display
    }

    pub fn cache(&self) -> &SlotCache {
        &self.cache
    }

    pub fn emitter(&self) -> &Emitter {
        &self.emitter
    }

    pub fn stats(&self) -> &EncodeStats {
        &self.stats
    }

    pub fn into_emitter(self) -> Emitter {
        self.emitter
    }

    pub fn is_finished(&self) -> bool {
        self.frame >= self.frames.len() as u64
    }

    #[tracing::instrument(
        skip(self),
        fields(frames = self.frames.len(), budget = self.pacer.budget())
    )]
    pub fn run(&mut self) -> LcdResult<EncodeStats> {
        while !self.is_finished() {
            self.step()?;
            self.advance();
        }
        tracing::info!(
            bytes = self.stats.bytes,
            assigns = self.stats.assigns,
            evictions = self.stats.evictions,
            idles = self.stats.idles,
            "encode finished"
        );
        Ok(self.stats.clone())
    }

    /// Move the target to the frame the byte count now corresponds to.
    pub fn advance(&mut self) -> bool {
        let next = self.pacer.frame_index_for(self.bytes_sent());
        if next <= self.frame {
            return false;
        }
        tracing::debug!(
            frame = self.frame,
            next,
            bytes = self.bytes_sent(),
            delta = self.target().delta(self.display.grid()),
            slots = self.cache.len(),
            "frame advance"
        );
        self.frame = next;
        self.stats.frame_advances += 1;
        true
    }

    /// Decide and emit the next action against the current target frame.
    pub fn step(&mut self) -> LcdResult<Step> {
        let before = self.bytes_sent();
        let decision = self.decide()?;
        let step = Step {
            decision,
            bytes: self.bytes_sent() - before,
        };
        tracing::trace!(?decision, bytes = step.bytes, "step");
        self.stats.record(&step);
        Ok(step)
    }

    fn decide(&mut self) -> LcdResult<Decision> {
        // A solid cell under the cursor costs one byte.
        if let Some(pos) = self.display.cursor_cell()
            && let Some(solid) = self.solid_mismatch(pos)
        {
            let released = self.cache.release(pos);
            self.emit(Opcode::solid(solid), released.map(|s| format!("free {s}")))?;
            return Ok(Decision::SolidFix {
                position: pos,
                solid,
                released,
            });
        }

        // Otherwise move to the leftmost cell of the next run needing a solid.
        if let Some(mut pos) = self.scan_visit_order(|enc, pos| enc.solid_mismatch(pos).is_some())
        {
            while let Some(left) = pos.left() {
                if self.solid_mismatch(left).is_none() {
                    break;
                }
                pos = left;
            }
            self.emit(Opcode::SetAddress(Address::Cell(pos)), None)?;
            return Ok(Decision::Seek { position: pos });
        }

        let forecast = self
            .pacer
            .frame_index_for(self.bytes_sent().saturating_add(self.cfg.forecast_offset));
        let Some(pos) = self.scan_visit_order(|enc, pos| enc.wants_glyph(pos, forecast)) else {
            self.emit(Opcode::Nop, None)?;
            return Ok(Decision::Idle);
        };
        let pattern = self.frames.get(forecast).cell(pos);

        if let Some(slot) = self.cache.touch(pos) {
            self.program_slot(slot, pattern, format!("update assigned {slot}"))?;
            return Ok(Decision::Refresh {
                position: pos,
                slot,
            });
        }

        if !self.cache.is_full() {
            let slot = self.cache.allocate(pos)?;
            self.program_slot(slot, pattern, format!("assign {slot}"))?;
            self.show_slot(pos, slot)?;
            return Ok(Decision::Assign {
                position: pos,
                slot,
            });
        }

        let (evicted, freed) = self.cache.evict_oldest()?;
        let fill = if popcount(self.frames.get(forecast).cell(evicted)) > self.cfg.majority {
            Solid::Lit
        } else {
            Solid::Blank
        };
        self.emit(
            Opcode::SetAddress(Address::Cell(evicted)),
            Some(format!("evict {freed} at {evicted}")),
        )?;
        self.emit(Opcode::solid(fill), None)?;
        let slot = self.cache.allocate(pos)?;
        debug_assert_eq!(slot, freed);
        self.program_slot(slot, pattern, format!("reassign {slot}"))?;
        self.show_slot(pos, slot)?;
        Ok(Decision::Evict {
            evicted,
            fill,
            position: pos,
            slot,
        })
    }

    /// Check up to one full cycle of the visiting order, resuming after the
    /// last visited cell.
    fn scan_visit_order(&mut self, pred: impl Fn(&Self, Position) -> bool) -> Option<Position> {
        for _ in 0..CELLS {
            let pos = VISIT_ORDER[self.scan];
            self.scan = (self.scan + 1) % CELLS;
            if pred(self, pos) {
                return Some(pos);
            }
        }
        None
    }

    /// The solid the target wants at `pos`, if the panel does not already show it.
    fn solid_mismatch(&self, pos: Position) -> Option<Solid> {
        let tol = self.cfg.tolerance;
        let want = classify_solid(self.target().cell(pos), tol)?;
        let have = classify_solid(self.display.grid().cell(pos), tol);
        (have != Some(want)).then_some(want)
    }

    /// Whether `pos` is worth a glyph update towards frame `forecast`: it
    /// differs visibly and does not turn solid in the frames right after.
    fn wants_glyph(&self, pos: Position, forecast: u64) -> bool {
        let tol = self.cfg.tolerance;
        let ahead = self.frames.get(forecast).cell(pos);
        if delta(ahead, self.display.grid().cell(pos)) <= tol {
            return false;
        }
        // Reads clamp at the replicated tail, so stop once they would repeat.
        let first = forecast.saturating_add(1);
        let end = forecast
            .saturating_add(self.cfg.lookahead_frames as u64)
            .min(self.frames.last_index().max(first));
        !(first..=end).any(|i| classify_solid(self.frames.get(i).cell(pos), tol).is_some())
    }

    fn program_slot(
        &mut self,
        slot: SlotIndex,
        pattern: CellPattern,
        comment: String,
    ) -> LcdResult<()> {
        self.emit(Opcode::SetAddress(slot.pattern_address(0)), Some(comment))?;
        for row in *pattern.rows() {
            self.emit(Opcode::PatternRow(row), None)?;
        }
        Ok(())
    }

    fn show_slot(&mut self, pos: Position, slot: SlotIndex) -> LcdResult<()> {
        self.emit(Opcode::SetAddress(Address::Cell(pos)), None)?;
        self.emit(Opcode::ShowSlot(slot), None)
    }

    fn emit(&mut self, op: Opcode, comment: Option<String>) -> LcdResult<()> {
        self.display.apply(op)?;
        self.emitter.emit(op, comment);
        Ok(())
    }
}
