use lcdplay::{
    Address, CellPattern, Decision, DisplayModel, Encoder, EncoderConfig, Grid, Opcode, Position,
    SlotIndex, Solid, VISIT_ORDER, assemble_program, disassemble,
};

const TOP: CellPattern = CellPattern([0x1f, 0x1f, 0x1f, 0x1f, 0, 0, 0, 0]);
const BOTTOM: CellPattern = CellPattern([0, 0, 0, 0, 0x1f, 0x1f, 0x1f, 0x1f]);
const CHECKER: CellPattern = CellPattern([0x15, 0x0a, 0x15, 0x0a, 0x15, 0x0a, 0x15, 0x0a]);

fn grid_with(cells: &[(Position, CellPattern)]) -> Grid {
    let mut g = Grid::blank();
    for (pos, pat) in cells {
        g.write_cell(*pat, *pos);
    }
    g
}

fn cfg(slots: usize, capacity: u64) -> EncoderConfig {
    EncoderConfig {
        slots,
        capacity,
        ..EncoderConfig::default()
    }
}

fn slot(i: usize) -> SlotIndex {
    SlotIndex::new(i).unwrap()
}

#[test]
fn single_lit_cell_costs_one_seek_and_one_literal() {
    let lit_at = Position::from_row_col(1, 5).unwrap();
    let frames = vec![Grid::blank(), grid_with(&[(lit_at, CellPattern::LIT)])];
    let mut enc = Encoder::new(frames, cfg(2, 205)).unwrap();
    enc.run().unwrap();

    let ops: Vec<Opcode> = disassemble(enc.emitter().bytes())
        .unwrap()
        .into_iter()
        .filter(|op| *op != Opcode::Nop)
        .collect();
    assert_eq!(
        ops,
        vec![Opcode::SetAddress(Address::Cell(lit_at)), Opcode::Lit]
    );
    assert_eq!(enc.display().grid().cell(lit_at), CellPattern::LIT);
}

#[test]
fn third_cell_evicts_first_assignment() {
    let (a, b, c) = (VISIT_ORDER[0], VISIT_ORDER[1], VISIT_ORDER[2]);
    let frame = grid_with(&[(a, TOP), (b, BOTTOM), (c, CHECKER)]);
    let mut enc = Encoder::new(vec![frame], cfg(2, 100_005)).unwrap();

    assert_eq!(
        enc.step().unwrap().decision,
        Decision::Assign {
            position: a,
            slot: slot(0)
        }
    );
    assert_eq!(
        enc.step().unwrap().decision,
        Decision::Assign {
            position: b,
            slot: slot(1)
        }
    );

    let before = enc.bytes_sent() as usize;
    assert_eq!(
        enc.step().unwrap().decision,
        Decision::Evict {
            evicted: a,
            fill: Solid::Blank,
            position: c,
            slot: slot(0),
        }
    );
    let ops = disassemble(&enc.emitter().bytes()[before..]).unwrap();
    assert_eq!(ops.len(), 13);
    assert_eq!(ops[0], Opcode::SetAddress(Address::Cell(a)));
    assert_eq!(ops[1], Opcode::Blank);
    assert_eq!(ops[2], Opcode::SetAddress(slot(0).pattern_address(0)));
    assert_eq!(ops[11], Opcode::SetAddress(Address::Cell(c)));
    assert_eq!(ops[12], Opcode::ShowSlot(slot(0)));

    assert_eq!(enc.cache().lookup(a), None);
    assert_eq!(enc.display().grid().cell(a), CellPattern::BLANK);
    assert_eq!(enc.display().grid().cell(c), CHECKER);
}

#[test]
fn single_slot_rotates_through_cells() {
    let (a, b, c) = (VISIT_ORDER[0], VISIT_ORDER[1], VISIT_ORDER[2]);
    let frame = grid_with(&[(a, TOP), (b, BOTTOM), (c, CHECKER)]);
    let mut enc = Encoder::new(vec![frame], cfg(1, 100_005)).unwrap();

    let decisions: Vec<Decision> = (0..3).map(|_| enc.step().unwrap().decision).collect();
    assert_eq!(
        decisions,
        vec![
            Decision::Assign {
                position: a,
                slot: slot(0)
            },
            Decision::Evict {
                evicted: a,
                fill: Solid::Blank,
                position: b,
                slot: slot(0),
            },
            Decision::Evict {
                evicted: b,
                fill: Solid::Blank,
                position: c,
                slot: slot(0),
            },
        ]
    );
}

#[test]
fn evicted_cell_fills_lit_when_mostly_lit() {
    let mostly = CellPattern([0x1f, 0x1f, 0x1f, 0x1f, 0x1f, 0x0f, 0, 0]);
    let (a, b) = (VISIT_ORDER[0], VISIT_ORDER[1]);
    let frame = grid_with(&[(a, mostly), (b, TOP)]);
    let mut enc = Encoder::new(vec![frame], cfg(1, 100_005)).unwrap();
    enc.step().unwrap();
    let Decision::Evict { evicted, fill, .. } = enc.step().unwrap().decision else {
        panic!("expected an eviction");
    };
    assert_eq!(evicted, a);
    assert_eq!(fill, Solid::Lit);
}

#[test]
fn unchanged_target_only_idles() {
    let mut enc = Encoder::new(vec![Grid::blank(); 3], cfg(8, 305)).unwrap();
    while !enc.is_finished() {
        let step = enc.step().unwrap();
        assert_eq!(step.decision, Decision::Idle);
        assert_eq!(step.bytes, 1);
        enc.advance();
    }
    assert_eq!(enc.bytes_sent(), 300);
}

#[test]
fn settled_display_idles_until_frame_advances() {
    let frame = grid_with(&[
        (Position::new(3).unwrap(), CellPattern::LIT),
        (Position::new(21).unwrap(), CHECKER),
    ]);
    let mut enc = Encoder::new(vec![frame.clone(); 2], cfg(8, 2005)).unwrap();

    let mut settled = false;
    while !enc.is_finished() {
        let decision = enc.step().unwrap().decision;
        if settled {
            assert_eq!(decision, Decision::Idle);
        } else if decision == Decision::Idle {
            settled = true;
            assert_eq!(enc.display().grid(), &frame);
        }
        enc.advance();
    }
    assert!(settled);
}

#[test]
fn empty_source_encodes_nothing() {
    let mut enc = Encoder::new(Vec::new(), EncoderConfig::default()).unwrap();
    assert!(enc.is_finished());
    let stats = enc.run().unwrap();
    assert_eq!(stats.steps, 0);
    assert_eq!(assemble_program(enc.emitter().bytes(), 32768, false).len(), 4);
}

#[test]
fn assembled_program_replays_to_encoder_model() {
    // Even cells cycle through textures, odd cells blink between solids.
    let textures = [TOP, BOTTOM, CHECKER];
    let frames: Vec<Grid> = (0..24usize)
        .map(|f| {
            let cells: Vec<_> = Position::all()
                .map(|pos| {
                    let p = pos.index();
                    let pat = if p % 2 == 0 {
                        textures[(f / 2 + p) % 3]
                    } else if (f / 3 + p) % 4 == 1 {
                        CellPattern::LIT
                    } else {
                        CellPattern::BLANK
                    };
                    (pos, pat)
                })
                .collect();
            grid_with(&cells)
        })
        .collect();
    let c = cfg(3, 3005);
    let capacity = c.capacity as usize;
    let mut enc = Encoder::new(frames, c).unwrap();
    let stats = enc.run().unwrap();
    assert!(stats.assigns > 0);
    assert!(stats.evictions > 0);
    assert!(stats.solid_fixes > 0);
    assert_eq!(stats.bytes, enc.bytes_sent());

    let program = assemble_program(enc.emitter().bytes(), capacity + 64, false);
    let replayed = DisplayModel::replay(&program).unwrap();
    assert_eq!(replayed.grid(), enc.display().grid());
    assert_eq!(replayed.cursor(), enc.display().cursor());
}
