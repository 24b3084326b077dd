use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter},
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "lcdplay", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Encode a frame stream into a device program.
    Encode(EncodeArgs),
    /// Decode a device program and report what it does.
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct EncodeArgs {
    /// Input frames: raw or gzip, 256 bytes per frame.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output program path.
    #[arg(long)]
    out: PathBuf,

    /// Also write an annotated mnemonic listing.
    #[arg(long)]
    listing: Option<PathBuf>,

    /// Encoder settings as JSON; flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Device storage in bytes.
    #[arg(long)]
    capacity: Option<u64>,

    /// Glyph slots to use (1-8).
    #[arg(long)]
    slots: Option<usize>,

    /// Pixels a cell may deviate and still count as solid.
    #[arg(long)]
    tolerance: Option<u32>,

    /// Fill unused device storage with no-ops.
    #[arg(long)]
    pad: bool,

    /// Print encode statistics as JSON on stdout.
    #[arg(long)]
    stats: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// Program to decode.
    #[arg(long = "in")]
    in_path: PathBuf,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Encode(args) => cmd_encode(args),
        Command::Inspect(args) => cmd_inspect(args),
    }
}

fn read_config(path: Option<&Path>) -> anyhow::Result<lcdplay::EncoderConfig> {
    let Some(path) = path else {
        return Ok(lcdplay::EncoderConfig::default());
    };
    let f = File::open(path).with_context(|| format!("open config '{}'", path.display()))?;
    let cfg = serde_json::from_reader(BufReader::new(f)).with_context(|| "parse config JSON")?;
    Ok(cfg)
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_encode(args: EncodeArgs) -> anyhow::Result<()> {
    let mut cfg = read_config(args.config.as_deref())?;
    if let Some(capacity) = args.capacity {
        cfg.capacity = capacity;
    }
    if let Some(slots) = args.slots {
        cfg.slots = slots;
    }
    if let Some(tolerance) = args.tolerance {
        cfg.tolerance = tolerance;
    }

    let frames = lcdplay::read_frames_file(&args.in_path)?;
    let capacity = usize::try_from(cfg.capacity).context("capacity does not fit in memory")?;

    let mut encoder = lcdplay::Encoder::new(frames, cfg)?.with_listing(args.listing.is_some());
    let stats = encoder.run()?;
    let emitter = encoder.into_emitter();

    if let Some(listing) = &args.listing {
        ensure_parent_dir(listing)?;
        let f = File::create(listing)
            .with_context(|| format!("create listing '{}'", listing.display()))?;
        emitter.write_listing(BufWriter::new(f))?;
        eprintln!("wrote {}", listing.display());
    }

    let program = lcdplay::assemble_program(emitter.bytes(), capacity, args.pad);
    ensure_parent_dir(&args.out)?;
    std::fs::write(&args.out, &program)
        .with_context(|| format!("write program '{}'", args.out.display()))?;
    eprintln!("wrote {} ({} bytes)", args.out.display(), program.len());

    if args.stats {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}

fn cmd_inspect(args: InspectArgs) -> anyhow::Result<()> {
    let bytes = std::fs::read(&args.in_path)
        .with_context(|| format!("read program '{}'", args.in_path.display()))?;
    let ops = lcdplay::disassemble(&bytes)?;

    let mut histogram: BTreeMap<&'static str, u64> = BTreeMap::new();
    for op in &ops {
        *histogram.entry(opcode_family(op)).or_default() += 1;
    }
    let model = lcdplay::DisplayModel::replay(&bytes)?;

    let mut cells = BTreeMap::new();
    for (_, cell) in model.grid().cells() {
        let kind = match lcdplay::classify_solid(cell, 0) {
            Some(lcdplay::Solid::Blank) => "blank",
            Some(lcdplay::Solid::Lit) => "lit",
            None => "glyph",
        };
        *cells.entry(kind).or_insert(0u64) += 1;
    }

    let report = serde_json::json!({
        "bytes": bytes.len(),
        "opcodes": histogram,
        "final_cells": cells,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn opcode_family(op: &lcdplay::Opcode) -> &'static str {
    use lcdplay::{Address, Opcode};
    match op {
        Opcode::ShowSlot(_) => "show_slot",
        Opcode::Nop => "nop",
        Opcode::Clear | Opcode::HideCursor | Opcode::EntryIncrement => "init",
        Opcode::Blank | Opcode::Lit => "solid",
        Opcode::PatternRow(_) => "pattern_row",
        Opcode::SetAddress(Address::Cell(_)) => "set_cell",
        Opcode::SetAddress(Address::Pattern { .. }) => "set_pattern",
    }
}
