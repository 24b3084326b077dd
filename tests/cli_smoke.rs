use std::{io::Write as _, path::PathBuf};

use flate2::{Compression, write::GzEncoder};
use lcdplay::{CellPattern, FRAME_BYTES, Grid, Position};

fn exe() -> PathBuf {
    std::env::var_os("CARGO_BIN_EXE_lcdplay")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            let mut p = PathBuf::from("target").join("debug");
            p.push(if cfg!(windows) {
                "lcdplay.exe"
            } else {
                "lcdplay"
            });
            p
        })
}

fn temp_dir(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!(
        "lcdplay_{name}_{}_{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ))
}

fn write_frames_gz(path: &std::path::Path) {
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    for f in 0..8 {
        let mut g = Grid::blank();
        g.write_cell(CellPattern::LIT, Position::new(f).unwrap());
        let texture = if f % 2 == 0 {
            CellPattern([0x1f, 0x1f, 0, 0, 0x1f, 0x1f, 0, 0])
        } else {
            CellPattern([0, 0, 0x1f, 0x1f, 0, 0, 0x1f, 0x1f])
        };
        g.write_cell(texture, Position::new(20).unwrap());
        enc.write_all(g.as_bytes()).unwrap();
    }
    assert_eq!(Grid::blank().as_bytes().len(), FRAME_BYTES);
    std::fs::write(path, enc.finish().unwrap()).unwrap();
}

#[test]
fn cli_encode_then_inspect() {
    let dir = temp_dir("cli_smoke");
    std::fs::create_dir_all(&dir).unwrap();
    let frames = dir.join("frames.gz");
    let out = dir.join("out").join("prog.bin");
    let listing = dir.join("prog.txt");
    write_frames_gz(&frames);

    let output = std::process::Command::new(exe())
        .args(["encode", "--in"])
        .arg(&frames)
        .arg("--out")
        .arg(&out)
        .arg("--listing")
        .arg(&listing)
        .args(["--capacity", "1005", "--slots", "2", "--pad", "--stats"])
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");

    let program = std::fs::read(&out).unwrap();
    assert_eq!(program.len(), 1005);
    let stats: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(stats["frames"], 8);
    assert!(stats["assigns"].as_u64().unwrap() > 0);

    let text = std::fs::read_to_string(&listing).unwrap();
    assert!(text.starts_with("INI +\nCUR +\nEIN +\nCLR +\n"));
    assert!(text.contains("assign 0"));

    let output = std::process::Command::new(exe())
        .args(["inspect", "--in"])
        .arg(&out)
        .output()
        .unwrap();
    assert!(output.status.success(), "{output:?}");
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["bytes"], 1005);
    assert_eq!(report["opcodes"]["init"], 3);

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn cli_rejects_invalid_config() {
    let dir = temp_dir("cli_bad_config");
    std::fs::create_dir_all(&dir).unwrap();
    let frames = dir.join("frames.gz");
    write_frames_gz(&frames);

    let status = std::process::Command::new(exe())
        .args(["encode", "--in"])
        .arg(&frames)
        .arg("--out")
        .arg(dir.join("prog.bin"))
        .args(["--slots", "9"])
        .status()
        .unwrap();
    assert!(!status.success());
    assert!(!dir.join("prog.bin").exists());

    std::fs::remove_dir_all(&dir).ok();
}
