use crate::foundation::core::CELL_PIXELS;
use crate::frame::CellPattern;

/// A cell close enough to uniform to be drawn with a built-in literal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Solid {
    Blank,
    Lit,
}

impl Solid {
    pub fn pattern(self) -> CellPattern {
        match self {
            Self::Blank => CellPattern::BLANK,
            Self::Lit => CellPattern::LIT,
        }
    }
}

pub fn popcount(a: CellPattern) -> u32 {
    a.bits().count_ones()
}

/// Number of differing pixels between two cells.
pub fn delta(a: CellPattern, b: CellPattern) -> u32 {
    (a.bits() ^ b.bits()).count_ones()
}

/// `Blank` if at most `tolerance` pixels are lit, `Lit` if at most `tolerance`
/// are dark, otherwise no verdict.
pub fn classify_solid(a: CellPattern, tolerance: u32) -> Option<Solid> {
    let n = popcount(a);
    if n <= tolerance {
        Some(Solid::Blank)
    } else if n >= CELL_PIXELS.saturating_sub(tolerance) {
        Some(Solid::Lit)
    } else {
        None
    }
}
