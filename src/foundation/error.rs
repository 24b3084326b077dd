/// Convenience result type used across lcdplay.
pub type LcdResult<T> = Result<T, LcdError>;

/// Errors raised while loading, encoding, or replaying a program.
#[derive(thiserror::Error, Debug)]
pub enum LcdError {
    /// A device address that maps to neither a cell nor pattern memory.
    #[error("address {address} is outside every addressable range")]
    OutOfRange { address: i32 },

    /// Allocation with every glyph slot bound.
    #[error("glyph slot cache is full")]
    CacheFull,

    /// Eviction with no glyph slot bound.
    #[error("glyph slot cache is empty")]
    CacheEmpty,

    /// A program byte outside the opcode table.
    #[error("byte 0x{byte:02x} is not a valid opcode")]
    Decode { byte: u8 },

    /// Invalid configuration, input data, or opcode placement.
    #[error("validation error: {0}")]
    Validation(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl LcdError {
    /// Build a [`LcdError::OutOfRange`] value.
    pub fn out_of_range(address: impl Into<i32>) -> Self {
        Self::OutOfRange {
            address: address.into(),
        }
    }

    /// Build a [`LcdError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_are_stable() {
        assert!(
            LcdError::validation("x")
                .to_string()
                .contains("validation error:")
        );
        assert!(LcdError::out_of_range(104).to_string().contains("104"));
        assert!(
            LcdError::Decode { byte: 0x1c }
                .to_string()
                .contains("0x1c")
        );
    }

    #[test]
    fn other_preserves_source() {
        let base = std::io::Error::other("boom");
        let err = LcdError::Other(anyhow::Error::new(base));
        assert!(err.to_string().contains("boom"));
    }
}
