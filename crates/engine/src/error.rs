//! Engine error types (thiserror-based).

use thiserror::Error;

use crate::decoder::DecoderError;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Manifest missing or malformed; init fails with no state mutation.
    #[error("Catalog error: {0}")]
    Catalog(#[from] alt_catalog::CatalogError),

    /// A sample file could not be opened or decoded. Local to one
    /// stream; other playback continues.
    #[error("Decoder error: {0}")]
    Decoder(#[from] DecoderError),

    /// The logical command has no catalog entry.
    #[error("Unknown command: {0:#06X}")]
    UnknownCommand(u16),

    /// Operation after shutdown.
    #[error("Engine is shut down")]
    ShutDown,

    /// IO error (worker spawn, file access).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_command_display() {
        let err = EngineError::UnknownCommand(0x7A42);
        assert_eq!(err.to_string(), "Unknown command: 0x7A42");
    }
}
