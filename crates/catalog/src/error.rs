//! Catalog error types (thiserror-based).

use thiserror::Error;

/// Errors raised while loading a game's sample manifest.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The altsound directory for the game does not exist.
    #[error("AltSound directory not found: {path}")]
    DirectoryNotFound { path: String },

    /// The sample manifest file is missing.
    #[error("Sample manifest not found: {path}")]
    ManifestNotFound { path: String },

    /// A manifest or behavior file line could not be parsed.
    #[error("Parse error in {file} line {line}: {reason}")]
    Parse {
        file: String,
        line: usize,
        reason: String,
    },

    /// IO error while reading manifest files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for catalog operations.
pub type CatalogResult<T> = Result<T, CatalogError>;
