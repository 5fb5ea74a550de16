use thiserror::Error;

/// Main error type for Lexigraph
#[derive(Error, Debug)]
pub enum LexigraphError {
    /// File system I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Snapshot/cache serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Entity not present in the graph
    #[error("Entity not found: {0}")]
    EntityNotFound(String),

    /// Relation endpoint could not be resolved (strict mode only)
    #[error("Unresolved relation endpoint: {0}")]
    UnresolvedEndpoint(String),

    /// Extraction errors from a pluggable extractor
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Convenient Result type using LexigraphError
pub type Result<T> = std::result::Result<T, LexigraphError>;
