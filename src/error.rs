//! Error types for SetuLink

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// SetuLink error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UDP port bind failure
    #[error("Failed to bind UDP port {port}: {source}")]
    Bind {
        /// Local port that could not be bound
        port: u16,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Remote address could not be resolved
    #[error("Unresolvable remote address: {0}")]
    InvalidAddress(String),

    /// Configuration parse error
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Configuration serialize error
    #[error("Configuration serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    /// Operation requires a running engine
    #[error("Engine is not running")]
    NotRunning,

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}
