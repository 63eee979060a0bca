//! Configuration error types

/// Invalid or unreadable configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A page size of zero was requested.
    #[error("Page size must be at least 1")]
    ZeroPageSize,

    /// A required setting was not provided.
    #[error("Missing setting: {0}")]
    Missing(&'static str),

    /// No RPC function is configured for the requested reference kind.
    #[error("No function configured for reference '{0}'")]
    UnknownReference(String),

    /// No view schema is configured for the requested table.
    #[error("No view configured for table '{0}'")]
    UnknownView(String),

    /// The configuration file could not be read.
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid JSON for the expected shape.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}
