//! Error types for Dhara

use crate::core::types::FilterId;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Dhara error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Datagram could not be decoded into a reading
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    /// Filter rule rejected at the boundary (syntax or value)
    #[error("Invalid rule: {0}")]
    InvalidRule(String),

    /// Operation referenced a filter that is not (or no longer) registered
    #[error("Filter not found: {0}")]
    NotFound(FilterId),

    /// Socket bind or send failure
    #[error("Network unavailable ({addr}): {source}")]
    NetworkUnavailable {
        /// Address the operation was attempted on
        addr: String,
        /// Underlying socket error
        #[source]
        source: std::io::Error,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed
    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Encoding an outbound message failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic error with message
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Build a `NetworkUnavailable` error for `addr`.
    pub fn network(addr: impl Into<String>, source: std::io::Error) -> Self {
        Error::NetworkUnavailable {
            addr: addr.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
