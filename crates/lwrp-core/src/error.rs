//! Error types for LWRP core

use thiserror::Error;

/// Result type alias for LWRP core operations
pub type Result<T> = std::result::Result<T, Error>;

/// LWRP core error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Stream number outside 0..=65535, or base + offset overflowed
    #[error("stream number out of range: {0}")]
    StreamNumOutOfRange(i64),

    /// Second octet does not identify a known stream format
    #[error("unknown stream format for address {0}")]
    UnknownFormat(String),

    /// Text is not a dotted-quad IPv4 address
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// Source text is neither a stream number nor a SIP descriptor
    #[error("invalid stream number: {0}")]
    InvalidStreamNum(String),

    /// Source text was empty
    #[error("empty source")]
    EmptySource,

    /// Unknown stream format name
    #[error("unknown stream format name: {0}")]
    UnknownFormatName(String),

    /// A protocol line could not be parsed
    #[error("malformed line: {reason}: {line:?}")]
    MalformedLine { line: String, reason: String },

    /// Outbound command contains characters outside Latin-1
    #[error("command is not latin-1 encodable: {0:?}")]
    NotLatin1(String),
}

impl Error {
    pub(crate) fn malformed(line: &str, reason: impl Into<String>) -> Self {
        Error::MalformedLine {
            line: line.to_string(),
            reason: reason.into(),
        }
    }
}
