//! Error types for APDU operations

use crate::response::StatusWord;

/// Error type for APDU command construction, parsing and transport
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Command serialization would be invalid (wrong length fields)
    #[error("invalid command length: {0}")]
    InvalidCommandLength(usize),

    /// A response shorter than the 2-byte status trailer
    #[error("response too short: {0} bytes")]
    ResponseTooShort(usize),

    /// The card returned an unexpected status word
    #[error("unexpected status word {0}")]
    UnexpectedStatus(StatusWord),

    /// The underlying transport failed
    #[error("transport error: {0}")]
    Transport(String),

    /// The card link is not connected or was lost
    #[error("card not connected")]
    NotConnected,
}

impl Error {
    /// Construct a transport error from any displayable cause
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }
}
