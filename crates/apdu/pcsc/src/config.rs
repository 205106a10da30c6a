//! Configuration options for the PC/SC transport

use pcsc::{Protocols as PcscProtocols, ShareMode as PcscShareMode};

/// Sharing mode for card connections
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareMode {
    /// Exclusive access to the card
    Exclusive,
    /// Shared access to the card (default)
    Shared,
    /// Direct connection to the reader
    Direct,
}

impl From<ShareMode> for PcscShareMode {
    fn from(mode: ShareMode) -> Self {
        match mode {
            ShareMode::Exclusive => Self::Exclusive,
            ShareMode::Shared => Self::Shared,
            ShareMode::Direct => Self::Direct,
        }
    }
}

/// Strategy for picking a reader to connect to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConnectStrategy {
    /// Connect to a specific reader by name
    Reader(String),
    /// Connect to the first reader reporting a present card
    #[default]
    AnyCard,
}

/// Configuration options for the PC/SC transport
#[derive(Debug, Clone)]
pub struct PcscConfig {
    /// Sharing mode for card connections
    pub share_mode: ShareMode,
    /// Preferred protocols for card communication
    pub protocols: PcscProtocols,
    /// Reader selection strategy
    pub strategy: ConnectStrategy,
}

impl Default for PcscConfig {
    fn default() -> Self {
        Self {
            share_mode: ShareMode::Shared,
            protocols: PcscProtocols::ANY,
            strategy: ConnectStrategy::AnyCard,
        }
    }
}

impl PcscConfig {
    /// Create a new default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sharing mode
    pub const fn with_share_mode(mut self, mode: ShareMode) -> Self {
        self.share_mode = mode;
        self
    }

    /// Set the preferred protocols
    pub const fn with_protocols(mut self, protocols: PcscProtocols) -> Self {
        self.protocols = protocols;
        self
    }

    /// Connect to the named reader instead of scanning for a card
    pub fn with_reader(mut self, name: impl Into<String>) -> Self {
        self.strategy = ConnectStrategy::Reader(name.into());
        self
    }
}
