//! PC/SC transport implementation for the IPA agent
//!
//! Wraps the system PC/SC stack behind the [`CardTransport`] trait from
//! `ipa-apdu-core`. The agent uses a single connected card for its whole
//! lifetime; reader events and hotplug handling are out of scope.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

mod config;

use std::ffi::CString;

use ipa_apdu_core::{Bytes, CardTransport, Error as CoreError};
use pcsc::{Card, Context, Disposition, Scope};
use tracing::{debug, trace};

pub use config::{ConnectStrategy, PcscConfig, ShareMode};

/// Error type for PC/SC transport operations
#[derive(Debug, thiserror::Error)]
pub enum PcscError {
    /// Underlying PC/SC error
    #[error("PC/SC error: {0}")]
    Pcsc(#[from] pcsc::Error),

    /// No reader matched the connect strategy
    #[error("no matching reader with a card present")]
    NoReaderFound,

    /// Reader name was not valid
    #[error("invalid reader name")]
    InvalidReaderName,
}

/// PC/SC implementation of [`CardTransport`]
pub struct PcscTransport {
    card: Card,
    config: PcscConfig,
    atr: Vec<u8>,
}

impl std::fmt::Debug for PcscTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcscTransport")
            .field("config", &self.config)
            .field("atr", &hex::encode_upper(&self.atr))
            .finish()
    }
}

impl PcscTransport {
    /// Establish a PC/SC context and connect per the configured strategy
    pub fn connect(config: PcscConfig) -> Result<Self, PcscError> {
        let context = Context::establish(Scope::User)?;

        let mut readers_buf = [0u8; 4096];
        let reader = match &config.strategy {
            ConnectStrategy::Reader(name) => {
                CString::new(name.as_str()).map_err(|_| PcscError::InvalidReaderName)?
            }
            ConnectStrategy::AnyCard => {
                let mut found = None;
                for reader in context.list_readers(&mut readers_buf)? {
                    // Probing by connecting: a reader without a card fails fast
                    match context.connect(reader, config.share_mode.into(), config.protocols) {
                        Ok(card) => {
                            drop(card);
                            found = Some(reader.to_owned());
                            break;
                        }
                        Err(e) => trace!(reader = ?reader, error = %e, "skipping reader"),
                    }
                }
                found.ok_or(PcscError::NoReaderFound)?
            }
        };

        debug!(reader = ?reader, "connecting to PC/SC reader");
        let card = context.connect(&reader, config.share_mode.into(), config.protocols)?;

        let atr = {
            let status = card.status2_owned()?;
            status.atr().to_vec()
        };
        debug!(atr = %hex::encode_upper(&atr), "card connected");

        Ok(Self { card, config, atr })
    }

    /// Answer To Reset of the connected card
    pub fn atr(&self) -> &[u8] {
        &self.atr
    }

    /// Disconnect, leaving the card in the reader
    pub fn disconnect(self) -> Result<(), PcscError> {
        self.card
            .disconnect(Disposition::LeaveCard)
            .map_err(|(_, e)| PcscError::Pcsc(e))
    }
}

impl CardTransport for PcscTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, CoreError> {
        trace!(apdu = %hex::encode_upper(command), "pcsc transmit");
        let mut response_buf = [0u8; pcsc::MAX_BUFFER_SIZE];
        let response = self
            .card
            .transmit(command, &mut response_buf)
            .map_err(CoreError::transport)?;
        trace!(response = %hex::encode_upper(response), "pcsc response");
        Ok(Bytes::copy_from_slice(response))
    }

    fn reset(&mut self) -> Result<(), CoreError> {
        self.card
            .reconnect(
                self.config.share_mode.into(),
                self.config.protocols,
                Disposition::ResetCard,
            )
            .map_err(CoreError::transport)
    }
}
