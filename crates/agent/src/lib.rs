//! GSMA SGP.32 IoT Profile Assistant (IPAe/IPAd host side).
//!
//! The agent mediates between an eIM reached over HTTP (ESipa) and a local
//! eUICC reached over an ISO 7816 card transport (ES10x). [`IpaContext`]
//! ties the two together: construct it over any [`CardTransport`], then
//! call [`IpaContext::poll`] on whatever schedule the device allows.
//!
//! Consumer eUICCs without SGP.32 support can be driven through
//! [`emulation::IotEmulatedEuicc`], which keeps the eIM association state
//! on the host and maps eUICC packages onto SGP.22 functions.
//!
//! [`CardTransport`]: ipa_apdu_core::CardTransport

pub mod asn1;
pub mod emulation;
pub mod message;
pub mod procedure;

mod activation_code;
mod bpp;
mod cert;
mod config;
mod context;
mod error;
mod es10x;
mod esipa;
mod euicc;
mod util;

pub use activation_code::{ActivationCode, ActivationCodeError};
pub use config::{EimScheme, IpaConfig};
pub use context::{IpaContext, PersistedState, PollOutcome};
pub use error::{Error, FailureOrigin, Result};
pub use es10x::{Es10xTransport, DEFAULT_RESPONSE_CAPACITY};
pub use esipa::{EimLink, EsipaClient};
pub use euicc::{EuiccInterface, RawOutcome, RealEuicc};
pub use message::es10x::ISDR_AID;
pub use message::Outcome;
