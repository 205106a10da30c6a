//! Agent context: one eUICC, one eIM, one poll loop
//!
//! The context owns the card interface (real or emulated, chosen once at
//! construction), the eIM client and the small amount of state that must
//! survive restarts. A poll cycle delivers anything left over from the
//! previous cycle, flushes pending notifications, then asks the eIM for
//! work and runs whatever it hands back.

use rasn::types::{Any, OctetString};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::asn1::esipa::{
    GetEimPackageResponseData, ProfileDownloadTriggerResult, ProvideEimPackageResult,
    ProvideEimPackageResultData,
};
use crate::config::IpaConfig;
use crate::emulation::{EmulationState, IotEmulatedEuicc};
use crate::error::{Error, FailureOrigin, Result};
use crate::es10x::Es10xTransport;
use crate::esipa::EsipaClient;
use crate::euicc::{EuiccInterface, RealEuicc};
use crate::message;
use crate::message::esipa::EimPackageErrorCode;
use crate::procedure::{download, notification, package, retrieval};
use ipa_apdu_core::CardTransport;

/// Bumped whenever the persisted layout changes; a mismatch starts fresh
const STATE_VERSION: u32 = 1;

/// State surviving agent restarts, serialized by the embedding process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    pub version: u32,
    /// Host-kept SGP.32 state when running in emulation
    pub emulation: Option<EmulationState>,
    /// Encoded ProvideEimPackageResult whose delivery has not yet been
    /// acknowledged by the eIM
    pub pending_result: Option<Vec<u8>>,
}

impl PersistedState {
    pub fn new() -> Self {
        Self {
            version: STATE_VERSION,
            ..Self::default()
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a state blob; anything unreadable or from another layout
    /// version resets to a fresh state rather than failing startup
    pub fn from_json(json: &str) -> Self {
        match serde_json::from_str::<Self>(json) {
            Ok(state) if state.version == STATE_VERSION => state,
            Ok(state) => {
                warn!(found = state.version, "state layout changed, starting fresh");
                Self::new()
            }
            Err(e) => {
                warn!(error = %e, "unreadable state blob, starting fresh");
                Self::new()
            }
        }
    }
}

/// What a poll cycle amounted to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// Work was performed; more may be queued, poll again soon
    ActionTaken,
    /// The eIM had nothing pending
    Idle,
    /// A profile switch just took effect; connectivity is about to drop,
    /// poll again once the device is back online
    AwaitConnectivity,
    /// Fatal failure, attributed to the collaborator that produced it
    Failed(FailureOrigin),
}

pub struct IpaContext {
    config: IpaConfig,
    eim: EsipaClient,
    euicc: Box<dyn EuiccInterface>,
    eid: OctetString,
    pending_result: Option<Vec<u8>>,
}

impl std::fmt::Debug for IpaContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpaContext")
            .field("eim", &self.eim)
            .field("eid", &hex::encode_upper(&self.eid))
            .field("pending_result", &self.pending_result.is_some())
            .finish_non_exhaustive()
    }
}

impl IpaContext {
    /// Open the ISD-R over the given card transport and bind to the eIM
    pub fn new<T: CardTransport + 'static>(
        transport: T,
        config: IpaConfig,
        state: PersistedState,
    ) -> Result<Self> {
        let mut es10x = Es10xTransport::new(transport, config.logical_channel);
        match &config.isdr_aid {
            Some(aid) => es10x.open_with_aid(aid)?,
            None => es10x.open()?,
        }

        let real = RealEuicc::new(es10x);
        let mut euicc: Box<dyn EuiccInterface> = if config.emulate_iot_euicc {
            Box::new(IotEmulatedEuicc::new(
                real,
                state.emulation.unwrap_or_default(),
            )?)
        } else {
            Box::new(real)
        };
        let eid = euicc.get_eid()?;
        info!(eid = %hex::encode_upper(&eid), "eUICC ready");

        let eim = EsipaClient::new(&config)?;
        Ok(Self {
            config,
            eim,
            euicc,
            eid,
            pending_result: state.pending_result,
        })
    }

    pub fn eid(&self) -> &OctetString {
        &self.eid
    }

    /// Snapshot for persistence, taken after each poll cycle
    pub fn state(&self) -> PersistedState {
        PersistedState {
            version: STATE_VERSION,
            emulation: self.euicc.export_emulation_state(),
            pending_result: self.pending_result.clone(),
        }
    }

    /// One poll cycle against the eIM
    pub fn poll(&mut self) -> PollOutcome {
        match self.poll_once() {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "poll cycle failed");
                PollOutcome::Failed(e.origin())
            }
        }
    }

    fn poll_once(&mut self) -> Result<PollOutcome> {
        let mut acted = false;

        // A result from an earlier cycle takes precedence over new work
        if let Some(bytes) = self.pending_result.clone() {
            let wrapper: ProvideEimPackageResult = message::decode(
                "ProvideEimPackageResult",
                &bytes,
                &[0xBF, 0x50],
                FailureOrigin::Internal,
            )?;
            package::deliver_result(self.euicc.as_mut(), &self.eim, wrapper.0)?;
            self.pending_result = None;
            acted = true;
        }

        if notification::process_pending(self.euicc.as_mut(), &self.eim)? > 0 {
            acted = true;
        }

        let Some(work) = retrieval::fetch_eim_package(&self.eim, &self.eid)? else {
            return Ok(if acted {
                PollOutcome::ActionTaken
            } else {
                PollOutcome::Idle
            });
        };
        match work {
            GetEimPackageResponseData::EuiccPackage(request) => {
                let execution = package::execute_package(self.euicc.as_mut(), &request)?;
                // Stash the result first: the package must not run twice
                // when delivery fails mid-way
                self.stash_result(&execution.response)?;
                package::deliver_result(self.euicc.as_mut(), &self.eim, execution.response)?;
                self.pending_result = None;
                if execution.profile_changed {
                    return Ok(PollOutcome::AwaitConnectivity);
                }
            }
            GetEimPackageResponseData::IpaEuiccData(request) => {
                let data =
                    retrieval::collect_euicc_data(self.euicc.as_mut(), &self.config, &request)?;
                package::deliver_result(
                    self.euicc.as_mut(),
                    &self.eim,
                    ProvideEimPackageResultData::IpaEuiccData(data),
                )?;
            }
            GetEimPackageResponseData::ProfileDownloadTrigger(trigger) => {
                match retrieval::activation_code_from_trigger(&trigger) {
                    Ok(code) => {
                        let downloaded = download::download_profile(
                            self.euicc.as_mut(),
                            &self.eim,
                            &self.config,
                            &code,
                        )?;
                        package::deliver_result(
                            self.euicc.as_mut(),
                            &self.eim,
                            ProvideEimPackageResultData::ProfileDownloadTriggerResult(
                                ProfileDownloadTriggerResult {
                                    eim_transaction_id: trigger.eim_transaction_id.clone(),
                                    profile_installation_result: Some(Any::new(
                                        downloaded.result_bytes.to_vec(),
                                    )),
                                },
                            ),
                        )?;
                    }
                    Err(e @ (Error::UnsupportedDownloadData | Error::ActivationCode(_))) => {
                        warn!(error = %e, "download trigger not actionable");
                        package::deliver_result(
                            self.euicc.as_mut(),
                            &self.eim,
                            ProvideEimPackageResultData::EimPackageError(
                                EimPackageErrorCode::Undefined.code(),
                            ),
                        )?;
                    }
                    Err(e) => return Err(e),
                }
            }
            // Error codes are turned into None or Err by fetch_eim_package
            GetEimPackageResponseData::Error(code) => {
                return Err(Error::EimError {
                    function: "GetEimPackage",
                    code,
                });
            }
        }
        Ok(PollOutcome::ActionTaken)
    }

    /// Download and install a profile from an activation code, outside any
    /// eIM-triggered flow. The installation result is still reported to
    /// the eIM over HandleNotification.
    pub fn download_profile(&mut self, code: &crate::activation_code::ActivationCode) -> Result<()> {
        download::download_profile(self.euicc.as_mut(), &self.eim, &self.config, code)?;
        Ok(())
    }

    /// Forward pending notifications without asking the eIM for work
    pub fn process_notifications(&mut self) -> Result<usize> {
        notification::process_pending(self.euicc.as_mut(), &self.eim)
    }

    fn stash_result(&mut self, response: &ProvideEimPackageResultData) -> Result<()> {
        let wrapper = ProvideEimPackageResult(response.clone());
        self.pending_result = Some(message::encode("ProvideEimPackageResult", &wrapper)?);
        Ok(())
    }

    /// Close the logical channel to the ISD-R
    pub fn close(&mut self) -> Result<()> {
        self.euicc.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_round_trips_through_json() {
        let mut state = PersistedState::new();
        state.pending_result = Some(vec![0xBF, 0x50, 0x00]);
        let json = state.to_json().unwrap();
        assert_eq!(PersistedState::from_json(&json), state);
    }

    #[test]
    fn foreign_state_version_starts_fresh() {
        let json = r#"{"version":99,"emulation":null,"pending_result":[1,2,3]}"#;
        let state = PersistedState::from_json(json);
        assert_eq!(state, PersistedState::new());
        assert_eq!(state.version, STATE_VERSION);
    }

    #[test]
    fn garbage_state_starts_fresh() {
        assert_eq!(PersistedState::from_json("not json"), PersistedState::new());
    }
}
