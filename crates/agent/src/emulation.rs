//! IoT eUICC emulation over a consumer eUICC
//!
//! A consumer (SGP.22-only) eUICC does not implement the SGP.32 functions:
//! eUICC package execution, eIM configuration storage, rollback and
//! device-default enabling. This layer keeps that state on the host and
//! maps package operations onto the ES10c primitives the card does have,
//! so the procedures see one uniform [`EuiccInterface`].
//!
//! Package results produced here carry an empty eUICC signature: the host
//! has no eUICC key to sign with, and an eIM operating an emulated fleet
//! is expected to accept unsigned results.

use bytes::Bytes;
use rasn::types::{Any, BitString, OctetString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::asn1::es10x::{
    profile_state, AddInitialEimOk, AuthenticateResponseOk, AuthenticateServerRequest,
    CancelSessionResponseOk, Eco, EimIdList, EuiccPackage, EuiccPackageRequest, EuiccPackageResult,
    EuiccPackageResultData, EuiccPackageResultDataSigned, EuiccPackageResultSigned,
    EuiccProfileInfoList, EuiccResultData, NotificationSearchCriteria, PrepareDownloadRequest,
    PrepareDownloadResponseOk, ProfileInfo, Psmo,
};
use crate::asn1::{EimConfigurationData, ProfileIdentifier};
use crate::error::{FailureOrigin, Result};
use crate::euicc::{EuiccInterface, RawOutcome, RealEuicc};
use crate::message::es10x::{
    op_result, AddInitialEimErrorCode, AuthenticateErrorCode, CancelSessionErrorCode,
    EuiccPackageErrorCode, NotificationsErrorCode, PrepareDownloadErrorCode,
    ProfileInfoListErrorCode,
};
use crate::message::{self, Outcome};
use ipa_apdu_core::CardTransport;

/// Result code when the addressed eIM entry already exists
const EIM_ALREADY_EXISTS: u8 = 1;
/// Result code when the addressed eIM entry is missing
const EIM_NOT_FOUND: u8 = 1;
/// Result code when no profile is available for the requested transition
const PROFILE_NOT_AVAILABLE: u8 = 1;

/// One host-kept eIM configuration entry.
///
/// Mirrors [`EimConfigurationData`] with owned, serializable fields so the
/// store survives agent restarts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredEim {
    pub eim_id: String,
    pub eim_fqdn: Option<String>,
    pub eim_id_type: Option<u8>,
    pub counter_value: u32,
    pub association_token: Option<i64>,
    pub eim_public_key_data: Option<Vec<u8>>,
    pub eim_supported_protocol: Option<Vec<bool>>,
    pub euicc_ci_pk_id: Option<Vec<u8>>,
}

impl StoredEim {
    fn from_configuration(data: &EimConfigurationData) -> Self {
        Self {
            eim_id: data.eim_id.clone(),
            eim_fqdn: data.eim_fqdn.clone(),
            eim_id_type: data.eim_id_type,
            counter_value: data.counter_value.unwrap_or(0),
            association_token: data.association_token,
            eim_public_key_data: data
                .eim_public_key_data
                .as_ref()
                .map(|any| any.as_bytes().to_vec()),
            eim_supported_protocol: data
                .eim_supported_protocol
                .as_ref()
                .map(|bits| bits.iter().map(|b| *b).collect()),
            euicc_ci_pk_id: data.euicc_ci_pk_id.as_ref().map(|id| id.to_vec()),
        }
    }

    fn to_configuration(&self) -> EimConfigurationData {
        EimConfigurationData {
            eim_id: self.eim_id.clone(),
            eim_fqdn: self.eim_fqdn.clone(),
            eim_id_type: self.eim_id_type,
            counter_value: Some(self.counter_value),
            association_token: self.association_token,
            eim_public_key_data: self
                .eim_public_key_data
                .as_ref()
                .map(|bytes| Any::new(bytes.clone())),
            eim_supported_protocol: self
                .eim_supported_protocol
                .as_ref()
                .map(|bits| bits.iter().copied().collect::<BitString>()),
            euicc_ci_pk_id: self
                .euicc_ci_pk_id
                .as_ref()
                .map(|id| OctetString::copy_from_slice(id)),
        }
    }

    /// Field-wise update from an updateEim operation.
    ///
    /// Counter handling: an explicit counterValue in the update wins;
    /// otherwise new key material resets the replay counter to zero;
    /// otherwise the counter is left untouched.
    fn apply_update(&mut self, update: &EimConfigurationData) {
        if let Some(fqdn) = &update.eim_fqdn {
            self.eim_fqdn = Some(fqdn.clone());
        }
        if let Some(id_type) = update.eim_id_type {
            self.eim_id_type = Some(id_type);
        }
        if let Some(token) = update.association_token {
            self.association_token = Some(token);
        }
        if let Some(protocol) = &update.eim_supported_protocol {
            self.eim_supported_protocol = Some(protocol.iter().map(|b| *b).collect());
        }
        if let Some(ci_pk_id) = &update.euicc_ci_pk_id {
            self.euicc_ci_pk_id = Some(ci_pk_id.to_vec());
        }
        if let Some(key) = &update.eim_public_key_data {
            self.eim_public_key_data = Some(key.as_bytes().to_vec());
        }
        if let Some(counter) = update.counter_value {
            self.counter_value = counter;
        } else if update.eim_public_key_data.is_some() {
            self.counter_value = 0;
        }
    }
}

/// Host-kept SGP.32 state of the emulated eUICC
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmulationState {
    pub eims: Vec<StoredEim>,
    /// Sequence number for the next emitted package result
    pub next_seq_number: u32,
    /// ICCID of the profile to restore on rollback, recorded when an
    /// enable operation carried the rollback flag
    pub rollback_iccid: Option<Vec<u8>>,
}

impl EmulationState {
    fn find_eim(&mut self, eim_id: &str) -> Option<&mut StoredEim> {
        self.eims.iter_mut().find(|eim| eim.eim_id == eim_id)
    }
}

/// [`EuiccInterface`] over a consumer eUICC plus host-kept SGP.32 state
#[derive(Debug)]
pub struct IotEmulatedEuicc<T: CardTransport> {
    real: RealEuicc<T>,
    eid: OctetString,
    state: EmulationState,
}

impl<T: CardTransport> IotEmulatedEuicc<T> {
    /// Wrap a real eUICC, reading its EID once for package addressing
    pub fn new(mut real: RealEuicc<T>, state: EmulationState) -> Result<Self> {
        let eid = real.get_eid()?;
        Ok(Self { real, eid, state })
    }

    fn enabled_iccid(&mut self) -> Result<Option<OctetString>> {
        let profiles = match self.real.profile_info_list(None)? {
            Outcome::Ok(profiles) => profiles,
            Outcome::Error(code) => {
                warn!(%code, "profile list unavailable");
                return Ok(None);
            }
        };
        Ok(profiles
            .into_iter()
            .find(|p| p.profile_state == Some(profile_state::ENABLED))
            .and_then(|p| p.iccid))
    }

    fn execute_psmo(&mut self, operation: &Psmo) -> Result<EuiccResultData> {
        Ok(match operation {
            Psmo::Enable(enable) => {
                if enable.rollback_flag.is_some() {
                    self.state.rollback_iccid =
                        self.enabled_iccid()?.map(|iccid| iccid.to_vec());
                }
                let code = self
                    .real
                    .enable_profile(ProfileIdentifier::Iccid(enable.iccid.clone()), false)?;
                EuiccResultData::Enable(code)
            }
            Psmo::Disable(disable) => {
                let code = self
                    .real
                    .disable_profile(ProfileIdentifier::Iccid(disable.iccid.clone()), false)?;
                EuiccResultData::Disable(code)
            }
            Psmo::Delete(delete) => {
                let code = self
                    .real
                    .delete_profile(ProfileIdentifier::Iccid(delete.iccid.clone()))?;
                EuiccResultData::Delete(code)
            }
            Psmo::ListProfileInfo(params) => {
                let profiles = match self.real.profile_info_list(params.tag_list.clone())? {
                    Outcome::Ok(profiles) => profiles,
                    Outcome::Error(code) => {
                        warn!(%code, "profile listing inside package failed");
                        Vec::new()
                    }
                };
                EuiccResultData::ListProfileInfo(EuiccProfileInfoList { profiles })
            }
        })
    }

    fn execute_eco(&mut self, operation: &Eco) -> EuiccResultData {
        match operation {
            Eco::AddEim(data) => {
                if self.state.find_eim(&data.eim_id).is_some() {
                    EuiccResultData::AddEim(EIM_ALREADY_EXISTS)
                } else {
                    self.state.eims.push(StoredEim::from_configuration(data));
                    EuiccResultData::AddEim(op_result::OK)
                }
            }
            Eco::DeleteEim(delete) => {
                let before = self.state.eims.len();
                self.state.eims.retain(|eim| eim.eim_id != delete.eim_id);
                if self.state.eims.len() == before {
                    EuiccResultData::DeleteEim(EIM_NOT_FOUND)
                } else {
                    EuiccResultData::DeleteEim(op_result::OK)
                }
            }
            Eco::UpdateEim(update) => match self.state.find_eim(&update.eim_id) {
                Some(stored) => {
                    stored.apply_update(update);
                    EuiccResultData::UpdateEim(op_result::OK)
                }
                None => EuiccResultData::UpdateEim(EIM_NOT_FOUND),
            },
            Eco::ListEim(_) => EuiccResultData::ListEim(EimIdList {
                eim_ids: self.state.eims.iter().map(|eim| eim.eim_id.clone()).collect(),
            }),
        }
    }

    fn package_error(
        &self,
        code: EuiccPackageErrorCode,
    ) -> Result<RawOutcome<EuiccPackageResultSigned, EuiccPackageErrorCode>> {
        let raw = message::encode(
            "emulated package result",
            &EuiccPackageResult(EuiccPackageResultData::Error(code.code())),
        )?;
        Ok((Bytes::from(raw), Outcome::Error(code)))
    }
}

impl<T: CardTransport> EuiccInterface for IotEmulatedEuicc<T> {
    fn get_euicc_info1(&mut self) -> Result<crate::asn1::EuiccInfo1> {
        self.real.get_euicc_info1()
    }

    fn get_euicc_challenge(&mut self) -> Result<OctetString> {
        self.real.get_euicc_challenge()
    }

    fn get_eid(&mut self) -> Result<OctetString> {
        Ok(self.eid.clone())
    }

    fn authenticate_server(
        &mut self,
        request: &AuthenticateServerRequest,
    ) -> Result<RawOutcome<AuthenticateResponseOk, AuthenticateErrorCode>> {
        self.real.authenticate_server(request)
    }

    fn prepare_download(
        &mut self,
        request: &PrepareDownloadRequest,
    ) -> Result<RawOutcome<PrepareDownloadResponseOk, PrepareDownloadErrorCode>> {
        self.real.prepare_download(request)
    }

    fn cancel_session(
        &mut self,
        transaction_id: &[u8],
        reason: u8,
    ) -> Result<RawOutcome<CancelSessionResponseOk, CancelSessionErrorCode>> {
        self.real.cancel_session(transaction_id, reason)
    }

    fn load_bpp_segment(&mut self, segment: &[u8]) -> Result<Bytes> {
        self.real.load_bpp_segment(segment)
    }

    fn retrieve_notifications(
        &mut self,
        search_criteria: Option<NotificationSearchCriteria>,
    ) -> Result<Outcome<Vec<Any>, NotificationsErrorCode>> {
        self.real.retrieve_notifications(search_criteria)
    }

    fn notification_sent(&mut self, seq_number: u32) -> Result<u8> {
        self.real.notification_sent(seq_number)
    }

    fn profile_info_list(
        &mut self,
        tag_list: Option<OctetString>,
    ) -> Result<Outcome<Vec<ProfileInfo>, ProfileInfoListErrorCode>> {
        self.real.profile_info_list(tag_list)
    }

    fn enable_profile(&mut self, id: ProfileIdentifier, refresh_flag: bool) -> Result<u8> {
        self.real.enable_profile(id, refresh_flag)
    }

    fn disable_profile(&mut self, id: ProfileIdentifier, refresh_flag: bool) -> Result<u8> {
        self.real.disable_profile(id, refresh_flag)
    }

    fn delete_profile(&mut self, id: ProfileIdentifier) -> Result<u8> {
        self.real.delete_profile(id)
    }

    /// Decode and execute an eUICC package on the host.
    ///
    /// The eIM signature cannot be verified without the eUICC's trust
    /// anchors; replay protection rests on the per-eIM counter alone.
    fn load_euicc_package(
        &mut self,
        package: &[u8],
    ) -> Result<RawOutcome<EuiccPackageResultSigned, EuiccPackageErrorCode>> {
        let request: EuiccPackageRequest = message::decode(
            "euicc package request",
            package,
            &[0xBF, 0x51],
            FailureOrigin::Http,
        )?;
        let signed = &request.euicc_package_signed;

        if signed.eid_value != self.eid {
            return self.package_error(EuiccPackageErrorCode::UnassignedEid);
        }
        let Some(index) = self
            .state
            .eims
            .iter()
            .position(|eim| eim.eim_id == signed.eim_id)
        else {
            warn!(eim_id = %signed.eim_id, "package from unconfigured eIM");
            return self.package_error(EuiccPackageErrorCode::InvalidSignature);
        };
        if signed.counter_value <= self.state.eims[index].counter_value {
            return self.package_error(EuiccPackageErrorCode::InvalidCounterValue);
        }
        // Bump the replay counter before executing anything
        self.state.eims[index].counter_value = signed.counter_value;

        let mut results = Vec::new();
        match &signed.euicc_package {
            EuiccPackage::PsmoList(operations) => {
                for operation in operations {
                    results.push(self.execute_psmo(operation)?);
                }
            }
            EuiccPackage::EcoList(operations) => {
                for operation in operations {
                    results.push(self.execute_eco(operation));
                }
            }
        }

        let seq_number = self.state.next_seq_number;
        self.state.next_seq_number += 1;
        debug!(eim_id = %signed.eim_id, seq_number, operations = results.len(), "package executed");

        let result = EuiccPackageResultSigned {
            data_signed: EuiccPackageResultDataSigned {
                eim_id: signed.eim_id.clone(),
                counter_value: signed.counter_value,
                transaction_id: signed.transaction_id.clone(),
                seq_number,
                euicc_result: results,
            },
            euicc_sign_epr: OctetString::new(),
        };
        let raw = message::encode(
            "emulated package result",
            &EuiccPackageResult(EuiccPackageResultData::Signed(result.clone())),
        )?;
        Ok((Bytes::from(raw), Outcome::Ok(result)))
    }

    fn add_initial_eim(
        &mut self,
        data: EimConfigurationData,
    ) -> Result<Outcome<AddInitialEimOk, AddInitialEimErrorCode>> {
        if self.state.find_eim(&data.eim_id).is_some() {
            return Ok(Outcome::Error(
                AddInitialEimErrorCode::AssociatedEimAlreadyExists,
            ));
        }
        let association_token = data.association_token;
        self.state.eims.push(StoredEim::from_configuration(&data));
        Ok(Outcome::Ok(AddInitialEimOk { association_token }))
    }

    fn get_eim_configuration_data(&mut self) -> Result<Vec<EimConfigurationData>> {
        Ok(self.state.eims.iter().map(StoredEim::to_configuration).collect())
    }

    /// Emulated reset: disable and delete every profile, drop all host state
    fn memory_reset(&mut self, _reset_options: BitString) -> Result<u8> {
        let profiles = match self.real.profile_info_list(None)? {
            Outcome::Ok(profiles) => profiles,
            Outcome::Error(code) => {
                warn!(%code, "profile list unavailable during reset");
                return Ok(code.code());
            }
        };
        for profile in profiles {
            let Some(iccid) = profile.iccid else { continue };
            if profile.profile_state == Some(profile_state::ENABLED) {
                self.real
                    .disable_profile(ProfileIdentifier::Iccid(iccid.clone()), false)?;
            }
            self.real.delete_profile(ProfileIdentifier::Iccid(iccid))?;
        }
        self.state = EmulationState::default();
        Ok(op_result::OK)
    }

    fn profile_rollback(&mut self, refresh_flag: bool) -> Result<u8> {
        let Some(iccid) = self.state.rollback_iccid.take() else {
            return Ok(PROFILE_NOT_AVAILABLE);
        };
        self.real.enable_profile(
            ProfileIdentifier::Iccid(OctetString::from(iccid)),
            refresh_flag,
        )
    }

    fn enable_using_dd(&mut self) -> Result<u8> {
        let profiles = match self.real.profile_info_list(None)? {
            Outcome::Ok(profiles) => profiles,
            Outcome::Error(code) => return Ok(code.code()),
        };
        let Some(iccid) = profiles
            .into_iter()
            .find(|p| p.profile_state == Some(profile_state::DISABLED))
            .and_then(|p| p.iccid)
        else {
            return Ok(PROFILE_NOT_AVAILABLE);
        };
        self.real.enable_profile(ProfileIdentifier::Iccid(iccid), false)
    }

    fn export_emulation_state(&self) -> Option<EmulationState> {
        Some(self.state.clone())
    }

    fn close(&mut self) -> Result<()> {
        self.real.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::es10x::{
        DisableProfileResponse, EcoDeleteEim, EcoListEim, EuiccPackageSigned,
        GetEuiccDataResponse, ProfileInfoListResponse, ProfileInfoListResponseData,
    };
    use crate::es10x::Es10xTransport;
    use ipa_apdu_core::MockTransport;
    use rasn::types::Utf8String;

    const EID: [u8; 16] = [0x89; 16];

    fn card_response<T: rasn::Encode>(value: &T) -> Vec<u8> {
        let mut raw = message::encode("test", value).unwrap();
        raw.extend_from_slice(&[0x90, 0x00]);
        raw
    }

    fn stored_eim(eim_id: &str, counter: u32) -> StoredEim {
        StoredEim {
            eim_id: eim_id.into(),
            counter_value: counter,
            ..StoredEim::default()
        }
    }

    fn queue_eid(mock: &mut MockTransport) {
        mock.push_response(card_response(&GetEuiccDataResponse {
            eid_value: OctetString::copy_from_slice(&EID),
        }));
    }

    fn emulated_with_queued(
        mock: &mut MockTransport,
        state: EmulationState,
    ) -> IotEmulatedEuicc<&mut MockTransport> {
        IotEmulatedEuicc::new(RealEuicc::new(Es10xTransport::new(mock, 0)), state).unwrap()
    }

    fn emulated(
        mock: &mut MockTransport,
        state: EmulationState,
    ) -> IotEmulatedEuicc<&mut MockTransport> {
        queue_eid(mock);
        emulated_with_queued(mock, state)
    }

    fn package(eim_id: &str, counter: u32, package: EuiccPackage) -> Vec<u8> {
        message::encode(
            "test",
            &EuiccPackageRequest {
                euicc_package_signed: EuiccPackageSigned {
                    eim_id: Utf8String::from(eim_id),
                    eid_value: OctetString::copy_from_slice(&EID),
                    counter_value: counter,
                    transaction_id: None,
                    euicc_package: package,
                },
                eim_signature: OctetString::new(),
            },
        )
        .unwrap()
    }

    #[test]
    fn replay_counter_must_strictly_increase() {
        let mut mock = MockTransport::new();
        let state = EmulationState {
            eims: vec![stored_eim("eim-1", 5)],
            ..EmulationState::default()
        };
        let mut euicc = emulated(&mut mock, state);

        let replayed = package("eim-1", 5, EuiccPackage::EcoList(vec![Eco::ListEim(EcoListEim {})]));
        let (_, outcome) = euicc.load_euicc_package(&replayed).unwrap();
        assert_eq!(
            outcome,
            Outcome::Error(EuiccPackageErrorCode::InvalidCounterValue)
        );

        let fresh = package("eim-1", 6, EuiccPackage::EcoList(vec![Eco::ListEim(EcoListEim {})]));
        let (raw, outcome) = euicc.load_euicc_package(&fresh).unwrap();
        let Outcome::Ok(result) = outcome else {
            panic!("expected a signed result");
        };
        assert_eq!(result.data_signed.counter_value, 6);
        assert_eq!(result.data_signed.seq_number, 0);
        assert!(result.euicc_sign_epr.is_empty());
        assert_eq!(
            result.data_signed.euicc_result,
            vec![EuiccResultData::ListEim(EimIdList {
                eim_ids: vec!["eim-1".into()],
            })]
        );
        // Raw bytes carry the tagged result envelope
        assert_eq!(&raw[..2], &[0xBF, 0x51]);

        let state = euicc.export_emulation_state().unwrap();
        assert_eq!(state.eims[0].counter_value, 6);
        assert_eq!(state.next_seq_number, 1);
    }

    #[test]
    fn packages_for_another_eid_are_refused() {
        let mut mock = MockTransport::new();
        let state = EmulationState {
            eims: vec![stored_eim("eim-1", 0)],
            ..EmulationState::default()
        };
        let mut euicc = emulated(&mut mock, state);

        let mut foreign = package("eim-1", 1, EuiccPackage::EcoList(vec![]));
        // Flip one EID byte inside the encoded request
        let position = foreign
            .windows(16)
            .position(|w| w == EID)
            .expect("eid present");
        foreign[position] ^= 0xFF;

        let (_, outcome) = euicc.load_euicc_package(&foreign).unwrap();
        assert_eq!(outcome, Outcome::Error(EuiccPackageErrorCode::UnassignedEid));
    }

    #[test]
    fn update_eim_counter_semantics() {
        let mut mock = MockTransport::new();
        let state = EmulationState {
            eims: vec![stored_eim("eim-a", 0), stored_eim("eim-b", 17)],
            ..EmulationState::default()
        };
        let mut euicc = emulated(&mut mock, state);

        let target = |counter: Option<u32>, key: Option<Any>| EimConfigurationData {
            eim_id: "eim-b".into(),
            eim_fqdn: None,
            eim_id_type: None,
            counter_value: counter,
            association_token: None,
            eim_public_key_data: key,
            eim_supported_protocol: None,
            euicc_ci_pk_id: None,
        };
        let updates = EuiccPackage::EcoList(vec![
            // Explicit counter wins
            Eco::UpdateEim(target(Some(42), Some(Any::new(vec![0x04, 0x01, 0xAB])))),
            // New key material without a counter resets it
            Eco::UpdateEim(target(None, Some(Any::new(vec![0x04, 0x01, 0xCD])))),
            // Neither: counter untouched
            Eco::UpdateEim(target(None, None)),
        ]);

        let (_, outcome) = euicc
            .load_euicc_package(&package("eim-a", 1, updates))
            .unwrap();
        let Outcome::Ok(result) = outcome else {
            panic!("expected a signed result");
        };
        assert_eq!(
            result.data_signed.euicc_result,
            vec![
                EuiccResultData::UpdateEim(op_result::OK),
                EuiccResultData::UpdateEim(op_result::OK),
                EuiccResultData::UpdateEim(op_result::OK),
            ]
        );

        let state = euicc.export_emulation_state().unwrap();
        let eim_b = state.eims.iter().find(|e| e.eim_id == "eim-b").unwrap();
        // 42 from the explicit update, then reset to 0 by the key-only
        // update, then left alone
        assert_eq!(eim_b.counter_value, 0);
        assert_eq!(eim_b.eim_public_key_data, Some(vec![0x04, 0x01, 0xCD]));
    }

    #[test]
    fn delete_eim_distinguishes_missing_entries() {
        let mut mock = MockTransport::new();
        let state = EmulationState {
            eims: vec![stored_eim("eim-a", 0), stored_eim("eim-b", 0)],
            ..EmulationState::default()
        };
        let mut euicc = emulated(&mut mock, state);

        let operations = EuiccPackage::EcoList(vec![
            Eco::DeleteEim(EcoDeleteEim { eim_id: "eim-b".into() }),
            Eco::DeleteEim(EcoDeleteEim { eim_id: "eim-x".into() }),
        ]);
        let (_, outcome) = euicc
            .load_euicc_package(&package("eim-a", 1, operations))
            .unwrap();
        let Outcome::Ok(result) = outcome else {
            panic!("expected a signed result");
        };
        assert_eq!(
            result.data_signed.euicc_result,
            vec![
                EuiccResultData::DeleteEim(op_result::OK),
                EuiccResultData::DeleteEim(EIM_NOT_FOUND),
            ]
        );
        assert_eq!(euicc.export_emulation_state().unwrap().eims.len(), 1);
    }

    #[test]
    fn add_initial_eim_rejects_duplicates() {
        let mut mock = MockTransport::new();
        let mut euicc = emulated(&mut mock, EmulationState::default());

        let data = EimConfigurationData {
            eim_id: "eim-1".into(),
            eim_fqdn: Some("eim.example.com".into()),
            eim_id_type: None,
            counter_value: None,
            association_token: Some(7),
            eim_public_key_data: None,
            eim_supported_protocol: None,
            euicc_ci_pk_id: None,
        };
        let outcome = euicc.add_initial_eim(data.clone()).unwrap();
        assert_eq!(
            outcome,
            Outcome::Ok(AddInitialEimOk {
                association_token: Some(7),
            })
        );

        let outcome = euicc.add_initial_eim(data).unwrap();
        assert_eq!(
            outcome,
            Outcome::Error(AddInitialEimErrorCode::AssociatedEimAlreadyExists)
        );
        assert_eq!(euicc.export_emulation_state().unwrap().eims.len(), 1);
    }

    #[test]
    fn memory_reset_wipes_profiles_and_host_state() {
        let enabled = ProfileInfo {
            iccid: Some(OctetString::copy_from_slice(&[0x01; 10])),
            profile_state: Some(profile_state::ENABLED),
            ..ProfileInfo::default()
        };
        let disabled = ProfileInfo {
            iccid: Some(OctetString::copy_from_slice(&[0x02; 10])),
            profile_state: Some(profile_state::DISABLED),
            ..ProfileInfo::default()
        };

        let mut mock = MockTransport::new();
        queue_eid(&mut mock);
        // List, disable the enabled one, delete both
        mock.push_response(card_response(&ProfileInfoListResponse(
            ProfileInfoListResponseData::Ok(vec![enabled, disabled]),
        )));
        mock.push_response(card_response(&DisableProfileResponse { disable_result: 0 }));
        for _ in 0..2 {
            mock.push_response(card_response(&crate::asn1::es10x::DeleteProfileResponse {
                delete_result: 0,
            }));
        }

        let state = EmulationState {
            eims: vec![stored_eim("eim-1", 3)],
            rollback_iccid: Some(vec![0x98; 10]),
            ..EmulationState::default()
        };
        let mut euicc = emulated_with_queued(&mut mock, state);

        let result = euicc.memory_reset(BitString::repeat(true, 2)).unwrap();
        assert_eq!(result, op_result::OK);
        assert_eq!(euicc.export_emulation_state().unwrap(), EmulationState::default());
    }
}
