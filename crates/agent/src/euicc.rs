//! Card-side operations behind one interface
//!
//! Procedures drive a `dyn EuiccInterface` and never know whether they are
//! talking to a real SGP.32 eUICC or to the IoT emulation layered over a
//! consumer eUICC; both produce result structures of the same shape. The
//! implementation is chosen once at context construction.

use bytes::Bytes;
use rasn::types::{Any, BitString, OctetString};

use crate::asn1::es10x::{
    AddInitialEimOk, AuthenticateResponseOk, AuthenticateServerRequest, CancelSessionResponseOk,
    EuiccPackageResultSigned, NotificationSearchCriteria, PrepareDownloadRequest,
    PrepareDownloadResponseOk, ProfileInfo,
};
use crate::asn1::{EimConfigurationData, EuiccInfo1, ProfileIdentifier};
use crate::emulation::EmulationState;
use crate::error::Result;
use crate::es10x::Es10xTransport;
use crate::message::es10x::{
    self as adapter, AddInitialEimErrorCode, AuthenticateErrorCode, CancelSessionErrorCode,
    EuiccPackageErrorCode, NotificationsErrorCode, PrepareDownloadErrorCode,
    ProfileInfoListErrorCode,
};
use crate::message::Outcome;
use ipa_apdu_core::CardTransport;

/// Raw response bytes paired with their decoded outcome.
///
/// Several responses are forwarded to the eIM verbatim because they carry
/// eUICC signatures; the decoded view is for local decisions only.
pub type RawOutcome<T, E> = (Bytes, Outcome<T, E>);

/// Card-side operations used by the procedures
pub trait EuiccInterface {
    fn get_euicc_info1(&mut self) -> Result<EuiccInfo1>;
    fn get_euicc_challenge(&mut self) -> Result<OctetString>;
    fn get_eid(&mut self) -> Result<OctetString>;

    fn authenticate_server(
        &mut self,
        request: &AuthenticateServerRequest,
    ) -> Result<RawOutcome<AuthenticateResponseOk, AuthenticateErrorCode>>;
    fn prepare_download(
        &mut self,
        request: &PrepareDownloadRequest,
    ) -> Result<RawOutcome<PrepareDownloadResponseOk, PrepareDownloadErrorCode>>;
    fn cancel_session(
        &mut self,
        transaction_id: &[u8],
        reason: u8,
    ) -> Result<RawOutcome<CancelSessionResponseOk, CancelSessionErrorCode>>;

    /// Raw STORE DATA of one bound-profile-package segment; the response is
    /// empty except for the final segment's ProfileInstallationResult
    fn load_bpp_segment(&mut self, segment: &[u8]) -> Result<Bytes>;

    fn retrieve_notifications(
        &mut self,
        search_criteria: Option<NotificationSearchCriteria>,
    ) -> Result<Outcome<Vec<Any>, NotificationsErrorCode>>;
    fn notification_sent(&mut self, seq_number: u32) -> Result<u8>;

    fn profile_info_list(
        &mut self,
        tag_list: Option<OctetString>,
    ) -> Result<Outcome<Vec<ProfileInfo>, ProfileInfoListErrorCode>>;
    fn enable_profile(&mut self, id: ProfileIdentifier, refresh_flag: bool) -> Result<u8>;
    fn disable_profile(&mut self, id: ProfileIdentifier, refresh_flag: bool) -> Result<u8>;
    fn delete_profile(&mut self, id: ProfileIdentifier) -> Result<u8>;

    /// Execute a signed eUICC package, received from the eIM verbatim
    fn load_euicc_package(
        &mut self,
        package: &[u8],
    ) -> Result<RawOutcome<EuiccPackageResultSigned, EuiccPackageErrorCode>>;
    fn add_initial_eim(
        &mut self,
        data: EimConfigurationData,
    ) -> Result<Outcome<AddInitialEimOk, AddInitialEimErrorCode>>;
    fn get_eim_configuration_data(&mut self) -> Result<Vec<EimConfigurationData>>;
    fn memory_reset(&mut self, reset_options: BitString) -> Result<u8>;
    fn profile_rollback(&mut self, refresh_flag: bool) -> Result<u8>;
    fn enable_using_dd(&mut self) -> Result<u8>;

    /// Serializable IoT-emulation state, `None` on a real eUICC
    fn export_emulation_state(&self) -> Option<EmulationState> {
        None
    }

    fn close(&mut self) -> Result<()>;
}

/// Direct SGP.32 eUICC over the ES10x block transport
#[derive(Debug)]
pub struct RealEuicc<T: CardTransport> {
    transport: Es10xTransport<T>,
}

impl<T: CardTransport> RealEuicc<T> {
    /// Take ownership of an already opened transport
    pub fn new(transport: Es10xTransport<T>) -> Self {
        Self { transport }
    }

    pub(crate) fn transport_mut(&mut self) -> &mut Es10xTransport<T> {
        &mut self.transport
    }
}

impl<T: CardTransport> EuiccInterface for RealEuicc<T> {
    fn get_euicc_info1(&mut self) -> Result<EuiccInfo1> {
        let request = adapter::encode_get_euicc_info1()?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_euicc_info1(&response)
    }

    fn get_euicc_challenge(&mut self) -> Result<OctetString> {
        let request = adapter::encode_get_euicc_challenge()?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_euicc_challenge(&response)
    }

    fn get_eid(&mut self) -> Result<OctetString> {
        let request = adapter::encode_get_eid()?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_eid(&response)
    }

    fn authenticate_server(
        &mut self,
        request: &AuthenticateServerRequest,
    ) -> Result<RawOutcome<AuthenticateResponseOk, AuthenticateErrorCode>> {
        let encoded = adapter::encode_authenticate_server(request)?;
        let response = self.transport.transceive(&encoded)?;
        let outcome = adapter::decode_authenticate_server(&response)?;
        Ok((response, outcome))
    }

    fn prepare_download(
        &mut self,
        request: &PrepareDownloadRequest,
    ) -> Result<RawOutcome<PrepareDownloadResponseOk, PrepareDownloadErrorCode>> {
        let encoded = adapter::encode_prepare_download(request)?;
        let response = self.transport.transceive(&encoded)?;
        let outcome = adapter::decode_prepare_download(&response)?;
        Ok((response, outcome))
    }

    fn cancel_session(
        &mut self,
        transaction_id: &[u8],
        reason: u8,
    ) -> Result<RawOutcome<CancelSessionResponseOk, CancelSessionErrorCode>> {
        let encoded = adapter::encode_cancel_session(transaction_id, reason)?;
        let response = self.transport.transceive(&encoded)?;
        let outcome = adapter::decode_cancel_session(&response, transaction_id)?;
        Ok((response, outcome))
    }

    fn load_bpp_segment(&mut self, segment: &[u8]) -> Result<Bytes> {
        self.transport.transceive(segment)
    }

    fn retrieve_notifications(
        &mut self,
        search_criteria: Option<NotificationSearchCriteria>,
    ) -> Result<Outcome<Vec<Any>, NotificationsErrorCode>> {
        let request = adapter::encode_retrieve_notifications(search_criteria)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_retrieve_notifications(&response)
    }

    fn notification_sent(&mut self, seq_number: u32) -> Result<u8> {
        let request = adapter::encode_notification_sent(seq_number)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_notification_sent(&response)
    }

    fn profile_info_list(
        &mut self,
        tag_list: Option<OctetString>,
    ) -> Result<Outcome<Vec<ProfileInfo>, ProfileInfoListErrorCode>> {
        let request = adapter::encode_profile_info_list(tag_list)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_profile_info_list(&response)
    }

    fn enable_profile(&mut self, id: ProfileIdentifier, refresh_flag: bool) -> Result<u8> {
        let request = adapter::encode_enable_profile(id, refresh_flag)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_enable_profile(&response)
    }

    fn disable_profile(&mut self, id: ProfileIdentifier, refresh_flag: bool) -> Result<u8> {
        let request = adapter::encode_disable_profile(id, refresh_flag)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_disable_profile(&response)
    }

    fn delete_profile(&mut self, id: ProfileIdentifier) -> Result<u8> {
        let request = adapter::encode_delete_profile(id)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_delete_profile(&response)
    }

    fn load_euicc_package(
        &mut self,
        package: &[u8],
    ) -> Result<RawOutcome<EuiccPackageResultSigned, EuiccPackageErrorCode>> {
        let response = self.transport.transceive(package)?;
        let outcome = adapter::decode_euicc_package_result(&response)?;
        Ok((response, outcome))
    }

    fn add_initial_eim(
        &mut self,
        data: EimConfigurationData,
    ) -> Result<Outcome<AddInitialEimOk, AddInitialEimErrorCode>> {
        let request = adapter::encode_add_initial_eim(data)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_add_initial_eim(&response)
    }

    fn get_eim_configuration_data(&mut self) -> Result<Vec<EimConfigurationData>> {
        let request = adapter::encode_get_eim_configuration_data()?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_eim_configuration_data(&response)
    }

    fn memory_reset(&mut self, reset_options: BitString) -> Result<u8> {
        let request = adapter::encode_memory_reset(reset_options)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_memory_reset(&response)
    }

    fn profile_rollback(&mut self, refresh_flag: bool) -> Result<u8> {
        let request = adapter::encode_profile_rollback(refresh_flag)?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_profile_rollback(&response)
    }

    fn enable_using_dd(&mut self) -> Result<u8> {
        let request = adapter::encode_enable_using_dd()?;
        let response = self.transport.transceive(&request)?;
        adapter::decode_enable_using_dd(&response)
    }

    fn close(&mut self) -> Result<()> {
        self.transport.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipa_apdu_core::MockTransport;

    fn card_response(payload: &[u8]) -> Vec<u8> {
        let mut raw = payload.to_vec();
        raw.extend_from_slice(&[0x90, 0x00]);
        raw
    }

    #[test]
    fn eid_read_round_trips_through_the_card() {
        let eid = OctetString::copy_from_slice(&[0x89; 16]);
        let encoded = crate::message::encode(
            "test",
            &crate::asn1::es10x::GetEuiccDataResponse {
                eid_value: eid.clone(),
            },
        )
        .unwrap();

        let mut mock = MockTransport::new();
        mock.push_response(card_response(&encoded));

        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));
        assert_eq!(euicc.get_eid().unwrap(), eid);
        assert!(euicc.export_emulation_state().is_none());

        // GetEuiccData request body carries the EID tag list (5C 01 5A)
        let request = &mock.commands[0];
        assert_eq!(request[1], 0xE2);
        assert!(request
            .windows(3)
            .any(|w| w == [0x5C, 0x01, 0x5A]));
    }

    #[test]
    fn enable_profile_result_code_is_returned() {
        let encoded = crate::message::encode(
            "test",
            &crate::asn1::es10x::EnableProfileResponse { enable_result: 2 },
        )
        .unwrap();
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&encoded));

        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));
        let result = euicc
            .enable_profile(
                ProfileIdentifier::Iccid(OctetString::copy_from_slice(&[0x98; 10])),
                false,
            )
            .unwrap();
        assert_eq!(result, 2);
    }
}
