//! Encode/decode adapters for the ES10a/ES10b/ES10c card functions
//!
//! Pure byte adapters; the card round trip itself lives in the transport
//! and eUICC layers. Responses from the card are classified with
//! [`FailureOrigin::Card`].

use rasn::types::{Any, BitString, OctetString};

use crate::asn1::es10x::*;
use crate::asn1::{EimConfigurationData, ProfileIdentifier, ProfileInstallationResult};
use crate::error::{Error, FailureOrigin, Result};
use crate::message::{decode, encode, error_codes, Outcome};

/// ISD-R application identifier (SGP.22 appendix)
pub const ISDR_AID: [u8; 16] = [
    0xA0, 0x00, 0x00, 0x05, 0x59, 0x10, 0x10, 0xFF, 0xFF, 0xFF, 0xFF, 0x89, 0x00, 0x00, 0x01, 0x00,
];

/// Tag requesting the EID in GetEuiccData
const EID_TAG: u8 = 0x5A;

/// Result code shared by the profile state-control responses
pub mod op_result {
    pub const OK: u8 = 0;
}

error_codes!(
    /// AuthenticateServer error codes
    AuthenticateErrorCode {
        InvalidCertificate = 1,
        InvalidSignature = 2,
        UnsupportedCurve = 3,
        NoSessionContext = 4,
        InvalidOid = 5,
        EuiccChallengeMismatch = 6,
        CiPkUnknown = 7,
        Undefined = 127,
    }
);

error_codes!(
    /// PrepareDownload error codes
    PrepareDownloadErrorCode {
        InvalidCertificate = 1,
        InvalidSignature = 2,
        UnsupportedCurve = 3,
        NoSessionContext = 4,
        InvalidTransactionId = 5,
        Undefined = 127,
    }
);

error_codes!(
    /// CancelSession error codes
    CancelSessionErrorCode {
        InvalidTransactionId = 5,
        Undefined = 127,
    }
);

error_codes!(
    /// RetrieveNotificationsList error codes
    NotificationsErrorCode {
        Undefined = 127,
    }
);

error_codes!(
    /// ProfileInfoList error codes
    ProfileInfoListErrorCode {
        IncorrectInputValues = 1,
        Undefined = 127,
    }
);

error_codes!(
    /// LoadEuiccPackage error codes
    EuiccPackageErrorCode {
        InvalidSignature = 2,
        InvalidCounterValue = 3,
        UnassignedEid = 4,
        Undefined = 127,
    }
);

error_codes!(
    /// AddInitialEim error codes
    AddInitialEimErrorCode {
        AssociatedEimAlreadyExists = 1,
        Undefined = 127,
    }
);

// --- GetEuiccInfo1 ---

pub fn encode_get_euicc_info1() -> Result<Vec<u8>> {
    encode("GetEuiccInfo1", &GetEuiccInfo1Request {})
}

pub fn decode_euicc_info1(bytes: &[u8]) -> Result<crate::asn1::EuiccInfo1> {
    decode(
        "GetEuiccInfo1",
        bytes,
        &[0xBF, 0x20],
        FailureOrigin::Card,
    )
}

// --- GetEuiccChallenge ---

pub fn encode_get_euicc_challenge() -> Result<Vec<u8>> {
    encode("GetEuiccChallenge", &GetEuiccChallengeRequest {})
}

pub fn decode_euicc_challenge(bytes: &[u8]) -> Result<OctetString> {
    let response: GetEuiccChallengeResponse = decode(
        "GetEuiccChallenge",
        bytes,
        &[0xBF, 0x2E],
        FailureOrigin::Card,
    )?;
    Ok(response.euicc_challenge)
}

// --- AuthenticateServer ---

pub fn encode_authenticate_server(request: &AuthenticateServerRequest) -> Result<Vec<u8>> {
    encode("AuthenticateServer", request)
}

pub fn decode_authenticate_server(
    bytes: &[u8],
) -> Result<Outcome<AuthenticateResponseOk, AuthenticateErrorCode>> {
    let response: AuthenticateServerResponse = decode(
        "AuthenticateServer",
        bytes,
        &[0xBF, 0x38],
        FailureOrigin::Card,
    )?;
    Ok(match response.0 {
        AuthenticateServerResponseData::Ok(ok) => Outcome::Ok(ok),
        AuthenticateServerResponseData::Error(e) => {
            Outcome::Error(AuthenticateErrorCode::from_code(e.authenticate_error_code))
        }
    })
}

// --- PrepareDownload ---

pub fn encode_prepare_download(request: &PrepareDownloadRequest) -> Result<Vec<u8>> {
    encode("PrepareDownload", request)
}

pub fn decode_prepare_download(
    bytes: &[u8],
) -> Result<Outcome<PrepareDownloadResponseOk, PrepareDownloadErrorCode>> {
    let response: PrepareDownloadResponse = decode(
        "PrepareDownload",
        bytes,
        &[0xBF, 0x21],
        FailureOrigin::Card,
    )?;
    Ok(match response.0 {
        PrepareDownloadResponseData::Ok(ok) => Outcome::Ok(ok),
        PrepareDownloadResponseData::Error(code) => {
            Outcome::Error(PrepareDownloadErrorCode::from_code(code))
        }
    })
}

// --- CancelSession ---

pub fn encode_cancel_session(transaction_id: &[u8], reason: u8) -> Result<Vec<u8>> {
    encode(
        "CancelSession",
        &CancelSessionRequest {
            transaction_id: OctetString::copy_from_slice(transaction_id),
            reason,
        },
    )
}

/// Decode a cancel-session response and verify the echoed transaction id.
///
/// A mismatching echo is security relevant and fails the call outright.
pub fn decode_cancel_session(
    bytes: &[u8],
    expected_transaction_id: &[u8],
) -> Result<Outcome<CancelSessionResponseOk, CancelSessionErrorCode>> {
    let response: CancelSessionResponse = decode(
        "CancelSession",
        bytes,
        &[0xBF, 0x41],
        FailureOrigin::Card,
    )?;
    match response.0 {
        CancelSessionResponseData::Ok(ok) => {
            let signed: EuiccCancelSessionSigned = decode(
                "EuiccCancelSessionSigned",
                ok.euicc_cancel_session_signed.as_bytes(),
                &[0x30],
                FailureOrigin::Card,
            )?;
            if signed.transaction_id.as_ref() != expected_transaction_id {
                return Err(Error::ProtocolViolation(
                    "cancel session echoed a different transaction id",
                ));
            }
            Ok(Outcome::Ok(ok))
        }
        CancelSessionResponseData::Error(code) => {
            Ok(Outcome::Error(CancelSessionErrorCode::from_code(code)))
        }
    }
}

// --- Notifications ---

pub fn encode_retrieve_notifications(
    search_criteria: Option<NotificationSearchCriteria>,
) -> Result<Vec<u8>> {
    encode(
        "RetrieveNotificationsList",
        &RetrieveNotificationsListRequest { search_criteria },
    )
}

pub fn decode_retrieve_notifications(
    bytes: &[u8],
) -> Result<Outcome<Vec<Any>, NotificationsErrorCode>> {
    let response: RetrieveNotificationsListResponse = decode(
        "RetrieveNotificationsList",
        bytes,
        &[0xBF, 0x2B],
        FailureOrigin::Card,
    )?;
    Ok(match response.0 {
        RetrieveNotificationsListResponseData::List(list) => Outcome::Ok(list),
        RetrieveNotificationsListResponseData::Error(code) => {
            Outcome::Error(NotificationsErrorCode::from_code(code))
        }
    })
}

pub fn encode_notification_sent(seq_number: u32) -> Result<Vec<u8>> {
    encode("NotificationSent", &NotificationSentRequest { seq_number })
}

pub fn decode_notification_sent(bytes: &[u8]) -> Result<u8> {
    let response: NotificationSentResponse = decode(
        "NotificationSent",
        bytes,
        &[0xBF, 0x30],
        FailureOrigin::Card,
    )?;
    Ok(response.delete_notification_status)
}

/// Decode a ProfileInstallationResult delivered on the final bound profile
/// package segment
pub fn decode_profile_installation_result(bytes: &[u8]) -> Result<ProfileInstallationResult> {
    decode(
        "ProfileInstallationResult",
        bytes,
        &[0xBF, 0x37],
        FailureOrigin::Card,
    )
}

// --- GetEuiccData (EID) ---

pub fn encode_get_eid() -> Result<Vec<u8>> {
    encode(
        "GetEuiccData",
        &GetEuiccDataRequest {
            tag_list: OctetString::copy_from_slice(&[EID_TAG]),
        },
    )
}

pub fn decode_eid(bytes: &[u8]) -> Result<OctetString> {
    let response: GetEuiccDataResponse =
        decode("GetEuiccData", bytes, &[0xBF, 0x3E], FailureOrigin::Card)?;
    Ok(response.eid_value)
}

// --- ES10c profile state control ---

pub fn encode_profile_info_list(tag_list: Option<OctetString>) -> Result<Vec<u8>> {
    encode("ProfileInfoList", &ProfileInfoListRequest { tag_list })
}

pub fn decode_profile_info_list(
    bytes: &[u8],
) -> Result<Outcome<Vec<ProfileInfo>, ProfileInfoListErrorCode>> {
    let response: ProfileInfoListResponse = decode(
        "ProfileInfoList",
        bytes,
        &[0xBF, 0x2D],
        FailureOrigin::Card,
    )?;
    Ok(match response.0 {
        ProfileInfoListResponseData::Ok(list) => Outcome::Ok(list),
        ProfileInfoListResponseData::Error(code) => {
            Outcome::Error(ProfileInfoListErrorCode::from_code(code))
        }
    })
}

pub fn encode_enable_profile(
    profile_identifier: ProfileIdentifier,
    refresh_flag: bool,
) -> Result<Vec<u8>> {
    encode(
        "EnableProfile",
        &EnableProfileRequest {
            profile_identifier,
            refresh_flag,
        },
    )
}

pub fn decode_enable_profile(bytes: &[u8]) -> Result<u8> {
    let response: EnableProfileResponse =
        decode("EnableProfile", bytes, &[0xBF, 0x31], FailureOrigin::Card)?;
    Ok(response.enable_result)
}

pub fn encode_disable_profile(
    profile_identifier: ProfileIdentifier,
    refresh_flag: bool,
) -> Result<Vec<u8>> {
    encode(
        "DisableProfile",
        &DisableProfileRequest {
            profile_identifier,
            refresh_flag,
        },
    )
}

pub fn decode_disable_profile(bytes: &[u8]) -> Result<u8> {
    let response: DisableProfileResponse =
        decode("DisableProfile", bytes, &[0xBF, 0x32], FailureOrigin::Card)?;
    Ok(response.disable_result)
}

pub fn encode_delete_profile(profile_identifier: ProfileIdentifier) -> Result<Vec<u8>> {
    encode("DeleteProfile", &DeleteProfileRequest(profile_identifier))
}

pub fn decode_delete_profile(bytes: &[u8]) -> Result<u8> {
    let response: DeleteProfileResponse =
        decode("DeleteProfile", bytes, &[0xBF, 0x33], FailureOrigin::Card)?;
    Ok(response.delete_result)
}

pub fn encode_memory_reset(reset_options: BitString) -> Result<Vec<u8>> {
    encode(
        "EuiccMemoryReset",
        &EuiccMemoryResetRequest { reset_options },
    )
}

pub fn decode_memory_reset(bytes: &[u8]) -> Result<u8> {
    let response: EuiccMemoryResetResponse = decode(
        "EuiccMemoryReset",
        bytes,
        &[0xBF, 0x34],
        FailureOrigin::Card,
    )?;
    Ok(response.reset_result)
}

// --- SGP.32 eUICC package and eIM configuration ---

/// The package request bytes arrive signed by the eIM and are forwarded to
/// the card verbatim, so there is no encode step here.
pub fn decode_euicc_package_result(
    bytes: &[u8],
) -> Result<Outcome<EuiccPackageResultSigned, EuiccPackageErrorCode>> {
    let response: EuiccPackageResult = decode(
        "LoadEuiccPackage",
        bytes,
        &[0xBF, 0x51],
        FailureOrigin::Card,
    )?;
    Ok(match response.0 {
        EuiccPackageResultData::Signed(signed) => Outcome::Ok(signed),
        EuiccPackageResultData::Error(code) => {
            Outcome::Error(EuiccPackageErrorCode::from_code(code))
        }
    })
}

pub fn encode_get_eim_configuration_data() -> Result<Vec<u8>> {
    encode("GetEimConfigurationData", &GetEimConfigurationDataRequest {})
}

pub fn decode_eim_configuration_data(bytes: &[u8]) -> Result<Vec<EimConfigurationData>> {
    let response: GetEimConfigurationDataResponse = decode(
        "GetEimConfigurationData",
        bytes,
        &[0xBF, 0x55],
        FailureOrigin::Card,
    )?;
    Ok(response.eim_configuration_data_list)
}

pub fn encode_add_initial_eim(eim_configuration_data: EimConfigurationData) -> Result<Vec<u8>> {
    encode(
        "AddInitialEim",
        &AddInitialEimRequest {
            eim_configuration_data,
        },
    )
}

pub fn decode_add_initial_eim(
    bytes: &[u8],
) -> Result<Outcome<AddInitialEimOk, AddInitialEimErrorCode>> {
    let response: AddInitialEimResponse =
        decode("AddInitialEim", bytes, &[0xBF, 0x57], FailureOrigin::Card)?;
    Ok(match response.0 {
        AddInitialEimResponseData::Ok(ok) => Outcome::Ok(ok),
        AddInitialEimResponseData::Error(code) => {
            Outcome::Error(AddInitialEimErrorCode::from_code(code))
        }
    })
}

pub fn encode_profile_rollback(refresh_flag: bool) -> Result<Vec<u8>> {
    encode("ProfileRollback", &ProfileRollbackRequest { refresh_flag })
}

pub fn decode_profile_rollback(bytes: &[u8]) -> Result<u8> {
    let response: ProfileRollbackResponse = decode(
        "ProfileRollback",
        bytes,
        &[0xBF, 0x58],
        FailureOrigin::Card,
    )?;
    Ok(response.rollback_result)
}

pub fn encode_enable_using_dd() -> Result<Vec<u8>> {
    encode("EnableUsingDD", &EnableUsingDdRequest {})
}

pub fn decode_enable_using_dd(bytes: &[u8]) -> Result<u8> {
    let response: EnableUsingDdResponse =
        decode("EnableUsingDD", bytes, &[0xBF, 0x5A], FailureOrigin::Card)?;
    Ok(response.enable_using_dd_result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DecodeFailure;

    #[test]
    fn challenge_round_trip() {
        let challenge = OctetString::copy_from_slice(&[0x11; 16]);
        let encoded = crate::message::encode(
            "test",
            &GetEuiccChallengeResponse {
                euicc_challenge: challenge.clone(),
            },
        )
        .unwrap();
        assert_eq!(decode_euicc_challenge(&encoded).unwrap(), challenge);
    }

    #[test]
    fn euicc_info1_round_trip() {
        let info = crate::asn1::EuiccInfo1 {
            svn: OctetString::copy_from_slice(&[2, 2, 2]),
            ci_pk_id_list_for_verification: vec![OctetString::copy_from_slice(&[0xAA; 20])],
            ci_pk_id_list_for_signing: vec![OctetString::copy_from_slice(&[0xBB; 20])],
        };
        let encoded = crate::message::encode("test", &info).unwrap();
        assert_eq!(decode_euicc_info1(&encoded).unwrap(), info);
    }

    #[test]
    fn cancel_session_checks_echoed_transaction_id() {
        let signed = EuiccCancelSessionSigned {
            transaction_id: OctetString::copy_from_slice(&[1, 2, 3]),
            reason: cancel_reason::UNDEFINED_REASON,
        };
        let signed_bytes = crate::message::encode("test", &signed).unwrap();
        let response = CancelSessionResponse(CancelSessionResponseData::Ok(
            CancelSessionResponseOk {
                euicc_cancel_session_signed: Any::new(signed_bytes),
                euicc_cancel_session_signature: OctetString::copy_from_slice(&[0xEE; 64]),
            },
        ));
        let bytes = crate::message::encode("test", &response).unwrap();

        assert!(decode_cancel_session(&bytes, &[1, 2, 3]).unwrap().is_ok());
        let err = decode_cancel_session(&bytes, &[9, 9, 9]).unwrap_err();
        assert!(matches!(err, Error::ProtocolViolation(_)));
    }

    #[test]
    fn cancel_session_error_code_is_protocol_level() {
        let response = CancelSessionResponse(CancelSessionResponseData::Error(5));
        let bytes = crate::message::encode("test", &response).unwrap();
        match decode_cancel_session(&bytes, &[1]).unwrap() {
            Outcome::Error(code) => {
                assert_eq!(code, CancelSessionErrorCode::InvalidTransactionId);
            }
            Outcome::Ok(_) => panic!("expected error arm"),
        }
    }

    #[test]
    fn profile_info_list_round_trip() {
        let info = ProfileInfo {
            iccid: Some(OctetString::copy_from_slice(&[0x98; 10])),
            profile_state: Some(profile_state::ENABLED),
            profile_name: Some("test profile".to_owned()),
            ..Default::default()
        };
        let response =
            ProfileInfoListResponse(ProfileInfoListResponseData::Ok(vec![info.clone()]));
        let bytes = crate::message::encode("test", &response).unwrap();
        match decode_profile_info_list(&bytes).unwrap() {
            Outcome::Ok(list) => assert_eq!(list, vec![info]),
            Outcome::Error(code) => panic!("unexpected error: {code}"),
        }
    }

    #[test]
    fn authenticate_server_error_maps_to_closed_code() {
        let response = AuthenticateServerResponse(AuthenticateServerResponseData::Error(
            AuthenticateResponseError {
                transaction_id: OctetString::copy_from_slice(&[7]),
                authenticate_error_code: 6,
            },
        ));
        let bytes = crate::message::encode("test", &response).unwrap();
        match decode_authenticate_server(&bytes).unwrap() {
            Outcome::Error(code) => {
                assert_eq!(code, AuthenticateErrorCode::EuiccChallengeMismatch);
            }
            Outcome::Ok(_) => panic!("expected error arm"),
        }
    }

    #[test]
    fn unknown_error_code_stays_decodable() {
        assert_eq!(
            AuthenticateErrorCode::from_code(99),
            AuthenticateErrorCode::Unknown(99)
        );
        assert_eq!(AuthenticateErrorCode::from_code(99).code(), 99);
    }

    #[test]
    fn wrong_function_tag_is_rejected_before_decode() {
        let encoded = encode_get_euicc_challenge().unwrap();
        let err = decode_eid(&encoded).unwrap_err();
        match err {
            Error::Decode { kind, .. } => {
                assert_eq!(kind, DecodeFailure::UnexpectedResponse);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
