//! Common Mutual Authentication between eUICC and RSP server, via the eIM
//!
//! Failure policy: anything that goes wrong before the eUICC has built a
//! session context (InitiateAuthentication refusal, CA gate, cross-check
//! mismatches) aborts without a cancel. Once AuthenticateServer has
//! succeeded on the card, a refusal from the server side is followed by a
//! Common Cancel Session so the eUICC does not hold a stale context.

use rasn::types::{Any, OctetString, Utf8String};
use tracing::{debug, warn};

use crate::asn1::es10x::{cancel_reason, AuthenticateServerRequest};
use crate::asn1::esipa::{
    AuthenticateClientRequestEsipa, AuthenticateClientResponseData, EsipaMessageFromIpaToEim,
    InitiateAuthenticationRequestEsipa, InitiateAuthenticationResponseData, StoreMetadataRequest,
};
use crate::asn1::{
    CtxParams1, CtxParamsForCommonAuthentication, DeviceCapabilities, DeviceInfo, EuiccInfo1,
};
use crate::cert;
use crate::config::IpaConfig;
use crate::error::{Error, Result};
use crate::esipa::EimLink;
use crate::euicc::EuiccInterface;
use crate::message::esipa::{
    check_authenticate_client, check_initiate_authentication, expect_authenticate_client,
    expect_initiate_authentication,
};
use crate::message::Outcome;

/// Session material left behind by a successful mutual authentication
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub transaction_id: OctetString,
    /// Profile metadata announced ahead of download, when the server sent it
    pub profile_metadata: Option<StoreMetadataRequest>,
    pub smdp_signed2: Any,
    pub smdp_signature2: OctetString,
    pub smdp_certificate: Any,
}

/// Keep only CI identifiers matching the configured CA
fn apply_ca_gate(euicc_info1: &mut EuiccInfo1, allowed_ca_id: &[u8]) -> Result<()> {
    euicc_info1
        .ci_pk_id_list_for_verification
        .retain(|id| id.as_ref() == allowed_ca_id);
    if euicc_info1.ci_pk_id_list_for_verification.is_empty() {
        return Err(Error::NoAllowedCa);
    }
    Ok(())
}

pub fn common_mutual_authentication(
    euicc: &mut dyn EuiccInterface,
    eim: &dyn EimLink,
    config: &IpaConfig,
    smdp_address: &str,
    matching_id: Option<&str>,
) -> Result<AuthenticatedSession> {
    let mut euicc_info1 = euicc.get_euicc_info1()?;
    if let Some(allowed) = &config.allowed_ca_id {
        apply_ca_gate(&mut euicc_info1, allowed)?;
    }
    let euicc_challenge = euicc.get_euicc_challenge()?;
    debug!(address = smdp_address, "initiating authentication");

    let request =
        EsipaMessageFromIpaToEim::InitiateAuthentication(InitiateAuthenticationRequestEsipa {
            euicc_challenge: euicc_challenge.clone(),
            smdp_address: Some(smdp_address.to_owned()),
            euicc_info1: Some(euicc_info1),
        });
    let ok = match expect_initiate_authentication(eim.call(&request)?)? {
        InitiateAuthenticationResponseData::Ok(ok) => ok,
        InitiateAuthenticationResponseData::Error(code) => {
            // The eUICC has no session context yet, nothing to cancel
            return Err(Error::EimError {
                function: "InitiateAuthentication",
                code,
            });
        }
    };
    let material = check_initiate_authentication(ok, smdp_address, &euicc_challenge)?;
    if let Some(allowed) = &config.allowed_ca_id {
        cert::check_authority_key(material.ok.server_certificate.as_bytes(), allowed)?;
    }
    let transaction_id = material.server_signed1.transaction_id.clone();

    let matching_id = matching_id
        .map(Utf8String::from)
        .or_else(|| material.ok.matching_id.clone());
    let request = AuthenticateServerRequest {
        server_signed1: material.ok.server_signed1.clone(),
        server_signature1: material.ok.server_signature1.clone(),
        euicc_ci_pk_id_to_be_used: material.ok.euicc_ci_pk_id_to_be_used.clone(),
        server_certificate: material.ok.server_certificate.clone(),
        ctx_params1: CtxParams1::ForCommonAuthentication(CtxParamsForCommonAuthentication {
            matching_id,
            device_info: DeviceInfo {
                tac: OctetString::copy_from_slice(&config.tac),
                device_capabilities: DeviceCapabilities::default(),
            },
        }),
    };
    let (response, outcome) = euicc.authenticate_server(&request)?;
    let euicc_refused = match &outcome {
        Outcome::Ok(_) => false,
        Outcome::Error(code) => {
            // The refusal is still signed material the server gets to see
            warn!(%code, "eUICC refused AuthenticateServer, forwarding the refusal");
            true
        }
    };

    let result = authenticate_client(eim, &transaction_id, &response, euicc_refused);
    if result.is_err() && !euicc_refused {
        // Past AuthenticateServer the eUICC holds a session context that
        // must be torn down, whatever went wrong on the server side
        if let Err(e) = super::cancel::common_cancel_session(
            euicc,
            eim,
            &transaction_id,
            cancel_reason::UNDEFINED_REASON,
        ) {
            warn!(error = %e, "cancel after authentication failure failed");
        }
    }
    let session = result?;
    debug!(transaction_id = %hex::encode_upper(&session.transaction_id), "mutual authentication complete");
    Ok(session)
}

fn authenticate_client(
    eim: &dyn EimLink,
    transaction_id: &OctetString,
    response: &[u8],
    euicc_refused: bool,
) -> Result<AuthenticatedSession> {
    let request = EsipaMessageFromIpaToEim::AuthenticateClient(AuthenticateClientRequestEsipa {
        transaction_id: transaction_id.clone(),
        authenticate_server_response: Any::new(response.to_vec()),
    });
    match expect_authenticate_client(eim.call(&request)?)? {
        AuthenticateClientResponseData::Ok(ok) => {
            if euicc_refused {
                return Err(Error::ProtocolViolation(
                    "server accepted a refused AuthenticateServer",
                ));
            }
            check_authenticate_client(&ok, transaction_id)?;
            Ok(AuthenticatedSession {
                transaction_id: transaction_id.clone(),
                profile_metadata: ok.profile_metadata,
                smdp_signed2: ok.smdp_signed2,
                smdp_signature2: ok.smdp_signature2,
                smdp_certificate: ok.smdp_certificate,
            })
        }
        AuthenticateClientResponseData::Error(code) => Err(Error::EimError {
            function: "AuthenticateClient",
            code,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::es10x::{
        AuthenticateResponseOk, AuthenticateServerResponse, AuthenticateServerResponseData,
        CancelSessionResponse, CancelSessionResponseData, CancelSessionResponseOk,
        EuiccCancelSessionSigned, GetEuiccChallengeResponse,
    };
    use crate::asn1::esipa::{
        CancelSessionOkEsipa, CancelSessionResponseEsipa, CancelSessionResponseEsipaData,
        EsipaMessageFromEimToIpa, InitiateAuthenticationOkEsipa,
        InitiateAuthenticationResponseEsipa,
    };
    use crate::asn1::ServerSigned1;
    use crate::es10x::Es10xTransport;
    use crate::euicc::RealEuicc;
    use crate::message;
    use crate::procedure::testing::ScriptedEim;
    use ipa_apdu_core::MockTransport;

    const CHALLENGE: [u8; 16] = [0x22; 16];
    const TRANSACTION_ID: [u8; 3] = [0xAB, 0xCD, 0xEF];
    const SMDP: &str = "smdp.example.com";

    fn card_response<T: rasn::Encode>(value: &T) -> Vec<u8> {
        let mut raw = message::encode("test", value).unwrap();
        raw.extend_from_slice(&[0x90, 0x00]);
        raw
    }

    fn euicc_info1() -> EuiccInfo1 {
        EuiccInfo1 {
            svn: OctetString::copy_from_slice(&[2, 2, 2]),
            ci_pk_id_list_for_verification: vec![OctetString::copy_from_slice(&[0xAA; 20])],
            ci_pk_id_list_for_signing: vec![OctetString::copy_from_slice(&[0xAA; 20])],
        }
    }

    fn queue_info_and_challenge(mock: &mut MockTransport) {
        mock.push_response(card_response(&euicc_info1()));
        mock.push_response(card_response(&GetEuiccChallengeResponse {
            euicc_challenge: OctetString::copy_from_slice(&CHALLENGE),
        }));
    }

    fn initiate_authentication_ok() -> EsipaMessageFromEimToIpa {
        let server_signed1 = ServerSigned1 {
            transaction_id: OctetString::copy_from_slice(&TRANSACTION_ID),
            euicc_challenge: OctetString::copy_from_slice(&CHALLENGE),
            server_address: SMDP.to_owned(),
            server_challenge: OctetString::copy_from_slice(&[0x33; 16]),
        };
        let signed_bytes = message::encode("test", &server_signed1).unwrap();
        EsipaMessageFromEimToIpa::InitiateAuthentication(InitiateAuthenticationResponseEsipa(
            InitiateAuthenticationResponseData::Ok(InitiateAuthenticationOkEsipa {
                transaction_id: Some(OctetString::copy_from_slice(&TRANSACTION_ID)),
                server_signed1: Any::new(signed_bytes),
                server_signature1: OctetString::copy_from_slice(&[0x44; 64]),
                euicc_ci_pk_id_to_be_used: OctetString::copy_from_slice(&[0xAA; 20]),
                server_certificate: Any::new(vec![0x30, 0x03, 0x02, 0x01, 0x00]),
                matching_id: None,
            }),
        ))
    }

    fn authenticate_server_ok() -> Vec<u8> {
        card_response(&AuthenticateServerResponse(
            AuthenticateServerResponseData::Ok(AuthenticateResponseOk {
                euicc_signed1: Any::new(vec![0x30, 0x00]),
                euicc_signature1: OctetString::copy_from_slice(&[0x55; 64]),
                euicc_certificate: Any::new(vec![0x30, 0x00]),
                eum_certificate: Any::new(vec![0x30, 0x00]),
            }),
        ))
    }

    fn cancel_session_ok() -> Vec<u8> {
        let signed = EuiccCancelSessionSigned {
            transaction_id: OctetString::copy_from_slice(&TRANSACTION_ID),
            reason: cancel_reason::UNDEFINED_REASON,
        };
        let signed_bytes = message::encode("test", &signed).unwrap();
        card_response(&CancelSessionResponse(CancelSessionResponseData::Ok(
            CancelSessionResponseOk {
                euicc_cancel_session_signed: Any::new(signed_bytes),
                euicc_cancel_session_signature: OctetString::copy_from_slice(&[0x66; 64]),
            },
        )))
    }

    #[test]
    fn initiate_authentication_refusal_aborts_without_cancel() {
        let mut mock = MockTransport::new();
        queue_info_and_challenge(&mut mock);
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        eim.push(EsipaMessageFromEimToIpa::InitiateAuthentication(
            InitiateAuthenticationResponseEsipa(InitiateAuthenticationResponseData::Error(1)),
        ));

        let err = common_mutual_authentication(
            &mut euicc,
            &eim,
            &IpaConfig::new("eim.example.com"),
            SMDP,
            None,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::EimError {
                function: "InitiateAuthentication",
                ..
            }
        ));
        // Only the initiation went out; no cancel, no AuthenticateClient
        assert_eq!(eim.sent_count(), 1);
    }

    #[test]
    fn authenticate_client_refusal_triggers_cancel() {
        let mut mock = MockTransport::new();
        queue_info_and_challenge(&mut mock);
        mock.push_response(authenticate_server_ok());
        mock.push_response(cancel_session_ok());
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        eim.push(initiate_authentication_ok());
        eim.push(EsipaMessageFromEimToIpa::AuthenticateClient(
            crate::asn1::esipa::AuthenticateClientResponseEsipa(
                AuthenticateClientResponseData::Error(3),
            ),
        ));
        eim.push(EsipaMessageFromEimToIpa::CancelSession(
            CancelSessionResponseEsipa(CancelSessionResponseEsipaData::Ok(CancelSessionOkEsipa {})),
        ));

        let err = common_mutual_authentication(
            &mut euicc,
            &eim,
            &IpaConfig::new("eim.example.com"),
            SMDP,
            Some("MATCHING-ID"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::EimError {
                function: "AuthenticateClient",
                ..
            }
        ));
        let sent = eim.sent.borrow();
        assert_eq!(sent.len(), 3);
        assert!(matches!(sent[2], EsipaMessageFromIpaToEim::CancelSession(_)));
    }

    #[test]
    fn transaction_id_mismatch_after_server_auth_triggers_cancel() {
        let mut mock = MockTransport::new();
        queue_info_and_challenge(&mut mock);
        mock.push_response(authenticate_server_ok());
        mock.push_response(cancel_session_ok());
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        eim.push(initiate_authentication_ok());
        // Acceptance under a foreign transaction id
        eim.push(EsipaMessageFromEimToIpa::AuthenticateClient(
            crate::asn1::esipa::AuthenticateClientResponseEsipa(
                AuthenticateClientResponseData::Ok(crate::asn1::esipa::AuthenticateClientOkEsipa {
                    transaction_id: OctetString::copy_from_slice(&[0x01, 0x02]),
                    profile_metadata: None,
                    smdp_signed2: Any::new(vec![0x30, 0x00]),
                    smdp_signature2: OctetString::copy_from_slice(&[0x77; 64]),
                    smdp_certificate: Any::new(vec![0x30, 0x00]),
                }),
            ),
        ));
        eim.push(EsipaMessageFromEimToIpa::CancelSession(
            CancelSessionResponseEsipa(CancelSessionResponseEsipaData::Ok(CancelSessionOkEsipa {})),
        ));

        let err = common_mutual_authentication(
            &mut euicc,
            &eim,
            &IpaConfig::new("eim.example.com"),
            SMDP,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::UnexpectedEimResponse(_)));
        // The stale session context was torn down on both ends
        let sent = eim.sent.borrow();
        assert_eq!(sent.len(), 3);
        assert!(matches!(sent[2], EsipaMessageFromIpaToEim::CancelSession(_)));
    }

    #[test]
    fn ca_gate_rejects_euicc_without_the_allowed_ca() {
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&euicc_info1()));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        let config = IpaConfig::new("eim.example.com").with_allowed_ca_id(vec![0xBB; 20]);
        let err = common_mutual_authentication(&mut euicc, &eim, &config, SMDP, None).unwrap_err();
        assert!(matches!(err, Error::NoAllowedCa));
        assert_eq!(eim.sent_count(), 0);
    }

    #[test]
    fn euicc_refusal_is_forwarded_and_not_cancelled() {
        let mut mock = MockTransport::new();
        queue_info_and_challenge(&mut mock);
        mock.push_response(card_response(&AuthenticateServerResponse(
            AuthenticateServerResponseData::Error(crate::asn1::es10x::AuthenticateResponseError {
                transaction_id: OctetString::copy_from_slice(&TRANSACTION_ID),
                authenticate_error_code: 6,
            }),
        )));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        eim.push(initiate_authentication_ok());
        eim.push(EsipaMessageFromEimToIpa::AuthenticateClient(
            crate::asn1::esipa::AuthenticateClientResponseEsipa(
                AuthenticateClientResponseData::Error(2),
            ),
        ));

        let err = common_mutual_authentication(
            &mut euicc,
            &eim,
            &IpaConfig::new("eim.example.com"),
            SMDP,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, Error::EimError { .. }));
        // The refusal went to the server, but no cancel followed: the card
        // never built a session context
        let sent = eim.sent.borrow();
        assert_eq!(sent.len(), 2);
        assert!(matches!(
            sent[1],
            EsipaMessageFromIpaToEim::AuthenticateClient(_)
        ));
    }
}
