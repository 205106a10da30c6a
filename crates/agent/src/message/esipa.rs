//! Envelope adapters and cross-checks for the ESipa link
//!
//! The HTTP transport hands a decoded [`EsipaMessageFromEimToIpa`] to the
//! `expect_*` helper for the function that was called; any other variant is
//! an unexpected eIM response, never partially read. Echo cross-checks for
//! session material also live here.

use crate::asn1::esipa::*;
use crate::asn1::ServerSigned1;
use crate::error::{Error, FailureOrigin, Result};
use crate::message::{decode, encode, error_codes};

error_codes!(
    /// Error codes returned by GetEimPackage in place of a package
    EimPackageErrorCode {
        NoEimPackageAvailable = 1,
        EidNotFound = 5,
        Undefined = 127,
    }
);

pub fn encode_ipa_to_eim(message: &EsipaMessageFromIpaToEim) -> Result<Vec<u8>> {
    encode("EsipaMessageFromIpaToEim", message)
}

pub fn decode_eim_to_ipa(bytes: &[u8]) -> Result<EsipaMessageFromEimToIpa> {
    // The envelope is a CHOICE, so there is no single expected outer tag;
    // an unknown variant fails inside the codec
    decode("EsipaMessageFromEimToIpa", bytes, &[], FailureOrigin::Http)
}

macro_rules! expect_variant {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident, $inner:ty, $name:literal) => {
        $(#[$doc])*
        pub fn $fn_name(message: EsipaMessageFromEimToIpa) -> Result<$inner> {
            match message {
                EsipaMessageFromEimToIpa::$variant(inner) => Ok(inner.0),
                _ => Err(Error::UnexpectedEimResponse($name)),
            }
        }
    };
}

expect_variant!(
    expect_initiate_authentication,
    InitiateAuthentication,
    InitiateAuthenticationResponseData,
    "expected InitiateAuthenticationResponse"
);

expect_variant!(
    expect_authenticate_client,
    AuthenticateClient,
    AuthenticateClientResponseData,
    "expected AuthenticateClientResponse"
);

expect_variant!(
    expect_get_bound_profile_package,
    GetBoundProfilePackage,
    GetBoundProfilePackageResponseData,
    "expected GetBoundProfilePackageResponse"
);

expect_variant!(
    expect_cancel_session,
    CancelSession,
    CancelSessionResponseEsipaData,
    "expected CancelSessionResponse"
);

expect_variant!(
    expect_get_eim_package,
    GetEimPackage,
    GetEimPackageResponseData,
    "expected GetEimPackageResponse"
);

/// The ProvideEimPackageResult acknowledgement is a plain SEQUENCE, not a
/// tagged CHOICE wrapper, so it falls outside the macro.
pub fn expect_provide_eim_package_result(
    message: EsipaMessageFromEimToIpa,
) -> Result<ProvideEimPackageResultResponse> {
    match message {
        EsipaMessageFromEimToIpa::ProvideEimPackageResult(inner) => Ok(inner),
        _ => Err(Error::UnexpectedEimResponse(
            "expected ProvideEimPackageResultResponse",
        )),
    }
}

/// Server authentication material with the signed view already verified
/// against what this agent sent
#[derive(Debug, Clone)]
pub struct ServerAuthenticationMaterial {
    pub ok: InitiateAuthenticationOkEsipa,
    pub server_signed1: ServerSigned1,
}

/// Verify the echoed SM-DP+ address and eUICC challenge inside
/// `serverSigned1` before the material is handed to the eUICC.
///
/// A mismatch means session confusion or replay and fails the procedure.
pub fn check_initiate_authentication(
    ok: InitiateAuthenticationOkEsipa,
    expected_address: &str,
    expected_challenge: &[u8],
) -> Result<ServerAuthenticationMaterial> {
    let server_signed1: ServerSigned1 = decode(
        "ServerSigned1",
        ok.server_signed1.as_bytes(),
        &[0x30],
        FailureOrigin::Http,
    )?;
    if server_signed1.euicc_challenge.as_ref() != expected_challenge {
        return Err(Error::UnexpectedEimResponse(
            "serverSigned1 echoed a different eUICC challenge",
        ));
    }
    if !server_signed1
        .server_address
        .eq_ignore_ascii_case(expected_address)
    {
        return Err(Error::UnexpectedEimResponse(
            "serverSigned1 echoed a different SM-DP+ address",
        ));
    }
    Ok(ServerAuthenticationMaterial { ok, server_signed1 })
}

/// Verify the transaction id echoed by AuthenticateClient
pub fn check_authenticate_client(
    ok: &AuthenticateClientOkEsipa,
    expected_transaction_id: &[u8],
) -> Result<()> {
    if ok.transaction_id.as_ref() != expected_transaction_id {
        return Err(Error::UnexpectedEimResponse(
            "AuthenticateClient echoed a different transaction id",
        ));
    }
    Ok(())
}
