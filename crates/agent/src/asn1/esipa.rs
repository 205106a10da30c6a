//! ESipa envelope and payload schemas exchanged with the eIM over HTTP
//!
//! Both directions are single CHOICE envelopes; the HTTP layer encodes the
//! outbound envelope and hands the decoded inbound envelope to the adapter
//! that knows which variant it expects.

use rasn::types::{Any, OctetString, Utf8String};
use rasn::{AsnType, Decode, Decoder as _, Encode, Encoder as _};

use super::{EuiccInfo1, IpaEuiccData};
use super::es10x::{EuiccPackageRequest, ProfileInfoListInner};

/// Everything the IPA can send to the eIM
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum EsipaMessageFromIpaToEim {
    InitiateAuthentication(InitiateAuthenticationRequestEsipa),
    GetBoundProfilePackage(GetBoundProfilePackageRequestEsipa),
    AuthenticateClient(AuthenticateClientRequestEsipa),
    HandleNotification(HandleNotificationEsipa),
    CancelSession(CancelSessionRequestEsipa),
    GetEimPackage(GetEimPackageRequest),
    ProvideEimPackageResult(ProvideEimPackageResult),
}

/// Everything the eIM can send back
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum EsipaMessageFromEimToIpa {
    InitiateAuthentication(InitiateAuthenticationResponseEsipa),
    GetBoundProfilePackage(GetBoundProfilePackageResponseEsipa),
    AuthenticateClient(AuthenticateClientResponseEsipa),
    CancelSession(CancelSessionResponseEsipa),
    GetEimPackage(GetEimPackageResponse),
    ProvideEimPackageResult(ProvideEimPackageResultResponse),
}

// --- InitiateAuthentication ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 57))]
pub struct InitiateAuthenticationRequestEsipa {
    #[rasn(tag(context, 1))]
    pub euicc_challenge: OctetString,
    #[rasn(tag(context, 3))]
    pub smdp_address: Option<Utf8String>,
    pub euicc_info1: Option<EuiccInfo1>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 57)))]
pub struct InitiateAuthenticationResponseEsipa(pub InitiateAuthenticationResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum InitiateAuthenticationResponseData {
    #[rasn(tag(context, 0))]
    Ok(InitiateAuthenticationOkEsipa),
    #[rasn(tag(context, 1))]
    Error(u8),
}

/// Server authentication material relayed by the eIM.
///
/// `server_signed1` and `server_certificate` stay verbatim; the typed
/// [`super::ServerSigned1`] view is decoded from the former only for the
/// address and challenge cross-checks.
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct InitiateAuthenticationOkEsipa {
    #[rasn(tag(context, 0))]
    pub transaction_id: Option<OctetString>,
    pub server_signed1: Any,
    #[rasn(tag(application, 55))]
    pub server_signature1: OctetString,
    pub euicc_ci_pk_id_to_be_used: OctetString,
    pub server_certificate: Any,
    #[rasn(tag(context, 1))]
    pub matching_id: Option<Utf8String>,
}

// --- AuthenticateClient ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 59))]
pub struct AuthenticateClientRequestEsipa {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    /// AuthenticateServerResponse exactly as produced by the eUICC
    pub authenticate_server_response: Any,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 59)))]
pub struct AuthenticateClientResponseEsipa(pub AuthenticateClientResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum AuthenticateClientResponseData {
    #[rasn(tag(context, 0))]
    Ok(AuthenticateClientOkEsipa),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct AuthenticateClientOkEsipa {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    pub profile_metadata: Option<StoreMetadataRequest>,
    pub smdp_signed2: Any,
    #[rasn(tag(application, 55))]
    pub smdp_signature2: OctetString,
    pub smdp_certificate: Any,
}

/// Profile metadata announced by the SM-DP+ ahead of download
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 37))]
pub struct StoreMetadataRequest {
    #[rasn(tag(application, 26))]
    pub iccid: OctetString,
    #[rasn(tag(context, 17))]
    pub service_provider_name: Option<Utf8String>,
    #[rasn(tag(context, 18))]
    pub profile_name: Option<Utf8String>,
    #[rasn(tag(context, 21))]
    pub profile_class: Option<u8>,
}

// --- GetBoundProfilePackage ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 58))]
pub struct GetBoundProfilePackageRequestEsipa {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    /// PrepareDownloadResponse verbatim, ok or error; the eIM interprets it
    pub prepare_download_response: Any,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 58)))]
pub struct GetBoundProfilePackageResponseEsipa(pub GetBoundProfilePackageResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum GetBoundProfilePackageResponseData {
    #[rasn(tag(context, 0))]
    Ok(GetBoundProfilePackageOkEsipa),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct GetBoundProfilePackageOkEsipa {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    /// BoundProfilePackage, opaque here, split by the segmenter
    pub bound_profile_package: Any,
}

// --- HandleNotification (no ASN.1 response; empty HTTP body on success) ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 61))]
pub struct HandleNotificationEsipa {
    /// PendingNotification verbatim as retrieved from the eUICC
    pub pending_notification: Any,
}

// --- CancelSession ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 65))]
pub struct CancelSessionRequestEsipa {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    /// CancelSessionResponse from the eUICC, verbatim
    pub cancel_session_response: Any,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 65)))]
pub struct CancelSessionResponseEsipa(pub CancelSessionResponseEsipaData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum CancelSessionResponseEsipaData {
    #[rasn(tag(context, 0))]
    Ok(CancelSessionOkEsipa),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct CancelSessionOkEsipa {}

// --- GetEimPackage ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 79))]
pub struct GetEimPackageRequest {
    #[rasn(tag(application, 26))]
    pub eid_value: OctetString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 79)))]
pub struct GetEimPackageResponse(pub GetEimPackageResponseData);

/// The three mutually exclusive package payloads, plus the no-package error
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum GetEimPackageResponseData {
    EuiccPackage(EuiccPackageRequest),
    IpaEuiccData(IpaEuiccDataRequest),
    ProfileDownloadTrigger(ProfileDownloadTriggerRequest),
    #[rasn(tag(context, 5))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 82))]
pub struct IpaEuiccDataRequest {
    /// Concatenated BER tags of the requested fields
    #[rasn(tag(application, 28))]
    pub tag_list: OctetString,
    pub search_criteria: Option<ProfileInfoListInner>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 84))]
pub struct ProfileDownloadTriggerRequest {
    #[rasn(tag(explicit(context, 0)))]
    pub profile_download_data: Option<ProfileDownloadData>,
    #[rasn(tag(context, 2))]
    pub eim_transaction_id: Option<OctetString>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum ProfileDownloadData {
    #[rasn(tag(context, 0))]
    ActivationCode(Utf8String),
    #[rasn(tag(context, 1))]
    ContactDefaultSmdp(()),
    #[rasn(tag(context, 2))]
    ContactSmds(ContactSmds),
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct ContactSmds {
    #[rasn(tag(context, 0))]
    pub smds_address: Option<Utf8String>,
}

// --- ProvideEimPackageResult ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 80)))]
pub struct ProvideEimPackageResult(pub ProvideEimPackageResultData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum ProvideEimPackageResultData {
    #[rasn(tag(context, 0))]
    EprAndNotifications(EprAndNotifications),
    #[rasn(tag(context, 1))]
    IpaEuiccData(IpaEuiccData),
    #[rasn(tag(context, 2))]
    ProfileDownloadTriggerResult(ProfileDownloadTriggerResult),
    #[rasn(tag(context, 3))]
    EimPackageError(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EprAndNotifications {
    /// EuiccPackageResult verbatim, signature intact
    pub euicc_package_result: Any,
    #[rasn(tag(context, 1))]
    pub notification_list: Vec<Any>,
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct ProfileDownloadTriggerResult {
    #[rasn(tag(context, 0))]
    pub eim_transaction_id: Option<OctetString>,
    /// ProfileInstallationResult verbatim, when installation got that far
    pub profile_installation_result: Option<Any>,
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 80))]
pub struct ProvideEimPackageResultResponse {
    #[rasn(tag(context, 0))]
    pub eim_acknowledgements: Option<Vec<u32>>,
}
