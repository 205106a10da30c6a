//! ES10a/ES10b/ES10c message schemas carried over the card transport
//!
//! Requests are plain tagged SEQUENCEs. Responses whose ASN.1 shape is a
//! tagged CHOICE use a `delegate` wrapper with an explicit outer tag over a
//! closed enum, so an unexpected variant fails decode instead of being
//! misread.

use rasn::types::{Any, BitString, OctetString, Utf8String};
use rasn::{AsnType, Decode, Decoder as _, Encode, Encoder as _};

use super::{EimConfigurationData, ProfileIdentifier};

// --- GetEuiccInfo1 / GetEuiccChallenge ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 32))]
pub struct GetEuiccInfo1Request {}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 46))]
pub struct GetEuiccChallengeRequest {}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 46))]
pub struct GetEuiccChallengeResponse {
    pub euicc_challenge: OctetString,
}

// --- AuthenticateServer ---

/// Signed server material handed to the eUICC for verification.
///
/// `server_signed1` and `server_certificate` are the verbatim bytes
/// received from the eIM; re-encoding them field by field would break the
/// signature.
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 56))]
pub struct AuthenticateServerRequest {
    pub server_signed1: Any,
    #[rasn(tag(application, 55))]
    pub server_signature1: OctetString,
    pub euicc_ci_pk_id_to_be_used: OctetString,
    pub server_certificate: Any,
    pub ctx_params1: super::CtxParams1,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 56)))]
pub struct AuthenticateServerResponse(pub AuthenticateServerResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum AuthenticateServerResponseData {
    #[rasn(tag(context, 0))]
    Ok(AuthenticateResponseOk),
    #[rasn(tag(context, 1))]
    Error(AuthenticateResponseError),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct AuthenticateResponseOk {
    pub euicc_signed1: Any,
    #[rasn(tag(application, 55))]
    pub euicc_signature1: OctetString,
    pub euicc_certificate: Any,
    pub eum_certificate: Any,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct AuthenticateResponseError {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    #[rasn(tag(context, 1))]
    pub authenticate_error_code: u8,
}

// --- PrepareDownload ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 33))]
pub struct PrepareDownloadRequest {
    pub smdp_signed2: Any,
    #[rasn(tag(application, 55))]
    pub smdp_signature2: OctetString,
    /// SHA-256 of the confirmation code, when one is required
    pub hash_cc: Option<OctetString>,
    pub smdp_certificate: Any,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 33)))]
pub struct PrepareDownloadResponse(pub PrepareDownloadResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum PrepareDownloadResponseData {
    #[rasn(tag(context, 0))]
    Ok(PrepareDownloadResponseOk),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct PrepareDownloadResponseOk {
    pub euicc_signed2: Any,
    #[rasn(tag(application, 55))]
    pub euicc_signature2: OctetString,
}

// --- CancelSession ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 65))]
pub struct CancelSessionRequest {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    #[rasn(tag(context, 1))]
    pub reason: u8,
}

/// Session cancellation reason codes
pub mod cancel_reason {
    pub const END_USER_REJECTION: u8 = 0;
    pub const POSTPONED: u8 = 1;
    pub const TIMEOUT: u8 = 2;
    pub const PPR_NOT_ALLOWED: u8 = 3;
    pub const METADATA_MISMATCH: u8 = 4;
    pub const LOAD_BPP_EXECUTION_ERROR: u8 = 5;
    pub const UNDEFINED_REASON: u8 = 127;
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 65)))]
pub struct CancelSessionResponse(pub CancelSessionResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum CancelSessionResponseData {
    #[rasn(tag(context, 0))]
    Ok(CancelSessionResponseOk),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct CancelSessionResponseOk {
    pub euicc_cancel_session_signed: Any,
    #[rasn(tag(application, 55))]
    pub euicc_cancel_session_signature: OctetString,
}

/// Inner signed structure of a cancel-session response, decoded from the
/// verbatim bytes only for the transaction-id cross-check
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EuiccCancelSessionSigned {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    #[rasn(tag(context, 1))]
    pub reason: u8,
}

// --- Notifications ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 43))]
pub struct RetrieveNotificationsListRequest {
    #[rasn(tag(explicit(context, 0)))]
    pub search_criteria: Option<NotificationSearchCriteria>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum NotificationSearchCriteria {
    #[rasn(tag(context, 0))]
    SeqNumber(u32),
    #[rasn(tag(context, 1))]
    ProfileManagementOperation(BitString),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 43)))]
pub struct RetrieveNotificationsListResponse(pub RetrieveNotificationsListResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum RetrieveNotificationsListResponseData {
    /// Pending notifications, verbatim, to be forwarded unmodified
    #[rasn(tag(context, 0))]
    List(Vec<Any>),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 48))]
pub struct NotificationSentRequest {
    #[rasn(tag(context, 0))]
    pub seq_number: u32,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 48))]
pub struct NotificationSentResponse {
    #[rasn(tag(context, 0))]
    pub delete_notification_status: u8,
}

// --- GetEuiccData (EID) ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 62))]
pub struct GetEuiccDataRequest {
    #[rasn(tag(application, 28))]
    pub tag_list: OctetString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 62))]
pub struct GetEuiccDataResponse {
    #[rasn(tag(application, 26))]
    pub eid_value: OctetString,
}

// --- ES10c profile state control ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 45))]
pub struct ProfileInfoListRequest {
    #[rasn(tag(application, 28))]
    pub tag_list: Option<OctetString>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 45)))]
pub struct ProfileInfoListResponse(pub ProfileInfoListResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum ProfileInfoListResponseData {
    #[rasn(tag(context, 0))]
    Ok(Vec<ProfileInfo>),
    #[rasn(tag(context, 1))]
    Error(u8),
}

/// Profile state values inside [`ProfileInfo`]
pub mod profile_state {
    pub const DISABLED: u8 = 0;
    pub const ENABLED: u8 = 1;
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(private, 3))]
pub struct ProfileInfo {
    #[rasn(tag(application, 26))]
    pub iccid: Option<OctetString>,
    #[rasn(tag(application, 15))]
    pub isdp_aid: Option<OctetString>,
    #[rasn(tag(context, 112))]
    pub profile_state: Option<u8>,
    #[rasn(tag(context, 16))]
    pub profile_nickname: Option<Utf8String>,
    #[rasn(tag(context, 17))]
    pub service_provider_name: Option<Utf8String>,
    #[rasn(tag(context, 18))]
    pub profile_name: Option<Utf8String>,
    #[rasn(tag(context, 21))]
    pub profile_class: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 49))]
pub struct EnableProfileRequest {
    pub profile_identifier: ProfileIdentifier,
    pub refresh_flag: bool,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 49))]
pub struct EnableProfileResponse {
    #[rasn(tag(context, 0))]
    pub enable_result: u8,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 50))]
pub struct DisableProfileRequest {
    pub profile_identifier: ProfileIdentifier,
    pub refresh_flag: bool,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 50))]
pub struct DisableProfileResponse {
    #[rasn(tag(context, 0))]
    pub disable_result: u8,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 51)))]
pub struct DeleteProfileRequest(pub ProfileIdentifier);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 51))]
pub struct DeleteProfileResponse {
    #[rasn(tag(context, 0))]
    pub delete_result: u8,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 52))]
pub struct EuiccMemoryResetRequest {
    #[rasn(tag(context, 2))]
    pub reset_options: BitString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 52))]
pub struct EuiccMemoryResetResponse {
    #[rasn(tag(context, 0))]
    pub reset_result: u8,
}

// --- SGP.32 eUICC package execution ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 81))]
pub struct EuiccPackageRequest {
    pub euicc_package_signed: EuiccPackageSigned,
    #[rasn(tag(application, 55))]
    pub eim_signature: OctetString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EuiccPackageSigned {
    #[rasn(tag(context, 0))]
    pub eim_id: Utf8String,
    #[rasn(tag(application, 26))]
    pub eid_value: OctetString,
    #[rasn(tag(context, 1))]
    pub counter_value: u32,
    #[rasn(tag(context, 2))]
    pub transaction_id: Option<OctetString>,
    #[rasn(tag(explicit(context, 3)))]
    pub euicc_package: EuiccPackage,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum EuiccPackage {
    #[rasn(tag(context, 0))]
    PsmoList(Vec<Psmo>),
    #[rasn(tag(context, 1))]
    EcoList(Vec<Eco>),
}

/// Profile state management operation
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum Psmo {
    #[rasn(tag(context, 3))]
    Enable(PsmoEnable),
    #[rasn(tag(context, 4))]
    Disable(PsmoDisable),
    #[rasn(tag(context, 5))]
    Delete(PsmoDelete),
    #[rasn(tag(context, 45))]
    ListProfileInfo(ProfileInfoListInner),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct PsmoEnable {
    #[rasn(tag(application, 26))]
    pub iccid: OctetString,
    /// NULL marker allowing a later rollback to the previous profile
    pub rollback_flag: Option<()>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct PsmoDisable {
    #[rasn(tag(application, 26))]
    pub iccid: OctetString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct PsmoDelete {
    #[rasn(tag(application, 26))]
    pub iccid: OctetString,
}

/// ProfileInfoList parameters when carried inside a package operation
#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct ProfileInfoListInner {
    #[rasn(tag(application, 28))]
    pub tag_list: Option<OctetString>,
}

/// eIM configuration operation
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum Eco {
    #[rasn(tag(context, 8))]
    AddEim(EimConfigurationData),
    #[rasn(tag(context, 9))]
    DeleteEim(EcoDeleteEim),
    #[rasn(tag(context, 10))]
    UpdateEim(EimConfigurationData),
    #[rasn(tag(context, 11))]
    ListEim(EcoListEim),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EcoDeleteEim {
    #[rasn(tag(context, 0))]
    pub eim_id: Utf8String,
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct EcoListEim {}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 81)))]
pub struct EuiccPackageResult(pub EuiccPackageResultData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum EuiccPackageResultData {
    #[rasn(tag(context, 0))]
    Signed(EuiccPackageResultSigned),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EuiccPackageResultSigned {
    pub data_signed: EuiccPackageResultDataSigned,
    #[rasn(tag(application, 55))]
    pub euicc_sign_epr: OctetString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EuiccPackageResultDataSigned {
    #[rasn(tag(context, 0))]
    pub eim_id: Utf8String,
    #[rasn(tag(context, 1))]
    pub counter_value: u32,
    #[rasn(tag(context, 2))]
    pub transaction_id: Option<OctetString>,
    #[rasn(tag(context, 3))]
    pub seq_number: u32,
    #[rasn(tag(context, 4))]
    pub euicc_result: Vec<EuiccResultData>,
}

/// Per-operation outcome inside a package result; code 0 is success
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum EuiccResultData {
    #[rasn(tag(context, 3))]
    Enable(u8),
    #[rasn(tag(context, 4))]
    Disable(u8),
    #[rasn(tag(context, 5))]
    Delete(u8),
    #[rasn(tag(context, 8))]
    AddEim(u8),
    #[rasn(tag(context, 9))]
    DeleteEim(u8),
    #[rasn(tag(context, 10))]
    UpdateEim(u8),
    #[rasn(tag(context, 11))]
    ListEim(EimIdList),
    #[rasn(tag(context, 12))]
    Rollback(u8),
    #[rasn(tag(context, 45))]
    ListProfileInfo(EuiccProfileInfoList),
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct EuiccProfileInfoList {
    #[rasn(tag(context, 0))]
    pub profiles: Vec<ProfileInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct EimIdList {
    #[rasn(tag(context, 0))]
    pub eim_ids: Vec<Utf8String>,
}

// --- SGP.32 eIM configuration over ES10b ---

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 85))]
pub struct GetEimConfigurationDataRequest {}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 85))]
pub struct GetEimConfigurationDataResponse {
    #[rasn(tag(context, 0))]
    pub eim_configuration_data_list: Vec<EimConfigurationData>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 87))]
pub struct AddInitialEimRequest {
    #[rasn(tag(context, 0))]
    pub eim_configuration_data: EimConfigurationData,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(delegate, tag(explicit(context, 87)))]
pub struct AddInitialEimResponse(pub AddInitialEimResponseData);

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum AddInitialEimResponseData {
    #[rasn(tag(context, 0))]
    Ok(AddInitialEimOk),
    #[rasn(tag(context, 1))]
    Error(u8),
}

#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct AddInitialEimOk {
    #[rasn(tag(context, 0))]
    pub association_token: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 88))]
pub struct ProfileRollbackRequest {
    pub refresh_flag: bool,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 88))]
pub struct ProfileRollbackResponse {
    #[rasn(tag(context, 0))]
    pub rollback_result: u8,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 90))]
pub struct EnableUsingDdRequest {}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 90))]
pub struct EnableUsingDdResponse {
    #[rasn(tag(context, 0))]
    pub enable_using_dd_result: u8,
}
