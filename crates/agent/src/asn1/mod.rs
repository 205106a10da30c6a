//! ASN.1 message schemas for the ES10x and ESipa protocols
//!
//! Types derive `rasn` codecs; requests are DER-encoded, responses are
//! BER-decoded. CHOICE types are closed Rust enums so an unknown variant is
//! a decode error rather than a silently misread union. Structures that are
//! forwarded verbatim between the eIM and the eUICC (signed material,
//! certificates, bound profile packages) are carried as [`Any`] so their
//! signed bytes are never re-encoded field by field.
//!
//! Context tag numbers follow the GSMA function tag space; the subset used
//! here is pinned by the round-trip tests in the adapter layer.

pub mod es10x;
pub mod esipa;

use rasn::types::{Any, BitString, ObjectIdentifier, OctetString, Utf8String};
use rasn::{AsnType, Decode, Decoder as _, Encode, Encoder as _};

/// EUICCInfo1: versions and the CA key identifiers the eUICC accepts
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 32))]
pub struct EuiccInfo1 {
    /// Lowest SGP.22 version the eUICC supports
    #[rasn(tag(context, 2))]
    pub svn: OctetString,
    /// CA public key identifiers acceptable for server certificate chains
    #[rasn(tag(context, 9))]
    pub ci_pk_id_list_for_verification: Vec<OctetString>,
    /// CA public key identifiers the eUICC can sign under
    #[rasn(tag(context, 10))]
    pub ci_pk_id_list_for_signing: Vec<OctetString>,
}

/// Server-signed material inside an InitiateAuthentication response.
///
/// Decoded from the verbatim `serverSigned1` bytes purely for the echo
/// cross-checks; the bytes themselves travel on untouched.
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct ServerSigned1 {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    #[rasn(tag(context, 1))]
    pub euicc_challenge: OctetString,
    #[rasn(tag(context, 3))]
    pub server_address: Utf8String,
    #[rasn(tag(context, 4))]
    pub server_challenge: OctetString,
}

/// Device capability releases reported in ctxParams1
#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct DeviceCapabilities {
    #[rasn(tag(context, 0))]
    pub gsm_supported_release: Option<OctetString>,
    #[rasn(tag(context, 1))]
    pub utran_supported_release: Option<OctetString>,
    #[rasn(tag(context, 2))]
    pub lte_supported_release: Option<OctetString>,
}

/// Device identification passed to the SM-DP+ during authentication
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct DeviceInfo {
    /// Type allocation code, 4 bytes BCD
    #[rasn(tag(context, 0))]
    pub tac: OctetString,
    #[rasn(tag(context, 1))]
    pub device_capabilities: DeviceCapabilities,
}

/// Parameters the IPA contributes to AuthenticateServer
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum CtxParams1 {
    #[rasn(tag(context, 0))]
    ForCommonAuthentication(CtxParamsForCommonAuthentication),
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct CtxParamsForCommonAuthentication {
    #[rasn(tag(context, 0))]
    pub matching_id: Option<Utf8String>,
    #[rasn(tag(context, 1))]
    pub device_info: DeviceInfo,
}

/// Profile selector used by the ES10c state-control functions
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(choice)]
pub enum ProfileIdentifier {
    #[rasn(tag(application, 15))]
    IsdpAid(OctetString),
    #[rasn(tag(application, 26))]
    Iccid(OctetString),
}

/// Metadata attached to every eUICC notification
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 47))]
pub struct NotificationMetadata {
    #[rasn(tag(context, 0))]
    pub seq_number: u32,
    /// Bit string of the profile management operation that produced this
    #[rasn(tag(context, 1))]
    pub profile_management_operation: BitString,
    pub notification_address: Utf8String,
    #[rasn(tag(application, 26))]
    pub iccid: Option<OctetString>,
}

/// Signed outcome of a profile installation, produced by the eUICC on the
/// final bound profile package segment
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 55))]
pub struct ProfileInstallationResult {
    #[rasn(tag(context, 39))]
    pub data: ProfileInstallationResultData,
    #[rasn(tag(application, 55))]
    pub euicc_sign_pir: OctetString,
}

#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct ProfileInstallationResultData {
    #[rasn(tag(context, 0))]
    pub transaction_id: OctetString,
    pub notification_metadata: NotificationMetadata,
    pub smdp_oid: ObjectIdentifier,
    /// Success or error detail; opaque to the agent, interpreted by the eIM
    pub final_result: Any,
}

/// One eIM entry in the eUICC's (or the emulated) configuration store
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct EimConfigurationData {
    #[rasn(tag(context, 0))]
    pub eim_id: Utf8String,
    #[rasn(tag(context, 1))]
    pub eim_fqdn: Option<Utf8String>,
    #[rasn(tag(context, 2))]
    pub eim_id_type: Option<u8>,
    #[rasn(tag(context, 3))]
    pub counter_value: Option<u32>,
    #[rasn(tag(context, 4))]
    pub association_token: Option<i64>,
    /// Verbatim key container, opaque to the agent
    #[rasn(tag(explicit(context, 5)))]
    pub eim_public_key_data: Option<Any>,
    #[rasn(tag(context, 7))]
    pub eim_supported_protocol: Option<BitString>,
    #[rasn(tag(context, 8))]
    pub euicc_ci_pk_id: Option<OctetString>,
}

/// IPA feature advertisement inside IpaEuiccData
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
pub struct IpaCapabilities {
    #[rasn(tag(context, 0))]
    pub ipa_features: BitString,
}

/// Pending notifications wrapped for transport inside IpaEuiccData
#[derive(Debug, Clone, PartialEq, AsnType, Decode, Encode)]
#[rasn(tag(context, 43))]
pub struct NotificationList {
    #[rasn(tag(context, 0))]
    pub notification_list: Vec<Any>,
}

/// eUICC data fields collected in answer to an eIM tag-list request.
///
/// Every field is optional; which ones are populated is driven by the
/// requested tag list.
#[derive(Debug, Clone, Default, PartialEq, AsnType, Decode, Encode)]
pub struct IpaEuiccData {
    #[rasn(tag(context, 0))]
    pub default_smdp_address: Option<Utf8String>,
    pub euicc_info1: Option<EuiccInfo1>,
    pub notifications_list: Option<NotificationList>,
    #[rasn(tag(context, 3))]
    pub eid_value: Option<OctetString>,
    #[rasn(tag(context, 4))]
    pub association_token: Option<i64>,
    #[rasn(tag(context, 5))]
    pub eim_configuration_data: Option<Vec<EimConfigurationData>>,
    #[rasn(tag(context, 6))]
    pub ipa_capabilities: Option<IpaCapabilities>,
    #[rasn(tag(context, 8))]
    pub iot_version: Option<OctetString>,
    #[rasn(tag(context, 9))]
    pub profile_info_list: Option<Vec<es10x::ProfileInfo>>,
}
