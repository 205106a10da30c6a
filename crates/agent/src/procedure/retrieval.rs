//! eIM package retrieval and the data-request path
//!
//! GetEimPackage yields one of three payloads: an eUICC package to execute,
//! a request for eUICC data, or a profile download trigger. The data path
//! is answered here by collecting exactly the fields named in the eIM's
//! tag list.

use rasn::types::{BitString, OctetString};
use tracing::{debug, warn};

use crate::activation_code::ActivationCode;
use crate::asn1::esipa::{
    EsipaMessageFromIpaToEim, GetEimPackageRequest, GetEimPackageResponseData,
    IpaEuiccDataRequest, ProfileDownloadData, ProfileDownloadTriggerRequest,
};
use crate::asn1::{IpaCapabilities, IpaEuiccData, NotificationList};
use crate::config::IpaConfig;
use crate::error::{Error, Result};
use crate::esipa::EimLink;
use crate::euicc::EuiccInterface;
use crate::message::esipa::{expect_get_eim_package, EimPackageErrorCode};
use crate::message::Outcome;
use crate::util::tag_in_list;

/// SGP.32 version reported in IpaEuiccData
const IOT_VERSION: [u8; 3] = [1, 0, 1];

/// Ask the eIM whether it holds work for this eUICC.
///
/// `None` means the eIM had nothing pending; any other error code fails
/// the poll.
pub fn fetch_eim_package(
    eim: &dyn EimLink,
    eid: &OctetString,
) -> Result<Option<GetEimPackageResponseData>> {
    let request = EsipaMessageFromIpaToEim::GetEimPackage(GetEimPackageRequest {
        eid_value: eid.clone(),
    });
    match expect_get_eim_package(eim.call(&request)?)? {
        GetEimPackageResponseData::Error(code) => {
            match EimPackageErrorCode::from_code(code) {
                EimPackageErrorCode::NoEimPackageAvailable => {
                    debug!("no package pending at the eIM");
                    Ok(None)
                }
                other => Err(Error::EimError {
                    function: "GetEimPackage",
                    code: other.code(),
                }),
            }
        }
        package => Ok(Some(package)),
    }
}

/// Collect the eUICC data fields named in the request's tag list
pub fn collect_euicc_data(
    euicc: &mut dyn EuiccInterface,
    config: &IpaConfig,
    request: &IpaEuiccDataRequest,
) -> Result<IpaEuiccData> {
    let tags = request.tag_list.as_ref();
    let mut data = IpaEuiccData::default();

    if tag_in_list(&[0x80], tags) {
        data.default_smdp_address = config.default_smdp_address.clone();
    }
    if tag_in_list(&[0xBF, 0x20], tags) {
        data.euicc_info1 = Some(euicc.get_euicc_info1()?);
    }
    if tag_in_list(&[0xBF, 0x2B], tags) {
        match euicc.retrieve_notifications(None)? {
            Outcome::Ok(list) => {
                data.notifications_list = Some(NotificationList {
                    notification_list: list,
                });
            }
            Outcome::Error(code) => warn!(%code, "pending notifications unavailable"),
        }
    }
    if tag_in_list(&[0x83], tags) {
        data.eid_value = Some(euicc.get_eid()?);
    }

    let want_token = tag_in_list(&[0x84], tags);
    let want_eim_list = tag_in_list(&[0xA5], tags);
    if want_token || want_eim_list {
        let eims = euicc.get_eim_configuration_data()?;
        if want_token {
            data.association_token = eims
                .iter()
                .filter(|eim| {
                    config
                        .eim_id
                        .as_deref()
                        .map_or(true, |id| eim.eim_id == id)
                })
                .find_map(|eim| eim.association_token);
        }
        if want_eim_list {
            data.eim_configuration_data = Some(eims);
        }
    }

    if tag_in_list(&[0xA6], tags) {
        data.ipa_capabilities = Some(ipa_capabilities());
    }
    if tag_in_list(&[0x88], tags) {
        data.iot_version = Some(OctetString::copy_from_slice(&IOT_VERSION));
    }
    if tag_in_list(&[0xA9], tags) {
        let tag_list = request
            .search_criteria
            .as_ref()
            .and_then(|criteria| criteria.tag_list.clone());
        match euicc.profile_info_list(tag_list)? {
            Outcome::Ok(profiles) => data.profile_info_list = Some(profiles),
            Outcome::Error(code) => warn!(%code, "profile list unavailable"),
        }
    }

    Ok(data)
}

/// Indirect server communication and eIM-provided download data
fn ipa_capabilities() -> IpaCapabilities {
    let mut features = BitString::repeat(false, 6);
    features.set(1, true);
    features.set(2, true);
    IpaCapabilities {
        ipa_features: features,
    }
}

/// The activation code out of a download trigger.
///
/// Only the activation-code variant is supported: default-SM-DP+ and SM-DS
/// contact would need discovery flows this agent does not run.
pub fn activation_code_from_trigger(
    trigger: &ProfileDownloadTriggerRequest,
) -> Result<ActivationCode> {
    match &trigger.profile_download_data {
        Some(ProfileDownloadData::ActivationCode(code)) => Ok(ActivationCode::parse(code)?),
        _ => Err(Error::UnsupportedDownloadData),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::es10x::{
        GetEimConfigurationDataResponse, GetEuiccDataResponse, ProfileInfoListInner,
    };
    use crate::asn1::EimConfigurationData;
    use crate::es10x::Es10xTransport;
    use crate::euicc::RealEuicc;
    use crate::message;
    use ipa_apdu_core::MockTransport;

    fn card_response<T: rasn::Encode>(value: &T) -> Vec<u8> {
        let mut raw = message::encode("test", value).unwrap();
        raw.extend_from_slice(&[0x90, 0x00]);
        raw
    }

    fn data_request(tag_list: &[u8]) -> IpaEuiccDataRequest {
        IpaEuiccDataRequest {
            tag_list: OctetString::copy_from_slice(tag_list),
            search_criteria: None,
        }
    }

    #[test]
    fn only_requested_fields_are_collected() {
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&GetEuiccDataResponse {
            eid_value: OctetString::copy_from_slice(&[0x89; 16]),
        }));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let config = IpaConfig::new("eim.example.com");
        // EID, IPA capabilities and version: no other card traffic
        let data =
            collect_euicc_data(&mut euicc, &config, &data_request(&[0x83, 0xA6, 0x88])).unwrap();

        assert!(data.eid_value.is_some());
        assert!(data.ipa_capabilities.is_some());
        assert_eq!(
            data.iot_version,
            Some(OctetString::copy_from_slice(&[1, 0, 1]))
        );
        assert!(data.euicc_info1.is_none());
        assert!(data.eim_configuration_data.is_none());
        assert!(data.profile_info_list.is_none());
    }

    #[test]
    fn association_token_follows_the_pinned_eim() {
        let eims = vec![
            EimConfigurationData {
                eim_id: "other".to_owned(),
                eim_fqdn: None,
                eim_id_type: None,
                counter_value: None,
                association_token: Some(11),
                eim_public_key_data: None,
                eim_supported_protocol: None,
                euicc_ci_pk_id: None,
            },
            EimConfigurationData {
                eim_id: "mine".to_owned(),
                eim_fqdn: None,
                eim_id_type: None,
                counter_value: None,
                association_token: Some(42),
                eim_public_key_data: None,
                eim_supported_protocol: None,
                euicc_ci_pk_id: None,
            },
        ];
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&GetEimConfigurationDataResponse {
            eim_configuration_data_list: eims,
        }));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let config = IpaConfig::new("eim.example.com").with_eim_id("mine");
        let data = collect_euicc_data(&mut euicc, &config, &data_request(&[0x84])).unwrap();
        assert_eq!(data.association_token, Some(42));
    }

    #[test]
    fn trigger_without_activation_code_is_unsupported() {
        let trigger = ProfileDownloadTriggerRequest {
            profile_download_data: Some(ProfileDownloadData::ContactDefaultSmdp(())),
            eim_transaction_id: None,
        };
        assert!(matches!(
            activation_code_from_trigger(&trigger),
            Err(Error::UnsupportedDownloadData)
        ));

        let trigger = ProfileDownloadTriggerRequest {
            profile_download_data: None,
            eim_transaction_id: None,
        };
        assert!(matches!(
            activation_code_from_trigger(&trigger),
            Err(Error::UnsupportedDownloadData)
        ));

        let trigger = ProfileDownloadTriggerRequest {
            profile_download_data: Some(ProfileDownloadData::ActivationCode(
                "1$smdp.example.com$TOKEN".to_owned(),
            )),
            eim_transaction_id: None,
        };
        let code = activation_code_from_trigger(&trigger).unwrap();
        assert_eq!(code.smdp_address, "smdp.example.com");
    }

    #[test]
    fn profile_list_search_criteria_pass_through() {
        let mut mock = MockTransport::new();
        mock.push_response(card_response(
            &crate::asn1::es10x::ProfileInfoListResponse(
                crate::asn1::es10x::ProfileInfoListResponseData::Ok(vec![]),
            ),
        ));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let request = IpaEuiccDataRequest {
            tag_list: OctetString::copy_from_slice(&[0xA9]),
            search_criteria: Some(ProfileInfoListInner {
                tag_list: Some(OctetString::copy_from_slice(&[0x5A, 0x4F])),
            }),
        };
        let config = IpaConfig::new("eim.example.com");
        let data = collect_euicc_data(&mut euicc, &config, &request).unwrap();
        assert_eq!(data.profile_info_list, Some(vec![]));

        // The requested tag list reached the card inside the request body
        assert!(mock.commands[0]
            .windows(4)
            .any(|w| w == [0x5C, 0x02, 0x5A, 0x4F]));
    }
}
