//! Profile download and installation
//!
//! Runs the full chain for one activation code: mutual authentication,
//! PrepareDownload, bound-profile-package retrieval, streamed installation
//! and delivery of the ProfileInstallationResult back to the eIM. The
//! PrepareDownload response travels to the server verbatim whether the
//! eUICC accepted or refused; the server owns that decision.

use bytes::Bytes;
use rasn::types::Any;
use tracing::{debug, info, warn};

use crate::activation_code::ActivationCode;
use crate::asn1::es10x::PrepareDownloadRequest;
use crate::asn1::esipa::{
    EsipaMessageFromIpaToEim, GetBoundProfilePackageRequestEsipa,
    GetBoundProfilePackageResponseData, HandleNotificationEsipa,
};
use crate::asn1::ProfileInstallationResult;
use crate::bpp::segment_bound_profile_package;
use crate::config::IpaConfig;
use crate::error::{Error, Result};
use crate::esipa::EimLink;
use crate::euicc::EuiccInterface;
use crate::message::es10x::{decode_profile_installation_result, op_result};
use crate::message::esipa::expect_get_bound_profile_package;
use crate::message::Outcome;

/// Outcome of a completed (successfully or not) installation attempt
#[derive(Debug, Clone)]
pub struct DownloadedProfile {
    /// Decoded installation result; `final_result` says whether the
    /// profile actually installed
    pub installation_result: ProfileInstallationResult,
    /// The same result verbatim, as forwarded to the eIM
    pub result_bytes: Bytes,
}

pub fn download_profile(
    euicc: &mut dyn EuiccInterface,
    eim: &dyn EimLink,
    config: &IpaConfig,
    code: &ActivationCode,
) -> Result<DownloadedProfile> {
    let session = super::auth::common_mutual_authentication(
        euicc,
        eim,
        config,
        &code.smdp_address,
        Some(&code.token),
    )?;
    if let Some(metadata) = &session.profile_metadata {
        debug!(
            iccid = %hex::encode_upper(&metadata.iccid),
            profile = metadata.profile_name.as_deref().unwrap_or(""),
            "profile metadata received"
        );
    }
    if code.confirmation_code_required {
        // No confirmation code channel on an unattended device; the server
        // will refuse the download when it insists on one
        warn!("activation code requires a confirmation code, proceeding without");
    }

    let request = PrepareDownloadRequest {
        smdp_signed2: session.smdp_signed2.clone(),
        smdp_signature2: session.smdp_signature2.clone(),
        hash_cc: None,
        smdp_certificate: session.smdp_certificate.clone(),
    };
    let (response, outcome) = euicc.prepare_download(&request)?;
    let euicc_refused = match &outcome {
        Outcome::Ok(_) => false,
        Outcome::Error(code) => {
            warn!(%code, "eUICC refused PrepareDownload, forwarding the refusal");
            true
        }
    };

    let request =
        EsipaMessageFromIpaToEim::GetBoundProfilePackage(GetBoundProfilePackageRequestEsipa {
            transaction_id: session.transaction_id.clone(),
            prepare_download_response: Any::new(response.to_vec()),
        });
    let ok = match expect_get_bound_profile_package(eim.call(&request)?)? {
        GetBoundProfilePackageResponseData::Ok(ok) => ok,
        GetBoundProfilePackageResponseData::Error(code) => {
            return Err(Error::EimError {
                function: "GetBoundProfilePackage",
                code,
            });
        }
    };
    if euicc_refused {
        return Err(Error::ProtocolViolation(
            "server delivered a package for a refused PrepareDownload",
        ));
    }
    if ok.transaction_id != session.transaction_id {
        return Err(Error::UnexpectedEimResponse(
            "GetBoundProfilePackage echoed a different transaction id",
        ));
    }

    let result_bytes = install_bound_profile_package(euicc, ok.bound_profile_package.as_bytes())?;
    let installation_result = decode_profile_installation_result(&result_bytes)?;

    // The installation result is delivered as a pending notification and
    // removed from the card once the eIM has taken it
    eim.notify(&EsipaMessageFromIpaToEim::HandleNotification(
        HandleNotificationEsipa {
            pending_notification: Any::new(result_bytes.to_vec()),
        },
    ))?;
    let seq_number = installation_result.data.notification_metadata.seq_number;
    let status = euicc.notification_sent(seq_number)?;
    if status != op_result::OK {
        warn!(seq_number, status, "installation notification removal refused");
    }

    info!(
        transaction_id = %hex::encode_upper(&session.transaction_id),
        "profile installation attempt finished"
    );
    Ok(DownloadedProfile {
        installation_result,
        result_bytes,
    })
}

/// Stream the package segments, stopping at the first non-empty response.
///
/// Intermediate segments answer empty; the ProfileInstallationResult comes
/// on the last one, or earlier when the eUICC aborts the installation.
fn install_bound_profile_package(
    euicc: &mut dyn EuiccInterface,
    bound_profile_package: &[u8],
) -> Result<Bytes> {
    let segments = segment_bound_profile_package(bound_profile_package)?;
    let total = segments.len();
    for (index, segment) in segments.iter().enumerate() {
        let response = euicc.load_bpp_segment(segment)?;
        if !response.is_empty() {
            if index + 1 < total {
                warn!(segment = index, total, "installation ended before the final segment");
            }
            return Ok(response);
        }
    }
    Err(Error::MissingInstallationResult)
}
