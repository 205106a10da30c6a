//! eUICC package execution and result delivery
//!
//! A package received from GetEimPackage is executed on the card (or the
//! emulation layer) and answered with ProvideEimPackageResult carrying the
//! verbatim EuiccPackageResult plus any pending notifications. Execution
//! and delivery are split so a result whose delivery fails can be retried
//! on a later poll without executing the package again.

use rasn::types::Any;
use tracing::{debug, warn};

use crate::asn1::es10x::{EuiccPackage, EuiccPackageRequest, EuiccResultData, Psmo};
use crate::asn1::esipa::{
    EprAndNotifications, EsipaMessageFromIpaToEim, ProvideEimPackageResult,
    ProvideEimPackageResultData,
};
use crate::error::Result;
use crate::esipa::EimLink;
use crate::euicc::EuiccInterface;
use crate::message::es10x::op_result;
use crate::message::esipa::expect_provide_eim_package_result;
use crate::message::{self, Outcome};

/// A package result ready for delivery, with what its execution changed
#[derive(Debug, Clone)]
pub struct PackageExecution {
    pub response: ProvideEimPackageResultData,
    /// An enable, disable, delete or rollback took effect
    pub profile_changed: bool,
    /// An enable with the rollback flag succeeded; ProfileRollback can
    /// restore the previous profile until something else changes state
    pub rollback_available: bool,
}

/// Execute a package on the eUICC and assemble the delivery payload.
///
/// The request is re-encoded for the card; eIM envelopes are DER, so the
/// bytes match the material the eIM signed.
pub fn execute_package(
    euicc: &mut dyn EuiccInterface,
    request: &EuiccPackageRequest,
) -> Result<PackageExecution> {
    let package_bytes = message::encode("EuiccPackageRequest", request)?;
    let (response, outcome) = euicc.load_euicc_package(&package_bytes)?;

    let (profile_changed, rollback_available) = match &outcome {
        Outcome::Ok(signed) => execution_flags(request, &signed.data_signed.euicc_result),
        Outcome::Error(code) => {
            warn!(%code, "eUICC refused the package, forwarding the error result");
            (false, false)
        }
    };

    let notification_list = match euicc.retrieve_notifications(None)? {
        Outcome::Ok(list) => list,
        Outcome::Error(code) => {
            warn!(%code, "pending notifications unavailable");
            Vec::new()
        }
    };
    debug!(
        profile_changed,
        rollback_available,
        notifications = notification_list.len(),
        "package executed"
    );

    Ok(PackageExecution {
        response: ProvideEimPackageResultData::EprAndNotifications(EprAndNotifications {
            euicc_package_result: Any::new(response.to_vec()),
            notification_list,
        }),
        profile_changed,
        rollback_available,
    })
}

fn execution_flags(request: &EuiccPackageRequest, results: &[EuiccResultData]) -> (bool, bool) {
    let operations = match &request.euicc_package_signed.euicc_package {
        EuiccPackage::PsmoList(operations) => operations.as_slice(),
        EuiccPackage::EcoList(_) => return (false, false),
    };
    let mut profile_changed = false;
    let mut rollback_available = false;
    for (operation, result) in operations.iter().zip(results) {
        match (operation, result) {
            (Psmo::Enable(enable), EuiccResultData::Enable(op_result::OK)) => {
                profile_changed = true;
                if enable.rollback_flag.is_some() {
                    rollback_available = true;
                }
            }
            (Psmo::Disable(_), EuiccResultData::Disable(op_result::OK))
            | (Psmo::Delete(_), EuiccResultData::Delete(op_result::OK)) => {
                profile_changed = true;
            }
            _ => {}
        }
    }
    (profile_changed, rollback_available)
}

/// Deliver a package (or data) result and process the acknowledgements.
///
/// Every acknowledged sequence number is removed from the card's pending
/// notification list.
pub fn deliver_result(
    euicc: &mut dyn EuiccInterface,
    eim: &dyn EimLink,
    response: ProvideEimPackageResultData,
) -> Result<()> {
    let request =
        EsipaMessageFromIpaToEim::ProvideEimPackageResult(ProvideEimPackageResult(response));
    let acknowledged = expect_provide_eim_package_result(eim.call(&request)?)?;
    for seq_number in acknowledged.eim_acknowledgements.unwrap_or_default() {
        let status = euicc.notification_sent(seq_number)?;
        if status != op_result::OK {
            warn!(seq_number, status, "notification removal refused");
        }
    }
    Ok(())
}
