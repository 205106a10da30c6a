//! Common Cancel Session
//!
//! Tears a session down on both ends: the eUICC produces a signed
//! cancellation which is forwarded to the server through the eIM. The
//! procedure only succeeds when both legs do.

use rasn::types::{Any, OctetString};
use tracing::debug;

use crate::asn1::esipa::{
    CancelSessionRequestEsipa, CancelSessionResponseEsipaData, EsipaMessageFromIpaToEim,
};
use crate::error::{Error, Result};
use crate::esipa::EimLink;
use crate::euicc::EuiccInterface;
use crate::message::esipa::expect_cancel_session;
use crate::message::Outcome;

pub fn common_cancel_session(
    euicc: &mut dyn EuiccInterface,
    eim: &dyn EimLink,
    transaction_id: &[u8],
    reason: u8,
) -> Result<()> {
    debug!(transaction_id = %hex::encode_upper(transaction_id), reason, "cancelling session");
    let (response, outcome) = euicc.cancel_session(transaction_id, reason)?;
    if let Outcome::Error(code) = outcome {
        return Err(Error::CardError {
            function: "CancelSession",
            code: code.code(),
        });
    }

    let request = EsipaMessageFromIpaToEim::CancelSession(CancelSessionRequestEsipa {
        transaction_id: OctetString::copy_from_slice(transaction_id),
        cancel_session_response: Any::new(response.to_vec()),
    });
    match expect_cancel_session(eim.call(&request)?)? {
        CancelSessionResponseEsipaData::Ok(_) => Ok(()),
        CancelSessionResponseEsipaData::Error(code) => Err(Error::EimError {
            function: "CancelSession",
            code,
        }),
    }
}
