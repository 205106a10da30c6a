//! Pending notification forwarding
//!
//! Notifications accumulate on the eUICC whenever profiles change state.
//! Each one is forwarded verbatim to the eIM over HandleNotification and
//! removed from the card once accepted; a delivery failure keeps the rest
//! on the card for the next poll.

use tracing::{debug, warn};

use crate::asn1::esipa::{EsipaMessageFromIpaToEim, HandleNotificationEsipa};
use crate::asn1::NotificationMetadata;
use crate::error::{Error, FailureOrigin, Result};
use crate::esipa::EimLink;
use crate::euicc::EuiccInterface;
use crate::message::es10x::op_result;
use crate::message::Outcome;
use crate::util::parse_tlv_header;

/// Forward every pending notification; returns how many were delivered
pub fn process_pending(euicc: &mut dyn EuiccInterface, eim: &dyn EimLink) -> Result<usize> {
    let pending = match euicc.retrieve_notifications(None)? {
        Outcome::Ok(list) => list,
        Outcome::Error(code) => {
            return Err(Error::CardError {
                function: "RetrieveNotificationsList",
                code: code.code(),
            });
        }
    };
    if pending.is_empty() {
        return Ok(0);
    }
    debug!(pending = pending.len(), "forwarding pending notifications");

    let mut forwarded = 0;
    for notification in pending {
        let seq_number = notification_seq_number(notification.as_bytes());
        eim.notify(&EsipaMessageFromIpaToEim::HandleNotification(
            HandleNotificationEsipa {
                pending_notification: notification,
            },
        ))?;
        forwarded += 1;
        match seq_number {
            Some(seq_number) => {
                let status = euicc.notification_sent(seq_number)?;
                if status != op_result::OK {
                    warn!(seq_number, status, "notification removal refused");
                }
            }
            None => warn!("pending notification without a readable sequence number"),
        }
    }
    Ok(forwarded)
}

/// Sequence number of a pending notification, whichever shape it has.
///
/// Installation results carry their metadata inside the BF37 structure;
/// other signed notifications start with the metadata element directly.
fn notification_seq_number(bytes: &[u8]) -> Option<u32> {
    if bytes.starts_with(&[0xBF, 0x37]) {
        return crate::message::es10x::decode_profile_installation_result(bytes)
            .ok()
            .map(|result| result.data.notification_metadata.seq_number);
    }
    let (_, header_len, _) = parse_tlv_header(bytes).ok()?;
    let inner = &bytes[header_len..];
    let (tag, meta_header, meta_len) = parse_tlv_header(inner).ok()?;
    if tag != [0xBF, 0x2F] || inner.len() < meta_header + meta_len {
        return None;
    }
    let metadata: NotificationMetadata = crate::message::decode(
        "NotificationMetadata",
        &inner[..meta_header + meta_len],
        &[0xBF, 0x2F],
        FailureOrigin::Card,
    )
    .ok()?;
    Some(metadata.seq_number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asn1::es10x::{
        NotificationSentResponse, RetrieveNotificationsListResponse,
        RetrieveNotificationsListResponseData,
    };
    use crate::es10x::Es10xTransport;
    use crate::euicc::RealEuicc;
    use crate::message;
    use crate::procedure::testing::ScriptedEim;
    use crate::util::tlv_header;
    use ipa_apdu_core::MockTransport;
    use rasn::types::{Any, BitString, OctetString};

    fn card_response<T: rasn::Encode>(value: &T) -> Vec<u8> {
        let mut raw = message::encode("test", value).unwrap();
        raw.extend_from_slice(&[0x90, 0x00]);
        raw
    }

    fn other_notification(seq_number: u32) -> Vec<u8> {
        let metadata = NotificationMetadata {
            seq_number,
            profile_management_operation: BitString::repeat(false, 8),
            notification_address: "smdp.example.com".to_owned(),
            iccid: None,
        };
        let metadata_bytes = message::encode("test", &metadata).unwrap();
        // tbsOtherNotification followed by an opaque signature element
        let mut body = metadata_bytes;
        body.extend_from_slice(&[0x5F, 0x37, 0x02, 0xAA, 0xBB]);
        let mut out = tlv_header(&[0x30], body.len());
        out.extend_from_slice(&body);
        out
    }

    #[test]
    fn notifications_are_forwarded_and_removed() {
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&RetrieveNotificationsListResponse(
            RetrieveNotificationsListResponseData::List(vec![
                Any::new(other_notification(7)),
                Any::new(other_notification(8)),
            ]),
        )));
        mock.push_response(card_response(&NotificationSentResponse {
            delete_notification_status: 0,
        }));
        mock.push_response(card_response(&NotificationSentResponse {
            delete_notification_status: 0,
        }));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        let forwarded = process_pending(&mut euicc, &eim).unwrap();
        assert_eq!(forwarded, 2);
        assert_eq!(eim.sent_count(), 2);
        // Retrieve plus two removals
        assert_eq!(mock.commands.len(), 3);
    }

    #[test]
    fn empty_pending_list_is_a_quiet_no_op() {
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&RetrieveNotificationsListResponse(
            RetrieveNotificationsListResponseData::List(vec![]),
        )));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        assert_eq!(process_pending(&mut euicc, &eim).unwrap(), 0);
        assert_eq!(eim.sent_count(), 0);
    }

    #[test]
    fn unreadable_sequence_number_still_forwards() {
        let mut mock = MockTransport::new();
        mock.push_response(card_response(&RetrieveNotificationsListResponse(
            RetrieveNotificationsListResponseData::List(vec![Any::new(vec![0x30, 0x02, 0x85, 0x00])]),
        )));
        let mut euicc = RealEuicc::new(Es10xTransport::new(&mut mock, 0));

        let eim = ScriptedEim::default();
        // Forwarded, but no removal was attempted
        assert_eq!(process_pending(&mut euicc, &eim).unwrap(), 1);
        assert_eq!(mock.commands.len(), 1);
    }

    #[test]
    fn sequence_number_extraction_handles_both_shapes() {
        assert_eq!(notification_seq_number(&other_notification(41)), Some(41));
        assert_eq!(notification_seq_number(&[0x30, 0x00]), None);
    }
}
