//! ES10x block transport over a smart card link
//!
//! Frames an ES10x request into chained STORE DATA blocks and drains the
//! chained GET RESPONSE sequence for the reply, per the SGP.22 ISD-R
//! transport rules. One instance owns the card for its whole lifetime and
//! speaks only four APDU families: MANAGE CHANNEL, SELECT, STORE DATA and
//! GET RESPONSE.

use bytes::{BufMut, Bytes, BytesMut};
use ipa_apdu_core::{CardTransport, Command, Response};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::message::es10x::ISDR_AID;

const INS_SELECT: u8 = 0xA4;
const INS_MANAGE_CHANNEL: u8 = 0x70;
const INS_STORE_DATA: u8 = 0xE2;
const INS_GET_RESPONSE: u8 = 0xC0;

const P1_MORE_BLOCKS: u8 = 0x11;
const P1_LAST_BLOCK: u8 = 0x91;

const MAX_BLOCK_LEN: usize = 255;
/// P2 is the zero-based block number; the sequence must not exceed 255
/// blocks in total
const MAX_BLOCKS: usize = 255;

/// Default ceiling for a single ES10x response
pub const DEFAULT_RESPONSE_CAPACITY: usize = 64 * 1024;

/// One ES10x request/response channel to the ISD-R
#[derive(Debug)]
pub struct Es10xTransport<T: CardTransport> {
    transport: T,
    channel: u8,
    response_capacity: usize,
}

impl<T: CardTransport> Es10xTransport<T> {
    /// Wrap a card transport; `channel` 0 means the basic channel
    pub fn new(transport: T, channel: u8) -> Self {
        Self {
            transport,
            channel,
            response_capacity: DEFAULT_RESPONSE_CAPACITY,
        }
    }

    /// Override the response buffer ceiling
    pub fn with_response_capacity(mut self, capacity: usize) -> Self {
        self.response_capacity = capacity;
        self
    }

    /// Class byte carrying the logical channel bits
    fn cla(&self) -> u8 {
        0x80 | self.channel
    }

    fn transmit(&mut self, command: &Command) -> Result<Response> {
        let raw = command.to_bytes()?;
        let response = self.transport.transmit_raw(&raw)?;
        Ok(Response::from_bytes(&response)?)
    }

    /// Open the logical channel (when not the basic channel) and select the
    /// ISD-R. Fatal on any failure; the transport is unusable without it.
    pub fn open(&mut self) -> Result<()> {
        self.open_with_aid(&ISDR_AID)
    }

    /// Same as [`open`](Self::open) with a non-default ISD-R AID
    pub fn open_with_aid(&mut self, aid: &[u8]) -> Result<()> {
        if self.channel != 0 {
            let open = Command::new_with_le(0x00, INS_MANAGE_CHANNEL, 0x00, self.channel, 0x01);
            let response = self.transmit(&open)?;
            if !response.status.is_success() {
                return Err(ipa_apdu_core::Error::UnexpectedStatus(response.status).into());
            }
            debug!(channel = self.channel, "logical channel open");
        }

        let select = Command::new_with_data(
            self.channel,
            INS_SELECT,
            0x04,
            0x00,
            Bytes::copy_from_slice(aid),
        );
        let response = self.transmit(&select)?;
        // The ISD-R confirms selection with pending FCI data (0x61xx)
        if !response.status.has_more_data() && !response.status.is_success() {
            return Err(ipa_apdu_core::Error::UnexpectedStatus(response.status).into());
        }
        debug!(aid = %hex::encode_upper(aid), status = %response.status, "ISD-R selected");
        Ok(())
    }

    /// Close the logical channel; no-op on the basic channel
    pub fn close(&mut self) -> Result<()> {
        if self.channel != 0 {
            let close = Command::new(0x00, INS_MANAGE_CHANNEL, 0x80, self.channel);
            let response = self.transmit(&close)?;
            if !response.status.is_success() {
                warn!(status = %response.status, "logical channel close refused");
            }
        }
        Ok(())
    }

    /// Reset the underlying card link
    pub fn reset(&mut self) -> Result<()> {
        Ok(self.transport.reset()?)
    }

    /// One full ES10x round trip: send the request as STORE DATA blocks,
    /// then drain the chained response.
    ///
    /// Also carries raw bound-profile-package segments, which use the same
    /// block framing without any request envelope.
    pub fn transceive(&mut self, request: &[u8]) -> Result<Bytes> {
        let block_count = request.len().div_ceil(MAX_BLOCK_LEN).max(1);
        if block_count > MAX_BLOCKS {
            return Err(Error::RequestTooLarge(request.len()));
        }
        trace!(len = request.len(), blocks = block_count, "es10x send");

        let mut final_response = None;
        for (number, block) in request.chunks(MAX_BLOCK_LEN).enumerate() {
            let last = number == block_count - 1;
            let p1 = if last { P1_LAST_BLOCK } else { P1_MORE_BLOCKS };
            let mut command =
                Command::new(self.cla(), INS_STORE_DATA, p1, number as u8)
                    .with_data(Bytes::copy_from_slice(block));
            if last {
                command = command.with_le(0x00);
            }
            let response = self.transmit(&command)?;
            if last {
                final_response = Some(response);
            } else if !response.status.is_success() {
                // Card refused mid-stream; remaining blocks must not be sent
                return Err(ipa_apdu_core::Error::UnexpectedStatus(response.status).into());
            }
        }
        let final_response = match final_response {
            Some(response) => response,
            // Empty request still needs one terminating block
            None => {
                let command =
                    Command::new_with_le(self.cla(), INS_STORE_DATA, P1_LAST_BLOCK, 0x00, 0x00);
                self.transmit(&command)?
            }
        };

        self.receive(final_response)
    }

    /// Drain the 0x61xx GET RESPONSE chain started by `first`
    fn receive(&mut self, first: Response) -> Result<Bytes> {
        if first.status.is_success() {
            return Ok(first.payload);
        }
        if !first.status.has_more_data() {
            return Err(ipa_apdu_core::Error::UnexpectedStatus(first.status).into());
        }

        let mut buffer = BytesMut::with_capacity(self.response_capacity);
        buffer.put_slice(&first.payload);
        let mut status = first.status;

        while status.has_more_data() {
            let pending = status.remaining();
            let command = Command::new_with_le(
                self.cla(),
                INS_GET_RESPONSE,
                0x00,
                0x00,
                (pending & 0xFF) as u8,
            );
            let response = self.transmit(&command)?;
            if !response.status.is_success() && !response.status.has_more_data() {
                return Err(ipa_apdu_core::Error::UnexpectedStatus(response.status).into());
            }
            if response.payload.len() != pending {
                return Err(Error::BlockLengthMismatch {
                    expected: pending,
                    got: response.payload.len(),
                });
            }
            if buffer.len() + response.payload.len() > self.response_capacity {
                return Err(Error::ResponseOverflow {
                    capacity: self.response_capacity,
                    got: buffer.len() + response.payload.len(),
                });
            }
            buffer.put_slice(&response.payload);
            status = response.status;
        }

        trace!(len = buffer.len(), "es10x response complete");
        Ok(buffer.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipa_apdu_core::MockTransport;

    fn sw(bytes: &'static [u8]) -> Bytes {
        Bytes::from_static(bytes)
    }

    #[test]
    fn three_block_framing_for_600_byte_request() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x90, 0x00]));
        mock.push_response(sw(&[0x90, 0x00]));
        mock.push_response(sw(&[0x90, 0x00]));

        let request = vec![0x42u8; 600];
        let mut transport = Es10xTransport::new(&mut mock, 0);
        let response = transport.transceive(&request).unwrap();
        assert!(response.is_empty());

        assert_eq!(mock.commands.len(), 3);
        let headers: Vec<[u8; 5]> = mock
            .commands
            .iter()
            .map(|c| [c[0], c[1], c[2], c[3], c[4]])
            .collect();
        assert_eq!(headers[0], [0x80, 0xE2, 0x11, 0x00, 255]);
        assert_eq!(headers[1], [0x80, 0xE2, 0x11, 0x01, 255]);
        assert_eq!(headers[2], [0x80, 0xE2, 0x91, 0x02, 90]);
        assert_eq!(mock.commands[0].len(), 5 + 255);
        assert_eq!(mock.commands[1].len(), 5 + 255);
        // Last block additionally carries Le
        assert_eq!(mock.commands[2].len(), 5 + 90 + 1);
    }

    #[test]
    fn request_over_block_ceiling_is_rejected() {
        let mut mock = MockTransport::new();
        let mut transport = Es10xTransport::new(&mut mock, 0);
        let request = vec![0u8; MAX_BLOCKS * MAX_BLOCK_LEN + 1];
        assert!(matches!(
            transport.transceive(&request),
            Err(Error::RequestTooLarge(_))
        ));
        assert!(mock.commands.is_empty());
    }

    #[test]
    fn get_response_chain_is_drained() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x61, 0x04]));
        mock.push_response(sw(&[0xAA, 0xBB, 0xCC, 0xDD, 0x61, 0x02]));
        mock.push_response(sw(&[0xEE, 0xFF, 0x90, 0x00]));

        let mut transport = Es10xTransport::new(&mut mock, 1);
        let response = transport.transceive(&[0x01, 0x02]).unwrap();
        assert_eq!(response.as_ref(), &[0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);

        // STORE DATA then two GET RESPONSEs, all on channel 1
        assert_eq!(mock.commands.len(), 3);
        assert_eq!(&mock.commands[1][..5], &[0x81, 0xC0, 0x00, 0x00, 0x04]);
        assert_eq!(&mock.commands[2][..5], &[0x81, 0xC0, 0x00, 0x00, 0x02]);
    }

    #[test]
    fn mid_stream_error_aborts_send() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x6A, 0x80]));

        let request = vec![0u8; 600];
        let mut transport = Es10xTransport::new(&mut mock, 0);
        assert!(transport.transceive(&request).is_err());
        // Only the first block went out
        assert_eq!(mock.commands.len(), 1);
    }

    #[test]
    fn short_get_response_block_is_a_length_mismatch() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x61, 0x04]));
        mock.push_response(sw(&[0xAA, 0xBB, 0x90, 0x00]));

        let mut transport = Es10xTransport::new(&mut mock, 0);
        assert!(matches!(
            transport.transceive(&[0x01]),
            Err(Error::BlockLengthMismatch {
                expected: 4,
                got: 2
            })
        ));
    }

    #[test]
    fn response_overflow_is_fatal() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x61, 0x08]));
        mock.push_response(sw(&[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x90, 0x00]));

        let mut transport = Es10xTransport::new(&mut mock, 0).with_response_capacity(4);
        assert!(matches!(
            transport.transceive(&[0x01]),
            Err(Error::ResponseOverflow { capacity: 4, .. })
        ));
    }

    #[test]
    fn open_requires_select_confirmation() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x61, 0x19]));
        let mut transport = Es10xTransport::new(&mut mock, 0);
        transport.open().unwrap();
        // Basic channel: no MANAGE CHANNEL, SELECT carries the AID
        assert_eq!(mock.commands.len(), 1);
        assert_eq!(&mock.commands[0][..5], &[0x00, 0xA4, 0x04, 0x00, 0x10]);
        assert_eq!(&mock.commands[0][5..21], &ISDR_AID);
    }

    #[test]
    fn open_fails_on_missing_applet() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x6A, 0x82]));
        let mut transport = Es10xTransport::new(&mut mock, 0);
        assert!(transport.open().is_err());
    }

    #[test]
    fn logical_channel_is_opened_and_closed() {
        let mut mock = MockTransport::new();
        mock.push_response(sw(&[0x01, 0x90, 0x00]));
        mock.push_response(sw(&[0x61, 0x00]));
        mock.push_response(sw(&[0x90, 0x00]));

        let mut transport = Es10xTransport::new(&mut mock, 1);
        transport.open().unwrap();
        transport.close().unwrap();

        assert_eq!(&mock.commands[0][..4], &[0x00, 0x70, 0x00, 0x01]);
        assert_eq!(mock.commands[1][0], 0x01);
        assert_eq!(&mock.commands[2][..4], &[0x00, 0x70, 0x80, 0x01]);
    }
}
