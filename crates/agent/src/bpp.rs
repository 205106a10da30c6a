//! Bound Profile Package segmentation
//!
//! Splits the BPP TLV received from the SM-DP+ into the exact ordered
//! segment list the eUICC expects for streamed installation: the outer
//! envelope header, the full InitialiseSecureChannelRequest, the first
//! '87' sequence header with its first element, the '88' sequence header
//! alone, every '88' element, the optional second '87' sequence, the '86'
//! sequence header alone and every '86' element. The order is a protocol
//! invariant; the installing eUICC keys its secure-channel state off it.

use bytes::Bytes;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::util::{parse_tlv_header, tlv_header};

const TAG_BPP: [u8; 2] = [0xBF, 0x36];
const TAG_ISCR: [u8; 2] = [0xBF, 0x23];
const TAG_FIRST_87: u8 = 0xA0;
const TAG_SEQ_88: u8 = 0xA1;
const TAG_SECOND_87: u8 = 0xA2;
const TAG_SEQ_86: u8 = 0xA3;

struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    fn next_tlv(&mut self) -> Result<(&'a [u8], &'a [u8], &'a [u8])> {
        let (tag, header_len, value_len) = parse_tlv_header(self.data)?;
        let total = header_len + value_len;
        if self.data.len() < total {
            return Err(Error::Tlv("TLV value exceeds buffer".into()));
        }
        let whole = &self.data[..total];
        let value = &self.data[header_len..total];
        self.data = &self.data[total..];
        Ok((tag, whole, value))
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Split a BoundProfilePackage into its installation segments.
///
/// All-or-nothing: any structural error yields `Err` and no segments.
pub(crate) fn segment_bound_profile_package(bpp: &[u8]) -> Result<Vec<Bytes>> {
    let (tag, header_len, value_len) = parse_tlv_header(bpp)?;
    if tag != TAG_BPP {
        return Err(Error::Tlv("not a BoundProfilePackage".into()));
    }
    if bpp.len() != header_len + value_len {
        return Err(Error::Tlv("BoundProfilePackage length mismatch".into()));
    }

    let mut segments = Vec::new();
    segments.push(Bytes::from(tlv_header(&TAG_BPP, value_len)));

    let mut cursor = Cursor {
        data: &bpp[header_len..],
    };

    // Full InitialiseSecureChannelRequest as one segment
    let (tag, whole, _) = cursor.next_tlv()?;
    if tag != TAG_ISCR {
        return Err(Error::Tlv("missing InitialiseSecureChannelRequest".into()));
    }
    segments.push(Bytes::copy_from_slice(whole));

    // First '87' sequence: header plus first element only
    let (tag, _, value) = cursor.next_tlv()?;
    if tag != [TAG_FIRST_87] {
        return Err(Error::Tlv("missing first 87 sequence".into()));
    }
    segments.push(first_element_segment(TAG_FIRST_87, value, 0x87)?);

    // '88' sequence: header-only segment, then each element
    let (tag, _, value) = cursor.next_tlv()?;
    if tag != [TAG_SEQ_88] {
        return Err(Error::Tlv("missing 88 sequence".into()));
    }
    segments.push(Bytes::from(tlv_header(&[TAG_SEQ_88], value.len())));
    push_elements(&mut segments, value, 0x88)?;

    // Optional second '87' sequence
    let (tag, _, value) = cursor.next_tlv()?;
    let value = if tag == [TAG_SECOND_87] {
        segments.push(first_element_segment(TAG_SECOND_87, value, 0x87)?);
        let (tag, _, value) = cursor.next_tlv()?;
        if tag != [TAG_SEQ_86] {
            return Err(Error::Tlv("missing 86 sequence".into()));
        }
        value
    } else if tag == [TAG_SEQ_86] {
        value
    } else {
        return Err(Error::Tlv("missing 86 sequence".into()));
    };

    // '86' sequence: header-only segment, then each element
    segments.push(Bytes::from(tlv_header(&[TAG_SEQ_86], value.len())));
    push_elements(&mut segments, value, 0x86)?;

    if !cursor.is_empty() {
        return Err(Error::Tlv("trailing data after 86 sequence".into()));
    }

    trace!(segments = segments.len(), "bound profile package segmented");
    Ok(segments)
}

/// Sequence header re-emitted over only the first element; additional
/// elements are dropped, which GSMA allows for the '87' sequences
fn first_element_segment(seq_tag: u8, value: &[u8], element_tag: u8) -> Result<Bytes> {
    let mut cursor = Cursor { data: value };
    let (tag, whole, _) = cursor.next_tlv()?;
    if tag != [element_tag] {
        return Err(Error::Tlv(format!(
            "expected {element_tag:02X} element in {seq_tag:02X} sequence"
        )));
    }
    if !cursor.is_empty() {
        warn!(
            sequence = format_args!("{seq_tag:02X}"),
            "dropping extra elements beyond the first"
        );
    }
    let mut segment = tlv_header(&[seq_tag], whole.len());
    segment.extend_from_slice(whole);
    Ok(Bytes::from(segment))
}

fn push_elements(segments: &mut Vec<Bytes>, value: &[u8], element_tag: u8) -> Result<()> {
    let mut cursor = Cursor { data: value };
    while !cursor.is_empty() {
        let (tag, whole, _) = cursor.next_tlv()?;
        if tag != [element_tag] {
            return Err(Error::Tlv(format!(
                "unexpected tag in {element_tag:02X} sequence"
            )));
        }
        segments.push(Bytes::copy_from_slice(whole));
    }
    Ok(())
}
