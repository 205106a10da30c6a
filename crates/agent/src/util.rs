//! Small BER-TLV helpers shared across the ES10x and ESipa layers
//!
//! Full message bodies are handled by `rasn`; these helpers cover the places
//! where the agent works on raw tag and length bytes directly, such as BPP
//! segmentation and tag-list filtering.

use crate::error::{Error, Result};

/// Encode a BER-TLV header: raw tag bytes followed by a definite length.
///
/// The tag is taken verbatim, so multi-byte tags are passed as their full
/// encoding (e.g. `&[0xBF, 0x36]`).
pub(crate) fn tlv_header(tag: &[u8], len: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(tag.len() + 5);
    out.extend_from_slice(tag);
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let bytes = len.to_be_bytes();
        let skip = bytes.iter().take_while(|b| **b == 0).count();
        out.push(0x80 | (bytes.len() - skip) as u8);
        out.extend_from_slice(&bytes[skip..]);
    }
    out
}

/// Number of bytes the tag field occupies at the start of `data`, or `None`
/// if the tag is incomplete
fn tag_len(data: &[u8]) -> Option<usize> {
    let first = *data.first()?;
    if first & 0x1F != 0x1F {
        return Some(1);
    }
    // High-tag-number form: subsequent bytes continue while bit 8 is set
    let mut n = 1;
    loop {
        let b = *data.get(n)?;
        n += 1;
        if b & 0x80 == 0 {
            return Some(n);
        }
    }
}

/// Whether `tag` occurs as a complete tag in a concatenated BER tag list.
///
/// The list is walked tag by tag, so a multi-byte tag in the list can never
/// be matched by one of its prefixes and a one-byte candidate can never match
/// inside a longer tag.
pub(crate) fn tag_in_list(tag: &[u8], list: &[u8]) -> bool {
    let mut rest = list;
    while !rest.is_empty() {
        let Some(n) = tag_len(rest) else {
            return false;
        };
        if &rest[..n] == tag {
            return true;
        }
        rest = &rest[n..];
    }
    false
}

/// Outcome of pre-scanning an outer TLV before handing it to the codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TlvScan {
    /// Header and value are fully present; total encoded length in bytes
    Complete(usize),
    /// The buffer ends before the announced value does
    Truncated,
    /// The header itself is not valid BER
    Malformed,
}

/// Check whether `data` starts with one structurally complete TLV.
///
/// Used to distinguish truncated responses from invalid encodings when the
/// codec rejects a message.
pub(crate) fn scan_outer_tlv(data: &[u8]) -> TlvScan {
    let Some(tn) = tag_len(data) else {
        return TlvScan::Truncated;
    };
    let Some(&first_len) = data.get(tn) else {
        return TlvScan::Truncated;
    };
    let (header, value_len) = if first_len < 0x80 {
        (tn + 1, first_len as usize)
    } else if first_len == 0x80 {
        // Indefinite lengths never appear in DER-encoded messages
        return TlvScan::Malformed;
    } else {
        let n = (first_len & 0x7F) as usize;
        if n > core::mem::size_of::<usize>() {
            return TlvScan::Malformed;
        }
        let Some(len_bytes) = data.get(tn + 1..tn + 1 + n) else {
            return TlvScan::Truncated;
        };
        let mut len = 0usize;
        for b in len_bytes {
            len = (len << 8) | *b as usize;
        }
        (tn + 1 + n, len)
    };
    match header.checked_add(value_len) {
        Some(total) if data.len() >= total => TlvScan::Complete(total),
        _ => TlvScan::Truncated,
    }
}

/// Parse the header of the TLV at the start of `data`, returning
/// `(tag, header_len, value_len)`
pub(crate) fn parse_tlv_header(data: &[u8]) -> Result<(&[u8], usize, usize)> {
    let tn = tag_len(data).ok_or_else(|| Error::Tlv("incomplete tag".into()))?;
    let first_len = *data
        .get(tn)
        .ok_or_else(|| Error::Tlv("missing length".into()))?;
    if first_len < 0x80 {
        return Ok((&data[..tn], tn + 1, first_len as usize));
    }
    if first_len == 0x80 {
        return Err(Error::Tlv("indefinite length".into()));
    }
    let n = (first_len & 0x7F) as usize;
    let len_bytes = data
        .get(tn + 1..tn + 1 + n)
        .ok_or_else(|| Error::Tlv("truncated length".into()))?;
    if n > core::mem::size_of::<usize>() {
        return Err(Error::Tlv("oversized length".into()));
    }
    let mut len = 0usize;
    for b in len_bytes {
        len = (len << 8) | *b as usize;
    }
    Ok((&data[..tn], tn + 1 + n, len))
}
