//! APDU responses and status word interpretation

use std::fmt;

use bytes::Bytes;

use crate::Error;

/// Common status words
pub mod status {
    use super::StatusWord;

    /// Processing completed normally
    pub const SW_NO_ERROR: StatusWord = StatusWord::new(0x90, 0x00);
    /// Response data available; SW2 carries the pending byte count
    pub const SW_RESPONSE_AVAILABLE: u8 = 0x61;
    /// Conditions of use not satisfied
    pub const SW_CONDITIONS_NOT_SATISFIED: StatusWord = StatusWord::new(0x69, 0x85);
    /// Referenced applet or file not found
    pub const SW_FILE_NOT_FOUND: StatusWord = StatusWord::new(0x6A, 0x82);
    /// Function not supported (e.g. logical channel unavailable)
    pub const SW_FUNCTION_NOT_SUPPORTED: StatusWord = StatusWord::new(0x6A, 0x81);
}

/// Two-byte status word trailing every card response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatusWord {
    /// First status byte
    pub sw1: u8,
    /// Second status byte
    pub sw2: u8,
}

impl StatusWord {
    /// Create a new status word
    pub const fn new(sw1: u8, sw2: u8) -> Self {
        Self { sw1, sw2 }
    }

    /// Combined 16-bit value
    pub const fn to_u16(self) -> u16 {
        u16::from_be_bytes([self.sw1, self.sw2])
    }

    /// Processing completed normally (0x9000)
    pub const fn is_success(self) -> bool {
        self.sw1 == 0x90 && self.sw2 == 0x00
    }

    /// More response data is pending (0x61xx)
    pub const fn has_more_data(self) -> bool {
        self.sw1 == status::SW_RESPONSE_AVAILABLE
    }

    /// Pending byte count signalled by 0x61xx, with 0x00 meaning 256
    pub const fn remaining(self) -> usize {
        if self.sw2 == 0x00 { 256 } else { self.sw2 as usize }
    }
}

impl fmt::Display for StatusWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SW={:02X}{:02X}", self.sw1, self.sw2)
    }
}

/// Parsed card response: payload plus status trailer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response payload (possibly empty)
    pub payload: Bytes,
    /// Status word trailer
    pub status: StatusWord,
}

impl Response {
    /// Split raw transceive output into payload and status trailer
    pub fn from_bytes(raw: &[u8]) -> Result<Self, Error> {
        if raw.len() < 2 {
            return Err(Error::ResponseTooShort(raw.len()));
        }
        let (payload, trailer) = raw.split_at(raw.len() - 2);
        Ok(Self {
            payload: Bytes::copy_from_slice(payload),
            status: StatusWord::new(trailer[0], trailer[1]),
        })
    }

    /// Succeed with the payload, or surface the status word as an error
    pub fn into_payload(self) -> Result<Bytes, Error> {
        if self.status.is_success() {
            Ok(self.payload)
        } else {
            Err(Error::UnexpectedStatus(self.status))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_word_predicates() {
        assert!(status::SW_NO_ERROR.is_success());
        assert!(StatusWord::new(0x61, 0x10).has_more_data());
        assert_eq!(StatusWord::new(0x61, 0x10).remaining(), 16);
        assert_eq!(StatusWord::new(0x61, 0x00).remaining(), 256);
        assert!(!StatusWord::new(0x6A, 0x82).is_success());
    }

    #[test]
    fn test_response_parse() {
        let resp = Response::from_bytes(&[0xDE, 0xAD, 0x90, 0x00]).unwrap();
        assert_eq!(resp.payload.as_ref(), &[0xDE, 0xAD]);
        assert!(resp.status.is_success());

        assert!(matches!(
            Response::from_bytes(&[0x90]),
            Err(Error::ResponseTooShort(1))
        ));
    }

    #[test]
    fn test_into_payload_rejects_errors() {
        let resp = Response::from_bytes(&[0x6A, 0x82]).unwrap();
        assert!(matches!(
            resp.into_payload(),
            Err(Error::UnexpectedStatus(sw)) if sw.to_u16() == 0x6A82
        ));
    }
}
