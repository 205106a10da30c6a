//! Per-function message adapters
//!
//! Each GSMA function gets an `encode_*` / `decode_*` pair built on the
//! schema types in [`crate::asn1`]. Decoders classify failures before
//! touching the codec: a structurally truncated outer TLV is reported as
//! [`DecodeFailure::Truncated`], a complete TLV with the wrong outer tag as
//! [`DecodeFailure::UnexpectedResponse`], and everything the codec itself
//! rejects as [`DecodeFailure::InvalidEncoding`]. Protocol-level error codes
//! are not failures here; they come back as the error arm of [`Outcome`].

pub mod es10x;
pub mod esipa;

use tracing::trace;

use crate::error::{Error, FailureOrigin, Result};
use crate::util::{scan_outer_tlv, TlvScan};

/// Classification of a response that produced no usable ASN.1 structure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    /// Buffer ends before the outer TLV does
    Truncated,
    /// Outer TLV is complete but the codec rejected the contents
    InvalidEncoding,
    /// Well-formed message of a type the caller did not expect
    UnexpectedResponse,
}

/// Two-armed protocol result: a decoded payload or a GSMA error code.
///
/// Transport and decode failures never reach this type; they surface as the
/// surrounding `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T, E> {
    Ok(T),
    Error(E),
}

impl<T, E> Outcome<T, E> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// DER-encode an outbound message, logging the produced bytes
pub(crate) fn encode<T: rasn::Encode>(context: &'static str, value: &T) -> Result<Vec<u8>> {
    let out = rasn::der::encode(value).map_err(|e| Error::Encode {
        context,
        message: e.to_string(),
    })?;
    trace!(context, data = %hex::encode_upper(&out), "encoded");
    Ok(out)
}

/// BER-decode an inbound message after the structural pre-checks.
///
/// `expected_tag` is the raw outer tag the function's response must carry;
/// a complete TLV with a different tag is an unexpected response, never
/// handed to the codec.
pub(crate) fn decode<T: rasn::Decode>(
    context: &'static str,
    bytes: &[u8],
    expected_tag: &[u8],
    origin: FailureOrigin,
) -> Result<T> {
    trace!(context, data = %hex::encode_upper(bytes), "decoding");
    let kind = match scan_outer_tlv(bytes) {
        TlvScan::Truncated => Some(DecodeFailure::Truncated),
        TlvScan::Malformed => Some(DecodeFailure::InvalidEncoding),
        TlvScan::Complete(_) if !bytes.starts_with(expected_tag) => {
            Some(DecodeFailure::UnexpectedResponse)
        }
        TlvScan::Complete(_) => None,
    };
    if let Some(kind) = kind {
        trace!(context, ?kind, "decode pre-check failed");
        return Err(Error::Decode {
            context,
            kind,
            origin,
        });
    }
    rasn::ber::decode::<T>(bytes).map_err(|e| {
        trace!(context, error = %e, "codec rejected message");
        Error::Decode {
            context,
            kind: DecodeFailure::InvalidEncoding,
            origin,
        }
    })
}

/// Generate a closed protocol error-code enum with a diagnostic name table.
///
/// Codes outside the closed set decode to `Unknown(code)` so a newer peer
/// never turns into a decode failure.
macro_rules! error_codes {
    ($(#[$doc:meta])* $name:ident { $($variant:ident = $code:literal),+ $(,)? }) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum $name {
            $($variant,)+
            Unknown(u8),
        }

        impl $name {
            pub fn from_code(code: u8) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    other => Self::Unknown(other),
                }
            }

            pub fn code(&self) -> u8 {
                match self {
                    $(Self::$variant => $code,)+
                    Self::Unknown(code) => *code,
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(Self::$variant => write!(f, "{} ({})", stringify!($variant), $code),)+
                    Self::Unknown(code) => write!(f, "Unknown ({code})"),
                }
            }
        }
    };
}

pub(crate) use error_codes;

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    use crate::asn1::es10x::GetEuiccChallengeResponse;

    #[test]
    fn truncated_response_is_classified() {
        let err = decode::<GetEuiccChallengeResponse>(
            "test",
            &hex!("BF2E12"),
            &hex!("BF2E"),
            FailureOrigin::Card,
        )
        .unwrap_err();
        match err {
            Error::Decode { kind, .. } => assert_eq!(kind, DecodeFailure::Truncated),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn wrong_outer_tag_is_unexpected_not_invalid() {
        // Complete BF30 TLV offered to a BF2E decoder
        let err = decode::<GetEuiccChallengeResponse>(
            "test",
            &hex!("BF30038001FF"),
            &hex!("BF2E"),
            FailureOrigin::Card,
        )
        .unwrap_err();
        match err {
            Error::Decode { kind, .. } => {
                assert_eq!(kind, DecodeFailure::UnexpectedResponse);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
