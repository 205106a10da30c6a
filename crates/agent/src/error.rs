//! Error taxonomy for the agent
//!
//! Three tiers, mirrored in the variants below: transport failures (card or
//! HTTP I/O), protocol-level errors (well-formed responses carrying a GSMA
//! error code, surfaced through the per-function outcome enums rather than
//! this type), and malformed/unexpected responses which always abort the
//! enclosing procedure.

use crate::message::DecodeFailure;

/// Result type for agent operations
pub type Result<T> = std::result::Result<T, Error>;

/// Which collaborator a fatal error originated in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOrigin {
    /// eIM HTTP link
    Http,
    /// Smart card link
    Card,
    /// Agent-internal (encoding, state, configuration)
    Internal,
}

/// Error type for agent operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Card transport or APDU-level failure
    #[error(transparent)]
    Apdu(#[from] ipa_apdu_core::Error),

    /// HTTP transport failure after retries were exhausted
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// eIM answered with a non-success HTTP status
    #[error("HTTP status {0} from eIM")]
    HttpStatus(u16),

    /// ASN.1 encoding of an outbound message failed
    #[error("ASN.1 encode error in {context}: {message}")]
    Encode {
        /// Function being encoded
        context: &'static str,
        /// Codec diagnostic
        message: String,
    },

    /// Inbound message could not be decoded
    #[error("ASN.1 decode failure in {context}: {kind:?}")]
    Decode {
        /// Function being decoded
        context: &'static str,
        /// Failure classification
        kind: DecodeFailure,
        /// Which link produced the undecodable bytes
        origin: FailureOrigin,
    },

    /// A well-formed eIM response of a type the caller did not ask for,
    /// or an echoed value that does not match the request
    #[error("unexpected eIM response: {0}")]
    UnexpectedEimResponse(&'static str),

    /// The eIM (or the server behind it) refused a function with an error
    /// code, ending the procedure
    #[error("{function} refused by the eIM with error code {code}")]
    EimError {
        /// ESipa function that was refused
        function: &'static str,
        /// Protocol error code
        code: u8,
    },

    /// The eUICC refused a function with a non-zero result code where the
    /// procedure cannot continue
    #[error("{function} failed on the eUICC with result code {code}")]
    CardError {
        /// ES10x function that failed
        function: &'static str,
        /// Result code from the card
        code: u8,
    },

    /// Cross-check or ordering violation on the card side
    #[error("ES10x protocol violation: {0}")]
    ProtocolViolation(&'static str),

    /// ES10x request would exceed the 255-block STORE DATA ceiling
    #[error("ES10x request too large: {0} bytes")]
    RequestTooLarge(usize),

    /// GET RESPONSE chain produced more data than the receive buffer allows
    #[error("ES10x response overflow: capacity {capacity}, got {got}")]
    ResponseOverflow {
        /// Allocated receive capacity
        capacity: usize,
        /// Bytes the card attempted to deliver
        got: usize,
    },

    /// GET RESPONSE block length did not match the announced pending count
    #[error("ES10x block length mismatch: expected {expected}, got {got}")]
    BlockLengthMismatch {
        /// Announced pending byte count
        expected: usize,
        /// Bytes actually returned
        got: usize,
    },

    /// The configured CA key identifier is not accepted by the eUICC
    #[error("allowed CA not present in eUICC CI list")]
    NoAllowedCa,

    /// Server certificate key identifier does not match the allowed CA
    #[error("server certificate CA identifier mismatch")]
    CaMismatch,

    /// Profile download trigger without a usable activation code
    #[error("activation code: {0}")]
    ActivationCode(#[from] crate::activation_code::ActivationCodeError),

    /// Download trigger carried a download-data variant other than an
    /// activation code
    #[error("unsupported profile download data variant")]
    UnsupportedDownloadData,

    /// Final BPP segment did not produce a ProfileInstallationResult
    #[error("no ProfileInstallationResult after final BPP segment")]
    MissingInstallationResult,

    /// BER TLV structure error while walking a certificate or BPP
    #[error("TLV error: {0}")]
    Tlv(String),

    /// Persisted state blob could not be serialized
    #[error("state serialization error: {0}")]
    State(#[from] serde_json::Error),

    /// TLS verification cannot be disabled outside debug builds
    #[error("refusing to disable TLS verification in a production build")]
    TlsVerificationRequired,
}

impl Error {
    /// Classify which collaborator a failure originated in
    pub fn origin(&self) -> FailureOrigin {
        match self {
            Self::Apdu(_)
            | Self::ProtocolViolation(_)
            | Self::RequestTooLarge(_)
            | Self::ResponseOverflow { .. }
            | Self::BlockLengthMismatch { .. }
            | Self::CardError { .. }
            | Self::MissingInstallationResult => FailureOrigin::Card,
            Self::Http(_)
            | Self::HttpStatus(_)
            | Self::UnexpectedEimResponse(_)
            | Self::EimError { .. } => FailureOrigin::Http,
            Self::Decode { origin, .. } => *origin,
            _ => FailureOrigin::Internal,
        }
    }
}
