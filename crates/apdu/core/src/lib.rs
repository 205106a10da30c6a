//! APDU primitives for the IPA agent
//!
//! This crate provides the foundational types for working with smart card
//! APDU commands and responses according to ISO/IEC 7816-4: command
//! serialization, status word interpretation, and the transport trait the
//! agent drives its eUICC link through.
//!
//! The agent only ever issues four command families (SELECT, MANAGE CHANNEL,
//! STORE DATA, GET RESPONSE); the types here are deliberately limited to the
//! short-form encodings those need.
#![forbid(unsafe_code)]
#![warn(missing_docs, rustdoc::missing_crate_level_docs)]

pub use bytes::{Bytes, BytesMut};

pub mod command;
pub mod error;
pub mod response;
pub mod transport;

pub use command::Command;
pub use error::Error;
pub use response::{Response, StatusWord};
pub use transport::CardTransport;
#[cfg(any(test, feature = "mock"))]
pub use transport::MockTransport;

/// Prelude module containing commonly used types
pub mod prelude {
    pub use crate::command::Command;
    pub use crate::error::Error;
    pub use crate::response::{Response, StatusWord, status};
    pub use crate::transport::CardTransport;
    pub use crate::{Bytes, BytesMut};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let cmd = Command::new(0x00, 0xA4, 0x04, 0x00);
        assert_eq!(cmd.cla, 0x00);
        assert_eq!(cmd.ins, 0xA4);

        let resp = Response::from_bytes(&[0x01, 0x02, 0x90, 0x00]).unwrap();
        assert!(resp.status.is_success());
        assert_eq!(resp.payload.as_ref(), &[0x01, 0x02]);
    }
}
