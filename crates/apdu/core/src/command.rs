//! APDU command definitions
//!
//! Short-form ISO/IEC 7816-4 command encoding. The agent never needs
//! extended-length APDUs: ES10x payloads are chunked into 255-byte STORE
//! DATA blocks well below the short-form ceiling.

use bytes::{BufMut, Bytes, BytesMut};

use crate::Error;

/// Generic APDU command structure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Command class byte
    pub cla: u8,
    /// Instruction byte
    pub ins: u8,
    /// Parameter 1
    pub p1: u8,
    /// Parameter 2
    pub p2: u8,
    /// Command data (optional)
    pub data: Option<Bytes>,
    /// Expected length (optional, 0x00 meaning 256)
    pub le: Option<u8>,
}

impl Command {
    /// Create a new command with just the header bytes
    pub const fn new(cla: u8, ins: u8, p1: u8, p2: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: None,
        }
    }

    /// Create a new command with expected response length (Le)
    pub const fn new_with_le(cla: u8, ins: u8, p1: u8, p2: u8, le: u8) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: None,
            le: Some(le),
        }
    }

    /// Create a new command with data payload
    pub fn new_with_data<T: Into<Bytes>>(cla: u8, ins: u8, p1: u8, p2: u8, data: T) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data: Some(data.into()),
            le: None,
        }
    }

    /// Set the data field
    pub fn with_data<T: Into<Bytes>>(mut self, data: T) -> Self {
        self.data = Some(data.into());
        self
    }

    /// Set the expected length field
    pub const fn with_le(mut self, le: u8) -> Self {
        self.le = Some(le);
        self
    }

    /// Length of the serialized command
    pub fn command_length(&self) -> usize {
        let mut length = 4;
        if let Some(data) = &self.data {
            length += 1 + data.len();
        }
        if self.le.is_some() {
            length += 1;
        }
        length
    }

    /// Serialize to raw APDU bytes
    ///
    /// Fails if the data field exceeds the short-form Lc ceiling of 255
    /// bytes.
    pub fn to_bytes(&self) -> Result<Bytes, Error> {
        if let Some(data) = &self.data {
            if data.is_empty() || data.len() > 255 {
                return Err(Error::InvalidCommandLength(data.len()));
            }
        }

        let mut buffer = BytesMut::with_capacity(self.command_length());
        buffer.put_u8(self.cla);
        buffer.put_u8(self.ins);
        buffer.put_u8(self.p1);
        buffer.put_u8(self.p2);

        if let Some(data) = &self.data {
            buffer.put_u8(data.len() as u8);
            buffer.put_slice(data);
        }

        if let Some(le) = self.le {
            buffer.put_u8(le);
        }

        Ok(buffer.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    #[test]
    fn test_command_serialization() {
        let cmd = Command::new_with_data(0x00, 0xA4, 0x04, 0x00, hex!("A000000151000000").to_vec())
            .with_le(0x00);
        let bytes = cmd.to_bytes().unwrap();
        assert_eq!(bytes.as_ref(), hex!("00A4040008A00000015100000000"));
    }

    #[test]
    fn test_command_length() {
        let cmd1 = Command::new(0x80, 0xC0, 0x00, 0x00);
        assert_eq!(cmd1.command_length(), 4);

        let cmd2 = Command::new_with_le(0x80, 0xC0, 0x00, 0x00, 0x00);
        assert_eq!(cmd2.command_length(), 5);

        let cmd3 = Command::new_with_data(0x80, 0xE2, 0x11, 0x00, vec![1, 2, 3]);
        assert_eq!(cmd3.command_length(), 8);
    }

    #[test]
    fn test_oversized_data_rejected() {
        let cmd = Command::new_with_data(0x80, 0xE2, 0x11, 0x00, vec![0u8; 256]);
        assert!(matches!(
            cmd.to_bytes(),
            Err(Error::InvalidCommandLength(256))
        ));
    }

    #[test]
    fn test_empty_data_rejected() {
        let cmd = Command::new(0x80, 0xE2, 0x11, 0x00).with_data(Bytes::new());
        assert!(matches!(cmd.to_bytes(), Err(Error::InvalidCommandLength(0))));
    }
}
