//! Card transport abstraction
//!
//! The agent's ES10x layer drives any implementor of [`CardTransport`];
//! the PC/SC implementation lives in `ipa-apdu-pcsc`.

use bytes::Bytes;

use crate::Error;

/// Trait for physical or simulated card transports
pub trait CardTransport {
    /// Transmit a raw APDU and return the raw response including the
    /// 2-byte status trailer
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Error>;

    /// Reset the card link
    fn reset(&mut self) -> Result<(), Error>;
}

impl<T: CardTransport + ?Sized> CardTransport for &mut T {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Error> {
        (**self).transmit_raw(command)
    }

    fn reset(&mut self) -> Result<(), Error> {
        (**self).reset()
    }
}

/// Scripted transport double for tests
///
/// Replays queued responses in order and records every command sent.
#[cfg(any(test, feature = "mock"))]
#[derive(Debug, Default)]
pub struct MockTransport {
    /// Queued responses, popped front-first
    responses: std::collections::VecDeque<Bytes>,
    /// Commands transmitted so far
    pub commands: Vec<Bytes>,
    /// Number of resets observed
    pub resets: usize,
}

#[cfg(any(test, feature = "mock"))]
impl MockTransport {
    /// Create an empty mock with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that answers every command with the same response
    pub fn with_response(response: impl Into<Bytes>) -> Self {
        let mut mock = Self::new();
        mock.responses.push_back(response.into());
        mock
    }

    /// Queue a response to be returned by the next transmit
    pub fn push_response(&mut self, response: impl Into<Bytes>) -> &mut Self {
        self.responses.push_back(response.into());
        self
    }
}

#[cfg(any(test, feature = "mock"))]
impl CardTransport for MockTransport {
    fn transmit_raw(&mut self, command: &[u8]) -> Result<Bytes, Error> {
        self.commands.push(Bytes::copy_from_slice(command));
        match self.responses.pop_front() {
            Some(response) => Ok(response),
            None => Err(Error::Transport("mock response queue exhausted".into())),
        }
    }

    fn reset(&mut self) -> Result<(), Error> {
        self.resets += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_replays_in_order() {
        let mut mock = MockTransport::new();
        mock.push_response(Bytes::from_static(&[0x61, 0x10]));
        mock.push_response(Bytes::from_static(&[0x90, 0x00]));

        assert_eq!(
            mock.transmit_raw(&[0x00, 0xA4, 0x04, 0x00]).unwrap().as_ref(),
            &[0x61, 0x10]
        );
        assert_eq!(
            mock.transmit_raw(&[0x80, 0xC0, 0x00, 0x00]).unwrap().as_ref(),
            &[0x90, 0x00]
        );
        assert!(mock.transmit_raw(&[0x00]).is_err());
        assert_eq!(mock.commands.len(), 3);
    }
}
