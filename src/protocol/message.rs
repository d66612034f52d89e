// Wire Messages
// A header byte followed by the raw payload, with no length prefix

use super::header::Header;
use crate::error::ProtocolError;

/// One protocol message.
///
/// The header is kept as the raw byte so that clients can send values outside
/// the known set; [`Message::header`] decodes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    header: u8,
    payload: Vec<u8>,
}

impl Message {
    pub fn new(header: Header, payload: impl Into<Vec<u8>>) -> Self {
        Self::raw(header.to_byte(), payload)
    }

    /// Message with an arbitrary header byte
    pub fn raw(header: u8, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            header,
            payload: payload.into(),
        }
    }

    /// Message with an empty payload
    pub fn empty(header: Header) -> Self {
        Self::new(header, Vec::new())
    }

    /// ERROR message carrying a human readable reason
    pub fn error(reason: &str) -> Self {
        Self::new(Header::Error, reason.as_bytes())
    }

    pub fn header(&self) -> Header {
        Header::from_byte(self.header)
    }

    pub fn header_byte(&self) -> u8 {
        self.header
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Payload rendered as text, replacing invalid UTF-8
    pub fn payload_text(&self) -> String {
        String::from_utf8_lossy(&self.payload).into_owned()
    }

    /// Serialize to wire format: header byte || payload
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + self.payload.len());
        bytes.push(self.header);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Parse one message from the bytes of a single read
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ProtocolError> {
        match bytes.split_first() {
            Some((&header, payload)) => Ok(Self::raw(header, payload)),
            None => Err(ProtocolError::EmptyMessage),
        }
    }
}
