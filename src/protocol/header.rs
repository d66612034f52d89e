// Message Headers
// One-byte discriminators carried at the start of every wire message

use std::fmt;

/// Wire header values.
///
/// `NoHeader` marks "nothing recognised" inside the crate; it is what an
/// unknown wire byte decodes to and it is never sent by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Header {
    ClientHello = 0,
    ServerHello = 1,
    ClientDone = 2,
    ServerDone = 3,
    Error = 4,
    ClientMsg = 5,
    ServerMsg = 6,
    ClientClose = 7,
    ServerClose = 8,
    NoHeader = 255,
}

impl Header {
    pub fn to_byte(self) -> u8 {
        self as u8
    }

    /// Decode a wire byte; unknown values map to [`Header::NoHeader`]
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            0 => Header::ClientHello,
            1 => Header::ServerHello,
            2 => Header::ClientDone,
            3 => Header::ServerDone,
            4 => Header::Error,
            5 => Header::ClientMsg,
            6 => Header::ServerMsg,
            7 => Header::ClientClose,
            8 => Header::ServerClose,
            _ => Header::NoHeader,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Header::ClientHello => "CLIENT_HELLO",
            Header::ServerHello => "SERVER_HELLO",
            Header::ClientDone => "CLIENT_DONE",
            Header::ServerDone => "SERVER_DONE",
            Header::Error => "ERROR",
            Header::ClientMsg => "CLIENT_MSG",
            Header::ServerMsg => "SERVER_MSG",
            Header::ClientClose => "CLIENT_CLOSE",
            Header::ServerClose => "SERVER_CLOSE",
            Header::NoHeader => "NO_HEADER",
        }
    }
}

impl From<Header> for u8 {
    fn from(header: Header) -> u8 {
        header.to_byte()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
