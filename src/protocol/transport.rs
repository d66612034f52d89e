// Transport Layer
// Sends and receives whole messages over a connected byte stream

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

use super::message::Message;
use crate::error::ProtocolError;

/// Receive buffer size; anything longer than this in one read is cut off
pub const READ_BUFFER_SIZE: usize = 1024 * 1024;

/// Message transport over a byte stream.
///
/// Messages carry no length prefix: every `recv` performs exactly one read
/// and treats whatever it returns as one complete message. Messages split
/// across reads or coalesced into one read are not reassembled.
pub struct Transport<S> {
    stream: S,
    buffer: Vec<u8>,
}

impl<S> Transport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            buffer: vec![0u8; READ_BUFFER_SIZE],
        }
    }

    /// Write one message
    pub async fn send(&mut self, message: &Message) -> Result<(), ProtocolError> {
        let bytes = message.to_bytes();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        trace!("Sent {} ({} bytes)", message.header(), bytes.len());
        Ok(())
    }

    /// Read one message; a zero-length read means the peer closed the stream
    pub async fn recv(&mut self) -> Result<Message, ProtocolError> {
        let n = self.stream.read(&mut self.buffer).await?;
        if n == 0 {
            return Err(ProtocolError::ConnectionClosed);
        }
        trace!("Read {} bytes", n);
        Message::from_bytes(&self.buffer[..n])
    }

    /// Shut down the write side of the stream
    pub async fn shutdown(&mut self) -> Result<(), ProtocolError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

impl Transport<TcpStream> {
    /// Connect to a remote address
    pub async fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self, ProtocolError> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(Self::new(stream))
    }
}
