// Chat Client
// Handshake driver and message framing for the interactive client

use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use super::header::Header;
use super::message::Message;
use super::transport::Transport;
use crate::cipher::{generate_symmetric_key, AesGcmCipher, SymmetricCipher, SymmetricKey};
use crate::error::ProtocolError;
use crate::rsa::RsaPublicKey;

/// Key material learned or created during the handshake
#[derive(Debug, Default)]
pub struct ClientContext {
    pub public_key: Option<RsaPublicKey>,
    pub symmetric_key: Option<SymmetricKey>,
}

/// One request/response round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    /// Header byte that was sent
    pub sent: u8,
    pub reply: Message,
}

impl Exchange {
    /// True once CLIENT_CLOSE has been sent and answered
    pub fn is_close(&self) -> bool {
        self.sent == Header::ClientClose.to_byte()
    }
}

/// Split a line of user input into header byte and message text.
///
/// `"<n>:<text>"` with n a decimal number in 0..=255 selects header n;
/// anything else is a CLIENT_MSG carrying the whole line.
pub fn parse_input_line(line: &str) -> (u8, &str) {
    if let Some((prefix, rest)) = line.split_once(':') {
        if !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(header) = prefix.parse::<u8>() {
                return (header, rest);
            }
        }
    }
    (Header::ClientMsg.to_byte(), line)
}

/// Build the outgoing message, encrypting non-empty text once a key exists
pub fn frame_message<C: SymmetricCipher>(
    header: u8,
    text: &str,
    context: &ClientContext,
    cipher: &C,
) -> Result<Message, ProtocolError> {
    match context.symmetric_key.as_ref() {
        Some(key) if !text.is_empty() => {
            Ok(Message::raw(header, cipher.encrypt(key, text.as_bytes())?))
        }
        _ => Ok(Message::raw(header, text.as_bytes())),
    }
}

/// Client side of one connection
pub struct ChatClient<S, C = AesGcmCipher> {
    transport: Transport<S>,
    context: ClientContext,
    cipher: C,
}

impl<S> ChatClient<S, AesGcmCipher>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(transport: Transport<S>) -> Self {
        Self::with_cipher(transport, AesGcmCipher)
    }
}

impl<S, C> ChatClient<S, C>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: SymmetricCipher,
{
    pub fn with_cipher(transport: Transport<S>, cipher: C) -> Self {
        Self {
            transport,
            context: ClientContext::default(),
            cipher,
        }
    }

    pub fn context(&self) -> &ClientContext {
        &self.context
    }

    /// Receive one message and require a specific header
    async fn expect(&mut self, expected: Header) -> Result<Message, ProtocolError> {
        let message = self.transport.recv().await?;
        if message.header() != expected {
            return Err(ProtocolError::UnexpectedHeader {
                expected,
                actual: message.header(),
            });
        }
        Ok(message)
    }

    /// Run CLIENT_HELLO .. SERVER_DONE and store the resulting keys.
    ///
    /// Any reply other than the expected one aborts the handshake with
    /// [`ProtocolError::UnexpectedHeader`].
    pub async fn handshake(&mut self) -> Result<(), ProtocolError> {
        self.transport.send(&Message::empty(Header::ClientHello)).await?;

        let hello = self.expect(Header::ServerHello).await?;
        info!("[server hello] received server hello");
        let public_key = RsaPublicKey::unmarshal(&hello.payload_text())?;
        info!("[server hello] public key is {}", public_key);

        let symmetric_key = generate_symmetric_key();
        debug!("[server hello] generated sym key: {}", hex::encode(symmetric_key));

        let encrypted = public_key.encrypt(&symmetric_key)?;
        self.transport.send(&Message::new(Header::ClientDone, encrypted)).await?;
        self.context.public_key = Some(public_key);
        self.context.symmetric_key = Some(symmetric_key);

        self.expect(Header::ServerDone).await?;
        info!("[server done] handshake complete");
        Ok(())
    }

    /// Send one line of user input and wait for exactly one reply
    pub async fn send_line(&mut self, line: &str) -> Result<Exchange, ProtocolError> {
        let (header, text) = parse_input_line(line);
        let message = frame_message(header, text, &self.context, &self.cipher)?;
        self.transport.send(&message).await?;

        let reply = self.transport.recv().await?;
        Ok(Exchange { sent: header, reply })
    }

    /// Human readable rendering of a server reply
    pub fn describe_reply(&self, reply: &Message) -> String {
        match reply.header() {
            Header::ServerHello => match RsaPublicKey::unmarshal(&reply.payload_text()) {
                Ok(key) => format!("[server hello] public key is {}", key),
                Err(e) => format!("[server hello] unreadable public key: {}", e),
            },
            Header::ServerMsg => {
                let encoded = BASE64_URL.encode(reply.payload());
                let decrypted = self
                    .context
                    .symmetric_key
                    .as_ref()
                    .and_then(|key| self.cipher.decrypt(key, reply.payload()).ok());
                match decrypted {
                    Some(plaintext) => format!(
                        "[message] server encrypted message as: {} ({})",
                        encoded,
                        String::from_utf8_lossy(&plaintext)
                    ),
                    None => format!("[message] server encrypted message as: {}", encoded),
                }
            }
            Header::ServerDone => "[server done] handshake complete".to_string(),
            Header::ServerClose => format!("[server close] {}", reply.payload_text()),
            Header::Error => format!("[error] received error: {}", reply.payload_text()),
            header => format!("[error] unexpected reply {} (byte {})", header, reply.header_byte()),
        }
    }

    pub fn into_transport(self) -> Transport<S> {
        self.transport
    }
}
