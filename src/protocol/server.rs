// Chat Server
// Per-connection handshake state machine and the accept loop around it

use std::net::SocketAddr;
use std::time::Duration;

use base64::{engine::general_purpose::URL_SAFE as BASE64_URL, Engine};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

use super::header::Header;
use super::message::Message;
use super::transport::Transport;
use crate::cipher::{AesGcmCipher, SymmetricCipher, SymmetricKey};
use crate::config::ServerConfig;
use crate::error::{ProtocolError, RsaError, ServerError};
use crate::rsa::{generate_keypair_in, RsaKeyPair, RsaPrivateKey};

pub const ERR_DUPLICATE_HELLO: &str = "client hello failed: received hello request twice";
pub const ERR_DUPLICATE_DONE: &str = "client done failed: received symmetric key twice";
pub const ERR_EMPTY_MESSAGE: &str = "there is no point in encrypting null messages";
pub const ERR_INVALID_HEADER: &str = "received invalid header";

/// Reason sent with SERVER_CLOSE
pub const CLOSE_REASON: &str = "goodbye";

/// Key material owned by one connection. Each key can be set only once.
#[derive(Debug, Default)]
pub struct ConnectionContext {
    private_key: Option<RsaPrivateKey>,
    symmetric_key: Option<SymmetricKey>,
}

impl ConnectionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.private_key.as_ref()
    }

    pub fn symmetric_key(&self) -> Option<&SymmetricKey> {
        self.symmetric_key.as_ref()
    }

    pub fn set_private_key(&mut self, key: RsaPrivateKey) -> Result<(), ProtocolError> {
        if self.private_key.is_some() {
            return Err(ProtocolError::DuplicateSetup("private key"));
        }
        self.private_key = Some(key);
        Ok(())
    }

    pub fn set_symmetric_key(&mut self, key: SymmetricKey) -> Result<(), ProtocolError> {
        if self.symmetric_key.is_some() {
            return Err(ProtocolError::DuplicateSetup("symmetric key"));
        }
        self.symmetric_key = Some(key);
        Ok(())
    }
}

/// Where a connection is in the handshake
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for CLIENT_HELLO
    Idle,
    /// SERVER_HELLO sent, waiting for the encrypted symmetric key
    HelloSent,
    /// Symmetric key established, relaying messages
    Secure,
    /// CLIENT_CLOSE answered; the connection loop stops
    Closed,
}

/// Protocol state for one connection.
///
/// `handle` is synchronous and performs no I/O; it returns the reply to
/// write back, or `None` when the message is dropped without answer.
/// A first CLIENT_HELLO generates the RSA key inline, so async callers
/// check [`ServerSession::needs_keypair`] and finish the hello with
/// [`ServerSession::complete_hello`] after generating the key off the runtime.
pub struct ServerSession<C = AesGcmCipher> {
    state: ServerState,
    context: ConnectionContext,
    cipher: C,
    prime_bounds: (u64, u64),
}

impl ServerSession<AesGcmCipher> {
    pub fn new(config: &ServerConfig) -> Self {
        Self::with_cipher(config, AesGcmCipher)
    }
}

impl<C: SymmetricCipher> ServerSession<C> {
    pub fn with_cipher(config: &ServerConfig, cipher: C) -> Self {
        Self {
            state: ServerState::Idle,
            context: ConnectionContext::new(),
            cipher,
            prime_bounds: (config.prime_lower_bound, config.prime_upper_bound),
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn context(&self) -> &ConnectionContext {
        &self.context
    }

    pub fn is_closed(&self) -> bool {
        self.state == ServerState::Closed
    }

    /// Range the RSA primes are drawn from
    pub fn prime_bounds(&self) -> (u64, u64) {
        self.prime_bounds
    }

    /// True when `message` is a first CLIENT_HELLO that needs a fresh key
    pub fn needs_keypair(&self, message: &Message) -> bool {
        self.state != ServerState::Closed
            && message.header() == Header::ClientHello
            && self.context.private_key().is_none()
    }

    /// Process one incoming message
    pub fn handle(&mut self, message: &Message) -> Option<Message> {
        match (message.header(), self.state) {
            (_, ServerState::Closed) => None,
            (Header::ClientHello, _) => Some(self.on_client_hello()),
            (Header::ClientDone, ServerState::HelloSent) => {
                Some(self.on_client_done(message.payload()))
            }
            (Header::ClientDone, ServerState::Secure) => {
                warn!("[client done] received symmetric key twice");
                Some(Message::error(ERR_DUPLICATE_DONE))
            }
            (Header::ClientMsg, _) => self.on_client_msg(message.payload()),
            (Header::ClientClose, _) => {
                info!("[client close] closing connection");
                self.state = ServerState::Closed;
                Some(Message::new(Header::ServerClose, CLOSE_REASON))
            }
            (header, state) => {
                warn!(
                    "[error] received invalid header {} (byte {}) in state {:?}",
                    header,
                    message.header_byte(),
                    state
                );
                Some(Message::error(ERR_INVALID_HEADER))
            }
        }
    }

    fn on_client_hello(&mut self) -> Message {
        info!("[client hello] received client hello");
        if self.context.private_key().is_some() {
            warn!("[client hello] received hello request twice");
            return Message::error(ERR_DUPLICATE_HELLO);
        }

        let (lower, upper) = self.prime_bounds;
        self.complete_hello(generate_keypair_in(lower, upper))
    }

    /// Store a freshly generated key pair and build the SERVER_HELLO reply
    pub fn complete_hello(&mut self, generated: Result<RsaKeyPair, RsaError>) -> Message {
        let keypair = match generated {
            Ok(keypair) => keypair,
            Err(e) => {
                error!("[client hello] key generation failed: {}", e);
                return Message::error(&format!("client hello failed: {}", e));
            }
        };

        let public_key = keypair.public_key.marshal();
        if let Err(e) = self.context.set_private_key(keypair.private_key) {
            return Message::error(&format!("client hello failed: {}", e));
        }
        self.state = ServerState::HelloSent;

        debug!("[client hello] issued public key {}", public_key);
        Message::new(Header::ServerHello, public_key)
    }

    fn on_client_done(&mut self, payload: &[u8]) -> Message {
        debug!(
            "[client done] received encrypted symmetric key: {}",
            String::from_utf8_lossy(payload)
        );

        match self.install_symmetric_key(payload) {
            Ok(()) => {
                info!("[client done] symmetric key established");
                self.state = ServerState::Secure;
                Message::empty(Header::ServerDone)
            }
            Err(ProtocolError::DuplicateSetup(_)) => {
                warn!("[client done] received symmetric key twice");
                Message::error(ERR_DUPLICATE_DONE)
            }
            Err(e) => {
                warn!("[client done] rejected symmetric key: {}", e);
                Message::error(&format!("client done failed: {}", e))
            }
        }
    }

    fn install_symmetric_key(&mut self, payload: &[u8]) -> Result<(), ProtocolError> {
        let private_key = self
            .context
            .private_key()
            .ok_or(ProtocolError::UnexpectedHeader {
                expected: Header::ClientHello,
                actual: Header::ClientDone,
            })?;

        let ciphertext = String::from_utf8_lossy(payload);
        let decrypted = private_key.decrypt(&ciphertext)?;
        let key: SymmetricKey = decrypted
            .as_slice()
            .try_into()
            .map_err(|_| ProtocolError::InvalidKeyLength(decrypted.len()))?;

        debug!("[client done] decrypted symmetric key is {}", hex::encode(key));
        self.context.set_symmetric_key(key)
    }

    fn on_client_msg(&self, payload: &[u8]) -> Option<Message> {
        info!("[message] received encrypted message: {}", BASE64_URL.encode(payload));

        let Some(key) = self.context.symmetric_key() else {
            warn!("[message] client tried to send message without encryption, dropping it");
            return None;
        };
        if payload.is_empty() {
            return Some(Message::error(ERR_EMPTY_MESSAGE));
        }

        match self.cipher.decrypt(key, payload) {
            Ok(plaintext) => {
                info!("[message] decrypted message: {}", String::from_utf8_lossy(&plaintext))
            }
            Err(e) => warn!("[message] could not decrypt message: {}", e),
        }

        // Echo the ciphertext exactly as received
        Some(Message::new(Header::ServerMsg, payload))
    }
}

/// Drive one connection until the peer disconnects or asks to close
pub async fn serve_connection<S, C>(
    mut transport: Transport<S>,
    mut session: ServerSession<C>,
    done_delay: Duration,
) -> Result<(), ProtocolError>
where
    S: AsyncRead + AsyncWrite + Unpin,
    C: SymmetricCipher,
{
    loop {
        let message = match transport.recv().await {
            Ok(message) => message,
            Err(ProtocolError::ConnectionClosed) => return Ok(()),
            Err(e) => return Err(e),
        };

        let reply = if session.needs_keypair(&message) {
            info!("[client hello] received client hello");
            let (lower, upper) = session.prime_bounds();
            let generated = tokio::task::spawn_blocking(move || generate_keypair_in(lower, upper))
                .await
                .unwrap_or_else(|e| Err(RsaError::KeyGeneration(e.to_string())));
            Some(session.complete_hello(generated))
        } else {
            session.handle(&message)
        };

        if let Some(reply) = reply {
            if reply.header() == Header::ServerDone && !done_delay.is_zero() {
                tokio::time::sleep(done_delay).await;
            }
            transport.send(&reply).await?;
        }

        if session.is_closed() {
            transport.shutdown().await?;
            return Ok(());
        }
    }
}

/// TCP server running one task per accepted connection
pub struct Server {
    listener: TcpListener,
    config: ServerConfig,
}

impl Server {
    /// Validate the configuration and bind the listener
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        config.validate()?;
        let listener = TcpListener::bind(&config.bind_addr).await?;
        Ok(Self { listener, config })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ProtocolError> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections forever
    pub async fn run(self) {
        info!("Listening on {}", self.config.bind_addr);
        info!("Waiting for client...");

        loop {
            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!("Error accepting client: {}", e);
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                warn!("[{}] could not disable Nagle: {}", peer, e);
            }
            info!("[{}] client connected", peer);

            let session = ServerSession::new(&self.config);
            let delay = self.config.done_delay();
            tokio::spawn(async move {
                match serve_connection(Transport::new(stream), session, delay).await {
                    Ok(()) => info!("[{}] client disconnected", peer),
                    Err(e) => warn!("[{}] client disconnected: {}", peer, e),
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cipher::{generate_symmetric_key, KEY_SIZE};
    use crate::rsa::RsaPublicKey;

    fn test_config() -> ServerConfig {
        ServerConfig::default()
            .with_prime_bounds(300, 600)
            .with_done_delay(Duration::ZERO)
    }

    fn hello(session: &mut ServerSession) -> RsaPublicKey {
        let reply = session.handle(&Message::empty(Header::ClientHello)).unwrap();
        assert_eq!(reply.header(), Header::ServerHello);
        RsaPublicKey::unmarshal(&reply.payload_text()).unwrap()
    }

    fn done(session: &mut ServerSession, public_key: &RsaPublicKey, key: &SymmetricKey) -> Message {
        let encrypted = public_key.encrypt(key).unwrap();
        session.handle(&Message::new(Header::ClientDone, encrypted)).unwrap()
    }

    #[test]
    fn test_full_handshake() {
        let mut session = ServerSession::new(&test_config());
        assert_eq!(session.state(), ServerState::Idle);

        let public_key = hello(&mut session);
        assert_eq!(session.state(), ServerState::HelloSent);
        assert!(!public_key.e.is_even());

        let key = generate_symmetric_key();
        assert_eq!(done(&mut session, &public_key, &key).header(), Header::ServerDone);
        assert_eq!(session.state(), ServerState::Secure);
        assert_eq!(session.context().symmetric_key(), Some(&key));

        let ciphertext = AesGcmCipher.encrypt(&key, b"hello there").unwrap();
        let reply = session.handle(&Message::new(Header::ClientMsg, ciphertext.clone())).unwrap();
        assert_eq!(reply.header(), Header::ServerMsg);
        assert_eq!(reply.payload(), ciphertext.as_slice());
    }

    #[test]
    fn test_duplicate_hello_keeps_first_key() {
        let mut session = ServerSession::new(&test_config());
        let public_key = hello(&mut session);
        let private_key = session.context().private_key().cloned();

        let reply = session.handle(&Message::empty(Header::ClientHello)).unwrap();
        assert_eq!(reply, Message::error(ERR_DUPLICATE_HELLO));
        assert_eq!(session.context().private_key().cloned(), private_key);

        let key = generate_symmetric_key();
        assert_eq!(done(&mut session, &public_key, &key).header(), Header::ServerDone);
    }

    #[test]
    fn test_duplicate_done_keeps_first_key() {
        let mut session = ServerSession::new(&test_config());
        let public_key = hello(&mut session);
        let first = generate_symmetric_key();
        done(&mut session, &public_key, &first);

        let reply = done(&mut session, &public_key, &generate_symmetric_key());
        assert_eq!(reply, Message::error(ERR_DUPLICATE_DONE));
        assert_eq!(session.context().symmetric_key(), Some(&first));
        assert_eq!(session.state(), ServerState::Secure);
    }

    #[test]
    fn test_message_before_key_exchange_is_dropped() {
        let mut session = ServerSession::new(&test_config());
        assert_eq!(session.handle(&Message::new(Header::ClientMsg, "plain")), None);

        hello(&mut session);
        assert_eq!(session.handle(&Message::new(Header::ClientMsg, "plain")), None);
        assert_eq!(session.state(), ServerState::HelloSent);
    }

    #[test]
    fn test_empty_message_rejected() {
        let mut session = ServerSession::new(&test_config());
        let public_key = hello(&mut session);
        done(&mut session, &public_key, &generate_symmetric_key());

        let reply = session.handle(&Message::empty(Header::ClientMsg)).unwrap();
        assert_eq!(reply, Message::error(ERR_EMPTY_MESSAGE));
        assert_eq!(session.state(), ServerState::Secure);
    }

    #[test]
    fn test_invalid_headers() {
        let mut session = ServerSession::new(&test_config());

        // CLIENT_DONE before any hello
        let reply = session.handle(&Message::new(Header::ClientDone, "abc")).unwrap();
        assert_eq!(reply, Message::error(ERR_INVALID_HEADER));
        assert_eq!(session.state(), ServerState::Idle);

        // Server-side headers and unknown bytes
        for byte in [1u8, 3, 4, 6, 8, 9, 255] {
            let reply = session.handle(&Message::raw(byte, "x")).unwrap();
            assert_eq!(reply, Message::error(ERR_INVALID_HEADER));
        }
        assert_eq!(session.state(), ServerState::Idle);
    }

    #[test]
    fn test_bad_symmetric_key_rejected() {
        let mut session = ServerSession::new(&test_config());
        let public_key = hello(&mut session);

        let reply = session.handle(&Message::new(Header::ClientDone, "@@not base64@@")).unwrap();
        assert_eq!(reply.header(), Header::Error);
        assert_eq!(session.state(), ServerState::HelloSent);

        let short = public_key.encrypt(&[7u8; 16]).unwrap();
        let reply = session.handle(&Message::new(Header::ClientDone, short)).unwrap();
        assert_eq!(reply.header(), Header::Error);
        assert!(reply.payload_text().contains("got 16"));
        assert!(session.context().symmetric_key().is_none());
    }

    #[test]
    fn test_client_close() {
        let mut session = ServerSession::new(&test_config());
        let reply = session.handle(&Message::empty(Header::ClientClose)).unwrap();
        assert_eq!(reply, Message::new(Header::ServerClose, CLOSE_REASON));
        assert!(session.is_closed());
        assert_eq!(session.handle(&Message::empty(Header::ClientHello)), None);
    }

    #[test]
    fn test_context_set_once() {
        let mut context = ConnectionContext::new();
        context.set_symmetric_key([1u8; KEY_SIZE]).unwrap();
        assert!(matches!(
            context.set_symmetric_key([2u8; KEY_SIZE]),
            Err(ProtocolError::DuplicateSetup("symmetric key"))
        ));
        assert_eq!(context.symmetric_key(), Some(&[1u8; KEY_SIZE]));
    }

    #[test]
    fn test_needs_keypair_only_for_first_hello() {
        let mut session = ServerSession::new(&test_config());
        let hello_message = Message::empty(Header::ClientHello);
        assert!(session.needs_keypair(&hello_message));
        assert!(!session.needs_keypair(&Message::empty(Header::ClientDone)));

        hello(&mut session);
        assert!(!session.needs_keypair(&hello_message));
    }

    #[test]
    fn test_complete_hello_reports_failure() {
        let mut session = ServerSession::new(&test_config());
        let failed = Err(RsaError::KeyGeneration("empty prime range".to_string()));

        let reply = session.complete_hello(failed);
        assert_eq!(reply.header(), Header::Error);
        assert!(reply.payload_text().starts_with("client hello failed"));
        assert_eq!(session.state(), ServerState::Idle);
        assert!(session.context().private_key().is_none());
    }

    // Single-threaded runtime: a connection generating its key must not hold
    // up another connection on the same thread
    #[tokio::test(flavor = "current_thread")]
    async fn test_key_generation_does_not_block_other_connections() {
        let config = ServerConfig::default().with_done_delay(Duration::ZERO);

        let (slow_client, slow_server) = tokio::io::duplex(64 * 1024);
        let (fast_client, fast_server) = tokio::io::duplex(64 * 1024);
        tokio::spawn(serve_connection(
            Transport::new(slow_server),
            ServerSession::new(&config),
            Duration::ZERO,
        ));
        tokio::spawn(serve_connection(
            Transport::new(fast_server),
            ServerSession::new(&config),
            Duration::ZERO,
        ));

        let mut slow = Transport::new(slow_client);
        let mut fast = Transport::new(fast_client);
        slow.send(&Message::empty(Header::ClientHello)).await.unwrap();
        fast.send(&Message::raw(42, "?")).await.unwrap();

        assert_eq!(fast.recv().await.unwrap(), Message::error(ERR_INVALID_HEADER));
        let pending = tokio::time::timeout(Duration::ZERO, slow.recv()).await;
        assert!(pending.is_err(), "key generation finished before the other connection ran");

        let reply = tokio::time::timeout(Duration::from_secs(30), slow.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reply.header(), Header::ServerHello);
        let public_key = RsaPublicKey::unmarshal(&reply.payload_text()).unwrap();
        assert!(public_key.n > crate::rsa::BigInt::from(1u64 << 40));
    }

    #[tokio::test]
    async fn test_serve_connection_over_duplex() {
        let (client_end, server_end) = tokio::io::duplex(64 * 1024);
        let session = ServerSession::new(&test_config());
        let server = tokio::spawn(serve_connection(
            Transport::new(server_end),
            session,
            Duration::ZERO,
        ));

        let mut client = Transport::new(client_end);
        client.send(&Message::raw(42, "?")).await.unwrap();
        assert_eq!(client.recv().await.unwrap(), Message::error(ERR_INVALID_HEADER));

        client.send(&Message::empty(Header::ClientClose)).await.unwrap();
        assert_eq!(client.recv().await.unwrap().header(), Header::ServerClose);

        server.await.unwrap().unwrap();
    }
}
