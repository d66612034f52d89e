//! Two-party encrypted chat.
//!
//! The server hands out a freshly generated RSA public key on every
//! connection, the client uses it to send over a random 32 byte key, and
//! from then on chat messages travel encrypted under that key.
//!
//! ```text
//! Client                                   Server
//!   |------- CLIENT_HELLO ------------------->|
//!   |<------ SERVER_HELLO "<n>,<e>" ----------|
//!   |------- CLIENT_DONE  base64(rsa(key)) -->|
//!   |<------ SERVER_DONE ---------------------|
//!   |------- CLIENT_MSG   aes(key, text) ---->|
//!   |<------ SERVER_MSG   (same bytes) -------|
//! ```
//!
//! The RSA layer runs on a decimal digit-array integer type and is sized for
//! demonstration only.

pub mod cipher;
pub mod config;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod rsa;

pub use config::{ClientConfig, ServerConfig};
pub use error::{BigIntError, CipherError, ConfigError, ProtocolError, RsaError, ServerError};
