// Error Types
// Errors raised by the arithmetic core, the RSA layer and the chat protocol

use thiserror::Error;

use crate::protocol::Header;

/// Errors from parsing or dividing big integers
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BigIntError {
    #[error("Invalid decimal digit: {0:?}")]
    InvalidDigit(char),

    #[error("Empty decimal literal")]
    Empty,

    #[error("Negative value {0} cannot be represented")]
    Negative(i64),

    #[error("Value does not fit in a 64-bit signed integer")]
    Overflow,

    #[error("Division by zero")]
    DivisionByZero,
}

/// Errors from key generation, key parsing and RSA encryption
#[derive(Error, Debug)]
pub enum RsaError {
    #[error("Arithmetic error: {0}")]
    BigInt(#[from] BigIntError),

    #[error("Invalid base64 ciphertext: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Invalid key format: {0}")]
    InvalidKeyFormat(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),

    #[error("Modulus {0} is too small to encrypt single bytes")]
    ModulusTooSmall(String),

    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Errors from the symmetric message cipher
#[derive(Error, Debug)]
pub enum CipherError {
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Invalid ciphertext: too short")]
    CiphertextTooShort,
}

/// Errors from the chat protocol and its transport
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Received empty message")]
    EmptyMessage,

    #[error("Unexpected header: expected {expected}, got {actual}")]
    UnexpectedHeader { expected: Header, actual: Header },

    #[error("{0} was already set")]
    DuplicateSetup(&'static str),

    #[error("Invalid symmetric key length: expected 32 bytes, got {0}")]
    InvalidKeyLength(usize),

    #[error("RSA error: {0}")]
    Rsa(#[from] RsaError),

    #[error("Cipher error: {0}")]
    Cipher(#[from] CipherError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure to start the server
#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to bind listener: {0}")]
    Bind(#[from] std::io::Error),
}

/// Errors from loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration from '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {field} - {reason}")]
    Invalid { field: &'static str, reason: String },
}
