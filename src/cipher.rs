// Symmetric Message Cipher
// AES-256-GCM encryption of chat messages under the handshake key

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::{rngs::OsRng, RngCore};

use crate::error::CipherError;

/// Symmetric key size in bytes (AES-256)
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-GCM (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Key established by the handshake
pub type SymmetricKey = [u8; KEY_SIZE];

/// Encryption primitive used for chat messages once the handshake is done.
pub trait SymmetricCipher: Send + Sync {
    fn encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CipherError>;

    fn decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError>;
}

/// AES-256-GCM with a random nonce per message.
///
/// The output format is: nonce (12 bytes) || ciphertext (variable, includes auth tag)
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmCipher;

impl SymmetricCipher for AesGcmCipher {
    fn encrypt(&self, key: &SymmetricKey, plaintext: &[u8]) -> Result<Vec<u8>, CipherError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|e| CipherError::EncryptionFailed(e.to_string()))?;

        let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        result.extend_from_slice(&nonce_bytes);
        result.extend_from_slice(&ciphertext);
        Ok(result)
    }

    fn decrypt(&self, key: &SymmetricKey, ciphertext: &[u8]) -> Result<Vec<u8>, CipherError> {
        if ciphertext.len() < NONCE_SIZE {
            return Err(CipherError::CiphertextTooShort);
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))?;

        let (nonce_bytes, body) = ciphertext.split_at(NONCE_SIZE);
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), body)
            .map_err(|e| CipherError::DecryptionFailed(e.to_string()))
    }
}

/// Generate a random 32 byte symmetric key
pub fn generate_symmetric_key() -> SymmetricKey {
    let mut key = [0u8; KEY_SIZE];
    OsRng.fill_bytes(&mut key);
    key
}
