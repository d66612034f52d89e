// RSA Encryption Implementation
// Encrypts byte strings one byte at a time with the public key

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::bigint::BigInt;
use super::keygen::RsaPublicKey;
use super::number_theory::mod_pow;
use crate::error::RsaError;

/// Separator between encrypted bytes before base64 encoding
pub(crate) const FIELD_SEPARATOR: char = ',';

/// Encrypt a single integer: c = m^e mod n
pub fn encrypt_digit(m: &BigInt, public_key: &RsaPublicKey) -> Result<BigInt, RsaError> {
    Ok(mod_pow(m, &public_key.e, &public_key.n)?)
}

/// Encrypt bytes using RSA public key.
///
/// Every byte is encrypted as its own plaintext integer, the decimal results
/// are joined with commas and the joined text is base64 encoded.
pub fn encrypt_bytes(plaintext: &[u8], public_key: &RsaPublicKey) -> Result<String, RsaError> {
    // Every byte value has to survive the reduction mod n
    if public_key.n <= BigInt::from(u8::MAX) {
        return Err(RsaError::ModulusTooSmall(public_key.n.to_string()));
    }

    let fields = plaintext
        .iter()
        .map(|&byte| encrypt_digit(&BigInt::from(byte), public_key).map(|c| c.to_string()))
        .collect::<Result<Vec<_>, _>>()?;

    let joined = fields.join(&FIELD_SEPARATOR.to_string());
    Ok(BASE64.encode(joined.as_bytes()))
}

/// Encrypt a string using RSA public key
pub fn encrypt_string(plaintext: &str, public_key: &RsaPublicKey) -> Result<String, RsaError> {
    encrypt_bytes(plaintext.as_bytes(), public_key)
}
