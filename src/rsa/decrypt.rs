// RSA Decryption Implementation
// Reverses the per-byte encryption of encrypt.rs with the private key

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};

use super::bigint::BigInt;
use super::encrypt::FIELD_SEPARATOR;
use super::keygen::RsaPrivateKey;
use super::number_theory::mod_pow;
use crate::error::RsaError;

/// Decrypt a single integer: m = c^d mod n
pub fn decrypt_digit(c: &BigInt, private_key: &RsaPrivateKey) -> Result<BigInt, RsaError> {
    Ok(mod_pow(c, &private_key.d, &private_key.n)?)
}

/// Decrypt base64 ciphertext text using RSA private key
/// Returns plaintext as bytes
pub fn decrypt_bytes(ciphertext: &str, private_key: &RsaPrivateKey) -> Result<Vec<u8>, RsaError> {
    let decoded = BASE64.decode(ciphertext)?;
    let text = String::from_utf8(decoded)?;

    // An empty plaintext encrypts to no fields at all
    if text.is_empty() {
        return Ok(Vec::new());
    }

    text.split(FIELD_SEPARATOR)
        .map(|field| -> Result<u8, RsaError> {
            let m = decrypt_digit(&field.parse::<BigInt>()?, private_key)?;
            // Only the low 8 bits are kept
            Ok(m.to_i64()? as u8)
        })
        .collect()
}

/// Decrypt ciphertext to a string
pub fn decrypt_to_string(
    ciphertext: &str,
    private_key: &RsaPrivateKey,
) -> Result<String, RsaError> {
    let plaintext = decrypt_bytes(ciphertext, private_key)?;
    Ok(String::from_utf8(plaintext)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::encrypt::{encrypt_bytes, encrypt_digit};
    use super::super::keygen::{generate_keypair_in, generate_keys, RsaKeyPair};

    fn textbook_keypair() -> RsaKeyPair {
        generate_keys(&BigInt::from(61u8), &BigInt::from(53u8)).unwrap()
    }

    fn test_roundtrip(keypair: &RsaKeyPair, message: &[u8]) {
        let ciphertext = keypair.public_key.encrypt(message).unwrap();
        let decrypted = keypair.private_key.decrypt(&ciphertext).unwrap();
        assert_eq!(message, decrypted.as_slice());
    }

    #[test]
    fn test_digit_roundtrip_textbook() {
        let keypair = textbook_keypair();
        for m in [0u32, 1, 65, 3232] {
            let m = BigInt::from(m);
            let c = encrypt_digit(&m, &keypair.public_key).unwrap();
            assert_eq!(decrypt_digit(&c, &keypair.private_key).unwrap(), m);
        }
    }

    #[test]
    fn test_digit_roundtrip_full_domain() {
        let keypair = generate_keys(&BigInt::from(17u8), &BigInt::from(19u8)).unwrap();
        for m in 0u32..323 {
            let m = BigInt::from(m);
            let c = encrypt_digit(&m, &keypair.public_key).unwrap();
            assert_eq!(decrypt_digit(&c, &keypair.private_key).unwrap(), m);
        }
    }

    #[test]
    fn test_decrypt_bytes() {
        let keypair = textbook_keypair();
        test_roundtrip(&keypair, b"");
        test_roundtrip(&keypair, &[255]);
        test_roundtrip(&keypair, b"Hello, RSA!");
        test_roundtrip(&keypair, &(0u8..=255).collect::<Vec<_>>());
    }

    #[test]
    fn test_decrypt_generated_key() {
        let keypair = generate_keypair_in(300, 600).unwrap();
        let symmetric_key: Vec<u8> = (0u8..32).map(|i| i.wrapping_mul(37)).collect();
        test_roundtrip(&keypair, &symmetric_key);
    }

    #[test]
    fn test_decrypt_string() {
        let keypair = textbook_keypair();
        let message = "Test message for RSA decryption";

        let ciphertext = encrypt_bytes(message.as_bytes(), &keypair.public_key).unwrap();
        let decrypted = decrypt_to_string(&ciphertext, &keypair.private_key).unwrap();

        assert_eq!(message, decrypted);
    }

    #[test]
    fn test_decrypt_invalid_input() {
        let keypair = textbook_keypair();
        assert!(matches!(
            decrypt_bytes("not base64!", &keypair.private_key),
            Err(RsaError::Base64(_))
        ));

        let garbage = BASE64.encode("12,abc");
        assert!(matches!(decrypt_bytes(&garbage, &keypair.private_key), Err(RsaError::BigInt(_))));
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let keypair1 = textbook_keypair();
        let keypair2 = generate_keys(&BigInt::from(67u8), &BigInt::from(71u8)).unwrap();

        let message = b"Test";
        let ciphertext = keypair1.public_key.encrypt(message).unwrap();

        let decrypted = keypair2.private_key.decrypt(&ciphertext).unwrap();
        assert_ne!(decrypted.as_slice(), message);
    }
}
