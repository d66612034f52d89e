// RSA Key Generation
// Implements RSA key pair generation (public and private keys)

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use tracing::debug;

use super::bigint::BigInt;
use super::number_theory::{gcd, mod_inverse, next_prime};
use crate::error::RsaError;

/// Lower bound of the range primes are drawn from; primes land in [bound, 2 * bound)
pub const DEFAULT_PRIME_BOUND: u64 = 1 << 20;

/// First public exponent tried during key generation
pub const DEFAULT_PUBLIC_EXPONENT: u64 = 65537;

/// RSA Public Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub n: BigInt, // Modulus
    pub e: BigInt, // Public exponent
}

/// RSA Private Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    pub n: BigInt, // Modulus (same as public)
    pub d: BigInt, // Private exponent
}

/// RSA Key Pair (both public and private keys)
#[derive(Debug, Clone)]
pub struct RsaKeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
}

/// Split `"<a>,<b>"` into two decimal integers
fn parse_pair(text: &str) -> Result<(BigInt, BigInt), RsaError> {
    let mut fields = text.split(',');
    match (fields.next(), fields.next(), fields.next()) {
        (Some(first), Some(second), None) => Ok((first.parse()?, second.parse()?)),
        _ => Err(RsaError::InvalidKeyFormat(format!(
            "expected two comma separated integers, got {:?}",
            text
        ))),
    }
}

impl RsaPublicKey {
    /// Serialize as `"<n>,<e>"`
    pub fn marshal(&self) -> String {
        format!("{},{}", self.n, self.e)
    }

    /// Parse the `"<n>,<e>"` form produced by [`RsaPublicKey::marshal`]
    pub fn unmarshal(text: &str) -> Result<Self, RsaError> {
        let (n, e) = parse_pair(text)?;
        Ok(Self { n, e })
    }

    /// Encrypt a message using this public key
    /// Returns the base64 transport text
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String, RsaError> {
        super::encrypt::encrypt_bytes(plaintext, self)
    }
}

impl RsaPrivateKey {
    /// Serialize as `"<n>,<d>"`
    pub fn marshal(&self) -> String {
        format!("{},{}", self.n, self.d)
    }

    /// Parse the `"<n>,<d>"` form produced by [`RsaPrivateKey::marshal`]
    pub fn unmarshal(text: &str) -> Result<Self, RsaError> {
        let (n, d) = parse_pair(text)?;
        Ok(Self { n, d })
    }

    /// Decrypt base64 transport text produced by [`RsaPublicKey::encrypt`]
    pub fn decrypt(&self, ciphertext: &str) -> Result<Vec<u8>, RsaError> {
        super::decrypt::decrypt_bytes(ciphertext, self)
    }
}

impl FromStr for RsaPublicKey {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::unmarshal(s)
    }
}

impl FromStr for RsaPrivateKey {
    type Err = RsaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::unmarshal(s)
    }
}

impl fmt::Display for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.n, self.e)
    }
}

impl fmt::Display for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}, {}>", self.n, self.d)
    }
}

/// Generate two distinct random primes, each the first prime after a
/// uniform draw from [lower, upper)
pub fn generate_primes(lower: u64, upper: u64) -> Result<(BigInt, BigInt), RsaError> {
    if lower >= upper {
        return Err(RsaError::KeyGeneration(format!(
            "empty prime range [{}, {})",
            lower, upper
        )));
    }

    let mut rng = rand::thread_rng();
    let p = next_prime(&BigInt::from(rng.gen_range(lower..upper)))?;
    let mut q = next_prime(&BigInt::from(rng.gen_range(lower..upper)))?;

    // Ensure p != q
    if p == q {
        q = next_prime(&q)?;
    }

    Ok((p, q))
}

/// Derive a key pair from two distinct primes.
///
/// e starts at 65537 and moves up by 2 until it is coprime with both p - 1
/// and q - 1; d is its inverse modulo (p - 1)(q - 1).
pub fn generate_keys(p: &BigInt, q: &BigInt) -> Result<RsaKeyPair, RsaError> {
    let two = BigInt::from(2u8);
    if *p < two || *q < two {
        return Err(RsaError::KeyGeneration("primes must be at least 2".to_string()));
    }
    if p == q {
        return Err(RsaError::KeyGeneration("primes must be distinct".to_string()));
    }

    // Step 1: n = p * q
    let n = p * q;

    // Step 2: smallest odd e >= 65537 coprime with p - 1 and q - 1
    let p_minus_1 = p.decrement();
    let q_minus_1 = q.decrement();
    let one = BigInt::one();
    let mut e = BigInt::from(DEFAULT_PUBLIC_EXPONENT);
    while gcd(&p_minus_1, &e)? != one || gcd(&q_minus_1, &e)? != one {
        e = &e + &two;
    }

    // Step 3: d = e^(-1) mod φ(n)
    let phi_n = &p_minus_1 * &q_minus_1;
    let d = mod_inverse(&e, &phi_n)?;

    debug!("Derived RSA key: n={} e={}", n, e);

    Ok(RsaKeyPair {
        public_key: RsaPublicKey { n: n.clone(), e },
        private_key: RsaPrivateKey { n, d },
    })
}

/// Generate a key pair from primes drawn out of [lower, upper)
pub fn generate_keypair_in(lower: u64, upper: u64) -> Result<RsaKeyPair, RsaError> {
    let (p, q) = generate_primes(lower, upper)?;
    debug!("Generated primes p={} q={}", p, q);
    generate_keys(&p, &q)
}

/// Generate RSA key pair with default settings (primes in [2^20, 2^21), e >= 65537)
pub fn generate_keypair() -> Result<RsaKeyPair, RsaError> {
    generate_keypair_in(DEFAULT_PRIME_BOUND, DEFAULT_PRIME_BOUND * 2)
}
