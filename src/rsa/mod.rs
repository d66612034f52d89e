// RSA Module - Main module file
// Exports the decimal BigInt core and the RSA built on top of it

pub mod bigint;
pub mod number_theory;
pub mod keygen;
pub mod encrypt;
pub mod decrypt;

pub use bigint::BigInt;
pub use keygen::{
    generate_keypair, generate_keypair_in, generate_keys, generate_primes, RsaKeyPair,
    RsaPrivateKey, RsaPublicKey,
};
pub use encrypt::{encrypt_bytes, encrypt_digit, encrypt_string};
pub use decrypt::{decrypt_bytes, decrypt_digit, decrypt_to_string};
