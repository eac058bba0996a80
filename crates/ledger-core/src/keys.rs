//! Key derivation from the persona seed.
//!
//! `key_info_seed` (32 bytes, CSPRNG-generated at persona registration)
//! is stretched via HKDF-SHA512 to a 32-byte secret, which is then used
//! directly as an Ed25519 seed.

use ed25519_dalek::{SigningKey, VerifyingKey};
use hkdf::Hkdf;
use sha2::Sha512;
use thiserror::Error;

/// Fixed HKDF salt. Not a secret — the scheme's domain separation comes
/// from this constant being stable across the whole install base.
const HKDF_SALT: &[u8; 64] = &[
    0x7e, 0x4a, 0x3b, 0x91, 0x1d, 0xc8, 0x52, 0x6f, 0x0a, 0x3e, 0x9d, 0x47, 0x2c, 0x1b, 0x8f, 0x64,
    0x2e, 0x5a, 0x93, 0xd1, 0x74, 0x0b, 0x2f, 0xc6, 0x88, 0x19, 0x4d, 0x5e, 0xa7, 0x36, 0xf2, 0x0c,
    0x91, 0x4b, 0x68, 0x2d, 0xe5, 0x3a, 0x7c, 0x1f, 0x50, 0x9b, 0x24, 0xd8, 0x63, 0xaf, 0x17, 0x4e,
    0x0d, 0x5c, 0x92, 0x3b, 0x71, 0xe4, 0x6a, 0xd9, 0x28, 0xbc, 0x4f, 0x15, 0x83, 0x2e, 0x6d, 0x95,
];

#[derive(Error, Debug)]
pub enum KeyError {
    #[error("HKDF expansion failed: {0}")]
    Hkdf(String),
}

/// Stretch a 32-byte persona seed into a 32-byte Ed25519 seed.
pub fn hkdf(seed: &[u8; 32]) -> Result<[u8; 32], KeyError> {
    let hk = Hkdf::<Sha512>::new(Some(HKDF_SALT), seed);
    let mut out = [0u8; 32];
    hk.expand(&[], &mut out)
        .map_err(|e| KeyError::Hkdf(e.to_string()))?;
    Ok(out)
}

/// Derive an Ed25519 keypair from an already-stretched secret.
pub fn ed25519_from_secret(secret: &[u8; 32]) -> (VerifyingKey, SigningKey) {
    let signing_key = SigningKey::from_bytes(secret);
    let verifying_key = signing_key.verifying_key();
    (verifying_key, signing_key)
}
