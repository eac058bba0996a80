//! Seed generation and mnemonic encode/decode.
//!
//! Two encodings are supported for the 32-byte `key_info_seed`: BIP-39
//! (24 words, the current format) and legacy Niceware (16 words, decode
//! only, for recovering older wallets).

use bip39::{Language, Mnemonic};
use rand::RngCore;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("invalid mnemonic: {0}")]
    InvalidMnemonic(String),
}

/// Generate a fresh 32-byte seed from a CSPRNG.
pub fn generate_seed() -> [u8; 32] {
    let mut seed = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut seed);
    seed
}

/// Encode a 32-byte seed as a 24-word BIP-39 mnemonic.
pub fn encode_bip39(seed: &[u8; 32]) -> Result<String, SeedError> {
    let mnemonic = Mnemonic::from_entropy_in(Language::English, seed)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// Decode a 24-word BIP-39 phrase back to its 32-byte entropy.
pub fn decode_bip39(phrase: &str) -> Result<[u8; 32], SeedError> {
    let mnemonic = Mnemonic::parse_in(Language::English, phrase)
        .map_err(|e| SeedError::InvalidMnemonic(e.to_string()))?;
    let entropy = mnemonic.to_entropy();
    entropy
        .try_into()
        .map_err(|_| SeedError::InvalidMnemonic("entropy is not 32 bytes".into()))
}

/// Decode a legacy 16-word Niceware phrase against an externally
/// supplied dictionary. The dictionary is loaded by the embedder (see
/// `ledger-wallet`'s recovery path) and passed in here rather than
/// bundled, matching the contract that Niceware's word list is an
/// external collaborator, not part of the core.
pub fn decode_niceware(phrase: &str, dictionary: &[String]) -> Result<[u8; 32], SeedError> {
    let words: Vec<&str> = phrase.split(' ').collect();
    if words.len() != 16 {
        return Err(SeedError::InvalidMnemonic(format!(
            "expected 16 words, got {}",
            words.len()
        )));
    }

    let mut bytes = Vec::with_capacity(32);
    for word in words {
        let index = dictionary
            .iter()
            .position(|w| w == word)
            .ok_or_else(|| SeedError::InvalidMnemonic(format!("word not in dictionary: {word}")))?;
        bytes.push((index >> 8) as u8);
        bytes.push((index & 0xff) as u8);
    }

    bytes
        .try_into()
        .map_err(|_| SeedError::InvalidMnemonic("decoded length is not 32 bytes".into()))
}
