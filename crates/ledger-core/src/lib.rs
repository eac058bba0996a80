//! Ledger Core
//!
//! Crypto primitives, mnemonic codecs, the blinded-credential oracle
//! trait, and the shared data model for the wallet/reconcile/ballot
//! subsystems.
//!
//! # Key derivation
//!
//! A persona's signing key comes from a single 32-byte seed:
//! `key_info_seed` → `HKDF-SHA512` → `Ed25519KeyFromSeed`.

pub mod anonize;
pub mod digest;
pub mod http_sig;
pub mod keys;
pub mod memory;
pub mod model;
pub mod niceware;
pub mod seed;
pub mod user_id;

pub use anonize::{AnonizeError, AnonizeOracle, BlockingAnonize, MockAnonize, RawAnonize};
pub use digest::{canonical_json, sha256_base64};
pub use http_sig::sign_http;
pub use keys::{ed25519_from_secret, hkdf, KeyError};
pub use seed::{decode_bip39, decode_niceware, encode_bip39, SeedError};
pub use user_id::derive_anonize_id;
