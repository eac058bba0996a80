//! The blinded-credential ("anonize2") oracle.
//!
//! The actual scheme is an opaque FFI collaborator — this crate defines
//! only the shape of its four entry points and never reimplements the
//! cryptography. Callers hold a `Arc<dyn AnonizeOracle>` and invoke it
//! from a blocking context, since every entry point is CPU-bound and may
//! take tens to hundreds of milliseconds.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnonizeError {
    #[error("oracle returned null")]
    Null,
}

/// The four anonize2 entry points. Implementations are synchronous and
/// CPU-bound; callers dispatch them via `tokio::task::spawn_blocking`
/// rather than calling directly from an async context.
pub trait AnonizeOracle: Send + Sync {
    fn make_cred(&self, id_31_octets: &str) -> Option<String>;
    fn register_user_message(&self, pre_flight: &str, registrar_vk: &str) -> Option<String>;
    fn register_user_final(
        &self,
        id: &str,
        verification: &str,
        pre_flight: &str,
        registrar_vk: &str,
    ) -> Option<String>;
    fn submit_message(
        &self,
        msg: &str,
        master_user_token: &str,
        registrar_vk: &str,
        surveyor_signature: &str,
        surveyor_id: &str,
        surveyor_vk: &str,
    ) -> Option<String>;
}

/// The raw, FFI-shaped binding a real anonize2 library would present:
/// four synchronous, CPU-bound entry points with the same signatures as
/// [`AnonizeOracle`]. Kept as a separate trait so [`BlockingAnonize`]
/// reads as a thin pass-through rather than the thing doing the crypto.
pub trait RawAnonize: Send + Sync {
    fn make_cred(&self, id_31_octets: &str) -> Option<String>;
    fn register_user_message(&self, pre_flight: &str, registrar_vk: &str) -> Option<String>;
    fn register_user_final(
        &self,
        id: &str,
        verification: &str,
        pre_flight: &str,
        registrar_vk: &str,
    ) -> Option<String>;
    fn submit_message(
        &self,
        msg: &str,
        master_user_token: &str,
        registrar_vk: &str,
        surveyor_signature: &str,
        surveyor_id: &str,
        surveyor_vk: &str,
    ) -> Option<String>;
}

/// The production `AnonizeOracle`: a straight pass-through to a
/// [`RawAnonize`] FFI binding. The binding itself is out of scope here —
/// this crate never reimplements the blinded-credential scheme — so
/// callers are responsible for dispatching every entry point via
/// `tokio::task::spawn_blocking` (see `ledger-ballot::proof`) rather than
/// calling it from the async reactor thread.
pub struct BlockingAnonize<R: RawAnonize> {
    raw: R,
}

impl<R: RawAnonize> BlockingAnonize<R> {
    pub fn new(raw: R) -> Self {
        Self { raw }
    }
}

impl<R: RawAnonize> AnonizeOracle for BlockingAnonize<R> {
    fn make_cred(&self, id_31_octets: &str) -> Option<String> {
        self.raw.make_cred(id_31_octets)
    }

    fn register_user_message(&self, pre_flight: &str, registrar_vk: &str) -> Option<String> {
        self.raw.register_user_message(pre_flight, registrar_vk)
    }

    fn register_user_final(
        &self,
        id: &str,
        verification: &str,
        pre_flight: &str,
        registrar_vk: &str,
    ) -> Option<String> {
        self.raw.register_user_final(id, verification, pre_flight, registrar_vk)
    }

    fn submit_message(
        &self,
        msg: &str,
        master_user_token: &str,
        registrar_vk: &str,
        surveyor_signature: &str,
        surveyor_id: &str,
        surveyor_vk: &str,
    ) -> Option<String> {
        self.raw.submit_message(
            msg,
            master_user_token,
            registrar_vk,
            surveyor_signature,
            surveyor_id,
            surveyor_vk,
        )
    }
}

/// A deterministic test double standing in for the real anonize2
/// library. Every entry point succeeds unless fed one of the configured
/// "poison" inputs, so tests can exercise both the happy path and the
/// null-return failure path without a real oracle.
#[derive(Default)]
pub struct MockAnonize {
    pub poison_ids: Vec<String>,
}

impl MockAnonize {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn poisoning(poison_ids: Vec<String>) -> Self {
        Self { poison_ids }
    }
}

impl AnonizeOracle for MockAnonize {
    fn make_cred(&self, id_31_octets: &str) -> Option<String> {
        if self.poison_ids.iter().any(|p| p == id_31_octets) {
            return None;
        }
        Some(format!("pre_flight:{id_31_octets}"))
    }

    fn register_user_message(&self, pre_flight: &str, registrar_vk: &str) -> Option<String> {
        if pre_flight.is_empty() || registrar_vk.is_empty() {
            return None;
        }
        Some(format!("proof:{pre_flight}:{registrar_vk}"))
    }

    fn register_user_final(
        &self,
        id: &str,
        verification: &str,
        pre_flight: &str,
        registrar_vk: &str,
    ) -> Option<String> {
        if verification.is_empty() {
            return None;
        }
        Some(format!("master_user_token:{id}:{pre_flight}:{registrar_vk}"))
    }

    fn submit_message(
        &self,
        msg: &str,
        master_user_token: &str,
        registrar_vk: &str,
        surveyor_signature: &str,
        surveyor_id: &str,
        surveyor_vk: &str,
    ) -> Option<String> {
        if surveyor_signature.is_empty() {
            return None;
        }
        Some(format!(
            "proof:{msg}:{master_user_token}:{registrar_vk}:{surveyor_id}:{surveyor_vk}"
        ))
    }
}
