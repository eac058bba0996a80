//! Ledger Reconcile — the reconcile state machine (C5).
//!
//! Drives one viewing id at a time through an explicit, persisted
//! [`ReconcileState`](ledger_core::model::ReconcileState) tag so a crash
//! mid-reconcile resumes by dispatching on whatever tag was last
//! written, instead of re-deriving progress from which fields happen to
//! be populated.

mod complete;
mod eligibility;
mod error;
mod state_machine;

pub use error::ReconcileError;

use ledger_core::anonize::AnonizeOracle;
use ledger_store::LedgerStore;
use ledger_transport::LedgerTransport;
use std::sync::Arc;

/// Drives reconciles for one operator. Like [`ledger_wallet::WalletClient`],
/// holds no state of its own — everything lives in the store.
pub struct ReconcileEngine<T: LedgerTransport, A: AnonizeOracle> {
    pub(crate) store: Arc<LedgerStore>,
    pub(crate) transport: Arc<T>,
    pub(crate) oracle: Arc<A>,
    pub(crate) operator_base_url: String,
    pub(crate) signing_key: ed25519_dalek::SigningKey,
}

impl<T: LedgerTransport, A: AnonizeOracle> ReconcileEngine<T, A> {
    pub fn new(
        store: Arc<LedgerStore>,
        transport: Arc<T>,
        oracle: Arc<A>,
        operator_base_url: impl Into<String>,
    ) -> Result<Self, ReconcileError> {
        let seed = store
            .wallet_info()
            .key_info_seed
            .ok_or_else(|| ReconcileError::LedgerError("wallet has no signing seed".into()))?;
        let secret = ledger_core::keys::hkdf(&seed)?;
        let (_public_key, signing_key) = ledger_core::keys::ed25519_from_secret(&secret);

        Ok(Self {
            store,
            transport,
            oracle,
            operator_base_url: operator_base_url.into(),
            signing_key,
        })
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.operator_base_url, path)
    }
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Pull a single top-level scalar field out of a response body without
/// committing to its full shape — the same tolerant-extraction approach
/// `ledger_wallet`'s persona dance uses for the registrar responses.
pub(crate) fn json_field(body: &str, field: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get(field)? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn json_string_array(body: &str, field: &str) -> Option<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let array = value.get(field)?.as_array()?;
    array
        .iter()
        .map(|v| v.as_str().map(|s| s.to_string()))
        .collect()
}
