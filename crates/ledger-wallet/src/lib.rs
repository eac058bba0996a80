//! Ledger Wallet — wallet lifecycle (C4): persona registration,
//! recovery, wallet property refresh, grants, and passphrase export.

mod error;
mod grants;
mod persona;
mod properties;
mod recovery;

pub use error::WalletError;

use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::{PersonaIdentity, WalletInfo};
use ledger_store::LedgerStore;
use ledger_transport::LedgerTransport;
use std::sync::Arc;

/// Drives every wallet-lifecycle operation against one operator. Holds
/// no state of its own beyond its collaborators — all persona/wallet
/// state lives in the store.
pub struct WalletClient<T: LedgerTransport, A: AnonizeOracle> {
    pub(crate) store: Arc<LedgerStore>,
    pub(crate) transport: Arc<T>,
    pub(crate) oracle: Arc<A>,
    pub(crate) operator_base_url: String,
}

impl<T: LedgerTransport, A: AnonizeOracle> WalletClient<T, A> {
    pub fn new(
        store: Arc<LedgerStore>,
        transport: Arc<T>,
        oracle: Arc<A>,
        operator_base_url: impl Into<String>,
    ) -> Self {
        Self {
            store,
            transport,
            oracle,
            operator_base_url: operator_base_url.into(),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.operator_base_url, path)
    }

    pub fn wallet_info(&self) -> WalletInfo {
        self.store.wallet_info()
    }

    pub fn persona_identity(&self) -> PersonaIdentity {
        self.store.persona_identity()
    }
}
