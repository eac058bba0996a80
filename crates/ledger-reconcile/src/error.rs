use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("reconcile rejected: {0}")]
    Rejected(&'static str),
    #[error("ledger error: {0}")]
    LedgerError(String),
    #[error("store error: {0}")]
    Store(#[from] ledger_store::StoreError),
    #[error("key error: {0}")]
    Key(#[from] ledger_core::keys::KeyError),
}
