use thiserror::Error;

#[derive(Error, Debug)]
pub enum BallotError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store error: {0}")]
    Store(#[from] ledger_store::StoreError),
}
