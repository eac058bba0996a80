use thiserror::Error;

/// The error kinds surfaced to callers, per the wallet lifecycle's error
/// handling policy. `LedgerError` carries a human-readable cause for
/// logging; callers match on the variant, not the message.
#[derive(Error, Debug)]
pub enum WalletError {
    #[error("bad registration response")]
    BadRegistrationResponse,
    #[error("registration verification failed")]
    RegistrationVerificationFailed,
    #[error("ledger error: {0}")]
    LedgerError(String),
    #[error("captcha failed")]
    CaptchaFailed,
    #[error("grant not found")]
    GrantNotFound,
    #[error("store error: {0}")]
    Store(#[from] ledger_store::StoreError),
    #[error("seed error: {0}")]
    Seed(#[from] ledger_core::seed::SeedError),
    #[error("key error: {0}")]
    Key(#[from] ledger_core::keys::KeyError),
}
