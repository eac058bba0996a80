//! Ledger Ballot — the ballot pipeline (C6).
//!
//! Re-entrant, driven by two wall-clock timers owned by `ledger-server`'s
//! daemon: a prepare-vote-batch timer and a vote-batch timer. Every step
//! here is idempotent on an empty queue, so a tick with nothing to do is
//! a cheap no-op, exactly like the original `voteBatch`'s
//! `if (batch.size() == 0) return;`.

mod error;
mod prepare;
mod proof;
#[cfg(test)]
mod tests;
mod vote;

pub use error::BallotError;

use ledger_core::anonize::AnonizeOracle;
use ledger_store::LedgerStore;
use ledger_transport::LedgerTransport;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

/// Configured constant: how many proofs `vote_batch` submits per tick.
pub const VOTE_BATCH_SIZE: usize = 10;

/// One ballot paired with the signing material its owning transaction
/// carries, the unit of work `proof_batch` offloads to a worker thread.
#[derive(Debug, Clone)]
pub(crate) struct BatchProof {
    pub ballot: ledger_core::model::Ballot,
    pub master_user_token: String,
    pub registrar_vk: String,
}

pub struct BallotPipeline<T: LedgerTransport, A: AnonizeOracle> {
    pub(crate) store: Arc<LedgerStore>,
    pub(crate) transport: Arc<T>,
    pub(crate) oracle: Arc<A>,
    pub(crate) operator_base_url: String,
    /// Guards "only one `prepare_batch` in flight at a time" — the
    /// idiomatic replacement for the original's implicit single-threaded
    /// serialization.
    pub(crate) prepare_in_flight: AtomicBool,
}

impl<T: LedgerTransport, A: AnonizeOracle> BallotPipeline<T, A> {
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
            prepare_in_flight: AtomicBool::new(false),
        }
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.operator_base_url, path)
    }
}
