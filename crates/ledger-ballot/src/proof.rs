//! `proofBatch` (worker-offloaded) / `proofBatchCallback`.

use crate::{BallotError, BallotPipeline, BatchProof};
use ledger_core::anonize::AnonizeOracle;
use ledger_transport::LedgerTransport;
use serde_json::json;
use std::sync::Arc;

impl<T, A> BallotPipeline<T, A>
where
    T: LedgerTransport + 'static,
    A: AnonizeOracle + Send + Sync + 'static,
{
    /// Offload the CPU-bound proof computation to a blocking worker
    /// thread, matching the original's "schedule on a worker, not the
    /// I/O dispatcher" — the async reactor thread never blocks on
    /// `submit_message`.
    pub(crate) async fn offload_proof_batch(&self, batch: Vec<BatchProof>) -> Result<(), BallotError> {
        let oracle = Arc::clone(&self.oracle);
        let proofs = tokio::task::spawn_blocking(move || proof_batch(&oracle, batch))
            .await
            .expect("proof_batch worker task panicked");

        self.proof_batch_callback(proofs).await
    }

    async fn proof_batch_callback(
        &self,
        proofs: Vec<(String, String)>,
    ) -> Result<(), BallotError> {
        let mut ballots = self.store.ballots();
        for (surveyor_id, proof) in proofs {
            for ballot in ballots.iter_mut() {
                if ballot.surveyor_id == surveyor_id {
                    ballot.proof_ballot = proof.clone();
                }
            }
        }
        self.store.set_ballots(ballots)?;
        Ok(())
    }
}

/// Per-`BatchProof` pure computation: split the surveyor signature at the
/// first comma (trimming one leading space), build the canonical
/// `{"publisher": ...}` message, and call into the blinded-credential
/// oracle. Runs entirely off the async reactor thread.
fn proof_batch<A: AnonizeOracle>(oracle: &A, batch: Vec<BatchProof>) -> Vec<(String, String)> {
    batch
        .into_iter()
        .map(|item| {
            let surveyor: serde_json::Value =
                serde_json::from_str(&item.ballot.prepare_ballot).unwrap_or(serde_json::Value::Null);
            let signature = surveyor
                .get("signature")
                .and_then(|v| v.as_str())
                .unwrap_or("");
            let surveyor_id = surveyor
                .get("surveyorId")
                .and_then(|v| v.as_str())
                .unwrap_or(&item.ballot.surveyor_id)
                .to_string();
            let surveyor_vk = surveyor.get("registrarVK").and_then(|v| v.as_str()).unwrap_or("");

            let signature_part = match signature.split_once(',') {
                Some((_, rest)) => rest.strip_prefix(' ').unwrap_or(rest).to_string(),
                None => String::new(),
            };

            let msg = json!({ "publisher": item.ballot.publisher_id }).to_string();

            let proof = oracle
                .submit_message(
                    &msg,
                    &item.master_user_token,
                    &item.registrar_vk,
                    &signature_part,
                    &surveyor_id,
                    surveyor_vk,
                )
                .unwrap_or_default();

            (surveyor_id, proof)
        })
        .collect()
}
