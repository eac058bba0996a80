//! `prepareVoteBatch` / `voteBatch` / `voteBatchCallback`.

use crate::{BallotError, BallotPipeline, VOTE_BATCH_SIZE};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::{BatchVote, SurveyorProof};
use ledger_transport::{HttpRequest, LedgerTransport};
use serde_json::json;

impl<T, A> BallotPipeline<T, A>
where
    T: LedgerTransport + 'static,
    A: AnonizeOracle + Send + Sync + 'static,
{
    /// Drain fully-proven ballots into the per-publisher batch buckets,
    /// removing each from the ballots list as it's moved.
    pub async fn prepare_vote_batch(&self) -> Result<(), BallotError> {
        let mut ballots = self.store.ballots();
        let mut batch = self.store.batch();
        let mut removed = Vec::new();

        for (index, ballot) in ballots.iter().enumerate().rev() {
            if !ballot.is_prepared() || !ballot.is_proven() {
                continue;
            }

            let moved = self.store.mutate_transaction_by_viewing_id(&ballot.viewing_id, |tx| {
                *tx.ballots.entry(ballot.publisher_id.clone()).or_insert(0) += 1;
            })?;
            if !moved {
                continue;
            }

            let bucket = match batch.iter_mut().find(|b| b.publisher_id == ballot.publisher_id) {
                Some(bucket) => bucket,
                None => {
                    batch.push(BatchVote {
                        publisher_id: ballot.publisher_id.clone(),
                        proofs: Vec::new(),
                    });
                    batch.last_mut().unwrap()
                }
            };
            bucket.proofs.push(SurveyorProof {
                surveyor_id: ballot.surveyor_id.clone(),
                proof: ballot.proof_ballot.clone(),
            });

            removed.push(index);
        }

        for index in removed {
            ballots.remove(index);
        }

        self.store.set_ballots(ballots)?;
        self.store.set_batch(batch)?;
        Ok(())
    }

    /// Submit up to [`VOTE_BATCH_SIZE`] entries from the first bucket in
    /// the batch list. A no-op when the batch list is empty, mirroring
    /// the original's `if (batch.size() == 0) return;`.
    pub async fn vote_batch(&self) -> Result<(), BallotError> {
        let batch = self.store.batch();
        let bucket = match batch.first() {
            Some(bucket) => bucket.clone(),
            None => return Ok(()),
        };

        let slice_len = bucket.proofs.len().min(VOTE_BATCH_SIZE);
        let slice = &bucket.proofs[..slice_len];

        let body = json!(slice
            .iter()
            .map(|p| json!({ "surveyorId": p.surveyor_id, "proof": p.proof }))
            .collect::<Vec<_>>())
        .to_string();

        let response = self
            .transport
            .load_url(HttpRequest::post(
                self.url("/v2/batch/surveyor/voting"),
                body,
            ))
            .await;

        if !response.ok {
            // Unacknowledged entries simply retry on the next tick.
            return Ok(());
        }

        self.vote_batch_callback(&bucket.publisher_id, slice_len, &response.body)
    }

    fn vote_batch_callback(
        &self,
        publisher_id: &str,
        submitted_len: usize,
        body: &str,
    ) -> Result<(), BallotError> {
        let acknowledged: Vec<String> = match serde_json::from_str::<Vec<serde_json::Value>>(body) {
            Ok(docs) => docs
                .iter()
                .filter_map(|d| d.get("surveyorId").and_then(|v| v.as_str()).map(str::to_string))
                .collect(),
            Err(_) => return Ok(()),
        };

        let mut batch = self.store.batch();
        if let Some(bucket) = batch.iter_mut().find(|b| b.publisher_id == publisher_id) {
            let considered: Vec<SurveyorProof> = bucket.proofs.drain(..submitted_len.min(bucket.proofs.len())).collect();
            let (acked, not_acked): (Vec<_>, Vec<_>) = considered
                .into_iter()
                .partition(|p| acknowledged.contains(&p.surveyor_id));
            let _ = acked;
            let mut remaining = not_acked;
            remaining.extend(bucket.proofs.drain(..));
            bucket.proofs = remaining;
        }
        batch.retain(|b| !b.proofs.is_empty());

        self.store.set_batch(batch)?;
        Ok(())
    }
}
