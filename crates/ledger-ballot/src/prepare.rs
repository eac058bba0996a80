//! `prepareBallots` / `prepareBatch` / `prepareBatchCallback`.

use crate::{BallotError, BallotPipeline, BatchProof};
use ledger_core::anonize::AnonizeOracle;
use ledger_transport::{HttpRequest, LedgerTransport};
use std::sync::atomic::Ordering;

impl<T, A> BallotPipeline<T, A>
where
    T: LedgerTransport + 'static,
    A: AnonizeOracle + Send + Sync + 'static,
{
    /// Scan ballots newest-to-oldest; launch one `prepare_batch` for the
    /// first unprepared ballot whose transaction is on record, then
    /// return. A no-op if a batch is already in flight or nothing needs
    /// preparing.
    pub async fn prepare_ballots(&self) -> Result<(), BallotError> {
        if self
            .prepare_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Ok(());
        }

        let ballots = self.store.ballots();
        let candidate = ballots
            .iter()
            .rev()
            .find(|b| !b.is_prepared() && self.store.find_transaction_by_viewing_id(&b.viewing_id).is_some())
            .cloned();

        let result = match candidate {
            Some(ballot) => {
                let transaction = self
                    .store
                    .find_transaction_by_viewing_id(&ballot.viewing_id)
                    .expect("checked above");
                self.prepare_batch(&transaction.anonize_viewing_id).await
            }
            None => Ok(()),
        };

        self.prepare_in_flight.store(false, Ordering::SeqCst);
        result
    }

    pub(crate) async fn prepare_batch(&self, anonize_viewing_id: &str) -> Result<(), BallotError> {
        let response = self
            .transport
            .load_url(HttpRequest::get(self.url(&format!(
                "/v2/batch/surveyor/voting/{anonize_viewing_id}"
            ))))
            .await;

        if !response.ok {
            return Err(BallotError::Transport(format!(
                "prepare_batch request failed with status {}",
                response.status
            )));
        }

        self.prepare_batch_callback(&response.body).await
    }

    async fn prepare_batch_callback(&self, body: &str) -> Result<(), BallotError> {
        let documents: Vec<serde_json::Value> = match serde_json::from_str(body) {
            Ok(docs) => docs,
            Err(_) => return Err(BallotError::Transport("prepare_batch response is not a JSON array".into())),
        };

        let mut ballots = self.store.ballots();
        let mut batch_proofs = Vec::new();

        for document in documents {
            if document.get("error").is_some() {
                continue;
            }
            let surveyor_id = match document.get("surveyorId").and_then(|v| v.as_str()) {
                Some(id) => id.to_string(),
                None => continue,
            };

            let matching: Vec<usize> = ballots
                .iter()
                .enumerate()
                .filter(|(_, b)| b.surveyor_id == surveyor_id)
                .map(|(i, _)| i)
                .collect();

            for index in matching {
                ballots[index].prepare_ballot = document.to_string();
                if let Some(transaction) = self
                    .store
                    .find_transaction_by_viewing_id(&ballots[index].viewing_id)
                {
                    batch_proofs.push(BatchProof {
                        ballot: ballots[index].clone(),
                        master_user_token: transaction.master_user_token.clone(),
                        registrar_vk: transaction.registrar_vk.clone(),
                    });
                }
            }
        }

        self.store.set_ballots(ballots)?;

        if !batch_proofs.is_empty() {
            self.offload_proof_batch(batch_proofs).await?;
        }
        Ok(())
    }
}
