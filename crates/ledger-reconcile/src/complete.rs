//! Reconcile completion and the two timer-facing orchestration entry
//! points carried over from `bat_contribution.cc`'s `OnTimerReconcile`/
//! `StartAutoContribute`: they gather a publisher list through an
//! embedder collaborator (modeled here as a closure, since the
//! collaborator itself is out of scope) and then call [`reconcile`].

use crate::{ReconcileEngine, ReconcileError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::{
    ContributionRecord, ContributionType, CurrentReconcile, PublisherShare, ReconcileCategory,
    Transaction,
};
use ledger_transport::LedgerTransport;
use std::collections::HashMap;

impl<T: LedgerTransport, A: AnonizeOracle> ReconcileEngine<T, A> {
    /// Build the settled `Transaction`, append it, and drop the reconcile
    /// from the in-flight map — the `DONE` transition in the state
    /// diagram. Ballot casting against this transaction happens later,
    /// driven by `ledger-ballot`.
    pub(crate) fn finish_reconcile(
        &self,
        reconcile: CurrentReconcile,
        master_user_token: String,
        surveyor_ids: Vec<String>,
    ) -> Result<(), ReconcileError> {
        let transaction = Transaction {
            viewing_id: reconcile.viewing_id.clone(),
            surveyor_id: reconcile.surveyor_id.clone().unwrap_or_default(),
            surveyor_ids,
            anonize_viewing_id: reconcile.anonize_viewing_id.clone(),
            registrar_vk: reconcile.registrar_vk.clone().unwrap_or_default(),
            master_user_token,
            contribution_rates: reconcile.rates.clone(),
            contribution_fiat_amount: reconcile.amount.to_string(),
            contribution_fiat_currency: reconcile.currency.clone(),
            contribution_probi: String::new(),
            ballots: HashMap::new(),
            votes: 0,
        };

        self.store.append_transaction(transaction)?;
        self.store.remove_reconcile(&reconcile.viewing_id)?;
        log::info!("reconcile {} complete", reconcile.viewing_id);
        Ok(())
    }

    /// Invoked once `ledger-ballot` has cast every vote for a completed
    /// reconcile's transaction. Writes the per-publisher contribution
    /// rows; for `RecurringDonation`, `probi = floor(weight) * 10^18` per
    /// publisher, matching `BatContribution::OnReconcileCompleteSuccess`.
    pub fn on_reconcile_complete_success(
        &self,
        category: ReconcileCategory,
        list: &[PublisherShare],
        viewing_id: &str,
        month: u32,
        year: i32,
    ) -> Result<(), ReconcileError> {
        let contribution_type = match category {
            ReconcileCategory::AutoContribute => ContributionType::AutoContribution,
            ReconcileCategory::RecurringDonation => ContributionType::DonationRecurring,
            ReconcileCategory::DirectDonation => ContributionType::Donation,
        };

        for share in list {
            let probi = match category {
                ReconcileCategory::RecurringDonation => {
                    format!("{}", (share.weight.floor() as u128) * 1_000_000_000_000_000_000)
                }
                _ => String::new(),
            };

            self.store.append_contribution_record(ContributionRecord {
                viewing_id: viewing_id.to_string(),
                month,
                year,
                contribution_type,
                publisher_id: share.publisher_id.clone(),
                probi,
            })?;
        }

        Ok(())
    }

    /// Start an auto-contribute reconcile using a publisher list sourced
    /// from the embedder's current-publisher-info collaborator.
    pub async fn start_auto_contribute<F>(&self, fetch_list: F) -> Result<String, ReconcileError>
    where
        F: FnOnce() -> Vec<PublisherShare>,
    {
        let list = fetch_list();
        self.reconcile(ReconcileCategory::AutoContribute, list, vec![]).await
    }

    /// Start a recurring-donation reconcile. On ineligibility (per
    /// `reconcile`'s checks), falls through to an auto-contribute
    /// reconcile built from `fetch_ac_list` — the "recurring falls
    /// through to AC" chained invocation.
    pub async fn start_recurring_donations<R, F>(
        &self,
        fetch_recurring_list: R,
        fetch_ac_list: F,
    ) -> Result<String, ReconcileError>
    where
        R: FnOnce() -> Vec<PublisherShare>,
        F: FnOnce() -> Vec<PublisherShare>,
    {
        let recurring_list = fetch_recurring_list();
        match self
            .reconcile(ReconcileCategory::RecurringDonation, recurring_list, vec![])
            .await
        {
            Ok(viewing_id) => Ok(viewing_id),
            Err(ReconcileError::Rejected(reason)) => {
                log::info!("recurring donation rejected ({reason}), falling through to auto-contribute");
                self.start_auto_contribute(fetch_ac_list).await
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::anonize::MockAnonize;
    use ledger_core::model::{PersonaIdentity, WalletInfo, WalletProperties};
    use ledger_store::LedgerStore;
    use ledger_transport::{HttpResponse, MockTransport};
    use std::collections::HashMap as StdHashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn engine(transport: Arc<MockTransport>) -> ReconcileEngine<MockTransport, MockAnonize> {
        let dir = tempdir().unwrap();
        let store = Arc::new(LedgerStore::load(dir.path().join("ledger.json")).unwrap());
        store
            .set_wallet_info(WalletInfo {
                key_info_seed: Some([5u8; 32]),
            })
            .unwrap();
        store
            .set_persona_identity(PersonaIdentity {
                payment_id: Some("pid-1".into()),
                currency: Some("BAT".into()),
                contribution_amount: Some(10.0),
                ..Default::default()
            })
            .unwrap();
        let oracle = Arc::new(MockAnonize::new());
        ReconcileEngine::new(store, transport, oracle, "https://operator.example").unwrap()
    }

    #[test]
    fn ac_rejected_by_balance_never_enters_the_map() {
        let transport = Arc::new(MockTransport::new());
        let e = engine(transport.clone());
        e.store
            .set_wallet_properties(WalletProperties {
                balance: 5.0,
                ..Default::default()
            })
            .unwrap();

        let result = tokio_test_block_on(e.reconcile(
            ReconcileCategory::AutoContribute,
            vec![PublisherShare {
                publisher_id: "pub1".into(),
                weight: 1.0,
            }],
            vec![],
        ));
        assert!(result.is_err());
        assert!(e.store.all_reconciles().is_empty());
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn recurring_falls_through_to_auto_contribute() {
        let transport = Arc::new(MockTransport::new());
        transport.queue(
            "https://operator.example/v2/wallet/pid-1/surveyor",
            HttpResponse {
                ok: true,
                status: 200,
                body: r#"{"surveyorId":"sv-1"}"#.into(),
                headers: StdHashMap::new(),
            },
        );
        transport.queue(
            "https://operator.example/v2/wallet/pid-1?amount=",
            HttpResponse {
                ok: true,
                status: 200,
                body: r#"{"rates":{}}"#.into(),
                headers: StdHashMap::new(),
            },
        );
        transport.queue(
            "https://operator.example/v2/wallet/pid-1",
            HttpResponse {
                ok: true,
                status: 200,
                body: "{}".into(),
                headers: StdHashMap::new(),
            },
        );
        transport.queue(
            "https://operator.example/v2/registrar/viewing/pid-1",
            HttpResponse {
                ok: true,
                status: 200,
                body: r#"{"registrarVK":"RVK"}"#.into(),
                headers: StdHashMap::new(),
            },
        );
        transport.queue(
            "https://operator.example/v2/registrar/viewing/",
            HttpResponse {
                ok: true,
                status: 200,
                body: r#"{"verification":"verified","surveyorIds":["sv-1"]}"#.into(),
                headers: StdHashMap::new(),
            },
        );

        let e = engine(transport);
        e.store
            .set_wallet_properties(WalletProperties {
                balance: 100.0,
                ..Default::default()
            })
            .unwrap();

        let ac_list = vec![PublisherShare {
            publisher_id: "pub1".into(),
            weight: 1.0,
        }];

        let result = tokio_test_block_on(e.start_recurring_donations(Vec::new, || ac_list.clone()));
        assert!(result.is_ok());
        assert_eq!(e.store.find_transaction_by_viewing_id(&result.unwrap()).unwrap().surveyor_id, "sv-1");
    }

    fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
            .block_on(f)
    }
}
