//! Eligibility checks run before a reconcile leaves `NEW` and enters the
//! persisted map.

use crate::{ReconcileEngine, ReconcileError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::{
    CurrentReconcile, Direction, PublisherShare, ReconcileCategory, ReconcileState,
};
use ledger_transport::LedgerTransport;

impl<T: LedgerTransport, A: AnonizeOracle> ReconcileEngine<T, A> {
    /// Entry point for a new reconcile. Runs the category-specific
    /// eligibility check, and on acceptance registers the viewing id in
    /// the store and kicks off the first state-machine step.
    ///
    /// `RecurringDonation` rejection does *not* fall through to
    /// `AutoContribute` here — that chained invocation needs its own,
    /// independently-sourced publisher list, so it lives one layer up in
    /// [`ReconcileEngine::start_recurring_donations`].
    pub async fn reconcile(
        &self,
        category: ReconcileCategory,
        list: Vec<PublisherShare>,
        directions: Vec<Direction>,
    ) -> Result<String, ReconcileError> {
        let identity = self.store.persona_identity();
        let balance = self.store.wallet_properties().balance;
        let contribution_amount = identity.contribution_amount.unwrap_or(0.0);
        let currency = identity.currency.clone().unwrap_or_else(|| "BAT".to_string());

        match category {
            ReconcileCategory::AutoContribute => {
                if list.is_empty() || contribution_amount > balance {
                    self.reset_reconcile_stamp()?;
                    return Err(ReconcileError::Rejected("auto-contribute not eligible"));
                }
                self.begin(category, list, vec![], contribution_amount).await
            }
            ReconcileCategory::RecurringDonation => {
                let ineligible =
                    list.is_empty() || list.iter().any(|share| share.publisher_id.is_empty());
                if ineligible {
                    return Err(ReconcileError::Rejected("recurring donation not eligible"));
                }
                let fee: f64 = list.iter().map(|share| share.weight).sum();
                if fee + contribution_amount > balance {
                    return Err(ReconcileError::Rejected("recurring donation over balance"));
                }
                self.begin(category, list, vec![], fee).await
            }
            ReconcileCategory::DirectDonation => {
                let ineligible = directions
                    .iter()
                    .any(|d| d.publisher_key.is_empty() || d.currency != currency);
                if ineligible {
                    return Err(ReconcileError::Rejected(
                        "direct donation has an invalid direction",
                    ));
                }
                let fee: f64 = directions.iter().map(|d| d.amount).sum();
                if fee > balance {
                    return Err(ReconcileError::Rejected("direct donation exceeds balance"));
                }
                self.begin(category, vec![], directions, fee).await
            }
        }
    }

    fn reset_reconcile_stamp(&self) -> Result<(), ReconcileError> {
        let days = 30;
        let now = crate::now_unix();
        self.store.set_reconcile_stamp(now + days * 86_400)?;
        Ok(())
    }

    async fn begin(
        &self,
        category: ReconcileCategory,
        list: Vec<PublisherShare>,
        directions: Vec<Direction>,
        fee: f64,
    ) -> Result<String, ReconcileError> {
        let viewing_id = uuid::Uuid::new_v4().to_string();
        let identity = self.store.persona_identity();

        let reconcile = CurrentReconcile {
            viewing_id: viewing_id.clone(),
            state: ReconcileState::ReconcileRequested,
            category,
            list,
            directions,
            fee,
            surveyor_id: None,
            registrar_vk: None,
            anonize_viewing_id: ledger_core::user_id::derive_anonize_id(&viewing_id),
            pre_flight: None,
            master_user_token: None,
            rates: serde_json::Value::Null,
            amount: 0.0,
            currency: identity.currency.unwrap_or_else(|| "BAT".to_string()),
        };

        self.store.add_reconcile(&viewing_id, reconcile)?;
        self.do_reconcile(&viewing_id).await?;
        Ok(viewing_id)
    }
}
