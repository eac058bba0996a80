//! The five persisted state transitions. Each method performs one
//! request, updates the record's state tag, persists, and (on success)
//! calls into the next step directly — the in-process equivalent of the
//! original callback chain, now an `async` call chain instead.
//!
//! Any transport or parse failure at any step is terminal: the reconcile
//! is removed from the store and the caller sees a
//! [`ReconcileError::LedgerError`].

use crate::{ReconcileEngine, ReconcileError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::digest::{canonical_json, sha256_base64};
use ledger_core::http_sig::sign_http;
use ledger_core::model::{CurrentReconcile, ReconcileState};
use ledger_transport::{HttpRequest, LedgerTransport};
use serde_json::json;
use std::sync::Arc;

impl<T: LedgerTransport, A: AnonizeOracle + Send + Sync + 'static> ReconcileEngine<T, A> {
    /// Re-enter every in-flight reconcile at startup, dispatching on its
    /// persisted state tag. A crash mid-reconcile costs at most one
    /// retried HTTP request.
    pub async fn resume_pending(&self) {
        for reconcile in self.store.all_reconciles() {
            let viewing_id = reconcile.viewing_id.clone();
            let result = match reconcile.state {
                ReconcileState::ReconcileRequested => self.do_reconcile(&viewing_id).await,
                ReconcileState::CurrentRequested => self.do_current(&viewing_id).await,
                ReconcileState::PayloadSubmitted => self.do_payload(&viewing_id).await,
                ReconcileState::ViewingRegistered => self.do_register_viewing(&viewing_id).await,
                ReconcileState::CredentialsObtained => self.do_viewing_credentials(&viewing_id).await,
            };
            if let Err(e) = result {
                log::warn!("resumed reconcile {viewing_id} failed: {e}");
            }
        }
    }

    fn fail(&self, viewing_id: &str, reason: impl Into<String>) -> ReconcileError {
        let reason = reason.into();
        let _ = self.store.remove_reconcile(viewing_id);
        log::warn!("reconcile {viewing_id} terminated: {reason}");
        ReconcileError::LedgerError(reason)
    }

    fn require(&self, viewing_id: &str) -> Result<CurrentReconcile, ReconcileError> {
        self.store
            .get_reconcile(viewing_id)
            .ok_or_else(|| ReconcileError::LedgerError(format!("no reconcile for {viewing_id}")))
    }

    pub(crate) async fn do_reconcile(&self, viewing_id: &str) -> Result<(), ReconcileError> {
        let mut reconcile = self.require(viewing_id)?;
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or_else(|| self.fail(viewing_id, "no payment id on record"))?;

        let response = self
            .transport
            .load_url(HttpRequest::get(
                self.url(&format!("/v2/wallet/{payment_id}/surveyor")),
            ))
            .await;
        if !response.ok {
            return Err(self.fail(viewing_id, "surveyor request failed"));
        }

        let surveyor_id = match crate::json_field(&response.body, "surveyorId") {
            Some(id) => id,
            None => return Err(self.fail(viewing_id, "surveyor response missing surveyorId")),
        };

        reconcile.surveyor_id = Some(surveyor_id);
        reconcile.state = ReconcileState::CurrentRequested;
        self.store.update_reconcile(viewing_id, reconcile)?;

        self.do_current(viewing_id).await
    }

    pub(crate) async fn do_current(&self, viewing_id: &str) -> Result<(), ReconcileError> {
        let mut reconcile = self.require(viewing_id)?;
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or_else(|| self.fail(viewing_id, "no payment id on record"))?;

        let response = self
            .transport
            .load_url(HttpRequest::get(self.url(&format!(
                "/v2/wallet/{payment_id}?amount={}&altcurrency={}",
                reconcile.fee, reconcile.currency
            ))))
            .await;
        if !response.ok {
            return Err(self.fail(viewing_id, "current-wallet request failed"));
        }

        let value: serde_json::Value = match serde_json::from_str(&response.body) {
            Ok(v) => v,
            Err(_) => return Err(self.fail(viewing_id, "current-wallet response is not JSON")),
        };

        reconcile.rates = value.get("rates").cloned().unwrap_or(serde_json::Value::Null);
        reconcile.amount = reconcile.fee;
        reconcile.state = ReconcileState::PayloadSubmitted;
        self.store.update_reconcile(viewing_id, reconcile)?;

        self.do_payload(viewing_id).await
    }

    pub(crate) async fn do_payload(&self, viewing_id: &str) -> Result<(), ReconcileError> {
        let mut reconcile = self.require(viewing_id)?;
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or_else(|| self.fail(viewing_id, "no payment id on record"))?;
        let surveyor_id = reconcile
            .surveyor_id
            .clone()
            .ok_or_else(|| self.fail(viewing_id, "no surveyor id recorded"))?;

        let body_value = json!({
            "requestType": "httpSignature",
            "viewingId": viewing_id,
            "surveyorId": surveyor_id,
        });
        let octets = canonical_json(&body_value);
        let digest = sha256_base64(&octets);
        let signature = sign_http(&[("digest", digest.as_str())], "primary", &self.signing_key);

        let signed_body = json!({
            "requestType": "httpSignature",
            "signedtx": {
                "headers": { "digest": digest, "signature": signature },
                "body": body_value,
                "octets": String::from_utf8_lossy(&octets).to_string(),
            },
            "viewingId": viewing_id,
            "surveyorId": surveyor_id,
        })
        .to_string();

        let response = self
            .transport
            .load_url(HttpRequest::put(
                self.url(&format!("/v2/wallet/{payment_id}")),
                signed_body,
            ))
            .await;
        if !response.ok {
            return Err(self.fail(viewing_id, "payload submission failed"));
        }

        reconcile.state = ReconcileState::ViewingRegistered;
        self.store.update_reconcile(viewing_id, reconcile)?;

        self.do_register_viewing(viewing_id).await
    }

    pub(crate) async fn do_register_viewing(&self, viewing_id: &str) -> Result<(), ReconcileError> {
        let mut reconcile = self.require(viewing_id)?;
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or_else(|| self.fail(viewing_id, "no payment id on record"))?;

        let response = self
            .transport
            .load_url(HttpRequest::get(self.url(&format!(
                "/v2/registrar/viewing/{payment_id}"
            ))))
            .await;
        if !response.ok {
            return Err(self.fail(viewing_id, "viewing registration failed"));
        }

        let registrar_vk = match crate::json_field(&response.body, "registrarVK") {
            Some(vk) => vk,
            None => return Err(self.fail(viewing_id, "viewing registration missing registrarVK")),
        };

        let pre_flight = {
            let oracle = Arc::clone(&self.oracle);
            let anonize_viewing_id = reconcile.anonize_viewing_id.clone();
            tokio::task::spawn_blocking(move || oracle.make_cred(&anonize_viewing_id))
                .await
                .expect("make_cred worker task panicked")
                .ok_or_else(|| self.fail(viewing_id, "anonize make_cred returned null"))?
        };

        reconcile.registrar_vk = Some(registrar_vk);
        reconcile.pre_flight = Some(pre_flight);
        reconcile.state = ReconcileState::CredentialsObtained;
        self.store.update_reconcile(viewing_id, reconcile)?;

        self.do_viewing_credentials(viewing_id).await
    }

    pub(crate) async fn do_viewing_credentials(&self, viewing_id: &str) -> Result<(), ReconcileError> {
        let reconcile = self.require(viewing_id)?;
        let registrar_vk = reconcile
            .registrar_vk
            .clone()
            .ok_or_else(|| self.fail(viewing_id, "no registrar vk recorded"))?;
        let pre_flight = reconcile
            .pre_flight
            .clone()
            .ok_or_else(|| self.fail(viewing_id, "no pre-flight credential recorded"))?;

        let proof = {
            let oracle = Arc::clone(&self.oracle);
            let pre_flight = pre_flight.clone();
            let registrar_vk = registrar_vk.clone();
            tokio::task::spawn_blocking(move || oracle.register_user_message(&pre_flight, &registrar_vk))
                .await
                .expect("register_user_message worker task panicked")
                .ok_or_else(|| self.fail(viewing_id, "anonize register_user_message returned null"))?
        };

        let body = json!({ "proof": proof }).to_string();
        let response = self
            .transport
            .load_url(HttpRequest::post(
                self.url(&format!(
                    "/v2/registrar/viewing/{}",
                    reconcile.anonize_viewing_id
                )),
                body,
            ))
            .await;
        if !response.ok {
            return Err(self.fail(viewing_id, "credential request failed"));
        }

        let verification = match crate::json_field(&response.body, "verification") {
            Some(v) => v,
            None => return Err(self.fail(viewing_id, "credential response missing verification")),
        };

        let master_user_token = {
            let oracle = Arc::clone(&self.oracle);
            let anonize_viewing_id = reconcile.anonize_viewing_id.clone();
            let verification = verification.clone();
            let pre_flight = pre_flight.clone();
            let registrar_vk = registrar_vk.clone();
            tokio::task::spawn_blocking(move || {
                oracle.register_user_final(&anonize_viewing_id, &verification, &pre_flight, &registrar_vk)
            })
            .await
            .expect("register_user_final worker task panicked")
            .ok_or_else(|| self.fail(viewing_id, "anonize register_user_final returned null"))?
        };

        let surveyor_ids = crate::json_string_array(&response.body, "surveyorIds")
            .unwrap_or_else(|| vec![reconcile.surveyor_id.clone().unwrap_or_default()]);

        self.finish_reconcile(reconcile, master_user_token, surveyor_ids)?;
        Ok(())
    }
}
