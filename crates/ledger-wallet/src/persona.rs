//! Persona registration — the three-phase blinded-credential enrollment
//! dance.

use crate::{WalletClient, WalletError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::digest::{canonical_json, sha256_base64};
use ledger_core::http_sig::sign_http;
use ledger_core::model::WalletInfo;
use ledger_transport::{HttpRequest, LedgerTransport};
use serde_json::json;
use std::sync::Arc;

impl<T: LedgerTransport, A: AnonizeOracle + Send + Sync + 'static> WalletClient<T, A> {
    /// Register a fresh persona with the operator. On success the store
    /// holds `payment_id`, `currency`, and the boot/reconcile stamps —
    /// the equivalent of the original `WALLET_CREATED` callback.
    pub async fn register_persona(&self) -> Result<(), WalletError> {
        // Phase A: request credentials.
        let response = self
            .transport
            .load_url(HttpRequest::get(self.url("/v2/registrar/persona")))
            .await;
        if !response.ok {
            return Err(WalletError::BadRegistrationResponse);
        }

        let registrar_vk = parse_field(&response.body, "registrarVK")
            .ok_or(WalletError::BadRegistrationResponse)?;

        let mut identity = self.store.persona_identity();
        if identity.persona_id.is_none() {
            identity.persona_id = Some(uuid::Uuid::new_v4().to_string());
        }
        let persona_id = identity.persona_id.clone().unwrap();
        let user_id = ledger_core::user_id::derive_anonize_id(&persona_id);
        identity.user_id = Some(user_id.clone());
        self.store.set_persona_identity(identity.clone())?;

        let pre_flight = {
            let oracle = Arc::clone(&self.oracle);
            let user_id = user_id.clone();
            tokio::task::spawn_blocking(move || oracle.make_cred(&user_id))
                .await
                .expect("make_cred worker task panicked")
                .ok_or(WalletError::BadRegistrationResponse)?
        };
        let proof = {
            let oracle = Arc::clone(&self.oracle);
            let pre_flight = pre_flight.clone();
            let registrar_vk = registrar_vk.clone();
            tokio::task::spawn_blocking(move || oracle.register_user_message(&pre_flight, &registrar_vk))
                .await
                .expect("register_user_message worker task panicked")
                .ok_or(WalletError::BadRegistrationResponse)?
        };

        let seed = ledger_core::seed::generate_seed();
        let secret = ledger_core::keys::hkdf(&seed)?;
        let (public_key, signing_key) = ledger_core::keys::ed25519_from_secret(&secret);
        let label = uuid::Uuid::new_v4().to_string();

        let body_value = json!({
            "currency": "BAT",
            "label": label,
            "publicKey": hex::encode(public_key.to_bytes()),
            "proof": proof,
        });
        let octets = canonical_json(&body_value);
        let digest = sha256_base64(&octets);
        let signature = sign_http(&[("digest", digest.as_str())], "primary", &signing_key);

        // Phase B: register persona.
        let body = String::from_utf8(octets).expect("canonical json is valid utf8");
        let request = HttpRequest::post(self.url(&format!("/v2/registrar/persona/{user_id}")), body)
            .with_header("digest", &digest)
            .with_header("signature", &signature);

        let response = self.transport.load_url(request).await;
        if !response.ok {
            return Err(WalletError::BadRegistrationResponse);
        }

        let verification = parse_field(&response.body, "verification")
            .ok_or(WalletError::BadRegistrationResponse)?;

        let master_user_token = {
            let oracle = Arc::clone(&self.oracle);
            let user_id = user_id.clone();
            let verification = verification.clone();
            let pre_flight = pre_flight.clone();
            let registrar_vk = registrar_vk.clone();
            tokio::task::spawn_blocking(move || {
                oracle.register_user_final(&user_id, &verification, &pre_flight, &registrar_vk)
            })
            .await
            .expect("register_user_final worker task panicked")
            .ok_or(WalletError::RegistrationVerificationFailed)?
        };

        let payment_id = parse_field(&response.body, "paymentId")
            .ok_or(WalletError::BadRegistrationResponse)?;
        let currency =
            parse_field(&response.body, "currency").unwrap_or_else(|| "BAT".to_string());
        let contribution_amount: f64 = parse_field(&response.body, "contribution_amount")
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.0);
        let days: i64 = parse_field(&response.body, "days")
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        identity.registrar_vk = Some(registrar_vk);
        identity.pre_flight = Some(pre_flight);
        identity.master_user_token = Some(master_user_token);
        identity.payment_id = Some(payment_id);
        identity.currency = Some(currency);
        identity.contribution_amount = Some(contribution_amount);
        self.store.set_persona_identity(identity)?;

        self.store.set_wallet_info(WalletInfo {
            key_info_seed: Some(seed),
        })?;

        let now = now_unix();
        self.store.set_boot_stamp(now)?;
        self.store.set_reconcile_stamp(now + days * 86_400)?;

        log::info!("persona registered for user_id {user_id}");
        Ok(())
    }
}

/// Hand-rolled "get value by name" field extraction: position- and
/// type-tolerant, and an absent field is a parse failure per the error
/// policy. Real deserialization happens downstream via `serde_json`
/// where the full shape is known; this is only used for the handful of
/// top-level scalar fields the registration dance inspects before the
/// rest of the body is parsed into a struct.
pub(crate) fn parse_field(body: &str, field: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let found = value.get(field)?;
    match found {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn now_unix() -> i64 {
    chrono::Utc::now().timestamp()
}
