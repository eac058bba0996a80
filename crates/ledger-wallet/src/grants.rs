//! Promotional grants: listing, claiming via captcha, and captcha image
//! retrieval.

use crate::{WalletClient, WalletError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::Grant;
use ledger_transport::{HttpRequest, LedgerTransport};

/// Identifies this client to the operator on captcha-gated requests. Named
/// for what it does rather than any particular embedder's brand string.
const CLIENT_PRODUCT_HEADER: &str = "x-ledger-client-product";
const CLIENT_PRODUCT_VALUE: &str = "ledger-client";

impl<T: LedgerTransport, A: AnonizeOracle> WalletClient<T, A> {
    /// List promotions available to this wallet. `lang` is an optional
    /// BCP-47 language tag; when absent the query parameter is simply
    /// omitted rather than sent empty.
    pub async fn get_grant(&self, lang: Option<&str>) -> Result<Vec<Grant>, WalletError> {
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or(WalletError::GrantNotFound)?;

        let mut query = format!("paymentId={payment_id}");
        if let Some(lang) = lang {
            query.push_str(&format!("&lang={lang}"));
        }

        let response = self
            .transport
            .load_url(HttpRequest::get(self.url(&format!("/v2/promotions?{query}"))))
            .await;

        match response.status {
            200..=299 => {
                self.store.set_last_grant_load_stamp(crate::persona::now_unix())?;
                let grants: Vec<Grant> = serde_json::from_str(&response.body)
                    .map_err(|e| WalletError::LedgerError(format!("malformed promotions body: {e}")))?;
                if let Some(grant) = grants.first() {
                    self.store.set_grant(Some(grant.clone()))?;
                }
                Ok(grants)
            }
            404 | 410 => Err(WalletError::GrantNotFound),
            status => Err(WalletError::LedgerError(format!(
                "promotions request failed with status {status}"
            ))),
        }
    }

    /// Claim a grant by submitting the solved captcha. Status-code
    /// mapping follows the operator's rejection semantics: `403` means
    /// the captcha itself was wrong, `404`/`410` mean the promotion is
    /// gone, anything else non-2xx is a generic ledger error.
    pub async fn set_grant(
        &self,
        captcha_response: &str,
        promotion_id: &str,
    ) -> Result<Grant, WalletError> {
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or(WalletError::GrantNotFound)?;

        let body = serde_json::json!({
            "promotionId": promotion_id,
            "captchaResponse": captcha_response,
        })
        .to_string();

        let request = HttpRequest::put(self.url(&format!("/v2/promotions/{payment_id}")), body)
            .with_header(CLIENT_PRODUCT_HEADER, CLIENT_PRODUCT_VALUE);

        let response = self.transport.load_url(request).await;

        match response.status {
            200..=299 => {
                let grant: Grant = serde_json::from_str(&response.body)
                    .map_err(|e| WalletError::LedgerError(format!("malformed grant body: {e}")))?;
                self.store.set_grant(Some(grant.clone()))?;
                Ok(grant)
            }
            403 => Err(WalletError::CaptchaFailed),
            404 | 410 => Err(WalletError::GrantNotFound),
            status => Err(WalletError::LedgerError(format!(
                "grant claim failed with status {status}"
            ))),
        }
    }

    /// Fetch a fresh captcha challenge image (base64-encoded payload, as
    /// returned by the operator) for the stored payment id.
    pub async fn get_grant_captcha(&self) -> Result<String, WalletError> {
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or(WalletError::GrantNotFound)?;

        let request = HttpRequest::get(self.url(&format!("/v2/captchas/{payment_id}")))
            .with_header(CLIENT_PRODUCT_HEADER, CLIENT_PRODUCT_VALUE);

        let response = self.transport.load_url(request).await;
        if !response.ok {
            return Err(WalletError::LedgerError(format!(
                "captcha request failed with status {}",
                response.status
            )));
        }
        Ok(response.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::anonize::MockAnonize;
    use ledger_core::model::PersonaIdentity;
    use ledger_store::LedgerStore;
    use ledger_transport::{HttpResponse, MockTransport};
    use std::collections::HashMap;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn wallet(transport: Arc<MockTransport>) -> WalletClient<MockTransport, MockAnonize> {
        let dir = tempdir().unwrap();
        let store = Arc::new(LedgerStore::load(dir.path().join("ledger.json")).unwrap());
        let oracle = Arc::new(MockAnonize::new());
        let client = WalletClient::new(store, transport, oracle, "https://operator.example");
        client
            .store
            .set_persona_identity(PersonaIdentity {
                payment_id: Some("pid-1".into()),
                ..Default::default()
            })
            .unwrap();
        client
    }

    fn sample_grant_body() -> &'static str {
        r#"{"promotionId":"promo-1","probi":"1000000000000000000","expiryTime":4102444800,"type":"UGP"}"#
    }

    #[tokio::test]
    async fn get_grant_lists_available_promotions() {
        let transport = Arc::new(MockTransport::new());
        transport.queue(
            "https://operator.example/v2/promotions?paymentId=pid-1",
            HttpResponse {
                ok: true,
                status: 200,
                body: format!("[{}]", sample_grant_body()),
                headers: HashMap::new(),
            },
        );

        let client = wallet(transport);
        let grants = client.get_grant(None).await.unwrap();
        assert_eq!(grants.len(), 1);
        assert_eq!(grants[0].promotion_id, "promo-1");
        assert_eq!(client.store.grant().unwrap().promotion_id, "promo-1");
        assert!(client.store.last_grant_load_stamp().is_some());
    }

    #[tokio::test]
    async fn get_grant_maps_404_to_grant_not_found() {
        let transport = Arc::new(MockTransport::new());
        transport.queue(
            "https://operator.example/v2/promotions?paymentId=pid-1",
            HttpResponse {
                ok: false,
                status: 404,
                body: String::new(),
                headers: HashMap::new(),
            },
        );

        let client = wallet(transport);
        let err = client.get_grant(None).await.unwrap_err();
        assert!(matches!(err, WalletError::GrantNotFound));
    }

    #[tokio::test]
    async fn set_grant_maps_403_to_captcha_failed() {
        let transport = Arc::new(MockTransport::new());
        transport.queue(
            "https://operator.example/v2/promotions/pid-1",
            HttpResponse {
                ok: false,
                status: 403,
                body: String::new(),
                headers: HashMap::new(),
            },
        );

        let client = wallet(transport);
        let err = client.set_grant("wrong", "promo-1").await.unwrap_err();
        assert!(matches!(err, WalletError::CaptchaFailed));
    }

    #[tokio::test]
    async fn set_grant_stores_the_claimed_grant_on_success() {
        let transport = Arc::new(MockTransport::new());
        transport.queue(
            "https://operator.example/v2/promotions/pid-1",
            HttpResponse {
                ok: true,
                status: 200,
                body: sample_grant_body().to_string(),
                headers: HashMap::new(),
            },
        );

        let client = wallet(transport);
        let grant = client.set_grant("correct", "promo-1").await.unwrap();
        assert_eq!(grant.promotion_id, "promo-1");
        assert_eq!(client.store.grant().unwrap().promotion_id, "promo-1");
    }

    #[tokio::test]
    async fn get_grant_captcha_returns_the_raw_body() {
        let transport = Arc::new(MockTransport::new());
        transport.queue(
            "https://operator.example/v2/captchas/pid-1",
            HttpResponse {
                ok: true,
                status: 200,
                body: "base64-image-data".into(),
                headers: HashMap::new(),
            },
        );

        let client = wallet(transport);
        let captcha = client.get_grant_captcha().await.unwrap();
        assert_eq!(captcha, "base64-image-data");
    }
}
