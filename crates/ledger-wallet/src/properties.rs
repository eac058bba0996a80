//! Wallet property refresh and passphrase export.

use crate::{WalletClient, WalletError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::WalletProperties;
use ledger_core::seed::encode_bip39;
use ledger_transport::{HttpRequest, LedgerTransport};

impl<T: LedgerTransport, A: AnonizeOracle> WalletClient<T, A> {
    /// Refresh the cached wallet properties from the operator. Merges
    /// into whatever is already cached rather than replacing it outright,
    /// so a partial or malformed payload never wipes a known-good
    /// balance.
    pub async fn get_wallet_properties(&self) -> Result<WalletProperties, WalletError> {
        let payment_id = self
            .store
            .persona_identity()
            .payment_id
            .ok_or_else(|| WalletError::LedgerError("no payment id on record".to_string()))?;

        let response = self
            .transport
            .load_url(HttpRequest::get(
                self.url(&format!("/v2/wallet/{payment_id}")),
            ))
            .await;

        if !response.ok {
            return Err(WalletError::LedgerError(format!(
                "wallet properties request failed with status {}",
                response.status
            )));
        }

        let parsed: WalletProperties = serde_json::from_str(&response.body)
            .map_err(|e| WalletError::LedgerError(format!("malformed wallet properties: {e}")))?;

        let mut properties = parsed;
        properties.last_refreshed = Some(crate::persona::now_unix());
        self.store.set_wallet_properties(properties.clone())?;
        Ok(properties)
    }

    /// Export the wallet's recovery passphrase as a 24-word BIP-39
    /// mnemonic. An empty string, not an error, is returned when no seed
    /// has been generated yet — there is nothing to export, not a
    /// failure.
    pub fn export_passphrase(&self) -> Result<String, WalletError> {
        match self.store.wallet_info().key_info_seed {
            Some(seed) => Ok(encode_bip39(&seed)?),
            None => Ok(String::new()),
        }
    }
}
