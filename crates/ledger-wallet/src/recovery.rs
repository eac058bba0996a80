//! Wallet recovery — restoring a wallet from a passphrase on a new
//! device or after reinstall.

use crate::persona::parse_field;
use crate::{WalletClient, WalletError};
use ledger_core::anonize::AnonizeOracle;
use ledger_core::model::{WalletInfo, WalletProperties};
use ledger_core::seed::{decode_bip39, decode_niceware};
use ledger_transport::{HttpRequest, LedgerTransport};

impl<T: LedgerTransport, A: AnonizeOracle> WalletClient<T, A> {
    /// Recover a wallet from a 24-word BIP-39 passphrase.
    pub async fn recover_wallet_bip39(&self, passphrase: &str) -> Result<(), WalletError> {
        let seed = match decode_bip39(passphrase) {
            Ok(seed) => seed,
            Err(e) => {
                self.store.set_wallet_properties(WalletProperties::default())?;
                return Err(e.into());
            }
        };
        self.recover_wallet_from_seed(seed).await
    }

    /// Recover a wallet from a legacy 16-word Niceware passphrase. The
    /// caller supplies the dictionary since it's embedder-provided data,
    /// not something this crate bundles.
    pub async fn recover_wallet_niceware(
        &self,
        passphrase: &str,
        dictionary: &[String],
    ) -> Result<(), WalletError> {
        let seed = match decode_niceware(passphrase, dictionary) {
            Ok(seed) => seed,
            Err(e) => {
                self.store.set_wallet_properties(WalletProperties::default())?;
                return Err(e.into());
            }
        };
        self.recover_wallet_from_seed(seed).await
    }

    async fn recover_wallet_from_seed(&self, seed: [u8; 32]) -> Result<(), WalletError> {
        let secret = ledger_core::keys::hkdf(&seed)?;
        let (public_key, _signing_key) = ledger_core::keys::ed25519_from_secret(&secret);
        let public_key_hex = hex::encode(public_key.to_bytes());

        let response = self
            .transport
            .load_url(HttpRequest::get(self.url(&format!(
                "/v2/wallet?publicKey={public_key_hex}"
            ))))
            .await;

        if !response.ok {
            // A failed lookup still resolves, mirroring the embedder
            // contract's LEDGER_ERROR path: a zero-balance, empty-grants
            // payload rather than propagating a transport error.
            self.store.set_wallet_properties(WalletProperties::default())?;
            return Err(WalletError::LedgerError(
                "wallet lookup by public key failed".to_string(),
            ));
        }

        let payment_id = match parse_field(&response.body, "paymentId") {
            Some(id) => id,
            None => {
                self.store.set_wallet_properties(WalletProperties::default())?;
                return Err(WalletError::LedgerError(
                    "wallet lookup response missing paymentId".to_string(),
                ));
            }
        };

        let mut identity = self.store.persona_identity();
        identity.payment_id = Some(payment_id.clone());
        self.store.set_persona_identity(identity)?;
        self.store.set_wallet_info(WalletInfo {
            key_info_seed: Some(seed),
        })?;

        self.get_wallet_properties().await?;
        log::info!("wallet recovered for payment_id {payment_id}");
        Ok(())
    }
}
