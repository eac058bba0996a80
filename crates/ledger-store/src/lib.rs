//! Ledger Store — the persisted state-store façade (C2).
//!
//! Wraps a single JSON document behind an `RwLock` so the wallet,
//! reconcile, and ballot subsystems all see linearizable reads/writes
//! without needing a single-threaded dispatcher discipline: this port
//! uses real `tokio` tasks, so the lock is the store's and the
//! transport's only shared-resource guard (see the concurrency notes in
//! `SPEC_FULL.md`).
//!
//! Every mutating method persists before returning, so "read your
//! writes" holds within the process and a crash never loses a
//! completed step.

mod document;

use ledger_core::model::{
    Ballot, BatchVote, ContributionRecord, CurrentReconcile, Grant, PersonaIdentity, Transaction,
    WalletInfo, WalletProperties,
};
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use thiserror::Error;

pub use document::LedgerDocument;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("reconcile already exists for viewing id {0}")]
    ReconcileAlreadyExists(String),
    #[error("reconcile not found for viewing id {0}")]
    ReconcileNotFound(String),
}

/// The state store. Cheap to clone the path; the document lives behind
/// a lock so callers hold `&LedgerStore`, not `&mut LedgerStore`.
pub struct LedgerStore {
    path: PathBuf,
    doc: RwLock<LedgerDocument>,
}

impl LedgerStore {
    /// Load the document at `path`, or start from an empty one if it
    /// doesn't exist yet.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let doc = LedgerDocument::load(&path)?;
        Ok(Self {
            path,
            doc: RwLock::new(doc),
        })
    }

    fn persist(&self) -> Result<(), StoreError> {
        let doc = self.doc.read().unwrap();
        doc.save(&self.path)
    }

    // ---- wallet info ----

    pub fn wallet_info(&self) -> WalletInfo {
        self.doc.read().unwrap().wallet_info.clone()
    }

    pub fn set_wallet_info(&self, info: WalletInfo) -> Result<(), StoreError> {
        self.doc.write().unwrap().wallet_info = info;
        self.persist()
    }

    // ---- persona identity ----

    pub fn persona_identity(&self) -> PersonaIdentity {
        self.doc.read().unwrap().persona_identity.clone()
    }

    pub fn set_persona_identity(&self, identity: PersonaIdentity) -> Result<(), StoreError> {
        self.doc.write().unwrap().persona_identity = identity;
        self.persist()
    }

    // ---- grant ----

    pub fn grant(&self) -> Option<Grant> {
        self.doc.read().unwrap().grant.clone()
    }

    pub fn set_grant(&self, grant: Option<Grant>) -> Result<(), StoreError> {
        self.doc.write().unwrap().grant = grant;
        self.persist()
    }

    // ---- wallet properties ----

    pub fn wallet_properties(&self) -> WalletProperties {
        self.doc.read().unwrap().wallet_properties.clone()
    }

    pub fn set_wallet_properties(&self, properties: WalletProperties) -> Result<(), StoreError> {
        self.doc.write().unwrap().wallet_properties = properties;
        self.persist()
    }

    // ---- timestamps ----

    pub fn boot_stamp(&self) -> Option<i64> {
        self.doc.read().unwrap().boot_stamp
    }

    pub fn set_boot_stamp(&self, stamp: i64) -> Result<(), StoreError> {
        self.doc.write().unwrap().boot_stamp = Some(stamp);
        self.persist()
    }

    pub fn reconcile_stamp(&self) -> Option<i64> {
        self.doc.read().unwrap().reconcile_stamp
    }

    pub fn set_reconcile_stamp(&self, stamp: i64) -> Result<(), StoreError> {
        self.doc.write().unwrap().reconcile_stamp = Some(stamp);
        self.persist()
    }

    pub fn last_grant_load_stamp(&self) -> Option<i64> {
        self.doc.read().unwrap().last_grant_load_stamp
    }

    pub fn set_last_grant_load_stamp(&self, stamp: i64) -> Result<(), StoreError> {
        self.doc.write().unwrap().last_grant_load_stamp = Some(stamp);
        self.persist()
    }

    // ---- reconciles ----

    pub fn reconcile_exists(&self, viewing_id: &str) -> bool {
        self.doc.read().unwrap().reconciles.contains_key(viewing_id)
    }

    pub fn add_reconcile(&self, viewing_id: &str, reconcile: CurrentReconcile) -> Result<(), StoreError> {
        let mut doc = self.doc.write().unwrap();
        if doc.reconciles.contains_key(viewing_id) {
            return Err(StoreError::ReconcileAlreadyExists(viewing_id.to_string()));
        }
        doc.reconciles.insert(viewing_id.to_string(), reconcile);
        drop(doc);
        self.persist()
    }

    pub fn get_reconcile(&self, viewing_id: &str) -> Option<CurrentReconcile> {
        self.doc.read().unwrap().reconciles.get(viewing_id).cloned()
    }

    pub fn update_reconcile(&self, viewing_id: &str, reconcile: CurrentReconcile) -> Result<(), StoreError> {
        let mut doc = self.doc.write().unwrap();
        if !doc.reconciles.contains_key(viewing_id) {
            return Err(StoreError::ReconcileNotFound(viewing_id.to_string()));
        }
        doc.reconciles.insert(viewing_id.to_string(), reconcile);
        drop(doc);
        self.persist()
    }

    pub fn remove_reconcile(&self, viewing_id: &str) -> Result<Option<CurrentReconcile>, StoreError> {
        let removed = self.doc.write().unwrap().reconciles.remove(viewing_id);
        self.persist()?;
        Ok(removed)
    }

    pub fn all_reconciles(&self) -> Vec<CurrentReconcile> {
        self.doc.read().unwrap().reconciles.values().cloned().collect()
    }

    // ---- transactions ----

    pub fn append_transaction(&self, tx: Transaction) -> Result<(), StoreError> {
        self.doc.write().unwrap().transactions.push(tx);
        self.persist()
    }

    pub fn find_transaction_by_viewing_id(&self, viewing_id: &str) -> Option<Transaction> {
        self.doc
            .read()
            .unwrap()
            .transactions
            .iter()
            .find(|t| t.viewing_id == viewing_id)
            .cloned()
    }

    pub fn mutate_transaction_by_viewing_id<F>(&self, viewing_id: &str, f: F) -> Result<bool, StoreError>
    where
        F: FnOnce(&mut Transaction),
    {
        let found = {
            let mut doc = self.doc.write().unwrap();
            match doc.transactions.iter_mut().find(|t| t.viewing_id == viewing_id) {
                Some(tx) => {
                    f(tx);
                    true
                }
                None => false,
            }
        };
        if found {
            self.persist()?;
        }
        Ok(found)
    }

    // ---- ballots ----

    pub fn ballots(&self) -> Vec<Ballot> {
        self.doc.read().unwrap().ballots.clone()
    }

    pub fn set_ballots(&self, ballots: Vec<Ballot>) -> Result<(), StoreError> {
        self.doc.write().unwrap().ballots = ballots;
        self.persist()
    }

    pub fn append_ballot(&self, ballot: Ballot) -> Result<(), StoreError> {
        self.doc.write().unwrap().ballots.push(ballot);
        self.persist()
    }

    // ---- batch votes ----

    pub fn batch(&self) -> Vec<BatchVote> {
        self.doc.read().unwrap().batch.clone()
    }

    pub fn set_batch(&self, batch: Vec<BatchVote>) -> Result<(), StoreError> {
        self.doc.write().unwrap().batch = batch;
        self.persist()
    }

    // ---- contribution records ----

    pub fn append_contribution_record(&self, record: ContributionRecord) -> Result<(), StoreError> {
        self.doc.write().unwrap().contribution_records.push(record);
        self.persist()
    }

    pub fn contribution_records(&self) -> Vec<ContributionRecord> {
        self.doc.read().unwrap().contribution_records.clone()
    }
}

/// Touch the parent directory ahead of the first save, mirroring the
/// create-dir-all-on-save discipline other components in this workspace
/// use for their own state files.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ledger_core::model::{PublisherShare, ReconcileCategory, ReconcileState};
    use tempfile::tempdir;

    fn sample_reconcile(viewing_id: &str) -> CurrentReconcile {
        CurrentReconcile {
            viewing_id: viewing_id.to_string(),
            state: ReconcileState::ReconcileRequested,
            category: ReconcileCategory::AutoContribute,
            list: vec![PublisherShare {
                publisher_id: "pub1".into(),
                weight: 1.0,
            }],
            directions: vec![],
            fee: 10.0,
            surveyor_id: None,
            registrar_vk: None,
            anonize_viewing_id: "anonizeid".into(),
            pre_flight: None,
            master_user_token: None,
            rates: serde_json::Value::Null,
            amount: 0.0,
            currency: "BAT".into(),
        }
    }

    #[test]
    fn load_creates_empty_document_when_missing() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/ledger.json");
        let store = LedgerStore::load(&path).unwrap();
        assert!(store.wallet_info().key_info_seed.is_none());
    }

    #[test]
    fn persists_and_reloads_wallet_info() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        let store = LedgerStore::load(&path).unwrap();
        store
            .set_wallet_info(WalletInfo {
                key_info_seed: Some([9u8; 32]),
            })
            .unwrap();

        let reloaded = LedgerStore::load(&path).unwrap();
        assert_eq!(reloaded.wallet_info().key_info_seed, Some([9u8; 32]));
    }

    #[test]
    fn reconcile_add_rejects_duplicate() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::load(dir.path().join("ledger.json")).unwrap();

        store.add_reconcile("vid1", sample_reconcile("vid1")).unwrap();
        let err = store.add_reconcile("vid1", sample_reconcile("vid1")).unwrap_err();
        assert!(matches!(err, StoreError::ReconcileAlreadyExists(id) if id == "vid1"));
    }

    #[test]
    fn reconcile_update_rejects_missing() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::load(dir.path().join("ledger.json")).unwrap();

        let err = store.update_reconcile("missing", sample_reconcile("missing")).unwrap_err();
        assert!(matches!(err, StoreError::ReconcileNotFound(id) if id == "missing"));
    }

    #[test]
    fn reconcile_lifecycle_round_trip() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::load(dir.path().join("ledger.json")).unwrap();

        assert!(!store.reconcile_exists("vid1"));
        store.add_reconcile("vid1", sample_reconcile("vid1")).unwrap();
        assert!(store.reconcile_exists("vid1"));

        let mut updated = store.get_reconcile("vid1").unwrap();
        updated.state = ledger_core::model::ReconcileState::CurrentRequested;
        store.update_reconcile("vid1", updated).unwrap();
        assert_eq!(
            store.get_reconcile("vid1").unwrap().state,
            ledger_core::model::ReconcileState::CurrentRequested
        );

        let removed = store.remove_reconcile("vid1").unwrap();
        assert!(removed.is_some());
        assert!(!store.reconcile_exists("vid1"));
    }

    #[test]
    fn transaction_mutate_by_viewing_id() {
        let dir = tempdir().unwrap();
        let store = LedgerStore::load(dir.path().join("ledger.json")).unwrap();

        store
            .append_transaction(Transaction {
                viewing_id: "vid1".into(),
                ..Default::default()
            })
            .unwrap();

        let mutated = store
            .mutate_transaction_by_viewing_id("vid1", |tx| {
                tx.votes += 1;
            })
            .unwrap();
        assert!(mutated);
        assert_eq!(store.find_transaction_by_viewing_id("vid1").unwrap().votes, 1);

        let missed = store
            .mutate_transaction_by_viewing_id("missing", |tx| {
                tx.votes += 1;
            })
            .unwrap();
        assert!(!missed);
    }
}
