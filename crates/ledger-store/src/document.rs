//! The persisted document itself: every field named in the data model,
//! serialized as JSON with a version tag for forward migration.

use super::StoreError;
use ledger_core::model::{
    Ballot, BatchVote, ContributionRecord, CurrentReconcile, Grant, PersonaIdentity, Transaction,
    WalletInfo, WalletProperties,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const CURRENT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerDocument {
    #[serde(default = "current_version")]
    pub version: u32,
    #[serde(default)]
    pub wallet_info: WalletInfo,
    #[serde(default)]
    pub persona_identity: PersonaIdentity,
    #[serde(default)]
    pub grant: Option<Grant>,
    #[serde(default)]
    pub wallet_properties: WalletProperties,
    #[serde(default)]
    pub boot_stamp: Option<i64>,
    #[serde(default)]
    pub reconcile_stamp: Option<i64>,
    #[serde(default)]
    pub last_grant_load_stamp: Option<i64>,
    #[serde(default)]
    pub reconciles: HashMap<String, CurrentReconcile>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    #[serde(default)]
    pub ballots: Vec<Ballot>,
    #[serde(default)]
    pub batch: Vec<BatchVote>,
    #[serde(default)]
    pub contribution_records: Vec<ContributionRecord>,
}

fn current_version() -> u32 {
    CURRENT_VERSION
}

impl Default for LedgerDocument {
    fn default() -> Self {
        Self {
            version: CURRENT_VERSION,
            wallet_info: WalletInfo::default(),
            persona_identity: PersonaIdentity::default(),
            grant: None,
            wallet_properties: WalletProperties::default(),
            boot_stamp: None,
            reconcile_stamp: None,
            last_grant_load_stamp: None,
            reconciles: HashMap::new(),
            transactions: Vec::new(),
            ballots: Vec::new(),
            batch: Vec::new(),
            contribution_records: Vec::new(),
        }
    }
}

impl LedgerDocument {
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if path.exists() {
            let contents = fs::read_to_string(path)?;
            let doc: LedgerDocument = serde_json::from_str(&contents)?;
            Ok(doc)
        } else {
            Ok(Self::default())
        }
    }

    /// Atomically replace the on-disk document: write to a sibling temp
    /// file, then rename over the target, so a crash mid-write never
    /// leaves a torn document behind.
    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, contents)?;
        fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn default_document_round_trips_through_json() {
        let doc = LedgerDocument::default();
        let json = serde_json::to_string(&doc).unwrap();
        let reloaded: LedgerDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(reloaded.version, CURRENT_VERSION);
    }

    #[test]
    fn save_then_load_preserves_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("doc.json");

        let mut doc = LedgerDocument::default();
        doc.boot_stamp = Some(1234);
        doc.save(&path).unwrap();

        let reloaded = LedgerDocument::load(&path).unwrap();
        assert_eq!(reloaded.boot_stamp, Some(1234));
    }

    #[test]
    fn load_tolerates_missing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let doc = LedgerDocument::load(&path).unwrap();
        assert_eq!(doc.version, CURRENT_VERSION);
    }
}
