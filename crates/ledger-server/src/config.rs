//! Server configuration — parsed from TOML file + environment variable overrides.
//!
//! Priority: environment variables > config file > defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// General server settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Operator endpoint this ledger talks to.
    pub operator: OperatorSection,

    /// Wallet lifecycle settings.
    #[serde(default)]
    pub wallet: WalletSection,

    /// Reconcile timer settings.
    #[serde(default)]
    pub reconcile: ReconcileSection,

    /// Ballot pipeline timer settings.
    #[serde(default)]
    pub ballot: BallotSection,
}

/// General server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Data directory (ledger.json state file).
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Operator endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorSection {
    /// Base URL of the operator API, e.g. `https://operator.example`.
    pub base_url: String,
}

/// Wallet lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletSection {
    /// Register a persona automatically on first run if none exists yet.
    #[serde(default = "default_auto_register")]
    pub auto_register: bool,

    /// Path to a newline-delimited Niceware dictionary, for recovering
    /// legacy 16-word passphrases. Absent unless Niceware recovery is
    /// actually used.
    pub niceware_dictionary_path: Option<PathBuf>,
}

impl Default for WalletSection {
    fn default() -> Self {
        Self {
            auto_register: default_auto_register(),
            niceware_dictionary_path: None,
        }
    }
}

/// Reconcile timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcileSection {
    /// How often to attempt a recurring-donation-falling-through-to-auto-contribute
    /// reconcile (default: 24 hours).
    #[serde(default = "default_reconcile_interval")]
    pub interval_secs: u64,

    /// Standing recurring-donation publisher list. The real
    /// `GetRecurringDonations` collaborator is an embedder concern out of
    /// scope here, so the daemon sources it from config instead.
    #[serde(default)]
    pub recurring_donation_publishers: Vec<PublisherShareEntry>,

    /// Standing auto-contribute publisher list, sourced the same way a
    /// browsing-weighted `GetCurrentPublisherInfoList` result would be.
    #[serde(default)]
    pub auto_contribute_publishers: Vec<PublisherShareEntry>,
}

impl Default for ReconcileSection {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval(),
            recurring_donation_publishers: Vec::new(),
            auto_contribute_publishers: Vec::new(),
        }
    }
}

/// One publisher's configured weight, the TOML-facing twin of
/// [`ledger_core::model::PublisherShare`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublisherShareEntry {
    pub publisher_id: String,
    pub weight: f64,
}

impl From<&PublisherShareEntry> for ledger_core::model::PublisherShare {
    fn from(entry: &PublisherShareEntry) -> Self {
        ledger_core::model::PublisherShare {
            publisher_id: entry.publisher_id.clone(),
            weight: entry.weight,
        }
    }
}

/// Ballot pipeline timer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSection {
    /// How often to run `prepare_ballots` + `prepare_vote_batch`.
    #[serde(default = "default_prepare_interval")]
    pub prepare_interval_secs: u64,

    /// How often to run `vote_batch`.
    #[serde(default = "default_vote_interval")]
    pub vote_interval_secs: u64,
}

impl Default for BallotSection {
    fn default() -> Self {
        Self {
            prepare_interval_secs: default_prepare_interval(),
            vote_interval_secs: default_vote_interval(),
        }
    }
}

// ============================================================================
// Default value functions
// ============================================================================

fn default_data_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_auto_register() -> bool {
    true
}

fn default_reconcile_interval() -> u64 {
    86_400 // 24 hours
}

fn default_prepare_interval() -> u64 {
    60
}

fn default_vote_interval() -> u64 {
    60
}

// ============================================================================
// Loading & environment override
// ============================================================================

impl ServerConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: ServerConfig =
            toml::from_str(&contents).with_context(|| "Failed to parse TOML config")?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Supported env vars:
    /// - `LEDGER_DATA_DIR`
    /// - `LEDGER_LOG_LEVEL`
    /// - `LEDGER_OPERATOR_BASE_URL`
    /// - `LEDGER_RECONCILE_INTERVAL`
    /// - `LEDGER_BALLOT_PREPARE_INTERVAL`
    /// - `LEDGER_BALLOT_VOTE_INTERVAL`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("LEDGER_DATA_DIR") {
            self.server.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("LEDGER_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("LEDGER_OPERATOR_BASE_URL") {
            self.operator.base_url = v;
        }
        if let Ok(v) = std::env::var("LEDGER_RECONCILE_INTERVAL") {
            if let Ok(secs) = v.parse::<u64>() {
                self.reconcile.interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("LEDGER_BALLOT_PREPARE_INTERVAL") {
            if let Ok(secs) = v.parse::<u64>() {
                self.ballot.prepare_interval_secs = secs;
            }
        }
        if let Ok(v) = std::env::var("LEDGER_BALLOT_VOTE_INTERVAL") {
            if let Ok(secs) = v.parse::<u64>() {
                self.ballot.vote_interval_secs = secs;
            }
        }
    }

    /// Validate that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.operator.base_url.is_empty(),
            "operator.base_url must not be empty"
        );
        anyhow::ensure!(
            self.operator.base_url.starts_with("http://") || self.operator.base_url.starts_with("https://"),
            "operator.base_url must be an http(s) URL"
        );
        anyhow::ensure!(
            self.reconcile.interval_secs >= 60,
            "reconcile.interval_secs must be >= 60"
        );
        anyhow::ensure!(
            self.ballot.prepare_interval_secs >= 1,
            "ballot.prepare_interval_secs must be >= 1"
        );
        anyhow::ensure!(
            self.ballot.vote_interval_secs >= 1,
            "ballot.vote_interval_secs must be >= 1"
        );
        if let Some(path) = &self.wallet.niceware_dictionary_path {
            anyhow::ensure!(
                path.as_os_str() != "",
                "wallet.niceware_dictionary_path must not be empty when present"
            );
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
