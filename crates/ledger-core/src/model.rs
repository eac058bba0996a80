//! Shared data model — persisted entities for the wallet, reconcile, and
//! ballot subsystems. These are the types the state store persists and
//! the other crates pass around; mutation always happens through the
//! store's typed setters, never by handing out a mutable reference.

use serde::{Deserialize, Serialize};

/// Persona signing material. `key_info_seed` is set once at persona
/// registration and only overwritten by a successful recovery.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletInfo {
    pub key_info_seed: Option<[u8; 32]>,
}

/// Stable per-install identity plus the opaque strings produced by the
/// blinded-credential enrollment dance.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PersonaIdentity {
    pub persona_id: Option<String>,
    pub user_id: Option<String>,
    pub registrar_vk: Option<String>,
    pub pre_flight: Option<String>,
    pub master_user_token: Option<String>,
    pub payment_id: Option<String>,
    pub currency: Option<String>,
    /// Per-reconcile-period auto-contribute fee, as reported at
    /// registration time.
    pub contribution_amount: Option<f64>,
}

/// Grant category as reported by the operator's `/v2/promotions` surface.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum GrantType {
    Ugp,
    Ads,
    Android,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Grant {
    pub promotion_id: String,
    pub probi: String,
    pub expiry_time: i64,
    #[serde(rename = "type")]
    pub grant_type: GrantType,
}

/// Server-reported wallet properties. Treated as an opaque refreshable
/// cache; `last_refreshed` records when it was last successfully merged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct WalletProperties {
    #[serde(default)]
    pub balance: f64,
    #[serde(default)]
    pub probi: String,
    #[serde(default)]
    pub grants: Vec<Grant>,
    #[serde(default)]
    pub rates: serde_json::Value,
    #[serde(default)]
    pub parameters: serde_json::Value,
    /// Days remaining in the current reconcile period, as reported by
    /// the operator.
    #[serde(default)]
    pub days: i64,
    /// Per-period auto-contribute fee, as reported by the operator.
    #[serde(default)]
    pub fee_amount: f64,
    #[serde(default)]
    pub currency: String,
    pub last_refreshed: Option<i64>,
}

/// The category a reconcile was started for. `RecurringDonation` falls
/// through to `AutoContribute` on rejection (see reconcile eligibility
/// checks); the variant recorded on a `CurrentReconcile` is whichever one
/// actually entered the map.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReconcileCategory {
    AutoContribute,
    RecurringDonation,
    DirectDonation,
}

/// A publisher's share of an `AutoContribute`/`RecurringDonation` list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublisherShare {
    pub publisher_id: String,
    pub weight: f64,
}

/// An absolute tip amount for `DirectDonation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Direction {
    pub publisher_key: String,
    pub amount: f64,
    pub currency: String,
}

/// The explicit state tag for a reconcile in flight, persisted alongside
/// the record so a restart can resume by dispatching on the tag instead
/// of re-deriving it from which fields happen to be populated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReconcileState {
    ReconcileRequested,
    CurrentRequested,
    PayloadSubmitted,
    ViewingRegistered,
    CredentialsObtained,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CurrentReconcile {
    pub viewing_id: String,
    pub state: ReconcileState,
    pub category: ReconcileCategory,
    pub list: Vec<PublisherShare>,
    pub directions: Vec<Direction>,
    pub fee: f64,
    pub surveyor_id: Option<String>,
    pub registrar_vk: Option<String>,
    pub anonize_viewing_id: String,
    pub pre_flight: Option<String>,
    pub master_user_token: Option<String>,
    pub rates: serde_json::Value,
    pub amount: f64,
    pub currency: String,
}

/// Append-only settlement record. `ballots`/`votes` are populated and
/// mutated by the ballot pipeline as it drains surveyor ids.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub viewing_id: String,
    pub surveyor_id: String,
    pub surveyor_ids: Vec<String>,
    pub anonize_viewing_id: String,
    pub registrar_vk: String,
    pub master_user_token: String,
    pub contribution_rates: serde_json::Value,
    pub contribution_fiat_amount: String,
    pub contribution_fiat_currency: String,
    pub contribution_probi: String,
    /// Per-publisher cumulative ballot offset, keyed by `publisher_id`.
    pub ballots: std::collections::HashMap<String, u32>,
    pub votes: u32,
}

/// A single vote's worth of contribution directed at one publisher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ballot {
    pub surveyor_id: String,
    pub viewing_id: String,
    pub publisher_id: String,
    pub offset: u32,
    #[serde(default)]
    pub prepare_ballot: String,
    #[serde(default)]
    pub proof_ballot: String,
    pub delay_stamp: i64,
}

impl Ballot {
    pub fn is_prepared(&self) -> bool {
        !self.prepare_ballot.is_empty()
    }

    pub fn is_proven(&self) -> bool {
        !self.proof_ballot.is_empty()
    }
}

/// One `(surveyor_id, proof)` entry queued for submission under a
/// publisher's batch-vote bucket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SurveyorProof {
    pub surveyor_id: String,
    pub proof: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BatchVote {
    pub publisher_id: String,
    pub proofs: Vec<SurveyorProof>,
}

/// The report-item category a completed reconcile settles under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ContributionType {
    AutoContribution,
    Donation,
    DonationRecurring,
}

/// One settled contribution, keyed by `(month, year, type)` at the
/// report level and by publisher at the row level.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContributionRecord {
    pub viewing_id: String,
    pub month: u32,
    pub year: i32,
    pub contribution_type: ContributionType,
    pub publisher_id: String,
    pub probi: String,
}
