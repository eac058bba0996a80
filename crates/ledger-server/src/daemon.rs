//! The daemon loop — registers a persona if needed, then runs the
//! reconcile and ballot timers forever.

use crate::config::ServerConfig;
use anyhow::{Context, Result};
use ledger_core::anonize::{BlockingAnonize, RawAnonize};
use ledger_core::model::PublisherShare;
use ledger_reconcile::ReconcileEngine;
use ledger_store::LedgerStore;
use ledger_transport::ReqwestTransport;
use ledger_wallet::WalletClient;
use std::sync::Arc;
use std::time::Duration;

/// A stand-in for the real anonize2 FFI binding. The blinded-credential
/// scheme itself is out of scope for this workspace — operators wire in
/// a real [`RawAnonize`] implementation at deployment time. Every call
/// here logs once and reports failure, so a daemon run against this
/// default makes the gap visible instead of silently fabricating
/// credentials.
struct UnwiredAnonize;

impl RawAnonize for UnwiredAnonize {
    fn make_cred(&self, _id_31_octets: &str) -> Option<String> {
        log::error!("no anonize2 binding configured; persona registration cannot proceed");
        None
    }

    fn register_user_message(&self, _pre_flight: &str, _registrar_vk: &str) -> Option<String> {
        None
    }

    fn register_user_final(
        &self,
        _id: &str,
        _verification: &str,
        _pre_flight: &str,
        _registrar_vk: &str,
    ) -> Option<String> {
        None
    }

    fn submit_message(
        &self,
        _msg: &str,
        _master_user_token: &str,
        _registrar_vk: &str,
        _surveyor_signature: &str,
        _surveyor_id: &str,
        _surveyor_vk: &str,
    ) -> Option<String> {
        None
    }
}

type Oracle = BlockingAnonize<UnwiredAnonize>;

/// Run the daemon loop. Blocks forever (until shutdown signal).
pub async fn run(config: ServerConfig) -> Result<()> {
    log::info!("ledger-server starting…");
    log::info!("  Operator:        {}", config.operator.base_url);
    log::info!("  Data dir:        {}", config.server.data_dir.display());
    log::info!(
        "  Reconcile every: {} seconds ({:.1} hours)",
        config.reconcile.interval_secs,
        config.reconcile.interval_secs as f64 / 3600.0
    );
    log::info!(
        "  Ballot prepare:  every {} seconds",
        config.ballot.prepare_interval_secs
    );
    log::info!(
        "  Ballot vote:     every {} seconds",
        config.ballot.vote_interval_secs
    );

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data dir: {}",
            config.server.data_dir.display()
        )
    })?;

    let store = Arc::new(
        LedgerStore::load(config.server.data_dir.join("ledger.json"))
            .context("Failed to load ledger state")?,
    );
    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP transport")?);
    let oracle: Arc<Oracle> = Arc::new(BlockingAnonize::new(UnwiredAnonize));

    if config.wallet.auto_register && store.wallet_info().key_info_seed.is_none() {
        log::info!("no persona on record, registering one now…");
        let wallet = WalletClient::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&oracle),
            config.operator.base_url.clone(),
        );
        match wallet.register_persona().await {
            Ok(()) => log::info!("persona registered."),
            Err(e) => log::error!("persona registration failed: {e}"),
        }
    }

    let reconcile = Arc::new(
        ReconcileEngine::new(
            Arc::clone(&store),
            Arc::clone(&transport),
            Arc::clone(&oracle),
            config.operator.base_url.clone(),
        )
        .context("Failed to build reconcile engine")?,
    );

    log::info!("resuming any reconcile left mid-flight by a prior crash…");
    reconcile.resume_pending().await;

    let ballot = Arc::new(ledger_ballot::BallotPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        config.operator.base_url.clone(),
    ));

    let recurring_list: Vec<PublisherShare> = config
        .reconcile
        .recurring_donation_publishers
        .iter()
        .map(PublisherShare::from)
        .collect();
    let ac_list: Vec<PublisherShare> = config
        .reconcile
        .auto_contribute_publishers
        .iter()
        .map(PublisherShare::from)
        .collect();

    let reconcile_handle = {
        let reconcile = Arc::clone(&reconcile);
        let interval = Duration::from_secs(config.reconcile.interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let recurring_list = recurring_list.clone();
                let ac_list = ac_list.clone();
                match reconcile
                    .start_recurring_donations(move || recurring_list, move || ac_list)
                    .await
                {
                    Ok(viewing_id) => log::info!("reconcile cycle started ({viewing_id})"),
                    Err(e) => log::warn!("reconcile cycle skipped: {e}"),
                }
            }
        })
    };

    let prepare_handle = {
        let ballot = Arc::clone(&ballot);
        let interval = Duration::from_secs(config.ballot.prepare_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = ballot.prepare_ballots().await {
                    log::warn!("prepare_ballots failed: {e}");
                }
                if let Err(e) = ballot.prepare_vote_batch().await {
                    log::warn!("prepare_vote_batch failed: {e}");
                }
            }
        })
    };

    let vote_handle = {
        let ballot = Arc::clone(&ballot);
        let interval = Duration::from_secs(config.ballot.vote_interval_secs);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if let Err(e) = ballot.vote_batch().await {
                    log::warn!("vote_batch failed: {e}");
                }
            }
        })
    };

    tokio::select! {
        res = reconcile_handle => res.context("reconcile timer task panicked")?,
        res = prepare_handle => res.context("ballot prepare timer task panicked")?,
        res = vote_handle => res.context("ballot vote timer task panicked")?,
    }

    Ok(())
}

/// Run a single reconcile + ballot tick and return, for `--check`/`--once`.
pub async fn run_check_cycle(config: &ServerConfig) -> Result<()> {
    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data dir: {}",
            config.server.data_dir.display()
        )
    })?;

    let store = Arc::new(
        LedgerStore::load(config.server.data_dir.join("ledger.json"))
            .context("Failed to load ledger state")?,
    );
    let transport = Arc::new(ReqwestTransport::new().context("Failed to build HTTP transport")?);
    let oracle: Arc<Oracle> = Arc::new(BlockingAnonize::new(UnwiredAnonize));

    let ballot = ledger_ballot::BallotPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        config.operator.base_url.clone(),
    );
    ballot.prepare_ballots().await.context("prepare_ballots failed")?;
    ballot.prepare_vote_batch().await.context("prepare_vote_batch failed")?;
    ballot.vote_batch().await.context("vote_batch failed")?;

    log::info!("single check cycle complete.");
    Ok(())
}
