//! End-to-end: persona registration feeds a reconcile, the reconcile's
//! transaction feeds the ballot pipeline, and the pipeline's votes feed
//! contribution bookkeeping -- one store, one scripted transport, one
//! mock oracle, exercised the way the daemon's three timers would.

use ledger_core::anonize::MockAnonize;
use ledger_core::model::{Ballot, PublisherShare, ReconcileCategory, WalletProperties};
use ledger_ballot::BallotPipeline;
use ledger_reconcile::ReconcileEngine;
use ledger_store::LedgerStore;
use ledger_transport::{HttpResponse, MockTransport};
use ledger_wallet::WalletClient;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

const BASE: &str = "https://operator.example";

fn ok(body: impl Into<String>) -> HttpResponse {
    HttpResponse {
        ok: true,
        status: 200,
        body: body.into(),
        headers: HashMap::new(),
    }
}

#[tokio::test]
async fn persona_to_reconcile_to_ballot_settles_a_contribution() {
    let dir = tempdir().unwrap();
    let store = Arc::new(LedgerStore::load(dir.path().join("ledger.json")).unwrap());
    let transport = Arc::new(MockTransport::new());
    let oracle = Arc::new(MockAnonize::new());

    // --- persona registration ---
    transport.queue(
        format!("{BASE}/v2/registrar/persona"),
        ok(r#"{"registrarVK":"RVK-persona"}"#),
    );
    transport.queue(
        format!("{BASE}/v2/registrar/persona/"),
        ok(r#"{"verification":"verified","paymentId":"pid-1","currency":"BAT","contribution_amount":"10","days":30}"#),
    );

    let wallet = WalletClient::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        BASE,
    );
    wallet.register_persona().await.unwrap();
    assert_eq!(store.persona_identity().payment_id.as_deref(), Some("pid-1"));
    assert!(store.wallet_info().key_info_seed.is_some());

    store
        .set_wallet_properties(WalletProperties {
            balance: 100.0,
            ..Default::default()
        })
        .unwrap();

    // --- reconcile: auto-contribute ---
    transport.queue(
        format!("{BASE}/v2/wallet/pid-1/surveyor"),
        ok(r#"{"surveyorId":"sv-1"}"#),
    );
    transport.queue(format!("{BASE}/v2/wallet/pid-1?amount="), ok(r#"{"rates":{}}"#));
    transport.queue(format!("{BASE}/v2/wallet/pid-1"), ok("{}"));
    transport.queue(
        format!("{BASE}/v2/registrar/viewing/pid-1"),
        ok(r#"{"registrarVK":"RVK-viewing"}"#),
    );
    transport.queue(
        format!("{BASE}/v2/registrar/viewing/"),
        ok(r#"{"verification":"verified","surveyorIds":["sv-1"]}"#),
    );

    let reconcile = ReconcileEngine::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        BASE,
    )
    .unwrap();

    let ac_list = vec![PublisherShare {
        publisher_id: "pub1".into(),
        weight: 5.0,
    }];
    let viewing_id = reconcile
        .start_auto_contribute(|| ac_list.clone())
        .await
        .unwrap();

    let tx = store.find_transaction_by_viewing_id(&viewing_id).unwrap();
    assert_eq!(tx.surveyor_id, "sv-1");
    assert!(store.get_reconcile(&viewing_id).is_none(), "a settled reconcile leaves the in-flight map");

    // --- ballot casting against the settled transaction ---
    store
        .append_ballot(Ballot {
            surveyor_id: "sv-1".into(),
            viewing_id: viewing_id.clone(),
            publisher_id: "pub1".into(),
            offset: 0,
            prepare_ballot: String::new(),
            proof_ballot: String::new(),
            delay_stamp: 0,
        })
        .unwrap();

    let ballot = BallotPipeline::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        BASE,
    );

    transport.queue(
        format!("{BASE}/v2/batch/surveyor/voting/{}", tx.anonize_viewing_id),
        ok(r#"[{"surveyorId":"sv-1","signature":"x, realsig","registrarVK":"RVK-viewing"}]"#),
    );

    ballot.prepare_ballots().await.unwrap();
    let prepared = store.ballots();
    assert_eq!(prepared.len(), 1);
    assert!(prepared[0].is_prepared());
    assert!(prepared[0].is_proven(), "offload_proof_batch runs synchronously within prepare_ballots");

    ballot.prepare_vote_batch().await.unwrap();
    assert!(store.ballots().is_empty());
    assert_eq!(store.batch().len(), 1);

    transport.queue(
        format!("{BASE}/v2/batch/surveyor/voting"),
        ok(r#"[{"surveyorId":"sv-1"}]"#),
    );
    ballot.vote_batch().await.unwrap();
    assert!(store.batch().is_empty(), "the lone bucket is acknowledged in full");

    let settled = store.find_transaction_by_viewing_id(&viewing_id).unwrap();
    assert_eq!(settled.ballots.get("pub1"), Some(&1));

    // --- contribution bookkeeping, once the embedder confirms the cast ---
    reconcile
        .on_reconcile_complete_success(
            ReconcileCategory::AutoContribute,
            &[PublisherShare {
                publisher_id: "pub1".into(),
                weight: 5.0,
            }],
            &viewing_id,
            7,
            2026,
        )
        .unwrap();

    let records = store.contribution_records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].publisher_id, "pub1");
    assert_eq!(records[0].viewing_id, viewing_id);
    assert!(records[0].probi.is_empty(), "auto-contribute rows carry no probi here; the operator settles the amount");
}

#[tokio::test]
async fn recurring_donation_falls_through_to_auto_contribute_and_still_settles() {
    let dir = tempdir().unwrap();
    let store = Arc::new(LedgerStore::load(dir.path().join("ledger.json")).unwrap());
    let transport = Arc::new(MockTransport::new());
    let oracle = Arc::new(MockAnonize::new());

    transport.queue(
        format!("{BASE}/v2/registrar/persona"),
        ok(r#"{"registrarVK":"RVK-persona"}"#),
    );
    transport.queue(
        format!("{BASE}/v2/registrar/persona/"),
        ok(r#"{"verification":"verified","paymentId":"pid-2","currency":"BAT","days":30}"#),
    );
    let wallet = WalletClient::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        BASE,
    );
    wallet.register_persona().await.unwrap();

    store
        .set_wallet_properties(WalletProperties {
            balance: 100.0,
            ..Default::default()
        })
        .unwrap();

    transport.queue(
        format!("{BASE}/v2/wallet/pid-2/surveyor"),
        ok(r#"{"surveyorId":"sv-2"}"#),
    );
    transport.queue(format!("{BASE}/v2/wallet/pid-2?amount="), ok(r#"{"rates":{}}"#));
    transport.queue(format!("{BASE}/v2/wallet/pid-2"), ok("{}"));
    transport.queue(
        format!("{BASE}/v2/registrar/viewing/pid-2"),
        ok(r#"{"registrarVK":"RVK-viewing-2"}"#),
    );
    transport.queue(
        format!("{BASE}/v2/registrar/viewing/"),
        ok(r#"{"verification":"verified","surveyorIds":["sv-2"]}"#),
    );

    let reconcile = ReconcileEngine::new(
        Arc::clone(&store),
        Arc::clone(&transport),
        Arc::clone(&oracle),
        BASE,
    )
    .unwrap();

    // An empty recurring-donation list is rejected, so this chains into
    // an auto-contribute reconcile built from the second closure.
    let ac_list = vec![PublisherShare {
        publisher_id: "pub2".into(),
        weight: 1.0,
    }];
    let viewing_id = reconcile
        .start_recurring_donations(Vec::new, || ac_list.clone())
        .await
        .unwrap();

    let tx = store.find_transaction_by_viewing_id(&viewing_id).unwrap();
    assert_eq!(tx.surveyor_id, "sv-2");
}
