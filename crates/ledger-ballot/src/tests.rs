use crate::BallotPipeline;
use ledger_core::anonize::MockAnonize;
use ledger_core::model::{Ballot, BatchVote, SurveyorProof, Transaction};
use ledger_store::LedgerStore;
use ledger_transport::{HttpResponse, MockTransport};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::tempdir;

fn pipeline(transport: Arc<MockTransport>) -> BallotPipeline<MockTransport, MockAnonize> {
    let dir = tempdir().unwrap();
    let store = Arc::new(LedgerStore::load(dir.path().join("ledger.json")).unwrap());
    let oracle = Arc::new(MockAnonize::new());
    BallotPipeline::new(store, transport, oracle, "https://operator.example")
}

fn sample_ballot(viewing_id: &str, publisher_id: &str) -> Ballot {
    Ballot {
        surveyor_id: format!("sv-{publisher_id}"),
        viewing_id: viewing_id.to_string(),
        publisher_id: publisher_id.to_string(),
        offset: 0,
        prepare_ballot: String::new(),
        proof_ballot: String::new(),
        delay_stamp: 0,
    }
}

#[tokio::test]
async fn ballot_with_empty_proof_is_skipped_in_prepare_vote_batch() {
    let transport = Arc::new(MockTransport::new());
    let p = pipeline(transport);

    p.store
        .append_transaction(Transaction {
            viewing_id: "vid1".into(),
            ..Default::default()
        })
        .unwrap();

    let mut ballot = sample_ballot("vid1", "pub1");
    ballot.prepare_ballot = "{}".into();
    // proof_ballot left empty on purpose.
    p.store.append_ballot(ballot).unwrap();

    p.prepare_vote_batch().await.unwrap();

    assert_eq!(p.store.ballots().len(), 1, "unproven ballot must not be drained");
    assert!(p.store.batch().is_empty());
}

#[tokio::test]
async fn prepare_vote_batch_moves_a_fully_proven_ballot_into_the_batch() {
    let transport = Arc::new(MockTransport::new());
    let p = pipeline(transport);

    p.store
        .append_transaction(Transaction {
            viewing_id: "vid1".into(),
            ..Default::default()
        })
        .unwrap();

    let mut ballot = sample_ballot("vid1", "pub1");
    ballot.prepare_ballot = "{}".into();
    ballot.proof_ballot = "proof-1".into();
    p.store.append_ballot(ballot).unwrap();

    p.prepare_vote_batch().await.unwrap();

    assert!(p.store.ballots().is_empty());
    let batch = p.store.batch();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].publisher_id, "pub1");
    assert_eq!(batch[0].proofs[0].proof, "proof-1");

    let tx = p.store.find_transaction_by_viewing_id("vid1").unwrap();
    assert_eq!(tx.ballots.get("pub1"), Some(&1));
}

#[tokio::test]
async fn vote_batch_is_a_no_op_on_an_empty_batch() {
    let transport = Arc::new(MockTransport::new());
    let p = pipeline(transport.clone());
    p.vote_batch().await.unwrap();
    assert!(transport.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn vote_batch_retries_entries_the_operator_did_not_acknowledge() {
    let transport = Arc::new(MockTransport::new());
    transport.queue(
        "https://operator.example/v2/batch/surveyor/voting",
        HttpResponse {
            ok: true,
            status: 200,
            body: r#"[{"surveyorId":"sv-1"}]"#.into(),
            headers: HashMap::new(),
        },
    );

    let p = pipeline(transport);
    p.store
        .set_batch(vec![BatchVote {
            publisher_id: "pub1".into(),
            proofs: vec![
                SurveyorProof { surveyor_id: "sv-1".into(), proof: "p1".into() },
                SurveyorProof { surveyor_id: "sv-2".into(), proof: "p2".into() },
            ],
        }])
        .unwrap();

    p.vote_batch().await.unwrap();

    let batch = p.store.batch();
    assert_eq!(batch.len(), 1, "sv-2 was not acknowledged and must be retried");
    assert_eq!(batch[0].proofs.len(), 1);
    assert_eq!(batch[0].proofs[0].surveyor_id, "sv-2");
}

#[tokio::test]
async fn vote_batch_drops_the_publisher_bucket_once_fully_acknowledged() {
    let transport = Arc::new(MockTransport::new());
    transport.queue(
        "https://operator.example/v2/batch/surveyor/voting",
        HttpResponse {
            ok: true,
            status: 200,
            body: r#"[{"surveyorId":"sv-1"}]"#.into(),
            headers: HashMap::new(),
        },
    );

    let p = pipeline(transport);
    p.store
        .set_batch(vec![BatchVote {
            publisher_id: "pub1".into(),
            proofs: vec![SurveyorProof { surveyor_id: "sv-1".into(), proof: "p1".into() }],
        }])
        .unwrap();

    p.vote_batch().await.unwrap();

    assert!(p.store.batch().is_empty());
}
