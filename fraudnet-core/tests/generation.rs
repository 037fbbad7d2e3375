//! End-to-end generation and loading against the in-memory store.

mod common;

use std::num::NonZeroUsize;

use common::{FailingStore, small_generator};
use fraudnet_core::{
    BatchLoader, GenerationError, GenerationErrorCode, GenerationRequest, GeneratorBuilder,
    LoadPhase, LoadStrategy, MemoryGraphStore, ReasonTag, RelationshipKind, StoreErrorCode,
};
use fraudnet_test_support::tracing::RecordingLayer;
use rstest::rstest;
use tracing::Level;

fn request(users: f64, transactions: f64, density: f64) -> GenerationRequest {
    GenerationRequest {
        users_count: Some(users),
        transactions_count: Some(transactions),
        density: Some(density),
        ..GenerationRequest::default()
    }
}

#[test]
fn zero_density_at_minimum_volume_creates_no_sharing() {
    let generator = GeneratorBuilder::new()
        .with_seed(1)
        .build()
        .expect("default configuration is valid");
    let store = MemoryGraphStore::new();
    let request = GenerationRequest {
        users_count: Some(10.0),
        transactions_count: Some(100_000.0),
        user_density: Some(0.0),
        transaction_density: Some(0.0),
        density: None,
    };
    let summary = generator.run(&request, &store).expect("memory store never fails");

    assert_eq!(summary.users_generated, 10);
    assert_eq!(summary.transactions_generated, 100_000);
    assert_eq!(summary.shared_edge_count, 0);
    assert_eq!(summary.transaction_edge_count, 0);
    assert_eq!(summary.effective_user_density, 0.0);
    assert_eq!(summary.effective_transaction_density, 0.0);
    assert_eq!(store.relationship_count(RelationshipKind::SharedAttribute), 0);
    assert_eq!(store.relationship_count(RelationshipKind::RelatedTo), 0);
    assert_eq!(store.debit_count(), 100_000);
    assert_eq!(store.credit_count(), 100_000);
}

#[test]
fn two_users_at_full_density_share_an_edge() {
    let store = MemoryGraphStore::new();
    let request = GenerationRequest {
        users_count: Some(2.0),
        transactions_count: Some(0.0),
        user_density: Some(1.0),
        ..GenerationRequest::default()
    };
    let summary = small_generator(100)
        .run(&request, &store)
        .expect("memory store never fails");
    assert_eq!(summary.users_generated, 2);
    assert_eq!(summary.shared_edge_count, 1);
    let forward = store.relationship(RelationshipKind::SharedAttribute, "u_0", "u_1");
    let backward = store.relationship(RelationshipKind::SharedAttribute, "u_1", "u_0");
    assert!(forward.is_some());
    assert_eq!(forward, backward);
}

#[test]
fn loading_twice_leaves_the_store_unchanged() {
    let generator = small_generator(7);
    let plan = generator.plan(&request(120.0, 300.0, 1.0));
    let dataset = generator.build_dataset(&plan).expect("enough users");
    let store = MemoryGraphStore::new();
    generator
        .loader()
        .load(&store, &dataset)
        .expect("memory store never fails");
    let first = store.snapshot();
    let rebatched = BatchLoader::new(
        NonZeroUsize::new(1_000).expect("non-zero"),
        LoadStrategy::Sequential,
    );
    rebatched
        .load(&store, &dataset)
        .expect("memory store never fails");
    assert_eq!(store.snapshot(), first);
    assert_eq!(first.users.len(), 120);
    assert_eq!(first.transactions.len(), 300);
    assert_eq!(
        first.relationships.len(),
        2 * (dataset.shared_edges().len() + dataset.transaction_edges().len())
    );
}

#[test]
fn stored_relationships_mirror_dataset_edges() {
    let generator = small_generator(16);
    let plan = generator.plan(&request(150.0, 400.0, 1.0));
    let dataset = generator.build_dataset(&plan).expect("enough users");
    let store = MemoryGraphStore::new();
    generator
        .loader()
        .load(&store, &dataset)
        .expect("memory store never fails");

    assert!(!dataset.shared_edges().is_empty());
    for edge in dataset.shared_edges() {
        let stored = store
            .relationship(
                RelationshipKind::SharedAttribute,
                edge.source().as_str(),
                edge.target().as_str(),
            )
            .expect("every user edge is stored");
        assert_eq!(stored, edge.reasons());
    }
    for edge in dataset.transaction_edges() {
        let stored = store.relationship(
            RelationshipKind::RelatedTo,
            edge.target().as_str(),
            edge.source().as_str(),
        );
        assert_eq!(stored.as_deref(), Some(edge.reasons()));
    }
    for transaction in dataset.transactions() {
        assert_ne!(transaction.sender_id, transaction.receiver_id);
        assert!(store.has_debit(transaction.sender_id.as_str(), transaction.id.as_str()));
        assert!(store.has_credit(transaction.id.as_str(), transaction.receiver_id.as_str()));
    }
    assert_eq!(store.skipped_count(), 0);
}

#[test]
fn shared_email_is_visible_through_attribute_lookup() {
    let generator = small_generator(50);
    let plan = generator.plan(&request(200.0, 0.0, 1.0));
    let dataset = generator.build_dataset(&plan).expect("enough users");
    let store = MemoryGraphStore::new();
    generator
        .loader()
        .load(&store, &dataset)
        .expect("memory store never fails");
    let email_edge = dataset
        .shared_edges()
        .iter()
        .find(|edge| edge.reasons().contains(&ReasonTag::Email))
        .expect("full density over 200 users shares at least one email");
    let email = store
        .user(email_edge.source().as_str())
        .map(|user| user.email)
        .expect("source user is stored");
    let sharers = store.users_with_attribute(ReasonTag::Email, &email);
    assert_eq!(sharers.len(), 2);
    assert!(sharers.contains(email_edge.target()));
}

#[rstest]
#[case::second_user_batch(1, LoadPhase::Users, 1)]
#[case::first_shared_batch(3, LoadPhase::SharedEdges, 0)]
fn first_failing_batch_aborts_the_run(
    #[case] fail_at: usize,
    #[case] phase: LoadPhase,
    #[case] batch: usize,
) {
    let store = FailingStore::failing_at(fail_at);
    let err = small_generator(10)
        .run(&request(25.0, 40.0, 1.0), &store)
        .expect_err("injected failure must abort the run");
    match &err {
        GenerationError::Store {
            phase: failed_phase,
            batch: failed_batch,
            ..
        } => {
            assert_eq!(*failed_phase, phase);
            assert_eq!(*failed_batch, batch);
        }
        other => panic!("expected a store failure, got {other:?}"),
    }
    assert_eq!(err.code(), GenerationErrorCode::StoreFailure);
    assert_eq!(err.store_code(), Some(StoreErrorCode::Rejected));
    assert_eq!(store.inner().transaction_count(), 0);
    assert_eq!(store.inner().user_count(), (fail_at * 10).min(25));
}

#[test]
fn run_emits_phase_spans_and_completion_event() {
    let store = MemoryGraphStore::new();
    let (result, layer) =
        RecordingLayer::capture(|| small_generator(8).run(&request(30.0, 40.0, 0.5), &store));
    result.expect("memory store never fails");

    let run = layer
        .span_named("generator.run")
        .expect("run span must be recorded");
    assert_eq!(run.field("users"), Some("30"));
    assert_eq!(run.field("transactions"), Some("40"));

    let phases: Vec<String> = layer
        .spans()
        .into_iter()
        .filter(|span| span.name == "loader.phase")
        .filter_map(|span| span.field("phase").map(str::to_owned))
        .collect();
    assert_eq!(
        phases,
        ["users", "shared_edges", "transactions", "transaction_edges"]
    );
    assert!(layer.has_message("generation completed"));
    assert!(
        layer
            .events_at(Level::DEBUG)
            .iter()
            .any(|event| event.field("message") == Some("batch loaded"))
    );
}

#[test]
fn volume_cap_override_is_logged() {
    let generator = small_generator(100);
    let ((), layer) = RecordingLayer::capture(|| {
        let plan = generator.plan(&request(200.0, 500.0, 1.0));
        generator.build_dataset(&plan).expect("enough users");
    });
    let capped = layer
        .events_at(Level::WARN)
        .into_iter()
        .find(|event| {
            event.field("message") == Some("volume cap lowered the sharing probability")
                && event.field("family") == Some("users")
        })
        .expect("8 / 200 < 0.1 so the user volume cap applies");
    assert_eq!(capped.field("requested"), Some("1"));
    assert_eq!(capped.field("effective"), Some("0.04"));
}

#[cfg(feature = "parallel")]
#[test]
fn parallel_and_sequential_loads_agree() {
    let generator = small_generator(9);
    let plan = generator.plan(&request(100.0, 250.0, 1.0));
    let dataset = generator.build_dataset(&plan).expect("enough users");
    let load = |strategy| {
        let store = MemoryGraphStore::new();
        BatchLoader::new(NonZeroUsize::new(9).expect("non-zero"), strategy)
            .load(&store, &dataset)
            .expect("memory store never fails");
        store.snapshot()
    };
    assert_eq!(load(LoadStrategy::Parallel), load(LoadStrategy::Sequential));
}
