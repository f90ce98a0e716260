//! Integrity audit log tests
//!
//! JSONL and database sinks, the outbox dispatcher, and verification of a
//! persisted log.

mod common;

use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use budget_baseline::audit::store::load_entries;
use budget_baseline::audit::{
    verify_audit_log_file, verify_entries, AuditEventType, IntegrityAuditLog, JsonlAuditStore,
};
use budget_baseline::integrity::IntegrityMetrics;
use budget_baseline::repository::BudgetRepository;
use budget_baseline::BaselineOrchestrator;

use common::*;

#[tokio::test]
async fn test_jsonl_sink_records_approval_and_validation() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("audit").join("integrity.jsonl");

    let db = setup_test_db().await;
    let seeded = seed_baseline(&db, &[100, 200]).await;
    let store = Arc::new(JsonlAuditStore::open(&log_path).unwrap());
    let (orchestrator, _) = orchestrator_with_store(db.clone(), fixed_clock(), store.clone());

    orchestrator
        .approve_budget(seeded.budget.id(), Uuid::new_v4())
        .await
        .unwrap();
    orchestrator
        .verify_budget(seeded.budget.id(), Uuid::new_v4())
        .await
        .unwrap();

    assert_eq!(store.entry_count().await, 2);
    let entries = load_entries(&log_path).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].event_type, AuditEventType::HashGenerated);
    assert_eq!(entries[1].event_type, AuditEventType::HashValidated);

    let result = verify_entries(&entries);
    assert!(result.is_valid(), "{}", result.detailed_status());
    assert_eq!(result.event_counts[&AuditEventType::HashGenerated], 1);

    // Nothing went to the database table.
    assert!(db
        .audit_entries_for_budget(seeded.budget.id())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_jsonl_log_edit_is_detected() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("integrity.jsonl");

    let db = setup_test_db().await;
    let seeded = seed_baseline(&db, &[100]).await;
    let store = Arc::new(JsonlAuditStore::open(&log_path).unwrap());
    let (orchestrator, _) = orchestrator_with_store(db, fixed_clock(), store.clone());
    orchestrator
        .approve_budget(seeded.budget.id(), Uuid::new_v4())
        .await
        .unwrap();
    store.close().await.unwrap();

    let original = std::fs::read_to_string(&log_path).unwrap();
    let forged_actor = Uuid::new_v4().to_string();
    let entry = &load_entries(&log_path).unwrap()[0];
    let edited = original.replace(&entry.actor.to_string(), &forged_actor);
    assert_ne!(original, edited);
    std::fs::write(&log_path, edited).unwrap();

    let result = verify_audit_log_file(&log_path).unwrap();
    assert!(!result.is_valid());
    assert_eq!(result.tampered_entries, vec![0]);
}

#[tokio::test]
async fn test_jsonl_store_reopens_with_existing_entries() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("integrity.jsonl");

    let db = setup_test_db().await;
    let seeded = seed_baseline(&db, &[100]).await;
    {
        let store = Arc::new(JsonlAuditStore::open(&log_path).unwrap());
        let (orchestrator, _) = orchestrator_with_store(db.clone(), fixed_clock(), store);
        orchestrator
            .approve_budget(seeded.budget.id(), Uuid::new_v4())
            .await
            .unwrap();
    }

    let reopened = JsonlAuditStore::open(&log_path).unwrap();
    assert_eq!(reopened.entry_count().await, 1);
    let history = reopened
        .entries_for_budget(seeded.budget.id())
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert!(reopened
        .entries_for_budget(Uuid::new_v4())
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_outbox_delivers_after_shutdown() {
    let db = setup_test_db().await;
    let clock = fixed_clock();
    let seeded = seed_baseline(&db, &[100, 200, 300]).await;

    let metrics = Arc::new(IntegrityMetrics::new());
    let (audit, dispatcher) =
        IntegrityAuditLog::with_outbox(db.clone(), clock.clone(), metrics.clone());
    let orchestrator =
        BaselineOrchestrator::with_database(db.clone(), Arc::new(audit), clock, metrics.clone());

    orchestrator
        .approve_budget(seeded.budget.id(), Uuid::new_v4())
        .await
        .unwrap();
    orchestrator
        .verify_budget(seeded.budget.id(), Uuid::new_v4())
        .await
        .unwrap();

    drop(orchestrator);
    dispatcher.await.unwrap();

    let entries = db.audit_entries_for_budget(seeded.budget.id()).await.unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.verify_hash()));
    assert!(verify_entries(&entries).is_valid());
    assert_eq!(metrics.snapshot().audit_failures, 0);
}

#[tokio::test]
async fn test_outbox_failures_are_counted() {
    let db = setup_test_db().await;
    let clock = fixed_clock();
    let seeded = seed_baseline(&db, &[100]).await;

    let metrics = Arc::new(IntegrityMetrics::new());
    let (audit, dispatcher) =
        IntegrityAuditLog::with_outbox(Arc::new(FailingAuditStore), clock.clone(), metrics.clone());
    let orchestrator =
        BaselineOrchestrator::with_database(db.clone(), Arc::new(audit), clock, metrics.clone());

    orchestrator
        .approve_budget(seeded.budget.id(), Uuid::new_v4())
        .await
        .unwrap();
    drop(orchestrator);
    dispatcher.await.unwrap();

    assert_eq!(metrics.snapshot().audit_failures, 1);
    assert!(db
        .find_plan(seeded.plan.id())
        .await
        .unwrap()
        .unwrap()
        .is_frozen());
}

#[tokio::test]
async fn test_recorded_entries_chain_to_seal() {
    let db = setup_test_db().await;
    let seeded = seed_baseline(&db, &[100, 200]).await;
    let recorder = Arc::new(RecordingAuditStore::default());
    let (orchestrator, _) = orchestrator_with_store(db.clone(), fixed_clock(), recorder.clone());

    let approver = Uuid::new_v4();
    orchestrator
        .approve_budget(seeded.budget.id(), approver)
        .await
        .unwrap();

    let sealed = db.find_budget(seeded.budget.id()).await.unwrap().unwrap();
    let entries = recorder.entries.lock().unwrap().clone();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor, approver);
    assert_eq!(entries[0].approval_hash.as_deref(), sealed.approval_hash());
    assert_eq!(entries[0].execution_hash.as_deref(), sealed.execution_hash());
    assert_eq!(entries[0].algorithm, "SHA-256-v1");
}

#[tokio::test]
async fn test_hanging_inline_store_does_not_block_approval() {
    let db = setup_test_db().await;
    let clock = fixed_clock();
    let seeded = seed_baseline(&db, &[100, 200]).await;

    let metrics = Arc::new(IntegrityMetrics::new());
    let audit = IntegrityAuditLog::inline(Arc::new(HangingAuditStore), clock.clone(), metrics.clone())
        .with_append_timeout(Duration::from_millis(50));
    let orchestrator =
        BaselineOrchestrator::with_database(db.clone(), Arc::new(audit), clock, metrics.clone());

    tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.approve_budget(seeded.budget.id(), Uuid::new_v4()),
    )
    .await
    .expect("approval must not wait on the audit store")
    .unwrap();

    assert_eq!(metrics.snapshot().audit_failures, 1);
    let sealed = db.find_budget(seeded.budget.id()).await.unwrap().unwrap();
    assert!(sealed.is_frozen());
}

#[tokio::test]
async fn test_hanging_outbox_store_does_not_block_approval() {
    let db = setup_test_db().await;
    let clock = fixed_clock();
    let seeded = seed_baseline(&db, &[100]).await;

    let metrics = Arc::new(IntegrityMetrics::new());
    let (audit, dispatcher) =
        IntegrityAuditLog::with_outbox(Arc::new(HangingAuditStore), clock.clone(), metrics.clone());
    let orchestrator =
        BaselineOrchestrator::with_database(db.clone(), Arc::new(audit), clock, metrics);

    tokio::time::timeout(
        Duration::from_secs(5),
        orchestrator.approve_budget(seeded.budget.id(), Uuid::new_v4()),
    )
    .await
    .expect("approval must not wait on the audit store")
    .unwrap();
    dispatcher.abort();

    assert!(db
        .find_plan(seeded.plan.id())
        .await
        .unwrap()
        .unwrap()
        .is_frozen());
}
