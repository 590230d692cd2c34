//! Integration tests for single-resource reconciliation.
//!
//! These drive the full fetch, diff, prepare, apply flow against an
//! in-memory handler and count the network calls it sees.

use std::sync::Arc;
use std::time::Duration;

use drift_reconcile::{
    DiffResult, HandlerError, HandlerRegistry, Operation, Phase, ReconcileError, ReconcileOutcome,
    Reconciler, ReconcilerConfig, RegistryError,
};
use drift_testing::{resource, CallCounts, MemoryHandler};
use rstest::rstest;
use serde_json::json;

const KIND: &str = "Check";

fn setup(handler: MemoryHandler) -> (Arc<MemoryHandler>, Reconciler) {
    setup_with(handler, ReconcilerConfig::default())
}

fn setup_with(handler: MemoryHandler, config: ReconcilerConfig) -> (Arc<MemoryHandler>, Reconciler) {
    let handler = Arc::new(handler);
    let mut builder = HandlerRegistry::builder();
    builder.register(KIND, handler.clone()).unwrap();
    (handler, Reconciler::new(builder.build(), config))
}

#[tokio::test]
async fn test_absent_resource_is_created_once() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));

    let outcome = reconciler
        .reconcile(resource(KIND, "check-a", json!({"job": "check-a", "target": "x"})))
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Created));
    let calls = handler.calls();
    assert_eq!(calls.get_remote, 1);
    assert_eq!(calls.add, 1);
    assert_eq!(calls.update, 0);

    let submitted = handler.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].get_field("tenantId"), None);
}

#[tokio::test]
async fn test_drifted_resource_is_updated_with_identity() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    handler.seed(
        "check-a",
        json!({"job": "check-a", "target": "y", "tenantId": "t1", "id": "42"}),
    );

    let outcome = reconciler
        .reconcile(resource(KIND, "check-a", json!({"job": "check-a", "target": "x"})))
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Updated));
    let calls = handler.calls();
    assert_eq!(calls.add, 0);
    assert_eq!(calls.update, 1);

    let submitted = handler.submitted();
    assert_eq!(submitted.len(), 1);
    assert_eq!(submitted[0].get_spec_str("tenantId"), Some("t1"));
    assert_eq!(submitted[0].get_spec_str("id"), Some("42"));
    assert_eq!(submitted[0].get_spec_str("target"), Some("x"));
}

#[tokio::test]
async fn test_matching_resource_is_unchanged_without_writes() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    handler.seed(
        "check-a",
        json!({
            "job": "check-a",
            "target": "x",
            "tenantId": "t1",
            "id": "42",
            "created": 1.0,
            "modified": 2.0,
        }),
    );

    let outcome = reconciler
        .reconcile(resource(KIND, "check-a", json!({"target": "x", "job": "check-a"})))
        .await;

    assert!(matches!(outcome, ReconcileOutcome::Unchanged));
    assert_eq!(handler.calls().writes(), 0);
}

#[tokio::test]
async fn test_second_pass_is_idempotent() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    let desired = resource(KIND, "check-a", json!({"job": "check-a", "target": "x"}));

    let first = reconciler.reconcile(desired.clone()).await;
    assert!(matches!(first, ReconcileOutcome::Created));
    let writes_after_first = handler.calls().writes();

    let second = reconciler.reconcile(desired.clone()).await;
    let third = reconciler.reconcile(desired).await;

    assert!(matches!(second, ReconcileOutcome::Unchanged));
    assert!(matches!(third, ReconcileOutcome::Unchanged));
    assert_eq!(handler.calls().writes(), writes_after_first);
}

#[tokio::test]
async fn test_updated_resource_converges() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    handler.seed(
        "check-a",
        json!({"job": "check-a", "target": "y", "tenantId": "t1", "id": "42"}),
    );
    let desired = resource(KIND, "check-a", json!({"job": "check-a", "target": "x"}));

    assert!(matches!(
        reconciler.reconcile(desired.clone()).await,
        ReconcileOutcome::Updated
    ));
    assert!(matches!(
        reconciler.reconcile(desired).await,
        ReconcileOutcome::Unchanged
    ));
    assert_eq!(handler.calls().update, 1);
}

#[tokio::test]
async fn test_unknown_kind_fails_fast() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));

    let report = reconciler
        .reconcile_report(resource("Dashboard", "d", json!({})))
        .await;

    match report.outcome {
        ReconcileOutcome::Failed(ReconcileError::UnknownKind { kind }) => {
            assert_eq!(kind, "Dashboard");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.reached, Phase::Start);
    assert_eq!(handler.calls(), CallCounts::default());
}

#[tokio::test]
async fn test_fetch_failure_skips_apply() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    handler.fail_fetch("check-a");

    let report = reconciler
        .reconcile_report(resource(KIND, "check-a", json!({"target": "x"})))
        .await;

    assert!(matches!(
        report.outcome,
        ReconcileOutcome::Failed(ReconcileError::RemoteFetch { .. })
    ));
    assert_eq!(report.reached, Phase::Start);
    assert_eq!(handler.calls().writes(), 0);
}

#[rstest]
#[case::add(None, Operation::Add)]
#[case::update(Some(json!({"target": "y", "tenantId": "t1", "id": "42"})), Operation::Update)]
#[tokio::test]
async fn test_apply_failure_surfaces_cause(
    #[case] remote: Option<serde_json::Value>,
    #[case] expected: Operation,
) {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    if let Some(spec) = remote {
        handler.seed("check-a", spec);
    }
    handler.fail_apply("check-a");

    let report = reconciler
        .reconcile_report(resource(KIND, "check-a", json!({"target": "x"})))
        .await;

    match report.outcome {
        ReconcileOutcome::Failed(ReconcileError::Apply {
            operation, source, ..
        }) => {
            assert_eq!(operation, expected);
            match source {
                HandlerError::Api { status, message } => {
                    assert_eq!(status, 500);
                    assert!(message.contains("injected failure"));
                }
                other => panic!("unexpected source: {other:?}"),
            }
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.reached, Phase::Prepared);
    assert_eq!(handler.calls().writes(), 1);
}

#[tokio::test]
async fn test_resource_with_uid_is_fetched_by_uid() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    handler.seed("check-a", json!({"target": "x", "tenantId": "t1", "id": "42"}));

    let desired = resource(KIND, "check-a", json!({"target": "x"})).with_uid("42");
    let outcome = reconciler.reconcile(desired).await;

    assert!(matches!(outcome, ReconcileOutcome::Unchanged));
    assert_eq!(handler.calls().get_by_uid, 1);
    assert_eq!(handler.calls().get_remote, 0);
}

#[tokio::test]
async fn test_fetch_timeout_is_remote_fetch_error() {
    let config = ReconcilerConfig {
        timeout: Some(Duration::from_millis(20)),
        ..Default::default()
    };
    let (handler, reconciler) = setup_with(
        MemoryHandler::new(KIND).with_delay(Duration::from_millis(500)),
        config,
    );

    let outcome = reconciler
        .reconcile(resource(KIND, "check-a", json!({"target": "x"})))
        .await;

    match outcome {
        ReconcileOutcome::Failed(ReconcileError::RemoteFetch { source, .. }) => {
            assert!(matches!(source, HandlerError::Timeout(_)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(handler.calls().writes(), 0);
}

#[rstest]
#[case::add(None, Operation::Add)]
#[case::update(Some(json!({"target": "y", "tenantId": "t1", "id": "42"})), Operation::Update)]
#[tokio::test]
async fn test_write_timeout_is_apply_error(
    #[case] remote: Option<serde_json::Value>,
    #[case] expected: Operation,
) {
    let config = ReconcilerConfig {
        timeout: Some(Duration::from_millis(20)),
        ..Default::default()
    };
    let (handler, reconciler) = setup_with(
        MemoryHandler::new(KIND).with_write_delay(Duration::from_millis(500)),
        config,
    );
    if let Some(spec) = remote {
        handler.seed("check-a", spec);
    }

    let report = reconciler
        .reconcile_report(resource(KIND, "check-a", json!({"target": "x"})))
        .await;

    match report.outcome {
        ReconcileOutcome::Failed(ReconcileError::Apply {
            operation, source, ..
        }) => {
            assert_eq!(operation, expected);
            assert!(matches!(source, HandlerError::Timeout(limit) if limit == Duration::from_millis(20)));
        }
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(report.reached, Phase::Prepared);
    assert_eq!(handler.calls().writes(), 1);
}

#[tokio::test]
async fn test_plan_never_applies() {
    let (handler, reconciler) = setup(MemoryHandler::new(KIND));
    handler.seed(
        "check-a",
        json!({"job": "check-a", "target": "y", "tenantId": "t1", "id": "42"}),
    );

    let plan = reconciler
        .plan(&resource(KIND, "check-a", json!({"job": "check-a", "target": "x"})))
        .await
        .unwrap();

    match &plan.diff {
        DiffResult::Drifted(deltas) => {
            assert_eq!(deltas.len(), 1);
            assert_eq!(deltas[0].path, "target");
        }
        other => panic!("unexpected diff: {other:?}"),
    }
    assert!(plan.remote.is_some());
    assert_ne!(plan.remote.as_ref(), Some(&plan.desired));

    let absent = reconciler
        .plan(&resource(KIND, "check-b", json!({"target": "x"})))
        .await
        .unwrap();
    assert_eq!(absent.diff, DiffResult::Absent);
    assert_eq!(absent.remote, None);

    assert_eq!(handler.calls().writes(), 0);
}

#[test]
fn test_duplicate_registration_rejected() {
    let mut builder = HandlerRegistry::builder();
    builder
        .register(KIND, Arc::new(MemoryHandler::new(KIND)))
        .unwrap();

    let err = builder
        .register(KIND, Arc::new(MemoryHandler::new(KIND)))
        .err();
    assert_eq!(err, Some(RegistryError::DuplicateKind(KIND.to_string())));

    let registry = builder.build();
    assert_eq!(registry.kinds().collect::<Vec<_>>(), vec![KIND]);
    assert!(registry.resolve(KIND).is_ok());
    assert!(registry.resolve("Other").is_err());
}

#[test]
fn test_parse_uses_handler() {
    let (_handler, reconciler) = setup(MemoryHandler::new(KIND));

    let parsed = reconciler
        .parse(resource(KIND, "check-a", json!({"target": "x"})))
        .unwrap();
    assert_eq!(parsed.len(), 1);

    assert!(matches!(
        reconciler.parse(resource("Other", "x", json!({}))),
        Err(ReconcileError::UnknownKind { .. })
    ));
}
