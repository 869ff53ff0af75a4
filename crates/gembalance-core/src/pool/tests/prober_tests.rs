use super::{ok_response, pool_with_keys, upstream_error, ScriptedDispatcher};
use crate::pool::{FailureKind, ProbeOutcome, INVALID_KEY_MESSAGE};
use gembalance_types::{DayBucket, ErrorMarker, KeyError, ModelCategory};

fn default_targets() -> Vec<(ModelCategory, String)> {
    vec![
        (ModelCategory::Pro, "gemini-2.5-pro".to_string()),
        (ModelCategory::Flash, "gemini-2.5-flash".to_string()),
    ]
}

#[tokio::test]
async fn test_probe_success_records_usage_and_recovers_key() {
    let (pool, keys) = pool_with_keys(1).await;
    pool.store()
        .set_error(&keys[0].id, ErrorMarker { status_code: 403, occurred_at: 100 })
        .await
        .unwrap();
    let dispatcher = ScriptedDispatcher::always(ok_response());

    let report = pool.probe_key(&dispatcher, &keys[0], &default_targets()).await.unwrap();
    assert!(report.all_ok());
    assert_eq!(report.results.len(), 2);

    // Recovery: the marker is gone and the probes were accounted.
    assert!(!pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());
    let snapshot = pool.store().usage_snapshot(&keys[0].id, &DayBucket::today()).await.unwrap();
    assert_eq!(snapshot.models.get("gemini-2.5-pro"), Some(&1));
    assert_eq!(snapshot.models.get("gemini-2.5-flash"), Some(&1));
    assert_eq!(snapshot.categories.get("pro"), Some(&1));
    assert_eq!(snapshot.categories.get("flash"), Some(&1));
}

#[tokio::test]
async fn test_probe_invalid_key_marks() {
    let (pool, keys) = pool_with_keys(1).await;
    let dispatcher = ScriptedDispatcher::always(upstream_error(401, ""));

    let report = pool.probe_key(&dispatcher, &keys[0], &default_targets()).await.unwrap();
    assert!(!report.all_ok());
    for result in &report.results {
        assert!(matches!(
            result.outcome,
            ProbeOutcome::Failed { status: Some(401), kind: FailureKind::InvalidKey }
        ));
    }
    assert!(pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());
}

#[tokio::test]
async fn test_probe_transient_failure_leaves_key_clear() {
    let (pool, keys) = pool_with_keys(1).await;
    let dispatcher = ScriptedDispatcher::always(upstream_error(429, "quota exceeded"));

    let report = pool.probe_key(&dispatcher, &keys[0], &default_targets()).await.unwrap();
    assert!(!report.all_ok());
    assert!(!pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());
    // Failed probes consume no quota.
    let snapshot = pool.store().usage_snapshot(&keys[0].id, &DayBucket::today()).await.unwrap();
    assert!(snapshot.models.is_empty());
}

#[tokio::test]
async fn test_probe_all_covers_every_key() {
    let (pool, _) = pool_with_keys(3).await;
    let dispatcher = ScriptedDispatcher::always(ok_response());

    let reports = pool.probe_all(&dispatcher, &default_targets()).await.unwrap();
    assert_eq!(reports.len(), 3);
    assert_eq!(dispatcher.calls(), 6);
}

#[tokio::test]
async fn test_verify_unknown_key_is_not_found() {
    let (pool, _) = pool_with_keys(1).await;
    let dispatcher = ScriptedDispatcher::always(ok_response());

    let err = pool.verify_key(&dispatcher, "no-such-id", "gemini-2.5-pro").await.unwrap_err();
    assert!(matches!(err, KeyError::NotFound { .. }));
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn test_verify_reports_classification_on_failure() {
    let (pool, keys) = pool_with_keys(1).await;
    let body = format!(r#"{{"error":{{"message":"{INVALID_KEY_MESSAGE}"}}}}"#);
    let dispatcher = ScriptedDispatcher::always(upstream_error(400, &body));

    let report = pool.verify_key(&dispatcher, &keys[0].id, "gemini-2.5-pro").await.unwrap();
    assert!(!report.success);
    assert_eq!(report.status, Some(400));
    assert_eq!(report.classification, Some(FailureKind::InvalidKey));
    assert!(pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());
}

#[tokio::test]
async fn test_verify_success_clears_and_accounts() {
    let (pool, keys) = pool_with_keys(1).await;
    pool.record_failure(&keys[0].id, Some(403), "").await.unwrap();
    let dispatcher = ScriptedDispatcher::always(ok_response());

    let report = pool.verify_key(&dispatcher, &keys[0].id, "gemini-2.5-flash").await.unwrap();
    assert!(report.success);
    assert_eq!(report.status, Some(200));
    assert!(report.classification.is_none());
    assert!(!pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());

    let snapshot = pool.store().usage_snapshot(&keys[0].id, &DayBucket::today()).await.unwrap();
    assert_eq!(snapshot.models.get("gemini-2.5-flash"), Some(&1));
}
