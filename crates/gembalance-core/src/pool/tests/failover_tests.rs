use super::{ok_response, pool_with_keys, upstream_error, ScriptedDispatcher};
use crate::dispatch::Dispatcher;
use crate::pool::{FailoverError, INVALID_KEY_MESSAGE};
use gembalance_types::DayBucket;

const MODEL: &str = "gemini-2.5-flash";

#[tokio::test]
async fn test_exactly_three_attempts_over_two_rate_limited_keys() {
    let (pool, keys) = pool_with_keys(2).await;
    let dispatcher = ScriptedDispatcher::always(upstream_error(429, "quota exceeded"));

    let result = pool
        .with_failover(MODEL, 3, |key| {
            let dispatcher = &dispatcher;
            async move { dispatcher.generate(&key, MODEL, &serde_json::json!({})).await }
        })
        .await;

    let Err(FailoverError::Exhausted { attempted, failures }) = result else {
        panic!("expected exhaustion");
    };
    assert_eq!(attempted, 3);
    assert_eq!(failures.len(), 3);
    assert_eq!(dispatcher.calls(), 3);
    assert!(failures.iter().all(|f| f.status == Some(429)));

    // Rate limits leave no trace: no markers, cursor untouched by peeking.
    for key in &keys {
        assert!(!pool.get_key(&key.id).await.unwrap().unwrap().is_errored());
    }
    assert_eq!(pool.store().cursor().await.unwrap(), 0);
}

#[tokio::test]
async fn test_success_on_second_attempt() {
    let (pool, _) = pool_with_keys(2).await;
    let dispatcher = ScriptedDispatcher::sequence(
        vec![upstream_error(503, "unavailable"), ok_response()],
        ok_response(),
    );

    let response = pool
        .with_failover(MODEL, 3, |key| {
            let dispatcher = &dispatcher;
            async move { dispatcher.generate(&key, MODEL, &serde_json::json!({})).await }
        })
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(dispatcher.calls(), 2);
}

#[tokio::test]
async fn test_invalid_key_drops_out_of_later_attempts() {
    let (pool, keys) = pool_with_keys(2).await;
    let dispatcher = ScriptedDispatcher::sequence(
        vec![upstream_error(403, "forbidden")],
        ok_response(),
    );

    pool.with_failover(MODEL, 3, |key| {
        let dispatcher = &dispatcher;
        async move { dispatcher.generate(&key, MODEL, &serde_json::json!({})).await }
    })
    .await
    .unwrap();

    // First attempt hit k1 and marked it; the retry peeked past it to k2.
    assert_eq!(dispatcher.keys_seen(), vec![keys[0].id.clone(), keys[1].id.clone()]);
    assert!(pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());
}

#[tokio::test]
async fn test_invalid_key_phrase_on_400_marks_mid_failover() {
    let (pool, keys) = pool_with_keys(1).await;
    let body = format!(r#"{{"error":{{"message":"{INVALID_KEY_MESSAGE}"}}}}"#);
    let dispatcher = ScriptedDispatcher::always(upstream_error(400, &body));

    let result = pool
        .with_failover(MODEL, 3, |key| {
            let dispatcher = &dispatcher;
            async move { dispatcher.generate(&key, MODEL, &serde_json::json!({})).await }
        })
        .await;

    // The only key was marked after attempt one, exhausting the pool.
    let Err(FailoverError::Exhausted { attempted, .. }) = result else {
        panic!("expected exhaustion");
    };
    assert_eq!(attempted, 1);
    assert!(pool.get_key(&keys[0].id).await.unwrap().unwrap().is_errored());
}

#[tokio::test]
async fn test_empty_pool_exhausts_without_dispatching() {
    let (pool, _) = pool_with_keys(0).await;
    let dispatcher = ScriptedDispatcher::always(ok_response());

    let result = pool
        .with_failover(MODEL, 3, |key| {
            let dispatcher = &dispatcher;
            async move { dispatcher.generate(&key, MODEL, &serde_json::json!({})).await }
        })
        .await;

    let Err(FailoverError::Exhausted { attempted, failures }) = result else {
        panic!("expected exhaustion");
    };
    assert_eq!(attempted, 0);
    assert!(failures.is_empty());
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn test_failover_records_no_usage() {
    let (pool, keys) = pool_with_keys(1).await;
    let dispatcher = ScriptedDispatcher::always(ok_response());

    pool.with_failover(MODEL, 3, |key| {
        let dispatcher = &dispatcher;
        async move { dispatcher.generate(&key, MODEL, &serde_json::json!({})).await }
    })
    .await
    .unwrap();

    let snapshot = pool.store().usage_snapshot(&keys[0].id, &DayBucket::today()).await.unwrap();
    assert!(snapshot.models.is_empty());
    assert!(snapshot.categories.is_empty());
}

#[tokio::test]
async fn test_list_models_through_failover() {
    let (pool, _) = pool_with_keys(2).await;
    let dispatcher =
        ScriptedDispatcher::sequence(vec![upstream_error(429, "")], ok_response());

    let models = pool.list_models(&dispatcher, MODEL, 3).await.unwrap();
    assert_eq!(models, vec!["gemini-2.5-pro".to_string(), "gemini-2.5-flash".to_string()]);
}
