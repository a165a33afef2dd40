//! Tests for the fetch mock.
//!
//! Covers:
//! - Route selection order, repeat limits and fallback handling
//! - Deferred request bodies and body-reading matchers
//! - Delays, aborts and flush
//! - Derived instances and the shared matcher registry
//! - Warnings logged for fallback use and unsatisfied expectations

use super::*;
use crate::config::UnmatchedPolicy;
use crate::predicate::predicate;
use crate::request::{AbortSignal, RequestBody};
use bytes::Bytes;
use http_body_util::Full;
use serde_json::json;
use std::time::Duration;
use tracing_test::traced_test;

fn post_json(body: serde_json::Value) -> Option<RequestInit> {
    Some(RequestInit::new().method("POST").body(body))
}

#[tokio::test]
async fn test_matched_route_responds() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, None).unwrap();

    let response = fm.fetch_handler("http://a.com", None).await.unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.status_text(), "OK");
    assert_eq!(response.url(), "http://a.com/");
}

#[tokio::test]
async fn test_unmatched_call_fails_and_is_recorded() {
    let fm = FetchMock::new();
    let err = fm.fetch_handler("http://a.com/", None).await.unwrap_err();
    assert!(matches!(err, FetchError::NoMatch { .. }));
    assert_eq!(fm.calls(CallFilter::Unmatched).unwrap().len(), 1);
}

#[tokio::test]
async fn test_first_declared_route_wins() {
    let mut fm = FetchMock::new();
    fm.route("begin:http://a.com", "first", None)
        .unwrap()
        .route("*", "second", None)
        .unwrap();

    let response = fm.fetch_handler("http://a.com/x", None).await.unwrap();
    assert_eq!(response.text(), "first");
    let response = fm.fetch_handler("http://b.com/x", None).await.unwrap();
    assert_eq!(response.text(), "second");
}

#[tokio::test]
async fn test_repeat_then_fallback() {
    let mut fm = FetchMock::new();
    fm.route(
        "http://a.com/",
        200,
        Some(RouteConfig::new().name("limited").repeat(2)),
    )
    .unwrap()
    .catch(404);

    for _ in 0..2 {
        let response = fm.fetch_handler("http://a.com/", None).await.unwrap();
        assert_eq!(response.status(), 200);
    }
    let response = fm.fetch_handler("http://a.com/", None).await.unwrap();
    assert_eq!(response.status(), 404);

    assert_eq!(fm.calls("limited").unwrap().len(), 2);
    assert_eq!(fm.calls(CallFilter::Unmatched).unwrap().len(), 1);
    assert!(fm.done(None));
}

#[tokio::test]
async fn test_repeat_slots_follow_call_order() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().repeat(1)))
        .unwrap()
        .catch(404);

    let first = fm.fetch_handler("http://a.com/", None);
    let second = fm.fetch_handler("http://a.com/", None);

    assert_eq!(second.await.unwrap().status(), 404);
    assert_eq!(first.await.unwrap().status(), 200);
}

#[tokio::test]
async fn test_done_counts_calls_not_yet_awaited() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().name("a")))
        .unwrap();

    let pending = fm.fetch_handler("http://a.com/", None);
    assert!(fm.done(None));
    assert!(fm.called("a").unwrap());

    assert_eq!(pending.await.unwrap().status(), 200);
}

#[tokio::test]
async fn test_pre_aborted_call_takes_no_repeat_slot() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().repeat(1)))
        .unwrap();

    let signal = AbortSignal::new();
    signal.abort();
    let aborted = fm.fetch_handler("http://a.com/", Some(RequestInit::new().signal(signal)));
    assert!(aborted.await.unwrap_err().is_abort());

    let response = fm.fetch_handler("http://a.com/", None).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_done_tracks_expectations() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().repeat(2)))
        .unwrap();
    assert!(!fm.done(None));

    fm.fetch_handler("http://a.com/", None).await.unwrap();
    assert!(!fm.done(None));
    fm.fetch_handler("http://a.com/", None).await.unwrap();
    assert!(fm.done(None));
}

#[tokio::test]
async fn test_clear_history_resets_counters() {
    let mut fm = FetchMock::new();
    fm.route("*", 200, Some(RouteConfig::new().repeat(1)))
        .unwrap()
        .catch(404);

    assert_eq!(fm.fetch_handler("http://a.com/", None).await.unwrap().status(), 200);
    assert_eq!(fm.fetch_handler("http://a.com/", None).await.unwrap().status(), 404);

    fm.clear_history();
    assert!(fm.history().is_empty());
    assert_eq!(fm.fetch_handler("http://a.com/", None).await.unwrap().status(), 200);
}

#[tokio::test]
async fn test_body_matching_exact_and_partial() {
    let mut fm = FetchMock::new();
    fm.route(
        RouteConfig::new().body(json!({"a": 1})),
        200,
        None,
    )
    .unwrap()
    .catch(404);

    let exact = fm.fetch_handler("http://a.com/", post_json(json!({"a": 1})));
    assert_eq!(exact.await.unwrap().status(), 200);
    let extra = fm.fetch_handler("http://a.com/", post_json(json!({"a": 1, "b": 2})));
    assert_eq!(extra.await.unwrap().status(), 404);

    fm.config_mut().match_partial_body = true;
    fm.route(
        RouteConfig::new().name("partial").body(json!({"b": 2})),
        201,
        None,
    )
    .unwrap();
    let partial = fm.fetch_handler("http://a.com/", post_json(json!({"a": 2, "b": 2})));
    assert_eq!(partial.await.unwrap().status(), 201);
}

#[tokio::test]
async fn test_route_overrides_partial_body_default() {
    let mut fm = FetchMock::with_config(FetchMockConfig {
        match_partial_body: true,
        ..Default::default()
    });
    fm.route(
        RouteConfig::new()
            .body(json!({"a": 1}))
            .match_partial_body(false),
        200,
        None,
    )
    .unwrap()
    .catch(404);

    let response = fm
        .fetch_handler("http://a.com/", post_json(json!({"a": 1, "b": 2})))
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_request_object_body_is_resolved_for_body_matchers() {
    let mut fm = FetchMock::new();
    fm.route(RouteConfig::new().body(json!({"id": 7})), 200, None)
        .unwrap();

    let request = hyper::Request::builder()
        .method("POST")
        .uri("http://a.com/items")
        .body(Full::new(Bytes::from_static(br#"{"id":7}"#)))
        .unwrap();
    let response = fm.fetch_handler(request, None).await.unwrap();
    assert_eq!(response.status(), 200);

    let call = fm.last_call(CallFilter::All).unwrap().unwrap();
    assert_eq!(call.body_json(), Some(json!({"id": 7})));
    assert_eq!(call.request().map(|r| r.method.clone()), Some(hyper::Method::POST));
}

#[tokio::test]
async fn test_deferred_body_left_alone_without_body_matchers() {
    let mut fm = FetchMock::new();
    fm.route("*", 200, None).unwrap();

    let init = RequestInit::new()
        .method("POST")
        .body(RequestBody::deferred(async { Bytes::from_static(b"later") }));
    fm.fetch_handler("http://a.com/", Some(init)).await.unwrap();

    let call = fm.last_call(CallFilter::All).unwrap().unwrap();
    assert!(call.options().has_deferred_body());
}

#[tokio::test]
async fn test_custom_matcher_sees_resolved_body() {
    let mut fm = FetchMock::new();
    fm.add_matcher(
        MatcherDefinition::new("bodyContains", |config| {
            let needle = config
                .custom
                .get("bodyContains")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            Ok(predicate(move |_, options, _| {
                options.body_text().is_some_and(|body| body.contains(&needle))
            }))
        })
        .uses_body(true),
    );
    fm.route(
        RouteConfig::new().custom("bodyContains", json!("needle")),
        200,
        None,
    )
    .unwrap()
    .catch(404);

    let init = RequestInit::new()
        .method("POST")
        .body(RequestBody::deferred(async {
            Bytes::from_static(b"haystack with a needle")
        }));
    let response = fm.fetch_handler("http://a.com/", Some(init)).await.unwrap();
    assert_eq!(response.status(), 200);
}

#[tokio::test]
async fn test_custom_matcher_build_error_rejects_route() {
    let mut fm = FetchMock::new();
    fm.add_matcher(MatcherDefinition::new("strict", |config| {
        match config.custom.get("strict").and_then(|v| v.as_bool()) {
            Some(flag) => Ok(predicate(move |_, _, _| flag)),
            None => Err(ConfigError::Matcher {
                name: "strict".to_string(),
                reason: "expected a boolean".to_string(),
            }),
        }
    }));
    let err = fm
        .route(RouteConfig::new().custom("strict", json!("yes")), 200, None)
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::Matcher { .. }));
    assert!(fm.routes().is_empty());
}

#[tokio::test]
async fn test_function_criteria() {
    let mut fm = FetchMock::new();
    fm.route(
        RouteCriteria::function(|url, options, _| url.ends_with("/fn") && options.method == "put"),
        204,
        None,
    )
    .unwrap();

    let response = fm
        .fetch_handler("http://a.com/fn", Some(RequestInit::new().method("PUT")))
        .await
        .unwrap();
    assert_eq!(response.status(), 204);
}

#[tokio::test]
async fn test_resolver_receives_request() {
    let mut fm = FetchMock::new();
    fm.route(
        "begin:http://a.com",
        ResponseSpec::from_fn(|url, options, _| {
            json!({"body": {"url": url, "method": options.method}})
        }),
        None,
    )
    .unwrap();

    let response = fm.fetch_handler("http://a.com/x", None).await.unwrap();
    let body: serde_json::Value = response.json().unwrap();
    assert_json_diff::assert_json_eq!(body, json!({"url": "http://a.com/x", "method": "get"}));
    assert_eq!(response.header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_async_resolver_error() {
    let mut fm = FetchMock::new();
    fm.route(
        "*",
        ResponseSpec::from_async_fn(|_, _, _| async {
            Err::<ResponseSpec, _>(anyhow::anyhow!("backend unavailable"))
        }),
        None,
    )
    .unwrap();

    let err = fm.fetch_handler("http://a.com/", None).await.unwrap_err();
    assert!(matches!(err, FetchError::Resolver(_)));
    let call = fm.last_call(CallFilter::All).unwrap().unwrap();
    assert!(call.is_matched());
    assert!(call.response().is_none());
}

#[tokio::test]
async fn test_throws_rejects_call() {
    let mut fm = FetchMock::new();
    fm.route("*", ResponseConfig::new().throws("connection reset"), None)
        .unwrap();
    let err = fm.fetch_handler("http://a.com/", None).await.unwrap_err();
    assert_eq!(err.to_string(), "connection reset");
}

#[tokio::test]
async fn test_per_call_invalid_status() {
    let mut fm = FetchMock::new();
    fm.route("*", ResponseSpec::from_fn(|_, _, _| 99), None)
        .unwrap();
    let err = fm.fetch_handler("http://a.com/", None).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Configuration(ConfigError::InvalidStatus(_))
    ));
}

#[tokio::test]
async fn test_deferred_response() {
    let mut fm = FetchMock::new();
    let (tx, rx) = tokio::sync::oneshot::channel::<u16>();
    fm.route(
        "*",
        ResponseSpec::deferred(async move { rx.await.unwrap_or(500) }),
        None,
    )
    .unwrap();

    let pending = tokio::spawn(fm.fetch_handler("http://a.com/", None));
    tx.send(418).unwrap();
    assert_eq!(pending.await.unwrap().unwrap().status(), 418);
}

#[tokio::test(start_paused = true)]
async fn test_calls_recorded_in_call_order_despite_delays() {
    let mut fm = FetchMock::new();
    fm.route(
        "http://a.com/slow",
        "slow",
        Some(RouteConfig::new().name("slow").delay(Duration::from_millis(50))),
    )
    .unwrap()
    .route("http://a.com/fast", "fast", None)
    .unwrap();

    let start = tokio::time::Instant::now();
    let slow = fm.fetch_handler("http://a.com/slow", None);
    let fast = fm.fetch_handler("http://a.com/fast", None);

    assert_eq!(fast.await.unwrap().text(), "fast");
    assert!(fm.history().all()[0].response().is_none());

    assert_eq!(slow.await.unwrap().text(), "slow");
    assert!(start.elapsed() >= Duration::from_millis(50));

    let urls: Vec<_> = fm
        .calls(CallFilter::All)
        .unwrap()
        .iter()
        .map(|c| c.url().to_string())
        .collect();
    assert_eq!(urls, vec!["http://a.com/slow", "http://a.com/fast"]);
}

#[tokio::test(start_paused = true)]
async fn test_flush_waits_for_delayed_responses() {
    let mut fm = FetchMock::new();
    fm.route("*", 200, Some(RouteConfig::new().delay(Duration::from_millis(20))))
        .unwrap();

    let _first = fm.fetch_handler("http://a.com/1", None);
    let _second = fm.fetch_handler("http://a.com/2", None);
    fm.flush(true).await;

    for call in &fm.calls(CallFilter::All).unwrap() {
        assert_eq!(call.response().map(|r| r.status()), Some(200));
        assert!(call.response_body_read());
    }
}

#[tokio::test]
async fn test_pre_aborted_signal() {
    let mut fm = FetchMock::new();
    fm.route("*", 200, None).unwrap();

    let signal = AbortSignal::new();
    signal.abort();
    let err = fm
        .fetch_handler("http://a.com/", Some(RequestInit::new().signal(signal)))
        .await
        .unwrap_err();
    assert!(err.is_abort());
    assert_eq!(fm.history().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_abort_cancels_delay_and_does_not_block_flush() {
    let mut fm = FetchMock::new();
    fm.route("*", 200, Some(RouteConfig::new().delay(Duration::from_secs(10))))
        .unwrap();

    let signal = AbortSignal::new();
    let start = tokio::time::Instant::now();
    let call = tokio::spawn(fm.fetch_handler(
        "http://a.com/",
        Some(RequestInit::new().signal(signal.clone())),
    ));
    tokio::task::yield_now().await;
    signal.abort();

    let err = call.await.unwrap().unwrap_err();
    assert!(err.is_abort());

    fm.flush(false).await;
    assert!(start.elapsed() < Duration::from_secs(10));
    let logged = fm.last_call(CallFilter::All).unwrap().unwrap();
    assert!(logged.response().is_none());
}

#[tokio::test]
async fn test_create_instance_isolation() {
    let mut parent = FetchMock::new();
    parent.route("http://a.com/", 200, None).unwrap();

    let mut child = parent.create_instance();
    assert!(child.registry().ptr_eq(parent.registry()));
    assert_eq!(child.routes().len(), 1);

    parent.route("http://b.com/", 200, None).unwrap();
    assert_eq!(child.routes().len(), 1);

    child.fetch_handler("http://a.com/", None).await.unwrap();
    assert_eq!(child.history().len(), 1);
    assert!(parent.history().is_empty());

    child.route("http://c.com/", 200, None).unwrap();
    assert_eq!(parent.routes().len(), 2);
}

#[tokio::test]
async fn test_matchers_added_later_are_shared() {
    let parent = FetchMock::new();
    let mut child = parent.create_instance();
    parent.add_matcher(MatcherDefinition::new("always", |_| {
        Ok(predicate(|_, _, _| true))
    }));
    child
        .route(RouteConfig::new().custom("always", json!(true)), 200, None)
        .unwrap();
    assert_eq!(
        child.fetch_handler("http://x.com/", None).await.unwrap().status(),
        200
    );
}

#[tokio::test]
async fn test_remove_routes_keeps_sticky_by_default() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().sticky(true)))
        .unwrap()
        .route("http://b.com/", 200, None)
        .unwrap()
        .catch(404);

    fm.remove_routes(RemoveRouteOptions::default());
    assert_eq!(fm.routes().len(), 1);
    assert_eq!(fm.fetch_handler("http://a.com/", None).await.unwrap().status(), 200);
    assert_eq!(fm.fetch_handler("http://b.com/", None).await.unwrap().status(), 404);
}

#[tokio::test]
async fn test_warn_policy_synthesizes_network_error() {
    let fm = FetchMock::with_config(FetchMockConfig {
        on_unmatched: UnmatchedPolicy::Warn,
        ..Default::default()
    });
    let response = fm.fetch_handler("http://a.com/", None).await.unwrap();
    assert_eq!(response.kind(), crate::response::ResponseKind::Error);
    assert_eq!(response.status(), 0);
}

#[tokio::test]
#[traced_test]
async fn test_fallback_use_is_logged() {
    let mut fm = FetchMock::new();
    fm.catch(404);
    fm.fetch_handler("http://unknown.com/", None).await.unwrap();
    assert!(logs_contain("Unmatched get to http://unknown.com/"));
}

#[tokio::test]
#[traced_test]
async fn test_fallback_warning_can_be_disabled() {
    let mut fm = FetchMock::with_config(FetchMockConfig {
        warn_on_fallback: false,
        ..Default::default()
    });
    fm.catch(404);
    fm.fetch_handler("http://quiet.com/", None).await.unwrap();
    assert!(!logs_contain("Unmatched get to http://quiet.com/"));
}

#[test]
#[traced_test]
fn test_unsatisfied_routes_are_logged() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().name("never-called")))
        .unwrap();
    assert!(!fm.done(None));
    assert!(logs_contain("Route never-called was not called"));
}

#[test]
fn test_missing_criteria_is_rejected() {
    let mut fm = FetchMock::new();
    let err = fm.route(RouteConfig::new(), 200, None).err().unwrap();
    assert_eq!(err, ConfigError::MissingCriteria);
}

#[test]
fn test_route_collision_without_overwrite() {
    let mut fm = FetchMock::new();
    fm.route("http://a.com/", 200, Some(RouteConfig::new().name("a")))
        .unwrap();
    let err = fm
        .route("http://b.com/", 200, Some(RouteConfig::new().name("a")))
        .err()
        .unwrap();
    assert!(matches!(err, ConfigError::RouteCollision(_)));

    fm.route(
        "http://b.com/",
        201,
        Some(RouteConfig::new().name("a").overwrite_routes(true)),
    )
    .unwrap();
    assert_eq!(fm.routes().len(), 1);
    assert_eq!(fm.routes()[0].config().url.as_ref().map(|u| u.as_str()), Some("http://b.com/"));
}
