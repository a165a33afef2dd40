//! Integration tests for intercepted calls: matching, response construction
//! and error propagation through the public API.

use rift_fetch_mock::logging::init_tracing;
use rift_fetch_mock::{
    ConfigError, FetchError, FetchMock, FetchMockConfig, MockResponse, RequestInit, ResponseConfig,
    ResponseSpec, RouteConfig,
};
use serde_json::json;

async fn fetch(fm: &FetchMock, url: &str) -> MockResponse {
    fm.fetch_handler(url, None).await.unwrap()
}

#[tokio::test]
async fn test_url_pattern_kinds() {
    init_tracing();
    let mut fm = FetchMock::new();
    fm.route("begin:http://begin.com", "begin", None)
        .unwrap()
        .route("end:.json", "end", None)
        .unwrap()
        .route("glob:http://glob.com/*/x", "glob", None)
        .unwrap()
        .route("path:/exact/path", "path", None)
        .unwrap()
        .route("express:/users/:id", "express", None)
        .unwrap()
        .route(regex::Regex::new(r"^http://re\.com/\d+$").unwrap(), "regex", None)
        .unwrap()
        .route("http://exact.com", "exact", None)
        .unwrap();

    assert_eq!(fetch(&fm, "http://begin.com/anything").await.text(), "begin");
    assert_eq!(fetch(&fm, "http://a.com/data.json").await.text(), "end");
    assert_eq!(fetch(&fm, "http://glob.com/a/x").await.text(), "glob");
    assert_eq!(fetch(&fm, "http://b.com/exact/path").await.text(), "path");
    assert_eq!(fetch(&fm, "http://c.com/users/12").await.text(), "express");
    assert_eq!(fetch(&fm, "http://re.com/123").await.text(), "regex");
    assert_eq!(fetch(&fm, "http://EXACT.com/").await.text(), "exact");
}

#[tokio::test]
async fn test_headers_query_and_params() {
    let mut fm = FetchMock::new();
    fm.route_config(
        RouteConfig::new()
            .url("express:/orders/:id")
            .params([("id", "9")])
            .query([("page", "2")])
            .header("X-Api-Key", "secret")
            .response(200),
    )
    .unwrap()
    .catch(404);

    let init = || Some(RequestInit::new().header("x-api-key", "secret"));
    let ok = fm
        .fetch_handler("http://a.com/orders/9?page=2", init())
        .await
        .unwrap();
    assert_eq!(ok.status(), 200);

    let wrong_param = fm
        .fetch_handler("http://a.com/orders/8?page=2", init())
        .await
        .unwrap();
    assert_eq!(wrong_param.status(), 404);

    let missing_header = fm
        .fetch_handler("http://a.com/orders/9?page=2", None)
        .await
        .unwrap();
    assert_eq!(missing_header.status(), 404);
}

#[tokio::test]
async fn test_params_need_express_url() {
    let mut fm = FetchMock::new();
    let err = fm
        .route_config(
            RouteConfig::new()
                .url("http://a.com/orders/9")
                .params([("id", "9")])
                .response(200),
        )
        .err()
        .unwrap();
    assert_eq!(err, ConfigError::ParamsWithoutExpress);
}

#[tokio::test]
async fn test_response_construction() {
    let mut fm = FetchMock::new();
    fm.route(
        "http://a.com/json",
        json!({"status": 201, "body": {"ok": true}, "headers": {"x-trace": "abc"}}),
        None,
    )
    .unwrap()
    .route("http://a.com/plain", json!({"ok": true}), None)
    .unwrap()
    .route(
        "http://a.com/redirect",
        ResponseConfig::new().redirect_url("http://b.com/"),
        None,
    )
    .unwrap()
    .route(
        "http://a.com/raw",
        json!({"a": 1}),
        Some(RouteConfig::new().send_as_json(false)),
    )
    .unwrap();

    let response = fetch(&fm, "http://a.com/json").await;
    assert_eq!(response.status(), 201);
    assert_eq!(response.status_text(), "Created");
    assert_eq!(response.header("x-trace"), Some("abc"));
    assert_eq!(response.header("content-type"), Some("application/json"));
    assert_eq!(response.header("content-length"), Some("11"));

    let response = fetch(&fm, "http://a.com/plain").await;
    assert_eq!(response.status(), 200);
    assert_eq!(response.json::<serde_json::Value>().unwrap(), json!({"ok": true}));

    let response = fetch(&fm, "http://a.com/redirect").await;
    assert!(response.redirected());
    assert_eq!(response.url(), "http://b.com/");

    let response = fetch(&fm, "http://a.com/raw").await;
    assert!(response.header("content-type").is_none());
}

#[tokio::test]
async fn test_invalid_declared_status() {
    let mut fm = FetchMock::new();
    fm.route("*", json!({"status": 700}), None).unwrap();
    let err = fm.fetch_handler("http://a.com/", None).await.unwrap_err();
    assert!(matches!(
        err,
        FetchError::Configuration(ConfigError::InvalidStatus(_))
    ));
}

#[tokio::test]
async fn test_status_text_for_many_codes() {
    let mut fm = FetchMock::new();
    for (status, text) in [(204, "No Content"), (404, "Not Found"), (503, "Service Unavailable")] {
        let url = format!("http://a.com/{status}");
        fm.route(url.as_str(), ResponseConfig::new().status(status), None)
            .unwrap();
        let response = fetch(&fm, &url).await;
        assert_eq!(response.status(), status);
        assert_eq!(response.status_text(), text);
    }
}

#[tokio::test]
async fn test_content_length_setting() {
    let mut fm = FetchMock::with_config(FetchMockConfig {
        include_content_length: false,
        ..Default::default()
    });
    fm.route("*", "hello", None).unwrap();
    let response = fetch(&fm, "http://a.com/").await;
    assert!(response.header("content-length").is_none());
}

#[tokio::test]
async fn test_into_http_response() {
    let mut fm = FetchMock::new();
    fm.route("*", ResponseSpec::from("body"), None).unwrap();
    let response = fetch(&fm, "http://a.com/").await.into_http().unwrap();
    assert_eq!(response.status(), hyper::StatusCode::OK);
    assert_eq!(response.headers()["content-length"], "4");
}
