//! Response specification types.

use super::builder::MockResponse;
use crate::request::RequestOptions;
use bytes::Bytes;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use hyper::http::request::Parts;
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Keys that mark a JSON object as a response config rather than a body.
const CONFIG_KEYS: [&str; 5] = ["body", "status", "headers", "throws", "redirectUrl"];

/// Resolver invoked per call with `(url, options, request object)`.
pub type ResolverFn = Arc<
    dyn Fn(&str, &RequestOptions, Option<&Parts>) -> BoxFuture<'static, anyhow::Result<ResponseSpec>>
        + Send
        + Sync,
>;

fn resolver<F>(f: F) -> ResolverFn
where
    F: Fn(&str, &RequestOptions, Option<&Parts>) -> BoxFuture<'static, anyhow::Result<ResponseSpec>>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// Everything a route may declare as its response.
#[derive(Clone)]
pub enum ResponseSpec {
    /// Status, headers and body to build a response from
    Config(ResponseConfig),
    /// A prebuilt response, returned as is
    Response(MockResponse),
    /// A value that becomes available later; resolved once and reused
    Deferred(Shared<BoxFuture<'static, ResponseSpec>>),
    /// Called for every matching call
    Resolver(ResolverFn),
}

impl ResponseSpec {
    /// A response that becomes available when `future` completes.
    pub fn deferred<F, R>(future: F) -> Self
    where
        F: Future<Output = R> + Send + 'static,
        R: Into<ResponseSpec> + 'static,
    {
        ResponseSpec::Deferred(future.map(Into::into).boxed().shared())
    }

    /// A synchronous per-call resolver.
    pub fn from_fn<F, R>(f: F) -> Self
    where
        F: Fn(&str, &RequestOptions, Option<&Parts>) -> R + Send + Sync + 'static,
        R: Into<ResponseSpec>,
    {
        ResponseSpec::Resolver(resolver(move |url, options, request| {
            let spec = f(url, options, request).into();
            futures::future::ready(Ok(spec)).boxed()
        }))
    }

    /// An asynchronous, fallible per-call resolver. The returned future must
    /// own whatever it needs from the arguments.
    pub fn from_async_fn<F, Fut, R>(f: F) -> Self
    where
        F: Fn(&str, &RequestOptions, Option<&Parts>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<R>> + Send + 'static,
        R: Into<ResponseSpec>,
    {
        ResponseSpec::Resolver(resolver(move |url, options, request| {
            f(url, options, request)
                .map(|result| result.map(Into::into))
                .boxed()
        }))
    }

    /// Interpret a JSON value the way literal responses are read: numbers are
    /// statuses, strings are text bodies, objects carrying any response-config
    /// key are configs and everything else is a JSON body.
    pub fn from_value(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => ResponseSpec::Config(ResponseConfig::default()),
            Value::Number(status) => ResponseSpec::Config(ResponseConfig {
                status: Some(status),
                ..Default::default()
            }),
            Value::String(text) => ResponseSpec::Config(ResponseConfig::new().body(text)),
            Value::Object(ref map) if CONFIG_KEYS.iter().any(|key| map.contains_key(*key)) => {
                match serde_json::from_value::<ResponseConfig>(value.clone()) {
                    Ok(config) => ResponseSpec::Config(config),
                    Err(_) => ResponseSpec::Config(ResponseConfig::new().body(value)),
                }
            }
            other => ResponseSpec::Config(ResponseConfig::new().body(other)),
        }
    }
}

impl fmt::Debug for ResponseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseSpec::Config(config) => f.debug_tuple("Config").field(config).finish(),
            ResponseSpec::Response(response) => f.debug_tuple("Response").field(response).finish(),
            ResponseSpec::Deferred(_) => f.write_str("Deferred(..)"),
            ResponseSpec::Resolver(_) => f.write_str("Resolver(..)"),
        }
    }
}

impl From<u16> for ResponseSpec {
    fn from(status: u16) -> Self {
        ResponseSpec::Config(ResponseConfig::new().status(status))
    }
}

/// Integer literals default to `i32`; out-of-range values are rejected when
/// the response is constructed.
impl From<i32> for ResponseSpec {
    fn from(status: i32) -> Self {
        ResponseSpec::Config(ResponseConfig {
            status: Some(status.into()),
            ..Default::default()
        })
    }
}

impl From<&str> for ResponseSpec {
    fn from(body: &str) -> Self {
        ResponseSpec::Config(ResponseConfig::new().body(body))
    }
}

impl From<String> for ResponseSpec {
    fn from(body: String) -> Self {
        ResponseSpec::Config(ResponseConfig::new().body(body))
    }
}

impl From<serde_json::Value> for ResponseSpec {
    fn from(value: serde_json::Value) -> Self {
        ResponseSpec::from_value(value)
    }
}

impl From<ResponseConfig> for ResponseSpec {
    fn from(config: ResponseConfig) -> Self {
        ResponseSpec::Config(config)
    }
}

impl From<MockResponse> for ResponseSpec {
    fn from(response: MockResponse) -> Self {
        ResponseSpec::Response(response)
    }
}

/// Response body as declared.
#[derive(Debug, Clone, PartialEq)]
pub enum BodySpec {
    Text(String),
    Json(serde_json::Value),
    Bytes(Bytes),
}

impl From<&str> for BodySpec {
    fn from(text: &str) -> Self {
        BodySpec::Text(text.to_string())
    }
}

impl From<String> for BodySpec {
    fn from(text: String) -> Self {
        BodySpec::Text(text)
    }
}

impl From<Bytes> for BodySpec {
    fn from(bytes: Bytes) -> Self {
        BodySpec::Bytes(bytes)
    }
}

impl From<serde_json::Value> for BodySpec {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::String(text) => BodySpec::Text(text),
            other => BodySpec::Json(other),
        }
    }
}

impl<'de> Deserialize<'de> for BodySpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(BodySpec::from)
    }
}

/// Declared status, headers and body of a response.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseConfig {
    #[serde(default)]
    pub body: Option<BodySpec>,
    /// Kept as a JSON number so non-integer statuses can be rejected at
    /// construction time
    #[serde(default)]
    pub status: Option<serde_json::Number>,
    #[serde(default, deserialize_with = "crate::config::string_map")]
    pub headers: BTreeMap<String, String>,
    /// Fail the call with this message instead of responding
    #[serde(default)]
    pub throws: Option<String>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl ResponseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn body(mut self, body: impl Into<BodySpec>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn throws(mut self, message: impl Into<String>) -> Self {
        self.throws = Some(message.into());
        self
    }

    pub fn redirect_url(mut self, url: impl Into<String>) -> Self {
        self.redirect_url = Some(url.into());
        self
    }
}
