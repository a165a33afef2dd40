//! Request normalization.
//!
//! Turns the `(input, init)` pair handed to the fetch handler into the
//! `(url, options, request object)` triple that matchers and response
//! resolvers see.

use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use http_body_util::{BodyExt, Full};
use hyper::http::request::Parts;
use hyper::Uri;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// The first argument of a fetch call: a URL or a full request object.
pub enum RequestInput {
    Url(String),
    Request(hyper::Request<Full<Bytes>>),
}

impl From<&str> for RequestInput {
    fn from(url: &str) -> Self {
        RequestInput::Url(url.to_string())
    }
}

impl From<String> for RequestInput {
    fn from(url: String) -> Self {
        RequestInput::Url(url)
    }
}

impl From<&String> for RequestInput {
    fn from(url: &String) -> Self {
        RequestInput::Url(url.clone())
    }
}

impl From<hyper::Request<Full<Bytes>>> for RequestInput {
    fn from(request: hyper::Request<Full<Bytes>>) -> Self {
        RequestInput::Request(request)
    }
}

/// Request body as seen by matchers.
pub enum RequestBody {
    /// Body available synchronously.
    Ready(Bytes),
    /// Body that must be awaited before body-dependent matchers can run.
    Deferred(BoxFuture<'static, Bytes>),
}

impl RequestBody {
    /// A body produced asynchronously, e.g. by a streaming serializer.
    pub fn deferred<F>(future: F) -> Self
    where
        F: std::future::Future<Output = Bytes> + Send + 'static,
    {
        RequestBody::Deferred(future.boxed())
    }

    pub fn is_deferred(&self) -> bool {
        matches!(self, RequestBody::Deferred(_))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Ready(bytes) => f.debug_tuple("Ready").field(bytes).finish(),
            RequestBody::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

impl From<&str> for RequestBody {
    fn from(body: &str) -> Self {
        RequestBody::Ready(Bytes::copy_from_slice(body.as_bytes()))
    }
}

impl From<String> for RequestBody {
    fn from(body: String) -> Self {
        RequestBody::Ready(Bytes::from(body))
    }
}

impl From<Bytes> for RequestBody {
    fn from(body: Bytes) -> Self {
        RequestBody::Ready(body)
    }
}

impl From<serde_json::Value> for RequestBody {
    fn from(body: serde_json::Value) -> Self {
        RequestBody::Ready(Bytes::from(body.to_string()))
    }
}

/// Abort signal attached to a call. Cloning shares the signal.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: CancellationToken,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the signal; every call holding a clone rejects with an abort error.
    pub fn abort(&self) {
        self.token.cancel();
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal fires.
    pub async fn aborted(&self) {
        self.token.cancelled().await;
    }
}

/// The second argument of a fetch call.
#[derive(Debug, Default)]
pub struct RequestInit {
    pub method: Option<String>,
    pub headers: Vec<(String, String)>,
    pub body: Option<RequestBody>,
    pub signal: Option<AbortSignal>,
}

impl RequestInit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: impl Into<RequestBody>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn signal(mut self, signal: AbortSignal) -> Self {
        self.signal = Some(signal);
        self
    }
}

/// Normalized request options: lower-cased method and header names.
#[derive(Debug)]
pub struct RequestOptions {
    pub method: String,
    pub headers: HashMap<String, String>,
    pub body: Option<RequestBody>,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            method: "get".to_string(),
            headers: HashMap::new(),
            body: None,
        }
    }
}

impl RequestOptions {
    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Body text, if the body has been resolved. Deferred bodies yield `None`.
    pub fn body_text(&self) -> Option<Cow<'_, str>> {
        match self.body.as_ref()? {
            RequestBody::Ready(bytes) => Some(String::from_utf8_lossy(bytes)),
            RequestBody::Deferred(_) => None,
        }
    }

    pub fn has_deferred_body(&self) -> bool {
        self.body.as_ref().is_some_and(RequestBody::is_deferred)
    }

    /// Take the deferred body future out, leaving the options without a body.
    pub(crate) fn take_deferred_body(&mut self) -> Option<BoxFuture<'static, Bytes>> {
        match self.body.take() {
            Some(RequestBody::Deferred(future)) => Some(future),
            other => {
                self.body = other;
                None
            }
        }
    }
}

/// Output of [`normalize_request`].
pub(crate) struct NormalizedRequest {
    pub url: String,
    pub options: RequestOptions,
    pub request: Option<Arc<Parts>>,
    pub signal: Option<AbortSignal>,
}

/// Normalize the arguments of a fetch call.
///
/// A request object contributes its method, headers and URL; its body is
/// read asynchronously, so it becomes a deferred body. Values in `init` take
/// precedence over those of the request object.
pub(crate) fn normalize_request(input: RequestInput, init: RequestInit) -> NormalizedRequest {
    let RequestInit {
        method,
        headers: init_headers,
        body,
        signal,
    } = init;

    let (url, mut options, request) = match input {
        RequestInput::Url(url) => (normalize_url(&url), RequestOptions::default(), None),
        RequestInput::Request(request) => {
            let (parts, request_body) = request.into_parts();
            let headers = parts
                .headers
                .iter()
                .map(|(k, v)| {
                    (
                        k.as_str().to_ascii_lowercase(),
                        v.to_str().unwrap_or("").to_string(),
                    )
                })
                .collect();
            let options = RequestOptions {
                method: parts.method.as_str().to_ascii_lowercase(),
                headers,
                body: Some(RequestBody::deferred(async move {
                    match request_body.collect().await {
                        Ok(collected) => collected.to_bytes(),
                        Err(never) => match never {},
                    }
                })),
            };
            (
                normalize_url(&parts.uri.to_string()),
                options,
                Some(Arc::new(parts)),
            )
        }
    };

    if let Some(method) = method {
        options.method = method.to_ascii_lowercase();
    }
    for (name, value) in init_headers {
        options.headers.insert(name.to_ascii_lowercase(), value);
    }
    if body.is_some() {
        options.body = body;
    }

    NormalizedRequest {
        url,
        options,
        request,
        signal,
    }
}

/// Normalize absolute URLs so that `http://A.com` and `http://a.com/` compare
/// equal. Relative URLs and anything unparseable are returned unchanged.
pub fn normalize_url(url: &str) -> String {
    let Ok(uri) = url.parse::<Uri>() else {
        return url.to_string();
    };
    match (uri.scheme_str(), uri.authority()) {
        (Some(scheme), Some(authority)) => {
            let path = if uri.path().is_empty() { "/" } else { uri.path() };
            let query = uri.query().map(|q| format!("?{q}")).unwrap_or_default();
            format!(
                "{}://{}{}{}",
                scheme.to_ascii_lowercase(),
                authority.as_str().to_ascii_lowercase(),
                path,
                query
            )
        }
        _ => url.to_string(),
    }
}

/// Path component of a URL (absolute or relative), without query or fragment.
pub fn url_path(url: &str) -> Cow<'_, str> {
    if let Ok(uri) = url.parse::<Uri>() {
        if uri.authority().is_some() {
            let path = if uri.path().is_empty() { "/" } else { uri.path() };
            return Cow::Owned(path.to_string());
        }
    }
    let end = url.find(['?', '#']).unwrap_or(url.len());
    Cow::Borrowed(&url[..end])
}

/// Query component of a URL, without the leading `?` or any fragment.
pub fn url_query(url: &str) -> Option<&str> {
    let start = url.find('?')? + 1;
    let rest = &url[start..];
    let end = rest.find('#').unwrap_or(rest.len());
    Some(&rest[..end])
}
