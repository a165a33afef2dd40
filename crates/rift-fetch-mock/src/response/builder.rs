use super::spec::{BodySpec, ResponseConfig};
use crate::error::ConfigError;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{CONTENT_LENGTH, CONTENT_TYPE};
use hyper::http::{HeaderName, HeaderValue};
use hyper::{HeaderMap, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::str::FromStr;

/// Whether a response is an ordinary one or a synthetic network error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Basic,
    Error,
}

/// A fully built response handed back to the caller of the fetch handler.
#[derive(Debug, Clone)]
pub struct MockResponse {
    status: u16,
    status_text: String,
    headers: HeaderMap,
    body: Bytes,
    url: String,
    redirected: bool,
    kind: ResponseKind,
}

impl MockResponse {
    /// Synthetic response used for unmatched calls under the warn policy:
    /// status 0, no headers, no body.
    pub fn network_error() -> Self {
        MockResponse {
            status: 0,
            status_text: String::new(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
            url: String::new(),
            redirected: false,
            kind: ResponseKind::Error,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn redirected(&self) -> bool {
        self.redirected
    }

    pub fn kind(&self) -> ResponseKind {
        self.kind
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    pub fn json<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        serde_json::from_slice(&self.body)
    }

    /// The body as an HTTP body, ready to be collected.
    pub fn body(&self) -> Full<Bytes> {
        Full::new(self.body.clone())
    }

    /// Convert into a `hyper` response. Fails for network errors, whose
    /// status is not a valid HTTP status.
    pub fn into_http(self) -> Result<Response<Full<Bytes>>, hyper::http::Error> {
        let mut response = Response::builder()
            .status(self.status)
            .body(Full::new(self.body))?;
        response.headers_mut().extend(self.headers);
        Ok(response)
    }
}

/// Builder for [`MockResponse`].
pub struct ResponseBuilder {
    status: u16,
    headers: HeaderMap,
    body: Bytes,
    url: String,
    redirected: bool,
}

impl ResponseBuilder {
    pub fn new(status: u16) -> Self {
        ResponseBuilder {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
            url: String::new(),
            redirected: false,
        }
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Add a header, silently skipping names or values that are not valid.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (HeaderName::from_str(name), HeaderValue::from_str(value)) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add a header, failing on invalid names or values.
    pub fn try_header(mut self, name: &str, value: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: String| ConfigError::InvalidHeader {
            name: name.to_string(),
            reason,
        };
        let header_name = HeaderName::from_str(name).map_err(|e| invalid(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| invalid(e.to_string()))?;
        self.headers.insert(header_name, header_value);
        Ok(self)
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn redirected(mut self, redirected: bool) -> Self {
        self.redirected = redirected;
        self
    }

    fn has_header(&self, name: &HeaderName) -> bool {
        self.headers.contains_key(name)
    }

    pub fn build(self) -> MockResponse {
        let status_text = StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
            .unwrap_or_default()
            .to_string();
        MockResponse {
            status: self.status,
            status_text,
            headers: self.headers,
            body: self.body,
            url: self.url,
            redirected: self.redirected,
            kind: ResponseKind::Basic,
        }
    }
}

/// Route-level settings that shape response construction.
#[derive(Debug, Clone, Default)]
pub(crate) struct ResponseSettings {
    pub send_as_json: bool,
    pub include_content_length: bool,
    /// The route's exact URL criterion, if it has one
    pub route_url: Option<String>,
}

/// Validate a declared status. Missing or zero means 200.
pub(crate) fn sanitize_status(status: Option<&serde_json::Number>) -> Result<u16, ConfigError> {
    let Some(status) = status else {
        return Ok(200);
    };
    match status.as_u64() {
        Some(0) => Ok(200),
        Some(code @ 200..=599) => Ok(code as u16),
        _ => Err(ConfigError::InvalidStatus(status.to_string())),
    }
}

/// Build the response for one call from a resolved config.
pub(crate) fn construct_response(
    settings: &ResponseSettings,
    config: &ResponseConfig,
    request_url: &str,
) -> Result<MockResponse, ConfigError> {
    let status = sanitize_status(config.status.as_ref())?;
    let mut builder = ResponseBuilder::new(status);
    for (name, value) in &config.headers {
        builder = builder.try_header(name, value)?;
    }

    let (body, textual) = match &config.body {
        None => (Bytes::new(), false),
        Some(BodySpec::Text(text)) => (Bytes::from(text.clone()), true),
        Some(BodySpec::Bytes(bytes)) => (bytes.clone(), false),
        Some(BodySpec::Json(value)) if value.is_object() || value.is_array() => {
            if settings.send_as_json {
                if !builder.has_header(&CONTENT_TYPE) {
                    builder = builder.header(CONTENT_TYPE.as_str(), "application/json");
                }
                (Bytes::from(value.to_string()), true)
            } else {
                (Bytes::from(value.to_string()), false)
            }
        }
        Some(BodySpec::Json(scalar)) => (Bytes::from(scalar.to_string()), false),
    };

    if textual && settings.include_content_length && !builder.has_header(&CONTENT_LENGTH) {
        builder = builder.header(CONTENT_LENGTH.as_str(), &body.len().to_string());
    }

    let (url, redirected) = match (&config.redirect_url, &settings.route_url) {
        (Some(redirect), _) => (redirect.as_str(), true),
        (None, Some(route_url)) => (route_url.as_str(), false),
        (None, None) => (request_url, false),
    };

    Ok(builder.body(body).url(url).redirected(redirected).build())
}
