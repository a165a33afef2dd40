//! Configuration types for the fetch mock.
//!
//! - [`FetchMockConfig`]: handler-level defaults that routes fall back to
//! - [`RouteFile`]: declarative route definitions loaded from YAML or JSON

mod route_file;

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

pub use route_file::{DeclaredRoute, RouteFile};

/// What happens to a call that matches no route and no fallback.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UnmatchedPolicy {
    /// Reject the call with [`crate::FetchError::NoMatch`].
    #[default]
    Error,
    /// Log a warning and answer with a synthetic network-error response.
    Warn,
}

/// Handler-level settings. Route-level modifiers override these.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct FetchMockConfig {
    /// Add a `Content-Length` header to textual response bodies
    pub include_content_length: bool,
    /// Serialize object bodies to JSON and add `Content-Type: application/json`
    pub send_as_json: bool,
    /// Log a warning whenever a call is answered by the fallback response
    pub warn_on_fallback: bool,
    /// Match request bodies by containment instead of deep equality
    pub match_partial_body: bool,
    /// Behaviour for calls nothing matched
    pub on_unmatched: UnmatchedPolicy,
}

impl Default for FetchMockConfig {
    fn default() -> Self {
        Self {
            include_content_length: true,
            send_as_json: true,
            warn_on_fallback: true,
            match_partial_body: false,
            on_unmatched: UnmatchedPolicy::Error,
        }
    }
}

/// Render a scalar JSON value the way it would appear in a header or query
/// string. Nested values are rendered as compact JSON.
pub(crate) fn scalar_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Deserialize a map whose values may be any scalar into string values.
pub(crate) fn string_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .iter()
        .map(|(k, v)| (k.clone(), scalar_to_string(v)))
        .collect())
}

/// Like [`string_map`], for optional fields.
pub(crate) fn option_string_map<'de, D>(
    deserializer: D,
) -> Result<Option<BTreeMap<String, String>>, D::Error>
where
    D: Deserializer<'de>,
{
    string_map(deserializer).map(Some)
}
