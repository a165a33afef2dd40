//! Declarative route files.
//!
//! ```yaml
//! settings:
//!   matchPartialBody: true
//! routes:
//!   - name: users
//!     url: "express:/users/:id"
//!     method: get
//!     response:
//!       status: 200
//!       body: { id: 1 }
//!   - url: "regex:^http://a\\.com/items"
//!     repeat: 2
//!     delay: 50
//!     response: 204
//! fallback: 404
//! ```

use super::{option_string_map, FetchMockConfig};
use crate::error::ConfigError;
use crate::response::ResponseSpec;
use crate::route::RouteConfig;
use anyhow::Context;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// A set of routes, an optional fallback and optional handler settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteFile {
    #[serde(default)]
    pub settings: Option<FetchMockConfig>,
    #[serde(default)]
    pub routes: Vec<DeclaredRoute>,
    /// Fallback response, read like any literal response
    #[serde(default)]
    pub fallback: Option<Value>,
}

impl RouteFile {
    /// Load from a `.json` file, or YAML for any other extension.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read route file {}", path.display()))?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let file = if is_json {
            Self::from_json_str(&contents)
        } else {
            Self::from_yaml_str(&contents)
        };
        file.with_context(|| format!("Invalid route file {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_json_str(contents: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// One route as written in a route file.
///
/// Keys that are not route fields are kept as custom matcher values.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeclaredRoute {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    /// URL pattern; `regex:` selects a regular expression
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "option_string_map")]
    pub headers: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "option_string_map")]
    pub query: Option<BTreeMap<String, String>>,
    #[serde(default, deserialize_with = "option_string_map")]
    pub params: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub body: Option<Value>,
    #[serde(default)]
    pub response: Option<Value>,
    #[serde(default)]
    pub repeat: Option<u32>,
    /// Delay in milliseconds
    #[serde(default)]
    pub delay: Option<u64>,
    #[serde(default)]
    pub sticky: bool,
    #[serde(default)]
    pub send_as_json: Option<bool>,
    #[serde(default)]
    pub include_content_length: Option<bool>,
    #[serde(default)]
    pub match_partial_body: Option<bool>,
    #[serde(default)]
    pub overwrite_routes: Option<bool>,
    #[serde(flatten)]
    pub custom: BTreeMap<String, Value>,
}

impl From<DeclaredRoute> for RouteConfig {
    fn from(route: DeclaredRoute) -> Self {
        RouteConfig {
            name: route.name,
            method: route.method,
            headers: route.headers,
            query: route.query,
            params: route.params,
            body: route.body,
            url: route.url.map(Into::into),
            function_matcher: None,
            custom: route.custom,
            response: route.response.map(ResponseSpec::from_value),
            repeat: route.repeat,
            delay: route.delay.map(Duration::from_millis),
            sticky: route.sticky,
            send_as_json: route.send_as_json,
            include_content_length: route.include_content_length,
            match_partial_body: route.match_partial_body,
            overwrite_routes: route.overwrite_routes,
        }
    }
}
