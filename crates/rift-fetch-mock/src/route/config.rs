//! Declared route configuration.

use crate::predicate::{MatcherKey, Predicate};
use crate::request::RequestOptions;
use crate::response::ResponseSpec;
use hyper::http::request::Parts;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// A URL criterion: pattern text (see the `predicate` module for prefixes)
/// or a compiled regular expression.
#[derive(Debug, Clone)]
pub enum UrlPattern {
    Text(String),
    Regex(Regex),
}

impl UrlPattern {
    /// Source text of the pattern, used to tell routes apart.
    pub fn as_str(&self) -> &str {
        match self {
            UrlPattern::Text(text) => text,
            UrlPattern::Regex(regex) => regex.as_str(),
        }
    }
}

impl fmt::Display for UrlPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for UrlPattern {
    fn from(text: &str) -> Self {
        UrlPattern::Text(text.to_string())
    }
}

impl From<String> for UrlPattern {
    fn from(text: String) -> Self {
        UrlPattern::Text(text)
    }
}

impl From<Regex> for UrlPattern {
    fn from(regex: Regex) -> Self {
        UrlPattern::Regex(regex)
    }
}

/// The first argument of `route`: a bare URL, a bare function matcher, or a
/// full configuration.
#[derive(Clone)]
pub enum RouteCriteria {
    Url(UrlPattern),
    Function(Predicate),
    Config(RouteConfig),
}

impl RouteCriteria {
    pub fn function<F>(f: F) -> Self
    where
        F: Fn(&str, &RequestOptions, Option<&Parts>) -> bool + Send + Sync + 'static,
    {
        RouteCriteria::Function(Arc::new(f))
    }

    /// Normalize into a configuration.
    pub fn into_config(self) -> RouteConfig {
        match self {
            RouteCriteria::Url(url) => RouteConfig {
                url: Some(url),
                ..Default::default()
            },
            RouteCriteria::Function(function) => RouteConfig {
                function_matcher: Some(function),
                ..Default::default()
            },
            RouteCriteria::Config(config) => config,
        }
    }
}

impl From<&str> for RouteCriteria {
    fn from(url: &str) -> Self {
        RouteCriteria::Url(url.into())
    }
}

impl From<String> for RouteCriteria {
    fn from(url: String) -> Self {
        RouteCriteria::Url(url.into())
    }
}

impl From<Regex> for RouteCriteria {
    fn from(regex: Regex) -> Self {
        RouteCriteria::Url(regex.into())
    }
}

impl From<UrlPattern> for RouteCriteria {
    fn from(url: UrlPattern) -> Self {
        RouteCriteria::Url(url)
    }
}

impl From<Predicate> for RouteCriteria {
    fn from(function: Predicate) -> Self {
        RouteCriteria::Function(function)
    }
}

impl From<RouteConfig> for RouteCriteria {
    fn from(config: RouteConfig) -> Self {
        RouteCriteria::Config(config)
    }
}

/// Everything a route may declare: matching criteria, response and modifiers.
///
/// Boolean modifiers left as `None` fall back to the handler-level
/// [`crate::FetchMockConfig`].
#[derive(Clone, Default)]
pub struct RouteConfig {
    pub name: Option<String>,
    pub method: Option<String>,
    pub headers: Option<BTreeMap<String, String>>,
    pub query: Option<BTreeMap<String, String>>,
    pub params: Option<BTreeMap<String, String>>,
    pub body: Option<serde_json::Value>,
    pub url: Option<UrlPattern>,
    pub function_matcher: Option<Predicate>,
    /// Values for user-registered matchers, keyed by matcher name
    pub custom: BTreeMap<String, serde_json::Value>,
    pub response: Option<ResponseSpec>,
    /// Stop matching after this many calls
    pub repeat: Option<u32>,
    pub delay: Option<Duration>,
    /// Keep the route across `remove_routes` unless explicitly included
    pub sticky: bool,
    pub send_as_json: Option<bool>,
    pub include_content_length: Option<bool>,
    pub match_partial_body: Option<bool>,
    /// `None` rejects a colliding route, `Some(true)` replaces the existing
    /// one, `Some(false)` adds alongside it
    pub overwrite_routes: Option<bool>,
}

impl RouteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn url(mut self, url: impl Into<UrlPattern>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers
            .get_or_insert_with(BTreeMap::new)
            .insert(name.into(), value.into());
        self
    }

    pub fn headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.headers = Some(collect_map(headers));
        self
    }

    pub fn query<I, K, V>(mut self, query: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.query = Some(collect_map(query));
        self
    }

    pub fn params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.params = Some(collect_map(params));
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn function_matcher<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &RequestOptions, Option<&Parts>) -> bool + Send + Sync + 'static,
    {
        self.function_matcher = Some(Arc::new(f));
        self
    }

    /// Set the value a user-registered matcher reads.
    pub fn custom(mut self, name: impl Into<String>, value: serde_json::Value) -> Self {
        self.custom.insert(name.into(), value);
        self
    }

    pub fn response(mut self, response: impl Into<ResponseSpec>) -> Self {
        self.response = Some(response.into());
        self
    }

    pub fn repeat(mut self, times: u32) -> Self {
        self.repeat = Some(times);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn sticky(mut self, sticky: bool) -> Self {
        self.sticky = sticky;
        self
    }

    pub fn send_as_json(mut self, enabled: bool) -> Self {
        self.send_as_json = Some(enabled);
        self
    }

    pub fn include_content_length(mut self, enabled: bool) -> Self {
        self.include_content_length = Some(enabled);
        self
    }

    pub fn match_partial_body(mut self, enabled: bool) -> Self {
        self.match_partial_body = Some(enabled);
        self
    }

    pub fn overwrite_routes(mut self, overwrite: bool) -> Self {
        self.overwrite_routes = Some(overwrite);
        self
    }

    /// Overlay `other` on `self`: every field `other` sets wins.
    pub fn merge(mut self, other: RouteConfig) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field = other.$field; })*
            };
        }
        overlay!(
            name,
            method,
            headers,
            query,
            params,
            body,
            url,
            function_matcher,
            response,
            repeat,
            delay,
            send_as_json,
            include_content_length,
            match_partial_body,
            overwrite_routes
        );
        self.sticky |= other.sticky;
        self.custom.extend(other.custom);
        self
    }

    /// Whether the configuration declares the criterion `key`.
    pub fn declares(&self, key: &MatcherKey) -> bool {
        match key {
            MatcherKey::Url => self.url.is_some(),
            MatcherKey::Method => self.method.is_some(),
            MatcherKey::Headers => self.headers.is_some(),
            MatcherKey::Query => self.query.is_some(),
            MatcherKey::Params => self.params.is_some(),
            MatcherKey::Body => self.body.is_some(),
            MatcherKey::Function => self.function_matcher.is_some(),
            MatcherKey::Custom(name) => self.custom.contains_key(name),
        }
    }
}

fn collect_map<I, K, V>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

impl fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteConfig")
            .field("name", &self.name)
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("query", &self.query)
            .field("params", &self.params)
            .field("body", &self.body)
            .field("function_matcher", &self.function_matcher.is_some())
            .field("custom", &self.custom)
            .field("response", &self.response)
            .field("repeat", &self.repeat)
            .field("delay", &self.delay)
            .field("sticky", &self.sticky)
            .finish_non_exhaustive()
    }
}
