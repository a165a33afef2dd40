//! Route compilation and per-route matching state.

use super::config::{RouteConfig, UrlPattern};
use crate::config::FetchMockConfig;
use crate::error::ConfigError;
use crate::predicate::{predicate, CompiledUrlMatcher, MatcherRegistry, Predicate};
use crate::request::RequestOptions;
use crate::response::{construct_response, MockResponse, ResponseConfig, ResponseSettings, ResponseSpec};
use hyper::http::request::Parts;
use std::collections::BTreeMap;
use std::fmt::{self, Write};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use tracing::debug;

/// Remaining-match counter of a repeat-limited route.
#[derive(Debug)]
struct RepeatLimit {
    repeat: u32,
    remaining: AtomicU32,
}

impl RepeatLimit {
    fn new(repeat: u32) -> Self {
        Self {
            repeat,
            remaining: AtomicU32::new(repeat),
        }
    }

    fn exhausted(&self) -> bool {
        self.remaining.load(Ordering::Relaxed) == 0
    }

    /// Take one match. False when another caller took the last one first.
    fn consume(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |v| v.checked_sub(1))
            .is_ok()
    }

    fn reset(&self) {
        self.remaining.store(self.repeat, Ordering::Relaxed);
    }
}

/// A compiled route.
///
/// Immutable after construction apart from its repeat counter.
pub struct Route {
    config: RouteConfig,
    matcher: Predicate,
    uses_body: bool,
    limit: Option<RepeatLimit>,
    response: ResponseSpec,
    settings: ResponseSettings,
    is_fallback: bool,
}

impl Route {
    /// Compile `config` against the matchers currently in `registry`.
    pub fn new(
        config: RouteConfig,
        registry: &MatcherRegistry,
        defaults: &FetchMockConfig,
    ) -> Result<Self, ConfigError> {
        let config = sanitize(config, defaults);
        let response = config
            .response
            .clone()
            .ok_or(ConfigError::MissingResponse)?;

        let definitions = registry.definitions();
        let active: Vec<_> = definitions
            .iter()
            .filter(|d| config.declares(&d.key))
            .collect();
        if active.is_empty() {
            return Err(ConfigError::MissingCriteria);
        }

        let uses_body = active.iter().any(|d| d.uses_body);
        let predicates = active
            .iter()
            .map(|d| (d.build)(&config))
            .collect::<Result<Vec<_>, _>>()?;
        let matcher = predicate(move |url, options, request| {
            predicates.iter().all(|p| p(url, options, request))
        });

        let limit = match config.repeat {
            Some(repeat) if repeat > 0 && !config.sticky => Some(RepeatLimit::new(repeat)),
            _ => None,
        };

        let settings = ResponseSettings {
            send_as_json: config.send_as_json.unwrap_or(defaults.send_as_json),
            include_content_length: config
                .include_content_length
                .unwrap_or(defaults.include_content_length),
            route_url: exact_url(config.url.as_ref())?,
        };

        debug!(
            "Compiled route {} ({} matcher(s), uses_body={})",
            describe(&config),
            active.len(),
            uses_body
        );

        Ok(Self {
            config,
            matcher,
            uses_body,
            limit,
            response,
            settings,
            is_fallback: false,
        })
    }

    /// The pseudo-route answering calls no other route matched.
    pub fn fallback(response: ResponseSpec, defaults: &FetchMockConfig) -> Self {
        let config = RouteConfig {
            url: Some(UrlPattern::Text("*".to_string())),
            response: Some(response.clone()),
            ..Default::default()
        };
        Self {
            config,
            matcher: predicate(|_, _, _| true),
            uses_body: false,
            limit: None,
            response,
            settings: ResponseSettings {
                send_as_json: defaults.send_as_json,
                include_content_length: defaults.include_content_length,
                route_url: None,
            },
            is_fallback: true,
        }
    }

    /// Test a call against the route, consuming one repeat when it matches.
    pub fn matches(&self, url: &str, options: &RequestOptions, request: Option<&Parts>) -> bool {
        if self.limit.as_ref().is_some_and(RepeatLimit::exhausted) {
            return false;
        }
        if !(self.matcher)(url, options, request) {
            return false;
        }
        self.limit.as_ref().map_or(true, RepeatLimit::consume)
    }

    /// Test a call against the route's criteria without touching counters.
    pub fn evaluate(&self, url: &str, options: &RequestOptions, request: Option<&Parts>) -> bool {
        (self.matcher)(url, options, request)
    }

    /// Restore the repeat counter.
    pub fn reset(&self) {
        if let Some(limit) = &self.limit {
            limit.reset();
        }
    }

    /// Identity used to detect colliding registrations: the name, or for
    /// unnamed routes the method and URL criterion.
    pub fn signature(&self) -> Option<String> {
        signature_of(&self.config)
    }

    pub fn name(&self) -> Option<&str> {
        self.config.name.as_deref()
    }

    pub fn config(&self) -> &RouteConfig {
        &self.config
    }

    pub fn uses_body(&self) -> bool {
        self.uses_body
    }

    pub fn is_sticky(&self) -> bool {
        self.config.sticky
    }

    pub fn is_fallback(&self) -> bool {
        self.is_fallback
    }

    /// Number of matches allowed, if limited.
    pub fn repeat(&self) -> Option<u32> {
        self.limit.as_ref().map(|l| l.repeat)
    }

    pub fn delay(&self) -> Option<Duration> {
        self.config.delay
    }

    pub fn response(&self) -> &ResponseSpec {
        &self.response
    }

    /// Build the response for one call from a resolved config.
    pub fn construct_response(
        &self,
        config: &ResponseConfig,
        request_url: &str,
    ) -> Result<MockResponse, ConfigError> {
        construct_response(&self.settings, config, request_url)
    }

    /// Human-readable route identity for logs.
    pub fn describe(&self) -> String {
        if self.is_fallback {
            return "fallback".to_string();
        }
        describe(&self.config)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("config", &self.config)
            .field("uses_body", &self.uses_body)
            .field("repeat", &self.repeat())
            .field("is_fallback", &self.is_fallback)
            .finish_non_exhaustive()
    }
}

/// Lower-case the method and resolve modifiers against handler defaults.
fn sanitize(mut config: RouteConfig, defaults: &FetchMockConfig) -> RouteConfig {
    if let Some(method) = &mut config.method {
        method.make_ascii_lowercase();
    }
    config.match_partial_body = Some(
        config
            .match_partial_body
            .unwrap_or(defaults.match_partial_body),
    );
    config
}

fn exact_url(url: Option<&UrlPattern>) -> Result<Option<String>, ConfigError> {
    let Some(url) = url else {
        return Ok(None);
    };
    Ok(CompiledUrlMatcher::compile(url)?
        .exact_url()
        .map(str::to_string))
}

/// Collision identity: the name, or for unnamed routes every declared
/// criterion with the URL in its normalized form. Routes matching through a
/// closure have no identity and never collide.
pub(crate) fn signature_of(config: &RouteConfig) -> Option<String> {
    if let Some(name) = &config.name {
        return Some(name.clone());
    }
    if config.function_matcher.is_some() {
        return None;
    }

    let mut signature = format!("{} {}", method_of(config), url_of(config));
    if let Some(headers) = &config.headers {
        let headers: BTreeMap<_, _> = headers
            .iter()
            .map(|(name, value)| (name.to_ascii_lowercase(), value))
            .collect();
        let _ = write!(signature, " headers={headers:?}");
    }
    if let Some(query) = &config.query {
        let _ = write!(signature, " query={query:?}");
    }
    if let Some(params) = &config.params {
        let _ = write!(signature, " params={params:?}");
    }
    if let Some(body) = &config.body {
        let _ = write!(signature, " body={body}");
    }
    for (name, value) in &config.custom {
        let _ = write!(signature, " {name}={value}");
    }
    Some(signature)
}

fn method_of(config: &RouteConfig) -> String {
    config
        .method
        .as_deref()
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| "*".to_string())
}

fn url_of(config: &RouteConfig) -> String {
    let Some(url) = &config.url else {
        return "*".to_string();
    };
    match CompiledUrlMatcher::compile(url) {
        Ok(CompiledUrlMatcher::Exact(normalized)) => normalized,
        _ => url.to_string(),
    }
}

fn describe(config: &RouteConfig) -> String {
    match &config.name {
        Some(name) => name.clone(),
        None => format!("{} {}", method_of(config), url_of(config)),
    }
}
