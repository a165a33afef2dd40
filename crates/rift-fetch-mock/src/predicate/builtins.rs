//! Built-in matcher definitions.

use super::body_matcher::{json_contains, json_equals};
use super::field_matcher::{CompiledHeaderMatcher, CompiledQueryMatcher};
use super::path_matcher::{CompiledUrlMatcher, ExpressPattern};
use super::registry::{MatcherDefinition, MatcherKey};
use super::{predicate, Predicate};
use crate::error::ConfigError;
use crate::route::{RouteConfig, UrlPattern};
use std::sync::Arc;

/// The built-in definitions in evaluation order.
pub(super) fn definitions() -> Vec<MatcherDefinition> {
    vec![
        builtin(MatcherKey::Url, build_url),
        builtin(MatcherKey::Method, build_method),
        builtin(MatcherKey::Headers, build_headers),
        builtin(MatcherKey::Query, build_query),
        builtin(MatcherKey::Params, build_params),
        builtin(MatcherKey::Body, build_body).uses_body(true),
        builtin(MatcherKey::Function, build_function),
    ]
}

fn builtin(
    key: MatcherKey,
    build: fn(&RouteConfig) -> Result<Predicate, ConfigError>,
) -> MatcherDefinition {
    MatcherDefinition {
        key,
        build: Arc::new(build),
        uses_body: false,
    }
}

fn always() -> Predicate {
    predicate(|_, _, _| true)
}

fn build_url(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    let Some(pattern) = &config.url else {
        return Ok(always());
    };
    let matcher = CompiledUrlMatcher::compile(pattern)?;
    Ok(predicate(move |url, _, _| matcher.matches(url)))
}

fn build_method(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    let Some(method) = &config.method else {
        return Ok(always());
    };
    let expected = method.to_ascii_lowercase();
    Ok(predicate(move |_, options, _| options.method == expected))
}

fn build_headers(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    let Some(headers) = &config.headers else {
        return Ok(always());
    };
    let matcher = CompiledHeaderMatcher::compile(headers);
    Ok(predicate(move |_, options, _| matcher.matches(options)))
}

fn build_query(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    let Some(query) = &config.query else {
        return Ok(always());
    };
    let matcher = CompiledQueryMatcher::compile(query);
    Ok(predicate(move |url, _, _| matcher.matches(url)))
}

fn build_params(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    let Some(expected) = config.params.clone() else {
        return Ok(always());
    };
    let express = match &config.url {
        Some(UrlPattern::Text(text)) => text.strip_prefix("express:"),
        _ => None,
    };
    let Some(express) = express else {
        return Err(ConfigError::ParamsWithoutExpress);
    };
    let pattern = ExpressPattern::compile(express)?;
    Ok(predicate(move |url, _, _| {
        let Some(actual) = pattern.params(url) else {
            return false;
        };
        expected
            .iter()
            .all(|(name, value)| actual.get(name) == Some(value))
    }))
}

fn build_body(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    let Some(expected) = config.body.clone() else {
        return Ok(always());
    };
    let partial = config.match_partial_body.unwrap_or(false);
    Ok(predicate(move |_, options, _| {
        // GET and HEAD requests cannot carry a body
        if matches!(options.method.as_str(), "get" | "head") {
            return false;
        }
        let Some(text) = options.body_text() else {
            return false;
        };
        let Ok(actual) = serde_json::from_str::<serde_json::Value>(&text) else {
            return false;
        };
        if partial {
            json_contains(&actual, &expected)
        } else {
            json_equals(&actual, &expected)
        }
    }))
}

fn build_function(config: &RouteConfig) -> Result<Predicate, ConfigError> {
    Ok(config.function_matcher.clone().unwrap_or_else(always))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::RequestOptions;
    use serde_json::json;

    fn options(method: &str, body: Option<&str>) -> RequestOptions {
        RequestOptions {
            method: method.to_string(),
            body: body.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let config = RouteConfig::new().method("POST");
        let matcher = build_method(&config).unwrap();
        assert!(matcher("http://a.com/", &options("post", None), None));
        assert!(!matcher("http://a.com/", &options("get", None), None));
    }

    #[test]
    fn test_params_require_express_url() {
        let config = RouteConfig::new()
            .url("http://a.com/users/1")
            .params([("id", "1")]);
        assert!(matches!(
            build_params(&config),
            Err(ConfigError::ParamsWithoutExpress)
        ));
    }

    #[test]
    fn test_params_match() {
        let config = RouteConfig::new()
            .url("express:/users/:id")
            .params([("id", "1")]);
        let matcher = build_params(&config).unwrap();
        let opts = RequestOptions::default();
        assert!(matcher("http://a.com/users/1", &opts, None));
        assert!(!matcher("http://a.com/users/2", &opts, None));
        assert!(!matcher("http://a.com/other", &opts, None));
    }

    #[test]
    fn test_body_exact() {
        let config = RouteConfig::new().body(json!({"a": 1}));
        let matcher = build_body(&config).unwrap();
        assert!(matcher("u", &options("post", Some(r#"{"a":1}"#)), None));
        assert!(!matcher("u", &options("post", Some(r#"{"a":1,"b":2}"#)), None));
        assert!(!matcher("u", &options("post", Some("not json")), None));
        assert!(!matcher("u", &options("post", None), None));
    }

    #[test]
    fn test_body_never_matches_get_or_head() {
        let config = RouteConfig::new().body(json!({"a": 1}));
        let matcher = build_body(&config).unwrap();
        assert!(!matcher("u", &options("get", Some(r#"{"a":1}"#)), None));
        assert!(!matcher("u", &options("head", Some(r#"{"a":1}"#)), None));
    }

    #[test]
    fn test_body_partial() {
        let config = RouteConfig::new()
            .body(json!({"a": 1}))
            .match_partial_body(true);
        let matcher = build_body(&config).unwrap();
        assert!(matcher("u", &options("post", Some(r#"{"a":1,"b":2}"#)), None));
    }

    #[test]
    fn test_function_matcher() {
        let config = RouteConfig::new()
            .function_matcher(|url, _, _| url.contains("yes"));
        let matcher = build_function(&config).unwrap();
        let opts = RequestOptions::default();
        assert!(matcher("http://a.com/yes", &opts, None));
        assert!(!matcher("http://a.com/no", &opts, None));
    }
}
