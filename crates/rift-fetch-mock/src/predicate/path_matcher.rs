//! URL pattern compilation.
//!
//! String URL criteria may carry a prefix selecting how they are compared:
//!
//! | Pattern              | Matches                                      |
//! |----------------------|----------------------------------------------|
//! | `*`                  | every URL                                    |
//! | `begin:http://a.com` | URLs starting with the text                  |
//! | `end:.json`          | URLs ending with the text                    |
//! | `glob:*/users/*`     | shell-style glob over the whole URL          |
//! | `path:/users`        | URLs whose path is exactly the text          |
//! | `express:/users/:id` | paths matching the express-style pattern     |
//! | `regex:^http`        | URLs matching the regular expression         |
//! | anything else        | the normalized URL exactly                   |

use crate::error::ConfigError;
use crate::request::{normalize_url, url_path};
use crate::route::UrlPattern;
use regex::Regex;
use std::collections::HashMap;
use std::sync::Arc;

/// Compiled URL criterion.
#[derive(Debug, Clone)]
pub enum CompiledUrlMatcher {
    Any,
    Exact(String),
    Begin(String),
    End(String),
    Glob(Arc<Regex>),
    Path(String),
    Express(Arc<ExpressPattern>),
    Regex(Arc<Regex>),
}

impl CompiledUrlMatcher {
    pub fn compile(pattern: &UrlPattern) -> Result<Self, ConfigError> {
        let text = match pattern {
            UrlPattern::Regex(regex) => return Ok(CompiledUrlMatcher::Regex(Arc::new(regex.clone()))),
            UrlPattern::Text(text) => text.as_str(),
        };

        if text == "*" {
            return Ok(CompiledUrlMatcher::Any);
        }
        if let Some(prefix) = text.strip_prefix("begin:") {
            return Ok(CompiledUrlMatcher::Begin(prefix.to_string()));
        }
        if let Some(suffix) = text.strip_prefix("end:") {
            return Ok(CompiledUrlMatcher::End(suffix.to_string()));
        }
        if let Some(glob) = text.strip_prefix("glob:") {
            return Ok(CompiledUrlMatcher::Glob(Arc::new(glob_to_regex(glob)?)));
        }
        if let Some(path) = text.strip_prefix("path:") {
            return Ok(CompiledUrlMatcher::Path(path.to_string()));
        }
        if let Some(express) = text.strip_prefix("express:") {
            return Ok(CompiledUrlMatcher::Express(Arc::new(ExpressPattern::compile(
                express,
            )?)));
        }
        if let Some(source) = text.strip_prefix("regex:") {
            let regex = Regex::new(source).map_err(|e| ConfigError::InvalidPattern {
                pattern: text.to_string(),
                reason: e.to_string(),
            })?;
            return Ok(CompiledUrlMatcher::Regex(Arc::new(regex)));
        }
        Ok(CompiledUrlMatcher::Exact(normalize_url(text)))
    }

    /// Check a (normalized) request URL against the criterion.
    pub fn matches(&self, url: &str) -> bool {
        match self {
            CompiledUrlMatcher::Any => true,
            CompiledUrlMatcher::Exact(expected) => url == expected,
            CompiledUrlMatcher::Begin(prefix) => url.starts_with(prefix.as_str()),
            CompiledUrlMatcher::End(suffix) => url.ends_with(suffix.as_str()),
            CompiledUrlMatcher::Glob(regex) | CompiledUrlMatcher::Regex(regex) => {
                regex.is_match(url)
            }
            CompiledUrlMatcher::Path(path) => url_path(url) == path.as_str(),
            CompiledUrlMatcher::Express(pattern) => pattern.params(url).is_some(),
        }
    }

    /// The URL a response should report when the route names one exactly.
    pub fn exact_url(&self) -> Option<&str> {
        match self {
            CompiledUrlMatcher::Exact(url) => Some(url),
            _ => None,
        }
    }
}

/// Translate a shell glob (`*` any run, `?` one character) to an anchored regex.
fn glob_to_regex(glob: &str) -> Result<Regex, ConfigError> {
    let mut source = String::with_capacity(glob.len() + 8);
    source.push('^');
    for c in glob.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|e| ConfigError::InvalidPattern {
        pattern: format!("glob:{glob}"),
        reason: e.to_string(),
    })
}

/// An express-style path pattern (`/users/:id`, `/files/*`), backed by a
/// radix-tree router.
#[derive(Debug)]
pub struct ExpressPattern {
    source: String,
    router: matchit::Router<()>,
}

impl ExpressPattern {
    pub fn compile(pattern: &str) -> Result<Self, ConfigError> {
        let route = to_matchit_route(pattern);
        let mut router = matchit::Router::new();
        router
            .insert(route, ())
            .map_err(|e| ConfigError::InvalidPattern {
                pattern: format!("express:{pattern}"),
                reason: e.to_string(),
            })?;
        Ok(Self {
            source: pattern.to_string(),
            router,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Path parameters of `url`, or `None` when the path does not match.
    pub fn params(&self, url: &str) -> Option<HashMap<String, String>> {
        let path = url_path(url);
        let matched = self.router.at(&path).ok()?;
        Some(
            matched
                .params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }
}

/// Rewrite `:name` segments to `{name}` and a bare `*` segment to a
/// catch-all, escaping literal braces.
fn to_matchit_route(pattern: &str) -> String {
    let escaped = pattern.replace('{', "{{").replace('}', "}}");
    escaped
        .split('/')
        .map(|segment| {
            if let Some(name) = segment.strip_prefix(':') {
                format!("{{{name}}}")
            } else if segment == "*" {
                "{*rest}".to_string()
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
