//! Header and query-string matching.
//!
//! Both compare a declared name/value map against the request: every
//! declared entry must be present with an equal value, extra request
//! entries are ignored.

use crate::request::{url_query, RequestOptions};
use std::collections::{BTreeMap, HashMap};

/// Compiled header criterion. Header names are case-insensitive.
#[derive(Debug, Clone)]
pub struct CompiledHeaderMatcher {
    expected: Vec<(String, String)>,
}

impl CompiledHeaderMatcher {
    pub fn compile(headers: &BTreeMap<String, String>) -> Self {
        Self {
            expected: headers
                .iter()
                .map(|(name, value)| (name.to_ascii_lowercase(), value.clone()))
                .collect(),
        }
    }

    pub fn matches(&self, options: &RequestOptions) -> bool {
        self.expected
            .iter()
            .all(|(name, value)| options.headers.get(name) == Some(value))
    }
}

/// Compiled query-string criterion. Request values are URL-decoded before
/// comparison.
#[derive(Debug, Clone)]
pub struct CompiledQueryMatcher {
    expected: Vec<(String, String)>,
}

impl CompiledQueryMatcher {
    pub fn compile(query: &BTreeMap<String, String>) -> Self {
        Self {
            expected: query
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        let actual = parse_query_string(url_query(url));
        self.expected
            .iter()
            .all(|(name, value)| actual.get(name) == Some(value))
    }
}

/// Parse a query string into a map of decoded values. Later duplicates win.
pub fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                params.insert(decode(key), decode(value));
            } else if !pair.is_empty() {
                params.insert(decode(pair), String::new());
            }
        }
    }
    params
}

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}
