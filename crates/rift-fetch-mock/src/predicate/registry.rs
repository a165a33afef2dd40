//! Matcher definitions and the registry that holds them.

use super::{builtins, Predicate};
use crate::error::ConfigError;
use crate::route::RouteConfig;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// The criterion a matcher definition is responsible for.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatcherKey {
    Url,
    Method,
    Headers,
    Query,
    Params,
    Body,
    Function,
    /// A user-registered criterion, read from [`RouteConfig::custom`]
    Custom(String),
}

impl MatcherKey {
    pub fn name(&self) -> &str {
        match self {
            MatcherKey::Url => "url",
            MatcherKey::Method => "method",
            MatcherKey::Headers => "headers",
            MatcherKey::Query => "query",
            MatcherKey::Params => "params",
            MatcherKey::Body => "body",
            MatcherKey::Function => "function",
            MatcherKey::Custom(name) => name,
        }
    }

    /// Map a criterion name to its key. Unknown names become custom keys.
    pub fn from_name(name: &str) -> Self {
        match name {
            "url" => MatcherKey::Url,
            "method" => MatcherKey::Method,
            "headers" => MatcherKey::Headers,
            "query" => MatcherKey::Query,
            "params" => MatcherKey::Params,
            "body" => MatcherKey::Body,
            "function" | "functionMatcher" => MatcherKey::Function,
            other => MatcherKey::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for MatcherKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds a predicate from the route configuration that declares the key.
pub type BuildFn = Arc<dyn Fn(&RouteConfig) -> Result<Predicate, ConfigError> + Send + Sync>;

/// One named matcher: how to build its predicate, and whether that predicate
/// reads the request body.
#[derive(Clone)]
pub struct MatcherDefinition {
    pub key: MatcherKey,
    pub build: BuildFn,
    pub uses_body: bool,
}

impl MatcherDefinition {
    /// A definition keyed by `name`; built-in names map to built-in keys.
    pub fn new<F>(name: &str, build: F) -> Self
    where
        F: Fn(&RouteConfig) -> Result<Predicate, ConfigError> + Send + Sync + 'static,
    {
        Self {
            key: MatcherKey::from_name(name),
            build: Arc::new(build),
            uses_body: false,
        }
    }

    /// Mark the predicate as reading the request body, so deferred bodies are
    /// resolved before it runs.
    pub fn uses_body(mut self, uses_body: bool) -> Self {
        self.uses_body = uses_body;
        self
    }
}

impl fmt::Debug for MatcherDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherDefinition")
            .field("key", &self.key)
            .field("uses_body", &self.uses_body)
            .finish_non_exhaustive()
    }
}

/// Ordered catalog of matcher definitions.
///
/// Cloning shares the underlying list: a definition added through any clone
/// is visible to all of them, and to every route compiled afterwards.
#[derive(Debug, Clone)]
pub struct MatcherRegistry {
    definitions: Arc<RwLock<Vec<MatcherDefinition>>>,
}

impl MatcherRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self {
            definitions: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// A registry seeded with the built-in definitions.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        for definition in builtins::definitions() {
            registry.add_matcher(definition);
        }
        registry
    }

    /// Register a definition. Re-registering a key replaces the existing
    /// definition in its original position.
    pub fn add_matcher(&self, definition: MatcherDefinition) {
        let mut definitions = self.definitions.write();
        match definitions.iter_mut().find(|d| d.key == definition.key) {
            Some(existing) => *existing = definition,
            None => definitions.push(definition),
        }
    }

    /// Snapshot of the definitions in evaluation order.
    pub fn definitions(&self) -> Vec<MatcherDefinition> {
        self.definitions.read().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.definitions
            .read()
            .iter()
            .map(|d| d.key.name().to_string())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.read().is_empty()
    }

    /// Whether two handles share the same underlying list.
    pub fn ptr_eq(&self, other: &MatcherRegistry) -> bool {
        Arc::ptr_eq(&self.definitions, &other.definitions)
    }
}

impl Default for MatcherRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}
