//! Error types for route configuration and intercepted calls.

use std::sync::Arc;

/// Errors raised while declaring routes or constructing responses.
///
/// These are always returned synchronously from the call that caused them
/// (`route`, `add_matcher`, route file loading) and abort it entirely.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("each route must define a response")]
    MissingResponse,
    #[error(
        "each route must specify some criteria for matching calls to fetch; \
         to match all calls use \"*\""
    )]
    MissingCriteria,
    #[error(
        "invalid status {0} passed on response object; status must be an integer \
         between 200 and 599 (to respond with a JSON object that has status as a \
         property, assign the object to body)"
    )]
    InvalidStatus(String),
    #[error(
        "route {0} collides with an existing route; set overwrite_routes to true to \
         replace it or to false to add it anyway"
    )]
    RouteCollision(String),
    #[error("invalid header '{name}': {reason}")]
    InvalidHeader { name: String, reason: String },
    #[error("invalid url pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
    #[error("the params matcher requires an express: url pattern")]
    ParamsWithoutExpress,
    #[error("matcher '{name}' could not be built: {reason}")]
    Matcher { name: String, reason: String },
    #[error("failed to parse route file: {0}")]
    Parse(String),
}

/// Errors an intercepted call can fail with.
///
/// Cloneable because the same outcome is handed to the caller and to
/// [`crate::CallHistory::flush`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum FetchError {
    #[error("no response or fallback rule matched {method} {url}")]
    NoMatch { url: String, method: String },
    #[error("the operation was aborted")]
    Aborted,
    #[error("{0}")]
    Thrown(String),
    #[error("response resolver failed: {0}")]
    Resolver(Arc<anyhow::Error>),
    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl FetchError {
    pub(crate) fn resolver(error: anyhow::Error) -> Self {
        FetchError::Resolver(Arc::new(error))
    }

    /// Whether the call was rejected by its abort signal.
    pub fn is_abort(&self) -> bool {
        matches!(self, FetchError::Aborted)
    }
}
