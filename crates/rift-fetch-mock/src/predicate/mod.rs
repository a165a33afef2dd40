//! Request predicates and the matcher registry.
//!
//! A route's matching criteria are turned into [`Predicate`]s by the
//! [`MatcherDefinition`]s held in a [`MatcherRegistry`]. Each definition owns
//! one criterion key; a route's combined predicate is the AND of every
//! definition whose key the route declares, evaluated in registration order.
//!
//! # Module Structure
//!
//! - `registry` - Matcher keys, definitions and the shared registry
//! - `builtins` - The built-in `url`, `method`, `headers`, `query`, `params`,
//!   `body` and `function` definitions
//! - `path_matcher` - URL pattern compilation (`begin:`, `glob:`, `express:`, ...)
//! - `field_matcher` - Header and query-string matching
//! - `body_matcher` - JSON body equality and containment

mod body_matcher;
mod builtins;
mod field_matcher;
mod path_matcher;
mod registry;

use crate::request::RequestOptions;
use hyper::http::request::Parts;
use std::sync::Arc;

pub use body_matcher::{json_contains, json_equals};
pub use field_matcher::{parse_query_string, CompiledHeaderMatcher, CompiledQueryMatcher};
pub use path_matcher::{CompiledUrlMatcher, ExpressPattern};
pub use registry::{BuildFn, MatcherDefinition, MatcherKey, MatcherRegistry};

/// A compiled test over `(url, options, request object)`.
///
/// Also the type of user-supplied function matchers.
pub type Predicate = Arc<dyn Fn(&str, &RequestOptions, Option<&Parts>) -> bool + Send + Sync>;

/// Wrap a closure as a [`Predicate`].
pub fn predicate<F>(f: F) -> Predicate
where
    F: Fn(&str, &RequestOptions, Option<&Parts>) -> bool + Send + Sync + 'static,
{
    Arc::new(f)
}
