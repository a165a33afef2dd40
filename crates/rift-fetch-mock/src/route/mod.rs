//! Route configuration and compilation.
//!
//! A [`RouteConfig`] is what callers declare; a [`Route`] is the compiled,
//! immutable result: one combined predicate, an optional repeat counter, an
//! optional delay and the response specification.

mod config;
mod core;

pub use self::config::{RouteConfig, RouteCriteria, UrlPattern};
pub use self::core::Route;
