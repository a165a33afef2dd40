//! Rift fetch mock: a request-matching and synthetic-response engine for
//! intercepted fetch calls.
//!
//! Routes are declared against a [`FetchMock`], calls are answered through
//! [`FetchMock::fetch_handler`] without touching a network, and every call is
//! recorded in a [`CallHistory`] that tests can query, flush and assert on.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use rift_fetch_mock::{FetchMock, RouteConfig};
//!
//! let mut fm = FetchMock::new();
//! fm.route_config(RouteConfig::new().url("http://a.com").method("GET").response(200))?
//!     .catch(404);
//!
//! let response = fm.fetch_handler("http://a.com", None).await?;
//! assert_eq!(response.status(), 200);
//! assert!(fm.done(None));
//! # Ok(())
//! # }
//! ```
//!
//! # Module Structure
//!
//! - `config` - Handler-level settings and declarative route files
//! - `error` - Configuration and fetch error types
//! - `predicate` - Matcher registry and built-in matchers
//! - `route` - Route configuration and compilation
//! - `response` - Response specifications and response construction
//! - `router` - Ordered route selection and response resolution
//! - `history` - Call recording, querying, flush and `done`
//! - `fetch_mock` - The composition root tying everything together

pub mod config;
pub mod error;
pub mod fetch_mock;
pub mod history;
pub mod logging;
pub mod predicate;
pub mod request;
pub mod response;
pub mod route;
pub mod router;

pub use config::{FetchMockConfig, RouteFile, UnmatchedPolicy};
pub use error::{ConfigError, FetchError};
pub use fetch_mock::{FetchFuture, FetchMock};
pub use history::{CallFilter, CallHistory, CallLog, CallsView};
pub use predicate::{MatcherDefinition, MatcherKey, MatcherRegistry, Predicate};
pub use request::{AbortSignal, RequestBody, RequestInit, RequestInput, RequestOptions};
pub use response::{BodySpec, MockResponse, ResponseConfig, ResponseKind, ResponseSpec};
pub use route::{Route, RouteConfig, RouteCriteria, UrlPattern};
pub use router::{RemoveRouteOptions, Router};
