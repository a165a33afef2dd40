//! Ordered route selection and response resolution.

use crate::config::{FetchMockConfig, UnmatchedPolicy};
use crate::error::{ConfigError, FetchError};
use crate::history::CallLog;
use crate::request::RequestOptions;
use crate::response::{MockResponse, ResponseConfig, ResponseSpec};
use crate::route::Route;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which routes [`Router::remove_routes`] drops.
#[derive(Debug, Clone, Default)]
pub struct RemoveRouteOptions {
    /// Only routes with these names; every route when `None`
    pub names: Option<Vec<String>>,
    /// Also remove sticky routes
    pub include_sticky: bool,
    /// Also remove the fallback
    pub include_fallback: bool,
}

impl RemoveRouteOptions {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: Some(names.into_iter().map(Into::into).collect()),
            ..Default::default()
        }
    }

    pub fn include_sticky(mut self, include: bool) -> Self {
        self.include_sticky = include;
        self
    }

    pub fn include_fallback(mut self, include: bool) -> Self {
        self.include_fallback = include;
        self
    }
}

/// Ordered routes plus an optional fallback.
///
/// Cloning is shallow: clones share the same compiled routes, and therefore
/// their repeat counters, but adding or removing routes on one clone does
/// not affect the other.
#[derive(Debug, Clone, Default)]
pub struct Router {
    routes: Vec<Arc<Route>>,
    fallback: Option<Arc<Route>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a compiled route, applying its overwrite policy when it
    /// collides with an existing one.
    pub fn add_route(&mut self, route: Route) -> Result<Arc<Route>, ConfigError> {
        let route = Arc::new(route);
        if let Some(signature) = route.signature() {
            let existing = self
                .routes
                .iter()
                .position(|r| r.signature().as_deref() == Some(signature.as_str()));
            if let Some(position) = existing {
                match route.config().overwrite_routes {
                    None => return Err(ConfigError::RouteCollision(signature)),
                    Some(true) => {
                        debug!("Replacing route {}", signature);
                        self.routes[position] = Arc::clone(&route);
                        return Ok(route);
                    }
                    Some(false) => {}
                }
            }
        }
        debug!("Adding route {}", route.describe());
        self.routes.push(Arc::clone(&route));
        Ok(route)
    }

    /// Set the response for calls no route matches.
    pub fn set_fallback(&mut self, route: Route) {
        if self.fallback.is_some() {
            warn!("Calling catch() more than once replaces the existing fallback response");
        }
        self.fallback = Some(Arc::new(route));
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    pub fn fallback(&self) -> Option<&Arc<Route>> {
        self.fallback.as_ref()
    }

    /// Whether a deferred request body must be read before routes are tried.
    pub fn needs_to_read_body(&self, options: &RequestOptions) -> bool {
        options.has_deferred_body() && self.routes.iter().any(|r| r.uses_body())
    }

    pub fn remove_routes(&mut self, options: &RemoveRouteOptions) {
        let before = self.routes.len();
        self.routes.retain(|route| {
            let selected = match &options.names {
                Some(names) => route.name().is_some_and(|n| names.iter().any(|x| x == n)),
                None => true,
            };
            let removable = options.include_sticky || !route.is_sticky();
            !(selected && removable)
        });
        if options.include_fallback {
            self.fallback = None;
        }
        debug!("Removed {} route(s)", before - self.routes.len());
    }

    /// Reset the repeat counter of every route.
    pub fn reset_routes(&self) {
        for route in &self.routes {
            route.reset();
        }
    }

    /// Answer one recorded call: select a route, then resolve its response.
    pub async fn execute(
        &self,
        call: &CallLog,
        config: &FetchMockConfig,
    ) -> Result<MockResponse, FetchError> {
        let route = self.select(call, config)?;
        respond(route, call).await
    }

    /// First matching route, else the fallback, attached to the call. Takes
    /// a repeat slot from the selected route, so calls must be selected in
    /// the order they were made. `Ok(None)` means the call is answered with a
    /// network error under the warn policy.
    pub fn select(
        &self,
        call: &CallLog,
        config: &FetchMockConfig,
    ) -> Result<Option<Arc<Route>>, FetchError> {
        let matched = {
            let options = call.options();
            self.routes
                .iter()
                .find(|r| r.matches(call.url(), &options, call.request()))
                .cloned()
        };
        if let Some(route) = matched {
            debug!("Call to {} matched route {}", call.url(), route.describe());
            call.set_route(Arc::clone(&route));
            return Ok(Some(route));
        }

        if let Some(fallback) = &self.fallback {
            if config.warn_on_fallback {
                warn!("Unmatched {} to {}", call.method(), call.url());
            }
            call.set_route(Arc::clone(fallback));
            return Ok(Some(Arc::clone(fallback)));
        }

        match config.on_unmatched {
            UnmatchedPolicy::Error => Err(FetchError::NoMatch {
                url: call.url().to_string(),
                method: call.method().to_ascii_uppercase(),
            }),
            UnmatchedPolicy::Warn => {
                warn!(
                    "No response or fallback rule, so resolving {} {} with a network error",
                    call.method().to_ascii_uppercase(),
                    call.url()
                );
                Ok(None)
            }
        }
    }
}

/// Resolve and build the response of a call whose route is already
/// selected, then attach it to the call. `None` answers with a network error.
pub(crate) async fn respond(
    route: Option<Arc<Route>>,
    call: &CallLog,
) -> Result<MockResponse, FetchError> {
    let Some(route) = route else {
        let response = MockResponse::network_error();
        call.set_response(response.clone());
        return Ok(response);
    };

    if let Some(delay) = route.delay() {
        debug!("Delaying response for {:?}", delay);
        tokio::time::sleep(delay).await;
    }

    let response = match resolve(&route, call).await? {
        Resolved::Response(response) => response,
        Resolved::Config(response_config) => {
            if let Some(message) = response_config.throws {
                return Err(FetchError::Thrown(message));
            }
            route.construct_response(&response_config, call.url())?
        }
    };
    call.set_response(response.clone());
    Ok(response)
}

enum Resolved {
    Config(ResponseConfig),
    Response(MockResponse),
}

/// Unwrap deferred values and resolver calls until a config or a prebuilt
/// response remains.
async fn resolve(route: &Route, call: &CallLog) -> Result<Resolved, FetchError> {
    let mut spec = route.response().clone();
    loop {
        spec = match spec {
            ResponseSpec::Config(config) => return Ok(Resolved::Config(config)),
            ResponseSpec::Response(response) => return Ok(Resolved::Response(response)),
            ResponseSpec::Deferred(deferred) => deferred.await,
            ResponseSpec::Resolver(resolver) => {
                let pending = {
                    let options = call.options();
                    resolver(call.url(), &options, call.request())
                };
                pending.await.map_err(FetchError::resolver)?
            }
        };
    }
}
