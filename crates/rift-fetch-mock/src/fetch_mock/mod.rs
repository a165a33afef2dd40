//! The fetch mock: route declaration, call interception and history queries.

#[cfg(test)]
mod tests;

use crate::config::{FetchMockConfig, RouteFile};
use crate::error::{ConfigError, FetchError};
use crate::history::{CallFilter, CallHistory, CallLog, CallsView, CompiledFilter, PendingFuture};
use crate::predicate::{MatcherDefinition, MatcherRegistry};
use crate::request::{normalize_request, AbortSignal, NormalizedRequest, RequestInit, RequestInput};
use crate::response::{MockResponse, ResponseConfig, ResponseSpec};
use crate::route::{Route, RouteConfig, RouteCriteria};
use crate::router::{respond, RemoveRouteOptions, Router};
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tracing::{debug, info};

type ResponseFuture = Shared<BoxFuture<'static, Result<MockResponse, FetchError>>>;

/// The outcome of an intercepted call. Resolves to the response or the error
/// the call failed with. Clones resolve to the same outcome.
#[derive(Clone)]
#[must_use = "futures do nothing unless polled"]
pub struct FetchFuture(ResponseFuture);

impl Future for FetchFuture {
    type Output = Result<MockResponse, FetchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

/// A mock fetch handler with its own routes and call history.
pub struct FetchMock {
    config: FetchMockConfig,
    registry: MatcherRegistry,
    router: Router,
    history: CallHistory,
}

impl FetchMock {
    pub fn new() -> Self {
        Self::with_config(FetchMockConfig::default())
    }

    pub fn with_config(config: FetchMockConfig) -> Self {
        Self {
            config,
            registry: MatcherRegistry::with_builtins(),
            router: Router::new(),
            history: CallHistory::new(),
        }
    }

    /// A new instance sharing this one's matcher registry, starting from a
    /// shallow copy of its routes and fallback, with an empty history.
    ///
    /// Routes added to either instance afterwards are not seen by the other.
    pub fn create_instance(&self) -> FetchMock {
        info!(
            "Creating fetch mock instance with {} inherited route(s)",
            self.router.routes().len()
        );
        FetchMock {
            config: self.config.clone(),
            registry: self.registry.clone(),
            router: self.router.clone(),
            history: CallHistory::new(),
        }
    }

    pub fn config(&self) -> &FetchMockConfig {
        &self.config
    }

    /// Handler-level settings. Changes apply to routes added afterwards and
    /// to calls made afterwards.
    pub fn config_mut(&mut self) -> &mut FetchMockConfig {
        &mut self.config
    }

    pub fn registry(&self) -> &MatcherRegistry {
        &self.registry
    }

    /// Register a matcher with the shared registry. Affects routes compiled
    /// afterwards, in this instance and every instance sharing the registry.
    pub fn add_matcher(&self, definition: MatcherDefinition) -> &Self {
        debug!("Registering matcher {}", definition.key);
        self.registry.add_matcher(definition);
        self
    }

    /// Add a route from criteria, a response and optional extra settings.
    pub fn route(
        &mut self,
        criteria: impl Into<RouteCriteria>,
        response: impl Into<ResponseSpec>,
        options: Option<RouteConfig>,
    ) -> Result<&mut Self, ConfigError> {
        let mut config = criteria.into().into_config();
        if let Some(options) = options {
            config = config.merge(options);
        }
        config.response = Some(response.into());
        self.route_config(config)
    }

    /// Add a route from a full configuration.
    pub fn route_config(&mut self, config: RouteConfig) -> Result<&mut Self, ConfigError> {
        let route = Route::new(config, &self.registry, &self.config)?;
        self.router.add_route(route)?;
        Ok(self)
    }

    /// Respond with `response` to calls no route matches.
    pub fn catch(&mut self, response: impl Into<ResponseSpec>) -> &mut Self {
        let route = Route::fallback(response.into(), &self.config);
        self.router.set_fallback(route);
        self
    }

    /// Respond with an empty 200 to calls no route matches.
    pub fn catch_default(&mut self) -> &mut Self {
        self.catch(ResponseConfig::new())
    }

    /// Register every route of a route file, in order. File settings, when
    /// present, replace the handler settings first.
    pub fn load_routes(&mut self, file: RouteFile) -> Result<&mut Self, ConfigError> {
        let RouteFile {
            settings,
            routes,
            fallback,
        } = file;
        if let Some(settings) = settings {
            self.config = settings;
        }
        let count = routes.len();
        for declared in routes {
            self.route_config(declared.into())?;
        }
        if let Some(fallback) = fallback {
            self.catch(ResponseSpec::from_value(fallback));
        }
        info!("Loaded {} route(s) from route file", count);
        Ok(self)
    }

    pub fn routes(&self) -> &[Arc<Route>] {
        self.router.routes()
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn remove_routes(&mut self, options: RemoveRouteOptions) -> &mut Self {
        self.router.remove_routes(&options);
        self
    }

    /// Intercept a call.
    ///
    /// The call is recorded and, unless a deferred body has to be read
    /// first, matched before this returns. Response resolution happens when
    /// the returned future (or [`FetchMock::flush`]) is polled.
    pub fn fetch_handler(
        &self,
        input: impl Into<RequestInput>,
        init: Option<RequestInit>,
    ) -> FetchFuture {
        let NormalizedRequest {
            url,
            options,
            request,
            signal,
        } = normalize_request(input.into(), init.unwrap_or_default());
        debug!("Intercepted {} {}", options.method, url);

        let call = Arc::new(CallLog::new(url, options, request));
        self.history.record_call(Arc::clone(&call));

        let pre_aborted = signal.as_ref().is_some_and(AbortSignal::is_aborted);
        let needs_body = self.router.needs_to_read_body(&call.options());

        // Routes are selected in call order. Only a call whose deferred body
        // must be read first is selected once that body arrives.
        let resolution: BoxFuture<'static, Result<MockResponse, FetchError>> = if pre_aborted {
            futures::future::ready(Err(FetchError::Aborted)).boxed()
        } else if needs_body {
            let router = self.router.clone();
            let config = self.config.clone();
            let call = Arc::clone(&call);
            async move {
                call.resolve_body().await;
                let route = router.select(&call, &config)?;
                respond(route, &call).await
            }
            .boxed()
        } else {
            let selected = self.router.select(&call, &self.config);
            let call = Arc::clone(&call);
            async move { respond(selected?, &call).await }.boxed()
        };

        let outcome = match signal {
            Some(signal) if !pre_aborted => async move {
                tokio::select! {
                    biased;
                    _ = signal.aborted() => {
                        debug!("Call aborted");
                        Err(FetchError::Aborted)
                    }
                    result = resolution => result,
                }
            }
            .boxed(),
            _ => resolution,
        };

        let shared = outcome.shared();
        let pending: PendingFuture = shared.clone().map(|_| ()).boxed().shared();
        call.add_pending(pending);
        FetchFuture(shared)
    }

    /// Wait for every call made so far to settle.
    pub async fn flush(&self, wait_for_body: bool) {
        self.history.flush(wait_for_body).await;
    }

    /// Whether every route (or only the named ones) was called as expected.
    pub fn done(&self, names: Option<&[&str]>) -> bool {
        self.history.done(self.router.routes(), names)
    }

    /// Recorded calls selected by `filter`.
    pub fn calls(&self, filter: impl Into<CallFilter>) -> Result<CallsView, ConfigError> {
        let filter =
            CompiledFilter::compile(filter.into(), &self.router, &self.registry, &self.config)?;
        Ok(self.history.calls(filter))
    }

    pub fn called(&self, filter: impl Into<CallFilter>) -> Result<bool, ConfigError> {
        Ok(!self.calls(filter)?.is_empty())
    }

    pub fn last_call(
        &self,
        filter: impl Into<CallFilter>,
    ) -> Result<Option<Arc<CallLog>>, ConfigError> {
        Ok(self.calls(filter)?.last().cloned())
    }

    pub fn history(&self) -> &CallHistory {
        &self.history
    }

    /// Forget every recorded call and restore every route's repeat counter.
    pub fn clear_history(&self) -> &Self {
        self.history.clear();
        self.router.reset_routes();
        self
    }
}

impl Default for FetchMock {
    fn default() -> Self {
        Self::new()
    }
}
