use super::CallLog;
use crate::config::FetchMockConfig;
use crate::error::ConfigError;
use crate::predicate::MatcherRegistry;
use crate::route::{Route, RouteConfig};
use crate::router::Router;
use std::sync::Arc;

/// Which calls a history query selects.
#[derive(Debug, Clone, Default)]
pub enum CallFilter {
    #[default]
    All,
    /// Calls handled by a declared route
    Matched,
    /// Calls handled by the fallback, or by nothing
    Unmatched,
    /// Calls handled by the named route; a name no route carries is read as a
    /// URL pattern
    Route(String),
    /// Calls whose request satisfies the given criteria
    Criteria(RouteConfig),
}

impl From<&str> for CallFilter {
    fn from(filter: &str) -> Self {
        match filter {
            "matched" => CallFilter::Matched,
            "unmatched" => CallFilter::Unmatched,
            other => CallFilter::Route(other.to_string()),
        }
    }
}

impl From<String> for CallFilter {
    fn from(filter: String) -> Self {
        CallFilter::from(filter.as_str())
    }
}

impl From<bool> for CallFilter {
    fn from(matched: bool) -> Self {
        if matched {
            CallFilter::Matched
        } else {
            CallFilter::Unmatched
        }
    }
}

impl From<RouteConfig> for CallFilter {
    fn from(criteria: RouteConfig) -> Self {
        CallFilter::Criteria(criteria)
    }
}

impl From<()> for CallFilter {
    fn from(_: ()) -> Self {
        CallFilter::All
    }
}

#[derive(Debug)]
pub(crate) enum CompiledFilter {
    All,
    Matched,
    Unmatched,
    Route(String),
    Criteria(Route),
}

impl CompiledFilter {
    pub(crate) fn compile(
        filter: CallFilter,
        router: &Router,
        registry: &MatcherRegistry,
        defaults: &FetchMockConfig,
    ) -> Result<Self, ConfigError> {
        let criteria = match filter {
            CallFilter::All => return Ok(CompiledFilter::All),
            CallFilter::Matched => return Ok(CompiledFilter::Matched),
            CallFilter::Unmatched => return Ok(CompiledFilter::Unmatched),
            CallFilter::Route(name) => {
                if router.routes().iter().any(|r| r.name() == Some(name.as_str())) {
                    return Ok(CompiledFilter::Route(name));
                }
                RouteConfig::new().url(name)
            }
            CallFilter::Criteria(criteria) => criteria,
        };
        // Criteria are compiled like a route; the response is never used.
        let criteria = RouteConfig {
            repeat: None,
            response: Some(200.into()),
            ..criteria
        };
        Route::new(criteria, registry, defaults).map(CompiledFilter::Criteria)
    }

    pub(crate) fn accepts(&self, call: &CallLog) -> bool {
        match self {
            CompiledFilter::All => true,
            CompiledFilter::Matched => call.is_matched(),
            CompiledFilter::Unmatched => !call.is_matched(),
            CompiledFilter::Route(name) => call
                .route()
                .is_some_and(|route| route.name() == Some(name.as_str())),
            CompiledFilter::Criteria(route) => {
                let options = call.options();
                route.evaluate(call.url(), &options, call.request())
            }
        }
    }
}

/// A lazy, restartable view over a snapshot of recorded calls.
///
/// Every iteration re-applies the filter from the first call, in call order.
#[derive(Debug)]
pub struct CallsView {
    calls: Vec<Arc<CallLog>>,
    filter: CompiledFilter,
}

impl CallsView {
    pub(crate) fn new(calls: Vec<Arc<CallLog>>, filter: CompiledFilter) -> Self {
        Self { calls, filter }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<CallLog>> + '_ {
        self.calls.iter().filter(|call| self.filter.accepts(call))
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    pub fn first(&self) -> Option<&Arc<CallLog>> {
        self.iter().next()
    }

    pub fn last(&self) -> Option<&Arc<CallLog>> {
        self.iter().last()
    }

    pub fn to_vec(&self) -> Vec<Arc<CallLog>> {
        self.iter().cloned().collect()
    }
}

impl<'a> IntoIterator for &'a CallsView {
    type Item = &'a Arc<CallLog>;
    type IntoIter = Box<dyn Iterator<Item = &'a Arc<CallLog>> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
