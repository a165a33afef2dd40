//! Call recording, querying, flush and `done`.

mod call_log;
mod filter;

pub use call_log::CallLog;
pub(crate) use call_log::PendingFuture;
pub use filter::{CallFilter, CallsView};
pub(crate) use filter::CompiledFilter;

use crate::route::Route;
use http_body_util::BodyExt;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, warn};

/// Ordered log of intercepted calls.
#[derive(Debug, Default)]
pub struct CallHistory {
    calls: RwLock<Vec<Arc<CallLog>>>,
}

impl CallHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a call. Happens synchronously when the call is made, before
    /// it is matched.
    pub fn record_call(&self, call: Arc<CallLog>) {
        self.calls.write().push(call);
    }

    /// Every recorded call, in call order.
    pub fn all(&self) -> Vec<Arc<CallLog>> {
        self.calls.read().clone()
    }

    pub fn len(&self) -> usize {
        self.calls.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.read().is_empty()
    }

    pub(crate) fn calls(&self, filter: CompiledFilter) -> CallsView {
        CallsView::new(self.all(), filter)
    }

    /// Wait until every recorded call has settled. With `wait_for_body`,
    /// also read each response body to the end and mark the call
    /// ([`CallLog::response_body_read`]). Calls that failed have no body to
    /// read and stay unmarked.
    ///
    /// Repeats until no new pending work appeared while waiting.
    pub async fn flush(&self, wait_for_body: bool) {
        loop {
            let calls = self.all();
            let pending: Vec<_> = calls.iter().flat_map(|call| call.pending()).collect();
            let count = pending.len();
            debug!("Flushing {} pending future(s)", count);

            futures::future::join_all(pending).await;

            if wait_for_body {
                for call in calls.iter().filter(|call| !call.response_body_read()) {
                    let Some(response) = call.response() else {
                        continue;
                    };
                    let Ok(collected) = response.body().collect().await;
                    debug!(
                        "Read {} byte response body of {}",
                        collected.to_bytes().len(),
                        call.url()
                    );
                    call.mark_response_body_read();
                }
            }

            let after: usize = self.calls.read().iter().map(|c| c.pending_len()).sum();
            if after == count {
                break;
            }
        }
    }

    /// Whether every route, or only the named ones, met its call-count
    /// expectation: exactly `repeat` calls when limited, otherwise at least
    /// one. Unsatisfied routes are logged.
    pub fn done(&self, routes: &[Arc<Route>], names: Option<&[&str]>) -> bool {
        let calls = self.calls.read();
        let selected = routes.iter().filter(|route| match names {
            Some(names) => route.name().is_some_and(|n| names.contains(&n)),
            None => true,
        });

        let mut satisfied = true;
        for route in selected {
            let count = calls
                .iter()
                .filter(|call| call.route().is_some_and(|r| Arc::ptr_eq(&r, route)))
                .count();
            match route.repeat() {
                Some(expected) if count != expected as usize => {
                    warn!(
                        "Route {} was expected to be called {} time(s) but was called {} time(s)",
                        route.describe(),
                        expected,
                        count
                    );
                    satisfied = false;
                }
                None if count == 0 => {
                    warn!("Route {} was not called", route.describe());
                    satisfied = false;
                }
                _ => {}
            }
        }
        satisfied
    }

    /// Forget every recorded call.
    pub fn clear(&self) {
        self.calls.write().clear();
    }
}
