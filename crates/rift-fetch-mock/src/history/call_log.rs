use crate::request::{RequestBody, RequestOptions};
use crate::response::MockResponse;
use crate::route::Route;
use futures::future::{BoxFuture, Shared};
use hyper::http::request::Parts;
use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

pub(crate) type PendingFuture = Shared<BoxFuture<'static, ()>>;

/// One intercepted call.
///
/// Created when the call is made; the matched route, the response, the
/// resolved request body and pending work are attached as they become known.
pub struct CallLog {
    url: String,
    options: Mutex<RequestOptions>,
    request: Option<Arc<Parts>>,
    route: Mutex<Option<Arc<Route>>>,
    response: Mutex<Option<MockResponse>>,
    pending: Mutex<Vec<PendingFuture>>,
    body_read: AtomicBool,
}

impl CallLog {
    pub fn new(url: String, options: RequestOptions, request: Option<Arc<Parts>>) -> Self {
        Self {
            url,
            options: Mutex::new(options),
            request,
            route: Mutex::new(None),
            response: Mutex::new(None),
            pending: Mutex::new(Vec::new()),
            body_read: AtomicBool::new(false),
        }
    }

    /// The normalized URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Request options. Do not hold the guard across an await.
    pub fn options(&self) -> MutexGuard<'_, RequestOptions> {
        self.options.lock()
    }

    /// Lower-case request method.
    pub fn method(&self) -> String {
        self.options.lock().method.clone()
    }

    /// Request body text, once available.
    pub fn body_text(&self) -> Option<String> {
        self.options.lock().body_text().map(|b| b.into_owned())
    }

    /// Request body parsed as JSON, once available.
    pub fn body_json(&self) -> Option<serde_json::Value> {
        self.body_text()
            .and_then(|text| serde_json::from_str(&text).ok())
    }

    /// Head of the request object, when the call was made with one.
    pub fn request(&self) -> Option<&Parts> {
        self.request.as_deref()
    }

    /// The route that handled the call, the fallback included.
    pub fn route(&self) -> Option<Arc<Route>> {
        self.route.lock().clone()
    }

    pub fn response(&self) -> Option<MockResponse> {
        self.response.lock().clone()
    }

    /// Handled by a declared route rather than the fallback.
    pub fn is_matched(&self) -> bool {
        self.route
            .lock()
            .as_ref()
            .is_some_and(|route| !route.is_fallback())
    }

    /// Whether the response body was read to the end by
    /// [`crate::CallHistory::flush`].
    pub fn response_body_read(&self) -> bool {
        self.body_read.load(Ordering::Acquire)
    }

    pub(crate) fn mark_response_body_read(&self) {
        self.body_read.store(true, Ordering::Release);
    }

    pub(crate) fn set_route(&self, route: Arc<Route>) {
        *self.route.lock() = Some(route);
    }

    pub(crate) fn set_response(&self, response: MockResponse) {
        *self.response.lock() = Some(response);
    }

    pub(crate) fn add_pending(&self, pending: PendingFuture) {
        self.pending.lock().push(pending);
    }

    pub(crate) fn pending(&self) -> Vec<PendingFuture> {
        self.pending.lock().clone()
    }

    pub(crate) fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Read a deferred request body so body-reading matchers can see it.
    pub(crate) async fn resolve_body(&self) {
        let deferred = self.options.lock().take_deferred_body();
        if let Some(body) = deferred {
            let bytes = body.await;
            debug!("Resolved request body of {} ({} bytes)", self.url, bytes.len());
            self.options.lock().body = Some(RequestBody::Ready(bytes));
        }
    }
}

impl fmt::Debug for CallLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallLog")
            .field("url", &self.url)
            .field("method", &self.method())
            .field("route", &self.route().map(|r| r.describe()))
            .field("status", &self.response().map(|r| r.status()))
            .finish_non_exhaustive()
    }
}
