//! Request dispatch.
//!
//! # Per-request state machine
//! ```text
//! Received → Unmatched → 404
//!          → Matched → BeforeDispatch published → stopped  → placeholder response
//!                                               → continue → chain runs → AfterDispatch → response
//! any failure, matching included → logged once → best-effort response
//! ```
//!
//! # Design Decisions
//! - Every request works on its own route clone, event and chain instances
//! - Handler and middleware instances are constructed per request, never cached
//! - Errors and panics are caught once, here, and never reach the transport
//! - An unmatched path is a normal outcome, not a failure

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures_util::FutureExt;

use crate::dispatch::chain::{Middleware, Next};
use crate::dispatch::container::Constructor;
use crate::error::{panic_message, FrameworkError};
use crate::events::{AfterDispatch, BeforeDispatch, Event, EventBus};
use crate::http::{Request, Response};
use crate::observability::metrics::{self, Outcome};
use crate::observability::{Logger, Severity};
use crate::routing::{Matcher, Route, RouteTable};

/// Entry point the transport calls for every request.
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    events: Arc<EventBus>,
    constructor: Arc<dyn Constructor>,
    matcher: Arc<dyn Matcher>,
    logger: Arc<dyn Logger>,
}

/// Where a failed dispatch went wrong.
enum Failure {
    Error(FrameworkError),
    Panic(String),
}

impl Dispatcher {
    pub fn new(
        routes: Arc<RouteTable>,
        events: Arc<EventBus>,
        constructor: Arc<dyn Constructor>,
        matcher: Arc<dyn Matcher>,
        logger: Arc<dyn Logger>,
    ) -> Self {
        Self {
            routes,
            events,
            constructor,
            matcher,
            logger,
        }
    }

    /// Route `request` and produce a response. Never fails.
    pub async fn process(&self, request: Request) -> Response {
        let start = Instant::now();
        let path = request.path.clone();

        let mut pattern = None;
        let mut best_effort = Response::not_found();
        let result = AssertUnwindSafe(self.dispatch(request, &mut pattern, &mut best_effort))
            .catch_unwind()
            .await;

        let pattern = pattern.unwrap_or_default();
        let (response, outcome) = match result {
            Ok(Ok((response, outcome))) => (response, outcome),
            Ok(Err(err)) => {
                self.report(&path, &pattern, Failure::Error(err));
                (best_effort, Outcome::Failed)
            }
            Err(panic) => {
                self.report(&path, &pattern, Failure::Panic(panic_message(panic.as_ref())));
                (best_effort, Outcome::Failed)
            }
        };

        metrics::record_dispatch(outcome, start);
        response
    }

    /// Match, then run. `pattern` is set once a route matched.
    async fn dispatch(
        &self,
        request: Request,
        pattern: &mut Option<String>,
        best_effort: &mut Response,
    ) -> Result<(Response, Outcome), FrameworkError> {
        let Some(route) = self.resolve(&request.path) else {
            tracing::debug!(path = %request.path, method = %request.method, "No route matched");
            return Ok((Response::not_found(), Outcome::Unmatched));
        };

        tracing::debug!(path = %request.path, route = %route.pattern, params = ?route.params, "Route matched");
        *pattern = Some(route.pattern.clone());
        self.run_matched(request, route, best_effort).await
    }

    /// The per-request clone of the winning route, wildcards captured.
    fn resolve(&self, path: &str) -> Option<Route> {
        // One snapshot serves both matching and lookup.
        let snapshot = self.routes.snapshot();
        let candidates: Vec<&str> = snapshot.patterns().collect();
        let stored = self
            .matcher
            .resolve(path, &candidates)
            .and_then(|pattern| snapshot.get(pattern))?;

        let mut route = Route::clone(stored);
        route.params = self.routes.syntax().capture(&route.pattern, path);
        Some(route)
    }

    /// Everything after matching. `best_effort` tracks the response to fall
    /// back to if a later step fails.
    async fn run_matched(
        &self,
        request: Request,
        route: Route,
        best_effort: &mut Response,
    ) -> Result<(Response, Outcome), FrameworkError> {
        let mut before = BeforeDispatch::new(request, Response::not_found(), route);
        let published = self.events.publish(&mut before);
        *best_effort = before.response.clone();
        published?;

        if before.is_propagation_stopped() {
            tracing::debug!(route = %before.route.pattern, "Dispatch stopped by listener");
            return Ok((before.response, Outcome::StoppedEarly));
        }

        let (request, placeholder, route) = before.into_parts();
        let method = request.method.clone();
        let path = request.path.clone();

        let handler = self.constructor.construct_handler(&route.handler, &route)?;
        let middlewares = route
            .middlewares
            .iter()
            .map(|id| self.constructor.construct_middleware(id, &route))
            .collect::<Result<Vec<Box<dyn Middleware>>, _>>()?;

        let mut response = Next::new(&middlewares, handler.as_ref()).run(request).await?;
        response.merge_missing_headers(&placeholder.headers);
        *best_effort = response.clone();

        let mut after = AfterDispatch {
            method,
            path,
            route,
            response,
        };
        self.events.publish(&mut after)?;

        Ok((after.response, Outcome::Responded))
    }

    fn report(&self, path: &str, pattern: &str, failure: Failure) {
        let (severity, message, kind, detail) = match failure {
            Failure::Error(err) => {
                let severity = if err.is_not_found() {
                    Severity::Info
                } else {
                    Severity::Notice
                };
                (severity, err.to_string(), error_kind(&err), err.chain())
            }
            Failure::Panic(message) => (Severity::Notice, message.clone(), "panic", message),
        };

        metrics::record_failure(kind);
        self.logger.log(
            severity,
            &message,
            &[
                ("path", path.to_string()),
                ("route", pattern.to_string()),
                ("kind", kind.to_string()),
                ("detail", detail),
            ],
        );
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("routes", &self.routes.len())
            .field("matcher", &self.matcher)
            .finish()
    }
}

fn error_kind(err: &FrameworkError) -> &'static str {
    match err {
        FrameworkError::NotFound { .. } => "not_found",
        FrameworkError::Construction { .. } => "construction",
        FrameworkError::Middleware(_) => "middleware",
        FrameworkError::Handler(_) => "handler",
        FrameworkError::Listener { .. } => "listener",
        _ => "other",
    }
}
