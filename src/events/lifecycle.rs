//! Lifecycle events published by the dispatcher and the server.

use axum::http::Method;

use crate::events::bus::Event;
use crate::http::{Request, Response};
use crate::routing::Route;

/// Published after a route matched, before middleware and handler run.
///
/// Listeners may edit the request, the placeholder response and the cloned
/// route. Stopping propagation answers the request with the placeholder
/// response as it stands, skipping middleware and handler.
#[derive(Debug)]
pub struct BeforeDispatch {
    pub request: Request,
    pub response: Response,
    pub route: Route,
    stopped: bool,
}

impl BeforeDispatch {
    pub fn new(request: Request, response: Response, route: Route) -> Self {
        Self {
            request,
            response,
            route,
            stopped: false,
        }
    }

    pub fn stop_propagation(&mut self) {
        self.stopped = true;
    }

    pub fn into_parts(self) -> (Request, Response, Route) {
        (self.request, self.response, self.route)
    }
}

impl Event for BeforeDispatch {
    fn is_propagation_stopped(&self) -> bool {
        self.stopped
    }
}

/// Published once the chain produced a response. Every listener runs.
#[derive(Debug)]
pub struct AfterDispatch {
    pub method: Method,
    pub path: String,
    pub route: Route,
    pub response: Response,
}

impl Event for AfterDispatch {}

/// Published when the HTTP listener is bound and about to accept requests.
#[derive(Debug, Clone)]
pub struct ServerStarted {
    pub bind_address: String,
}

impl Event for ServerStarted {}

/// Published when shutdown begins, before modules are unloaded.
#[derive(Debug, Clone, Default)]
pub struct ServerStopping;

impl Event for ServerStopping {}
