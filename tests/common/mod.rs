//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::{HeaderValue, StatusCode};
use route_dispatch::dispatch::{Handler, Middleware, Next};
use route_dispatch::http::{Request, Response};
use route_dispatch::observability::{LogContext, Logger, Severity};
use route_dispatch::routing::Route;
use route_dispatch::{Framework, FrameworkError};

/// One captured log call.
#[derive(Debug, Clone)]
pub struct Record {
    pub severity: Severity,
    pub message: String,
    pub context: Vec<(&'static str, String)>,
}

impl Record {
    pub fn field(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Logger that keeps every record for assertions.
#[derive(Debug, Default)]
pub struct RecordingLogger {
    records: Mutex<Vec<Record>>,
}

impl RecordingLogger {
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }
}

impl Logger for RecordingLogger {
    fn log(&self, severity: Severity, message: &str, context: LogContext<'_>) {
        self.records.lock().unwrap().push(Record {
            severity,
            message: message.to_string(),
            context: context.to_vec(),
        });
    }
}

/// Answers with a fixed body, plus the captured route params.
pub struct Fixed(pub &'static str);

#[async_trait]
impl Handler for Fixed {
    async fn handle(&self, _request: Request) -> Result<Response, FrameworkError> {
        Ok(Response::text(StatusCode::OK, self.0))
    }
}

/// Echoes the route params it was constructed with, joined by commas.
pub struct Params(pub Vec<String>);

#[async_trait]
impl Handler for Params {
    async fn handle(&self, _request: Request) -> Result<Response, FrameworkError> {
        Ok(Response::text(StatusCode::OK, self.0.join(",")))
    }
}

pub struct Failing;

#[async_trait]
impl Handler for Failing {
    async fn handle(&self, _request: Request) -> Result<Response, FrameworkError> {
        Err(FrameworkError::handler(std::io::Error::other("storage offline")))
    }
}

pub struct Panicking;

#[async_trait]
impl Handler for Panicking {
    async fn handle(&self, _request: Request) -> Result<Response, FrameworkError> {
        panic!("handler exploded")
    }
}

/// Appends its name to the `x-trail` response header and a shared journal.
pub struct Trail {
    pub name: &'static str,
    pub journal: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Middleware for Trail {
    async fn process(&self, request: Request, next: Next<'_>) -> Result<Response, FrameworkError> {
        self.journal.lock().unwrap().push(format!("before:{}", self.name));
        let mut response = next.run(request).await?;
        self.journal.lock().unwrap().push(format!("after:{}", self.name));
        response
            .headers
            .append("x-trail", HeaderValue::from_static(self.name));
        Ok(response)
    }
}

/// A framework with the test handlers registered under their usual ids.
pub fn framework() -> Framework {
    let framework = Framework::default();
    let container = framework.container();
    container.register_handler("ok", |_: &Route| Ok(Box::new(Fixed("ok")) as Box<dyn Handler>));
    container.register_handler("params", |route: &Route| {
        Ok(Box::new(Params(route.params.clone())) as Box<dyn Handler>)
    });
    container.register_handler("failing", |_: &Route| Ok(Box::new(Failing) as Box<dyn Handler>));
    container.register_handler("panicking", |_: &Route| Ok(Box::new(Panicking) as Box<dyn Handler>));
    framework
}
