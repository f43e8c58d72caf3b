//! Middleware chain.
//!
//! Chain-of-responsibility: each middleware gets the request and the rest of
//! the chain as [`Next`]. It may call `next.run(request)` once, transform the
//! response it gets back, or answer on its own without calling it.

use async_trait::async_trait;

use crate::error::FrameworkError;
use crate::http::{Request, Response};

/// Produces the response at the end of the chain.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, request: Request) -> Result<Response, FrameworkError>;
}

/// Transforms a request on its way in and the response on its way out.
#[async_trait]
pub trait Middleware: Send + Sync {
    async fn process(&self, request: Request, next: Next<'_>) -> Result<Response, FrameworkError>;
}

/// The remainder of a middleware chain.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    middlewares: &'a [Box<dyn Middleware>],
    handler: &'a dyn Handler,
}

impl<'a> Next<'a> {
    pub fn new(middlewares: &'a [Box<dyn Middleware>], handler: &'a dyn Handler) -> Self {
        Self { middlewares, handler }
    }

    pub async fn run(self, request: Request) -> Result<Response, FrameworkError> {
        match self.middlewares.split_first() {
            Some((current, rest)) => {
                current
                    .process(request, Next::new(rest, self.handler))
                    .await
            }
            None => self.handler.handle(request).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Method, StatusCode};
    use std::sync::{Arc, Mutex};

    struct Echo;

    #[async_trait]
    impl Handler for Echo {
        async fn handle(&self, request: Request) -> Result<Response, FrameworkError> {
            let tag = request.header("x-tag").unwrap_or("none").to_string();
            Ok(Response::text(StatusCode::OK, tag))
        }
    }

    struct Tag {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Middleware for Tag {
        async fn process(&self, mut request: Request, next: Next<'_>) -> Result<Response, FrameworkError> {
            self.log.lock().unwrap().push(format!("in:{}", self.name));
            let existing = request.header("x-tag").unwrap_or("").to_string();
            let tagged = format!("{existing}{}", self.name);
            request
                .headers
                .insert("x-tag", HeaderValue::from_str(&tagged).unwrap());
            let response = next.run(request).await;
            self.log.lock().unwrap().push(format!("out:{}", self.name));
            response
        }
    }

    struct Deny;

    #[async_trait]
    impl Middleware for Deny {
        async fn process(&self, _request: Request, _next: Next<'_>) -> Result<Response, FrameworkError> {
            Ok(Response::new(StatusCode::FORBIDDEN))
        }
    }

    #[tokio::test]
    async fn test_chain_runs_in_order_and_unwinds() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares: Vec<Box<dyn Middleware>> = vec![
            Box::new(Tag { name: "a", log: log.clone() }),
            Box::new(Tag { name: "b", log: log.clone() }),
        ];

        let response = Next::new(&middlewares, &Echo)
            .run(Request::new(Method::GET, "/"))
            .await
            .unwrap();

        assert_eq!(response.body.as_ref(), b"ab");
        assert_eq!(*log.lock().unwrap(), vec!["in:a", "in:b", "out:b", "out:a"]);
    }

    #[tokio::test]
    async fn test_middleware_can_short_circuit() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let middlewares: Vec<Box<dyn Middleware>> = vec![
            Box::new(Deny),
            Box::new(Tag { name: "never", log: log.clone() }),
        ];

        let response = Next::new(&middlewares, &Echo)
            .run(Request::new(Method::GET, "/"))
            .await
            .unwrap();

        assert_eq!(response.status, StatusCode::FORBIDDEN);
        assert!(log.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chain_calls_handler() {
        let response = Next::new(&[], &Echo)
            .run(Request::new(Method::GET, "/"))
            .await
            .unwrap();
        assert_eq!(response.body.as_ref(), b"none");
    }
}
