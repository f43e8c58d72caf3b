//! The built-in module.
//!
//! Registers the index page (behind the session middleware), a health route
//! and a listener that announces when the server is accepting requests.
//! While the server runs it also sweeps expired sessions. Everything it
//! registers is removed again on unload.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use tokio::runtime::Handle;
use tokio::sync::broadcast;

use crate::dispatch::{Handler, Middleware};
use crate::error::FrameworkError;
use crate::events::{Listener, ServerStarted};
use crate::framework::Framework;
use crate::http::middleware::{MemorySessionStore, Session, SessionMiddleware};
use crate::http::{Request, Response};
use crate::modules::registry::Module;
use crate::routing::Route;

pub const MODULE_NAME: &str = "framework";
pub const INDEX_HANDLER: &str = "framework.index";
pub const HEALTH_HANDLER: &str = "framework.health";
pub const SESSION_MIDDLEWARE: &str = "framework.session";
pub const READY_LISTENER: &str = "framework.ready";

pub const INDEX_PATTERN: &str = "/";
pub const HEALTH_PATTERN: &str = "health";

const INDEX_PAGE: &str = "<!DOCTYPE html>\n\
<html>\n\
<head><meta charset=\"utf-8\"><title>route-dispatch</title></head>\n\
<body><h1>It works</h1><p>No module has claimed this page yet.</p></body>\n\
</html>\n";

#[derive(Debug)]
pub struct CoreModule {
    sessions: Arc<MemorySessionStore>,
    /// Stops the session cleanup task.
    stop_cleanup: broadcast::Sender<()>,
}

impl CoreModule {
    pub fn new() -> Self {
        let (stop_cleanup, _) = broadcast::channel(1);
        Self {
            sessions: Arc::default(),
            stop_cleanup,
        }
    }

    /// The store backing the session middleware.
    pub fn sessions(&self) -> &Arc<MemorySessionStore> {
        &self.sessions
    }
}

impl Default for CoreModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for CoreModule {
    fn name(&self) -> &str {
        MODULE_NAME
    }

    fn on_load(&self, framework: &Framework) -> Result<(), FrameworkError> {
        let container = framework.container();
        container.register_handler(INDEX_HANDLER, |_: &Route| Ok(Box::new(IndexPage) as Box<dyn Handler>));
        container.register_handler(HEALTH_HANDLER, |_: &Route| Ok(Box::new(HealthCheck) as Box<dyn Handler>));

        let session = framework.config().session.clone();
        let mut index_middlewares = Vec::new();
        if session.enabled {
            let store = self.sessions.clone();
            container.register_middleware(SESSION_MIDDLEWARE, move |_: &Route| {
                Ok(Box::new(SessionMiddleware::new(store.clone(), session.clone())) as Box<dyn Middleware>)
            });
            index_middlewares.push(SESSION_MIDDLEWARE);
        }

        framework.register_route(INDEX_PATTERN, INDEX_HANDLER, index_middlewares)?;
        framework.register_route(HEALTH_PATTERN, HEALTH_HANDLER, Vec::<String>::new())?;
        framework.register_event_listener::<ServerStarted, _>(READY_LISTENER, ReadyAnnouncer);
        Ok(())
    }

    fn on_unload(&self, framework: &Framework) -> Result<(), FrameworkError> {
        framework.unregister_route(INDEX_PATTERN);
        framework.unregister_route(HEALTH_PATTERN);
        framework.unregister_event_listener::<ServerStarted>(READY_LISTENER);

        let container = framework.container();
        container.unregister_handler(INDEX_HANDLER);
        container.unregister_handler(HEALTH_HANDLER);
        container.unregister_middleware(SESSION_MIDDLEWARE);
        Ok(())
    }

    fn on_server_start(&self, framework: &Framework) -> Result<(), FrameworkError> {
        let session = &framework.config().session;
        if !session.enabled {
            return Ok(());
        }
        let runtime =
            Handle::try_current().map_err(|err| FrameworkError::construction("session cleanup", err.to_string()))?;
        let every = Duration::from_secs(session.cleanup_interval_secs);
        runtime.spawn(self.sessions.clone().run_cleanup(every, self.stop_cleanup.subscribe()));
        Ok(())
    }

    fn on_server_stop(&self, _framework: &Framework) -> Result<(), FrameworkError> {
        // No receivers just means cleanup never started.
        let _ = self.stop_cleanup.send(());
        Ok(())
    }
}

struct IndexPage;

#[async_trait]
impl Handler for IndexPage {
    async fn handle(&self, request: Request) -> Result<Response, FrameworkError> {
        if let Some(session) = request.extensions.get::<Session>() {
            tracing::trace!(session = %session.id(), "Serving index page");
        }
        Ok(Response::html(StatusCode::OK, INDEX_PAGE))
    }
}

struct HealthCheck;

#[async_trait]
impl Handler for HealthCheck {
    async fn handle(&self, _request: Request) -> Result<Response, FrameworkError> {
        Ok(Response::text(StatusCode::OK, "ok"))
    }
}

struct ReadyAnnouncer;

impl Listener<ServerStarted> for ReadyAnnouncer {
    fn handle(&self, event: &mut ServerStarted) -> Result<(), FrameworkError> {
        tracing::info!(address = %event.bind_address, "Accepting requests");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FrameworkConfig;
    use crate::modules::ModuleRegistry;
    use crate::observability::TracingLogger;
    use crate::routing::CollisionPolicy;
    use axum::http::{header, Method};

    fn loaded(config: FrameworkConfig) -> (Framework, CoreModule) {
        let framework = Framework::new(config);
        let module = CoreModule::new();
        module.on_load(&framework).unwrap();
        (framework, module)
    }

    #[tokio::test]
    async fn test_index_starts_a_session() {
        let (framework, module) = loaded(FrameworkConfig::default());
        let dispatcher = framework.dispatcher(Arc::new(TracingLogger));

        let response = dispatcher.process(Request::new(Method::GET, "/")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.headers.get(header::SET_COOKIE).is_some());
        assert_eq!(module.sessions().len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_can_be_disabled() {
        let mut config = FrameworkConfig::default();
        config.session.enabled = false;
        let (framework, module) = loaded(config);
        let dispatcher = framework.dispatcher(Arc::new(TracingLogger));

        let response = dispatcher.process(Request::new(Method::GET, "/")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert!(response.headers.get(header::SET_COOKIE).is_none());
        assert!(module.sessions().is_empty());
        assert!(!framework.container().has_middleware(SESSION_MIDDLEWARE));
    }

    #[tokio::test]
    async fn test_health_route() {
        let (framework, _) = loaded(FrameworkConfig::default());
        let dispatcher = framework.dispatcher(Arc::new(TracingLogger));

        let response = dispatcher.process(Request::new(Method::GET, "/health/")).await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body.as_ref(), b"ok");
    }

    #[test]
    fn test_unload_removes_everything() {
        let (framework, module) = loaded(FrameworkConfig::default());
        assert_eq!(framework.events().listener_ids::<ServerStarted>(), vec![READY_LISTENER]);

        module.on_unload(&framework).unwrap();
        assert!(framework.routes().is_empty());
        assert!(framework.events().listener_ids::<ServerStarted>().is_empty());
        assert!(!framework.container().has_handler(INDEX_HANDLER));
        assert!(!framework.container().has_handler(HEALTH_HANDLER));
        assert!(!framework.container().has_middleware(SESSION_MIDDLEWARE));
    }

    #[test]
    fn test_rejected_route_rolls_back_the_whole_module() {
        let mut config = FrameworkConfig::default();
        config.routing.collision_policy = CollisionPolicy::Reject;
        let framework = Framework::new(config);
        framework.register_route("HEALTH", "app.health", Vec::<String>::new()).unwrap();

        let mut registry = ModuleRegistry::new(
            vec![Arc::new(CoreModule::new()) as Arc<dyn Module>],
            &framework.config().modules,
            Arc::new(TracingLogger),
        )
        .unwrap();

        assert_eq!(registry.load_all(&framework), 0);
        assert_eq!(framework.routes().list(), vec!["HEALTH".to_string()]);
        assert!(!framework.container().has_handler(INDEX_HANDLER));
        assert!(!framework.container().has_middleware(SESSION_MIDDLEWARE));
        assert!(framework.events().listener_ids::<ServerStarted>().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_sessions_are_swept_while_serving() {
        let mut config = FrameworkConfig::default();
        config.session.expiration_secs = 1;
        config.session.cleanup_interval_secs = 1;
        let (framework, module) = loaded(config);
        let dispatcher = framework.dispatcher(Arc::new(TracingLogger));

        module.on_server_start(&framework).unwrap();
        for _ in 0..100 {
            dispatcher.process(Request::new(Method::GET, "/")).await;
        }
        assert_eq!(module.sessions().len(), 100);

        tokio::time::sleep(Duration::from_millis(2100)).await;
        assert!(module.sessions().is_empty());

        module.on_server_stop(&framework).unwrap();
        for _ in 0..10 {
            dispatcher.process(Request::new(Method::GET, "/")).await;
        }
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(module.sessions().len(), 10);
    }

    #[test]
    fn test_cleanup_needs_a_runtime() {
        let (framework, module) = loaded(FrameworkConfig::default());
        assert!(matches!(
            module.on_server_start(&framework),
            Err(FrameworkError::Construction { .. })
        ));
    }
}
