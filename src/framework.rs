//! The registration surface shared by modules and the dispatcher.
//!
//! A [`Framework`] is a cheap handle (a bundle of `Arc`s) over the route
//! table, event bus, handler container and configuration. Modules receive it
//! in their lifecycle hooks; the dispatcher is built from it once loading is
//! done. Registration stays possible while requests are being served.

use std::sync::Arc;

use crate::config::FrameworkConfig;
use crate::dispatch::{Container, Dispatcher, FactoryCheckpoint};
use crate::error::FrameworkError;
use crate::events::{Event, EventBus, Listener, ListenerCheckpoint};
use crate::observability::Logger;
use crate::routing::{Route, RouteSnapshot, RouteTable, SegmentMatcher};

#[derive(Clone, Debug)]
pub struct Framework {
    routes: Arc<RouteTable>,
    events: Arc<EventBus>,
    container: Arc<Container>,
    config: Arc<FrameworkConfig>,
}

impl Framework {
    pub fn new(config: FrameworkConfig) -> Self {
        let routes = RouteTable::new(config.routing.syntax(), config.routing.collision_policy);
        Self {
            routes: Arc::new(routes),
            events: Arc::new(EventBus::new()),
            container: Arc::new(Container::new()),
            config: Arc::new(config),
        }
    }

    /// Register `pattern` → `handler_id`, wrapped by `middleware_ids` in order.
    pub fn register_route<I, S>(
        &self,
        pattern: &str,
        handler_id: &str,
        middleware_ids: I,
    ) -> Result<(), FrameworkError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let route = Route::new(pattern, handler_id)?.with_middlewares(middleware_ids);
        self.register_route_with(route)
    }

    /// Register a fully built route, metadata included.
    pub fn register_route_with(&self, route: Route) -> Result<(), FrameworkError> {
        self.routes.register(route).map(|_| ())
    }

    /// Remove the route stored under `pattern`. Unknown patterns are a no-op.
    pub fn unregister_route(&self, pattern: &str) -> bool {
        self.routes.unregister(pattern).is_some()
    }

    pub fn register_event_listener<E, L>(&self, id: &str, listener: L)
    where
        E: Event,
        L: Listener<E> + 'static,
    {
        self.events.register::<E, L>(id, listener);
    }

    pub fn unregister_event_listener<E: Event>(&self, id: &str) -> bool {
        self.events.unregister::<E>(id)
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn container(&self) -> &Arc<Container> {
        &self.container
    }

    pub fn config(&self) -> &FrameworkConfig {
        &self.config
    }

    /// Record every route, listener and factory registered right now.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            routes: self.routes.snapshot(),
            listeners: self.events.checkpoint(),
            factories: self.container.checkpoint(),
        }
    }

    /// Undo whatever was registered or removed since `checkpoint`.
    pub fn rollback(&self, checkpoint: Checkpoint) {
        self.routes.restore(&checkpoint.routes);
        self.events.restore(checkpoint.listeners);
        self.container.restore(checkpoint.factories);
    }

    /// Build a dispatcher over this framework's shared state.
    ///
    /// The dispatcher sees later registrations; it holds the same `Arc`s.
    pub fn dispatcher(&self, logger: Arc<dyn Logger>) -> Dispatcher {
        let matcher = SegmentMatcher::new(self.routes.syntax().clone());
        Dispatcher::new(
            self.routes.clone(),
            self.events.clone(),
            self.container.clone(),
            Arc::new(matcher),
            logger,
        )
    }
}

/// Registration state captured by [`Framework::checkpoint`].
pub struct Checkpoint {
    routes: RouteSnapshot,
    listeners: ListenerCheckpoint,
    factories: FactoryCheckpoint,
}

impl Default for Framework {
    fn default() -> Self {
        Self::new(FrameworkConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::ServerStarted;
    use crate::routing::CollisionPolicy;

    #[test]
    fn test_register_and_unregister_route() {
        let framework = Framework::default();
        framework
            .register_route("users/%", "users.show", ["auth", "session"])
            .unwrap();

        let route = framework.routes().get("users/%").unwrap();
        assert_eq!(route.handler, "users.show");
        assert_eq!(route.middlewares, vec!["auth", "session"]);

        assert!(framework.unregister_route("users/%"));
        assert!(!framework.unregister_route("users/%"));
        assert!(framework.routes().is_empty());
    }

    #[test]
    fn test_config_drives_route_table() {
        let mut config = FrameworkConfig::default();
        config.routing.collision_policy = CollisionPolicy::Reject;
        let framework = Framework::new(config);

        framework.register_route("a", "first", Vec::<String>::new()).unwrap();
        let err = framework
            .register_route("A", "second", Vec::<String>::new())
            .unwrap_err();
        assert!(matches!(err, FrameworkError::Collision { .. }));
    }

    #[test]
    fn test_event_listener_registration() {
        let framework = Framework::default();
        framework.register_event_listener::<ServerStarted, _>("watcher", |_: &mut ServerStarted| {
            Ok::<(), FrameworkError>(())
        });
        assert_eq!(framework.events().listener_ids::<ServerStarted>(), vec!["watcher"]);
        assert!(framework.unregister_event_listener::<ServerStarted>("watcher"));
    }

    #[test]
    fn test_clones_share_state() {
        let framework = Framework::default();
        let handle = framework.clone();
        handle.register_route("/", "index", Vec::<String>::new()).unwrap();
        assert_eq!(framework.routes().len(), 1);
    }

    #[test]
    fn test_rollback_undoes_partial_registration() {
        let framework = Framework::default();
        framework.register_route("/", "index", Vec::<String>::new()).unwrap();
        let checkpoint = framework.checkpoint();

        framework.register_route("late", "late", Vec::<String>::new()).unwrap();
        framework.register_event_listener::<ServerStarted, _>("late", |_: &mut ServerStarted| {
            Ok::<(), FrameworkError>(())
        });
        framework
            .container()
            .register_handler("late", |_: &Route| Err(FrameworkError::handler("unused")));
        framework.rollback(checkpoint);

        assert_eq!(framework.routes().list(), vec!["/".to_string()]);
        assert!(framework.events().listener_ids::<ServerStarted>().is_empty());
        assert!(!framework.container().has_handler("late"));
    }
}
