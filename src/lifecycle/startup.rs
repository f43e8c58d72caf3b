//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the framework from validated configuration
//! - Load modules in dependency order and build the dispatcher
//! - Serve until shutdown, then unwind modules in reverse order
//!
//! # Design Decisions
//! - Fail fast on ambiguous module lists; individual module failures are not fatal
//! - Listeners start last (traffic only when modules are loaded)

use std::sync::Arc;

use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

use crate::config::FrameworkConfig;
use crate::dispatch::Dispatcher;
use crate::error::FrameworkError;
use crate::events::{ServerStarted, ServerStopping};
use crate::framework::Framework;
use crate::http::HttpServer;
use crate::lifecycle::shutdown::Shutdown;
use crate::modules::{CoreModule, Module, ModuleRegistry};
use crate::observability::Logger;
use crate::routing::Route;

/// A bootstrapped framework: modules loaded, dispatcher ready.
#[derive(Debug)]
pub struct Application {
    framework: Framework,
    registry: ModuleRegistry,
    dispatcher: Arc<Dispatcher>,
    shutdown: Shutdown,
    /// Subscribed at bootstrap so a trigger before `serve` is not lost.
    stop: broadcast::Receiver<()>,
}

/// What `routes` prints: load order plus the registered routes.
#[derive(Debug, Serialize)]
pub struct Inventory {
    pub modules: Vec<String>,
    pub routes: Vec<Route>,
}

impl Application {
    /// The modules every application starts with.
    pub fn default_modules() -> Vec<Arc<dyn Module>> {
        vec![Arc::new(CoreModule::new())]
    }

    pub fn bootstrap(
        config: FrameworkConfig,
        modules: Vec<Arc<dyn Module>>,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, FrameworkError> {
        let framework = Framework::new(config);
        let mut registry = ModuleRegistry::new(modules, &framework.config().modules, logger.clone())?;

        let loaded = registry.load_all(&framework);
        tracing::info!(
            loaded,
            order = ?registry.loaded(),
            routes = framework.routes().len(),
            "Modules loaded"
        );

        let dispatcher = Arc::new(framework.dispatcher(logger));
        let shutdown = Shutdown::new();
        let stop = shutdown.subscribe();
        Ok(Self {
            framework,
            registry,
            dispatcher,
            shutdown,
            stop,
        })
    }

    pub fn framework(&self) -> &Framework {
        &self.framework
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        self.dispatcher.clone()
    }

    /// A handle that stops [`Application::serve`] when triggered.
    pub fn shutdown_handle(&self) -> Shutdown {
        self.shutdown.clone()
    }

    /// Loaded modules and registered routes, sorted by pattern.
    pub fn inventory(&self) -> Inventory {
        let mut routes: Vec<Route> = self
            .framework
            .routes()
            .snapshot()
            .routes()
            .map(|route| Route::clone(route))
            .collect();
        routes.sort_by(|a, b| a.pattern.cmp(&b.pattern));

        Inventory {
            modules: self.registry.loaded().into_iter().map(str::to_owned).collect(),
            routes,
        }
    }

    /// Serve on `listener` until the shutdown handle fires, then unload.
    pub async fn serve(mut self, listener: TcpListener) -> Result<(), std::io::Error> {
        let bind_address = listener.local_addr()?.to_string();
        let server = HttpServer::new(self.dispatcher.clone(), self.framework.config());
        let fresh = self.shutdown.subscribe();
        let stop = std::mem::replace(&mut self.stop, fresh);

        let mut started = ServerStarted { bind_address };
        if let Err(e) = self.framework.events().publish(&mut started) {
            tracing::warn!(error = %e.chain(), "ServerStarted listener failed");
        }
        self.registry.server_started(&self.framework);

        let served = server.run(listener, stop).await;

        if let Err(e) = self.framework.events().publish(&mut ServerStopping) {
            tracing::warn!(error = %e.chain(), "ServerStopping listener failed");
        }
        self.registry.server_stopping(&self.framework);
        self.unload();

        served
    }

    /// Run every loaded module's `on_unload`, in reverse load order.
    pub fn unload(&mut self) {
        self.registry.unload_all(&self.framework);
    }
}
