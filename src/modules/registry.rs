//! Module registration and lifecycle.
//!
//! # Responsibilities
//! - Accept an explicit list of modules and reject ambiguous names
//! - Drop disabled modules and order the rest by their declared constraints
//! - Run lifecycle hooks in order, isolating each module's failures
//!
//! # Design Decisions
//! - A module whose hook fails or panics is logged and skipped; the rest still load
//! - Whatever a failed `on_load` registered before failing is rolled back
//! - Unload and server-stop hooks run in reverse load order
//! - Modules caught in a dependency cycle are skipped unless configured otherwise

use std::collections::{HashMap, HashSet};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::ModulesConfig;
use crate::error::{panic_message, FrameworkError};
use crate::framework::Framework;
use crate::modules::order::{topological_order, DependencyNode, Ordering};
use crate::observability::metrics;
use crate::observability::{Logger, Severity};

/// A unit of functionality plugged into the framework.
///
/// Every hook is optional. Hooks receive the shared [`Framework`] handle and
/// register or remove routes, listeners and factories through it.
pub trait Module: Send + Sync {
    /// Unique module name, referenced by other modules' constraints.
    fn name(&self) -> &str;

    /// Modules this one must load before.
    fn load_before(&self) -> Vec<String> {
        Vec::new()
    }

    /// Modules this one must load after.
    fn load_after(&self) -> Vec<String> {
        Vec::new()
    }

    fn on_load(&self, _framework: &Framework) -> Result<(), FrameworkError> {
        Ok(())
    }

    fn on_unload(&self, _framework: &Framework) -> Result<(), FrameworkError> {
        Ok(())
    }

    fn on_server_start(&self, _framework: &Framework) -> Result<(), FrameworkError> {
        Ok(())
    }

    fn on_server_stop(&self, _framework: &Framework) -> Result<(), FrameworkError> {
        Ok(())
    }
}

/// Ordered set of modules and the subset currently loaded.
pub struct ModuleRegistry {
    /// Modules selected for loading, in load order.
    modules: Vec<Arc<dyn Module>>,
    ordering: Ordering,
    loaded: Vec<usize>,
    logger: Arc<dyn Logger>,
}

impl ModuleRegistry {
    pub fn new(
        modules: Vec<Arc<dyn Module>>,
        config: &ModulesConfig,
        logger: Arc<dyn Logger>,
    ) -> Result<Self, FrameworkError> {
        let mut seen = HashSet::new();
        for module in &modules {
            if !seen.insert(module.name().to_string()) {
                return Err(FrameworkError::AmbiguousModule {
                    name: module.name().to_string(),
                });
            }
        }

        let disabled: HashSet<&str> = config.disabled.iter().map(String::as_str).collect();
        let (enabled, skipped): (Vec<_>, Vec<_>) = modules
            .into_iter()
            .partition(|module| !disabled.contains(module.name()));
        for module in &skipped {
            tracing::info!(module = %module.name(), "Module disabled by configuration");
        }

        let nodes: Vec<DependencyNode> = enabled
            .iter()
            .map(|module| {
                DependencyNode::new(module.name())
                    .before(module.load_before())
                    .after(module.load_after())
            })
            .collect();
        let ordering = topological_order(&nodes);

        for missing in &ordering.missing {
            logger.log(
                Severity::Warning,
                "Module constraint names an unknown module",
                &[
                    ("module", missing.node.clone()),
                    ("reference", missing.reference.clone()),
                ],
            );
        }
        if ordering.has_cycle() {
            let action = if config.load_unresolved {
                "loaded last"
            } else {
                "skipped"
            };
            logger.log(
                Severity::Warning,
                "Circular module dependency",
                &[
                    ("modules", ordering.unresolved.join(", ")),
                    ("action", action.to_string()),
                ],
            );
        }

        let selected = if config.load_unresolved {
            ordering.sequence()
        } else {
            ordering.sorted.clone()
        };
        let mut by_name: HashMap<String, Arc<dyn Module>> = enabled
            .into_iter()
            .map(|module| (module.name().to_string(), module))
            .collect();
        let modules = selected
            .iter()
            .filter_map(|name| by_name.remove(name))
            .collect();

        Ok(Self {
            modules,
            ordering,
            loaded: Vec::new(),
            logger,
        })
    }

    /// Names of the modules that will load, in load order.
    pub fn order(&self) -> Vec<&str> {
        self.modules.iter().map(|module| module.name()).collect()
    }

    /// Names of the modules whose `on_load` succeeded, in load order.
    pub fn loaded(&self) -> Vec<&str> {
        self.loaded
            .iter()
            .map(|&i| self.modules[i].name())
            .collect()
    }

    pub fn ordering(&self) -> &Ordering {
        &self.ordering
    }

    /// Run `on_load` for every module in order. Returns how many succeeded.
    pub fn load_all(&mut self, framework: &Framework) -> usize {
        let mut loaded = Vec::with_capacity(self.modules.len());
        for (i, module) in self.modules.iter().enumerate() {
            let checkpoint = framework.checkpoint();
            if self.run_hook("on_load", module.as_ref(), || module.on_load(framework)) {
                tracing::info!(module = %module.name(), "Module loaded");
                loaded.push(i);
            } else {
                framework.rollback(checkpoint);
                tracing::warn!(module = %module.name(), "Registrations from failed load rolled back");
            }
        }
        self.loaded = loaded;
        self.loaded.len()
    }

    /// Run `on_unload` for loaded modules in reverse load order.
    pub fn unload_all(&mut self, framework: &Framework) {
        let loaded = std::mem::take(&mut self.loaded);
        for &i in loaded.iter().rev() {
            let module = &self.modules[i];
            if self.run_hook("on_unload", module.as_ref(), || module.on_unload(framework)) {
                tracing::info!(module = %module.name(), "Module unloaded");
            }
        }
    }

    pub fn server_started(&self, framework: &Framework) {
        for &i in &self.loaded {
            let module = &self.modules[i];
            self.run_hook("on_server_start", module.as_ref(), || module.on_server_start(framework));
        }
    }

    pub fn server_stopping(&self, framework: &Framework) {
        for &i in self.loaded.iter().rev() {
            let module = &self.modules[i];
            self.run_hook("on_server_stop", module.as_ref(), || module.on_server_stop(framework));
        }
    }

    /// Run one hook, turning an error or panic into a logged failure.
    fn run_hook<F>(&self, hook: &'static str, module: &dyn Module, f: F) -> bool
    where
        F: FnOnce() -> Result<(), FrameworkError>,
    {
        let detail = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(Ok(())) => None,
            Ok(Err(err)) => Some(FrameworkError::module(module.name(), err).chain()),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };

        metrics::record_module_hook(hook, detail.is_none());
        match detail {
            None => true,
            Some(detail) => {
                self.logger.log(
                    Severity::Error,
                    "Module hook failed",
                    &[
                        ("module", module.name().to_string()),
                        ("hook", hook.to_string()),
                        ("detail", detail),
                    ],
                );
                false
            }
        }
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleRegistry")
            .field("order", &self.order())
            .field("loaded", &self.loaded())
            .finish()
    }
}
