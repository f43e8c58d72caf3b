//! Route table.
//!
//! # Responsibilities
//! - Store registered routes keyed by canonical pattern
//! - Detect structurally identical patterns on registration
//! - Hand out immutable snapshots for dispatch
//!
//! # Design Decisions
//! - Copy-on-write: writers build a new map and swap it in atomically
//! - Readers never lock and never observe a half-applied registration
//! - Writers serialize on a mutex; registration happens at module load/unload only

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use arc_swap::ArcSwap;
use serde::{Deserialize, Serialize};

use crate::error::FrameworkError;
use crate::routing::route::{PatternSyntax, Route};

/// What to do when a registration collides with an existing pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Last registration wins.
    #[default]
    Replace,
    /// Refuse the registration with [`FrameworkError::Collision`].
    Reject,
}

type RouteMap = HashMap<String, Arc<Route>>;

/// Shared registry of routes.
#[derive(Debug)]
pub struct RouteTable {
    syntax: PatternSyntax,
    policy: CollisionPolicy,
    routes: ArcSwap<RouteMap>,
    write_lock: Mutex<()>,
}

impl RouteTable {
    pub fn new(syntax: PatternSyntax, policy: CollisionPolicy) -> Self {
        Self {
            syntax,
            policy,
            routes: ArcSwap::from_pointee(RouteMap::new()),
            write_lock: Mutex::new(()),
        }
    }

    pub fn syntax(&self) -> &PatternSyntax {
        &self.syntax
    }

    /// Insert or replace a route.
    ///
    /// Returns the route it displaced, if any. Under [`CollisionPolicy::Reject`]
    /// a structurally identical pattern fails instead.
    pub fn register(&self, route: Route) -> Result<Option<Arc<Route>>, FrameworkError> {
        let key = self.syntax.canonical(&route.pattern);
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.routes.load_full();
        if let Some(existing) = current.get(&key) {
            match self.policy {
                CollisionPolicy::Reject => {
                    return Err(FrameworkError::Collision {
                        pattern: route.pattern,
                        existing: existing.pattern.clone(),
                    });
                }
                CollisionPolicy::Replace => {
                    tracing::warn!(
                        pattern = %route.pattern,
                        existing = %existing.pattern,
                        "Route replaced by later registration"
                    );
                }
            }
        }

        tracing::debug!(
            pattern = %route.pattern,
            handler = %route.handler,
            middlewares = ?route.middlewares,
            "Route registered"
        );

        let mut next = RouteMap::clone(&current);
        let previous = next.insert(key, Arc::new(route));
        self.routes.store(Arc::new(next));
        Ok(previous)
    }

    /// Remove a route. Absent patterns are a no-op.
    pub fn unregister(&self, pattern: &str) -> Option<Arc<Route>> {
        let key = self.syntax.canonical(pattern);
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.routes.load_full();
        if !current.contains_key(&key) {
            return None;
        }

        let mut next = RouteMap::clone(&current);
        let removed = next.remove(&key);
        self.routes.store(Arc::new(next));
        tracing::debug!(pattern = %pattern, "Route unregistered");
        removed
    }

    pub fn get(&self, pattern: &str) -> Result<Arc<Route>, FrameworkError> {
        self.snapshot()
            .get(pattern)
            .cloned()
            .ok_or_else(|| FrameworkError::not_found("route", pattern))
    }

    /// Registered patterns as spelled at registration. Order is unspecified.
    pub fn list(&self) -> Vec<String> {
        self.snapshot().patterns().map(str::to_string).collect()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Immutable view of the table at this instant.
    pub fn snapshot(&self) -> RouteSnapshot {
        RouteSnapshot {
            syntax: self.syntax.clone(),
            routes: self.routes.load_full(),
        }
    }
}

impl RouteTable {
    /// Put back every pattern that changed since `snapshot` was taken.
    ///
    /// Patterns added since are removed; replaced or removed ones get their
    /// earlier route back. Untouched patterns are left alone.
    pub(crate) fn restore(&self, snapshot: &RouteSnapshot) -> usize {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let current = self.routes.load_full();
        let mut next = RouteMap::clone(&current);
        let mut changed = 0;
        for (key, route) in current.iter() {
            match snapshot.routes.get(key) {
                Some(earlier) if Arc::ptr_eq(earlier, route) => {}
                Some(earlier) => {
                    next.insert(key.clone(), earlier.clone());
                    changed += 1;
                }
                None => {
                    next.remove(key);
                    changed += 1;
                }
            }
        }
        for (key, earlier) in snapshot.routes.iter() {
            if !current.contains_key(key) {
                next.insert(key.clone(), earlier.clone());
                changed += 1;
            }
        }

        if changed > 0 {
            self.routes.store(Arc::new(next));
            tracing::debug!(changed, "Route table restored");
        }
        changed
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(PatternSyntax::default(), CollisionPolicy::default())
    }
}

/// A consistent view of the route table used for one dispatch.
#[derive(Debug, Clone)]
pub struct RouteSnapshot {
    syntax: PatternSyntax,
    routes: Arc<RouteMap>,
}

impl RouteSnapshot {
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.routes.values().map(|route| route.pattern.as_str())
    }

    pub fn get(&self, pattern: &str) -> Option<&Arc<Route>> {
        self.routes.get(&self.syntax.canonical(pattern))
    }

    pub fn routes(&self) -> impl Iterator<Item = &Arc<Route>> {
        self.routes.values()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn route(pattern: &str, handler: &str) -> Route {
        Route::new(pattern, handler).unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let table = RouteTable::default();
        table.register(route("users/%", "users.show")).unwrap();

        let found = table.get("/users/%/").unwrap();
        assert_eq!(found.handler, "users.show");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let table = RouteTable::default();
        let err = table.get("nope").unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_unregister_missing_is_noop() {
        let table = RouteTable::default();
        assert!(table.unregister("ghost").is_none());
        table.register(route("a", "h")).unwrap();
        assert!(table.unregister("A").is_some());
        assert!(table.is_empty());
    }

    #[test]
    fn test_replace_policy_last_write_wins() {
        let table = RouteTable::new(PatternSyntax::default(), CollisionPolicy::Replace);
        table.register(route("users/admin", "first")).unwrap();
        let previous = table.register(route("Users/Admin", "second")).unwrap();

        assert_eq!(previous.unwrap().handler, "first");
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("users/admin").unwrap().handler, "second");
        assert_eq!(table.list(), vec!["Users/Admin".to_string()]);
    }

    #[test]
    fn test_reject_policy_surfaces_collision() {
        let table = RouteTable::new(PatternSyntax::default(), CollisionPolicy::Reject);
        table.register(route("users/%", "first")).unwrap();

        let err = table.register(route("/USERS/%", "second")).unwrap_err();
        match err {
            FrameworkError::Collision { pattern, existing } => {
                assert_eq!(pattern, "/USERS/%");
                assert_eq!(existing, "users/%");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(table.get("users/%").unwrap().handler, "first");
    }

    #[test]
    fn test_wildcard_and_literal_do_not_collide() {
        let table = RouteTable::new(PatternSyntax::default(), CollisionPolicy::Reject);
        table.register(route("users/%", "a")).unwrap();
        table.register(route("users/admin", "b")).unwrap();
        let mut patterns = table.list();
        patterns.sort();
        assert_eq!(patterns, vec!["users/%", "users/admin"]);
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let table = RouteTable::default();
        table.register(route("a", "h")).unwrap();
        let snapshot = table.snapshot();

        table.register(route("b", "h")).unwrap();
        table.unregister("a");

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.get("a").is_some());
        assert_eq!(table.list(), vec!["b".to_string()]);
    }

    #[test]
    fn test_concurrent_readers_see_whole_registrations() {
        let table = Arc::new(RouteTable::default());
        let writer = {
            let table = table.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    table.register(route(&format!("r/{i}"), "h")).unwrap();
                }
            })
        };

        for _ in 0..200 {
            let snapshot = table.snapshot();
            for pattern in snapshot.patterns() {
                assert!(snapshot.get(pattern).is_some());
            }
        }
        writer.join().unwrap();
        assert_eq!(table.len(), 200);
    }

    #[test]
    fn test_restore_undoes_changes_since_snapshot() {
        let table = RouteTable::default();
        table.register(route("kept", "h")).unwrap();
        table.register(route("replaced", "old")).unwrap();
        table.register(route("removed", "h")).unwrap();
        let snapshot = table.snapshot();

        table.register(route("added", "h")).unwrap();
        table.register(route("replaced", "new")).unwrap();
        table.unregister("removed");

        assert_eq!(table.restore(&snapshot), 3);
        let mut patterns = table.list();
        patterns.sort();
        assert_eq!(patterns, vec!["kept", "removed", "replaced"]);
        assert_eq!(table.get("replaced").unwrap().handler, "old");
        assert_eq!(table.restore(&snapshot), 0);
    }
}
