//! Cookie-backed sessions.
//!
//! # Responsibilities
//! - Resolve the session named by the session cookie, or start a new one
//! - Expose it to downstream middleware and handlers via request extensions
//! - Send `Set-Cookie` whenever the client's id is missing or stale
//!
//! # Design Decisions
//! - Storage is a trait; the in-memory store expires sessions lazily on lookup
//!   and sweeps the rest on a fixed interval while the server runs
//! - Session ids are UUID v4
//! - Cookie lifetime uses `Max-Age`, so no clock formatting is needed

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{header, HeaderValue};
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::dispatch::{Middleware, Next};
use crate::error::FrameworkError;
use crate::http::{Request, Response};

/// Longest lifetime a session can have: ten years.
pub const MAX_SESSION_TTL: Duration = Duration::from_secs(10 * 365 * 24 * 60 * 60);

/// Used when the clock cannot represent `now + ttl`.
const SESSION_TTL_FALLBACK: Duration = Duration::from_secs(24 * 60 * 60);

/// Per-client state shared across requests.
///
/// Clones share the same data map.
#[derive(Debug, Clone)]
pub struct Session {
    id: String,
    expires_at: Instant,
    data: Arc<DashMap<String, Value>>,
}

impl Session {
    /// A fresh session. `ttl` is capped at [`MAX_SESSION_TTL`].
    pub fn new(ttl: Duration) -> Self {
        let now = Instant::now();
        let ttl = ttl.min(MAX_SESSION_TTL);
        Self {
            id: Uuid::new_v4().to_string(),
            expires_at: now.checked_add(ttl).unwrap_or(now + SESSION_TTL_FALLBACK),
            data: Arc::new(DashMap::new()),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).map(|entry| entry.value().clone())
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.data.insert(key.into(), value)
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.data.remove(key).map(|(_, value)| value)
    }
}

/// Session persistence.
pub trait SessionStore: Send + Sync {
    /// A live session for `id`, if one exists.
    fn load(&self, id: &str) -> Option<Session>;

    /// Start and store a fresh session.
    fn create(&self, ttl: Duration) -> Session;

    fn remove(&self, id: &str) -> bool;
}

/// Process-local session storage.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, session| !session.is_expired());
        before.saturating_sub(self.sessions.len())
    }

    /// Purge expired sessions every `every` until `shutdown` fires.
    pub async fn run_cleanup(self: Arc<Self>, every: Duration, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval_secs = every.as_secs(), "Session cleanup starting");
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let purged = self.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, remaining = self.sessions.len(), "Expired sessions purged");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Session cleanup stopping");
                    break;
                }
            }
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &str) -> Option<Session> {
        let session = self.sessions.get(id).map(|entry| entry.value().clone())?;
        if session.is_expired() {
            self.sessions.remove(id);
            tracing::debug!(session = %id, "Session expired");
            return None;
        }
        Some(session)
    }

    fn create(&self, ttl: Duration) -> Session {
        let session = Session::new(ttl);
        self.sessions.insert(session.id.clone(), session.clone());
        session
    }

    fn remove(&self, id: &str) -> bool {
        self.sessions.remove(id).is_some()
    }
}

/// Attaches a [`Session`] to every request passing through.
pub struct SessionMiddleware {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

impl SessionMiddleware {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    fn cookie(&self, id: &str) -> Result<HeaderValue, FrameworkError> {
        let mut cookie = format!("{}={id}; Path=/;", self.config.cookie_name);
        if self.config.secure {
            cookie.push_str(" Secure;");
        }
        cookie.push_str(&format!(" HttpOnly; Max-Age={};", self.config.expiration_secs));
        if let Some(domain) = &self.config.domain {
            cookie.push_str(&format!(" Domain={domain};"));
        }
        HeaderValue::from_str(&cookie).map_err(FrameworkError::middleware)
    }
}

#[async_trait]
impl Middleware for SessionMiddleware {
    async fn process(&self, mut request: Request, next: Next<'_>) -> Result<Response, FrameworkError> {
        let cookie_id = request.cookie(&self.config.cookie_name).map(str::to_owned);
        let session = match cookie_id.as_deref().and_then(|id| self.store.load(id)) {
            Some(session) => session,
            None => self
                .store
                .create(Duration::from_secs(self.config.expiration_secs)),
        };

        let renewed = cookie_id.as_deref() != Some(session.id());
        let id = session.id().to_string();
        if renewed {
            request
                .cookies
                .insert(self.config.cookie_name.clone(), id.clone());
        }
        request.extensions.insert(session);

        let mut response = next.run(request).await?;
        if renewed {
            tracing::debug!(session = %id, "Session started");
            response.headers.append(header::SET_COOKIE, self.cookie(&id)?);
        }
        Ok(response)
    }
}
