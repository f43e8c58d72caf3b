//! Built-in middleware.

pub mod session;

pub use session::{MemorySessionStore, Session, SessionMiddleware, SessionStore, MAX_SESSION_TTL};
