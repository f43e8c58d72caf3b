//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, timeout, body limit)
//!     → request.rs (method, path, headers, cookies, body)
//!     → Dispatcher::process
//!     → response.rs (status, headers, body)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{parse_cookies, Request};
pub use response::Response;
pub use server::{AppState, HttpServer};
