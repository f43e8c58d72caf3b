//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Module load (startup):
//!     Route (pattern, handler id, middleware ids, metadata)
//!     → table.rs (canonicalize, collision check, copy-on-write insert)
//!
//! Incoming request path:
//!     → table.rs snapshot (consistent view for this request)
//!     → matcher.rs (positional full match, most specific wins)
//!     → Return: winning pattern or no match
//! ```
//!
//! # Design Decisions
//! - Segment-based patterns; `%` matches exactly one segment
//! - Literals compare case-insensitively
//! - Deterministic: same table and path always select the same route
//! - A dispatch clones the matched route; the table's copy is never mutated

pub mod matcher;
pub mod route;
pub mod table;

pub use matcher::{MatchCandidate, Matcher, SegmentMatcher};
pub use route::{PatternSyntax, Route};
pub use table::{CollisionPolicy, RouteSnapshot, RouteTable};
