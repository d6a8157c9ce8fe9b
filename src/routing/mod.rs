//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Request path (query stripped)
//!     → router.rs (first-prefix lookup)
//!     → matcher.rs (starts_with test)
//!     → table.rs (declared method, streaming, long-running)
//!     → Return: EndpointClassification or NoMatch
//! ```
//!
//! # Design Decisions
//! - Table built at startup, immutable at runtime
//! - No regex in hot path (prefix matching only)
//! - Deterministic: first match in insertion order wins

pub mod matcher;
pub mod router;
pub mod table;

pub use router::{EndpointClassification, Router};
pub use table::{EndpointRoute, EndpointTable};
