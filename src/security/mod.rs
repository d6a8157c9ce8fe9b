//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → limits.rs (bounded body read)
//!     → [body normalisation, routing]
//!     → headers.rs (sanitize before forwarding)
//! ```
//!
//! # Design Decisions
//! - Fail closed: oversized bodies never reach the resolver
//! - Framing headers are always recomputed for the upstream

pub mod headers;
pub mod limits;
