//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to upstream:
//!     → timeouts.rs (deadline for response headers)
//!     → timeouts.rs (idle deadline between streamed body chunks)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every upstream call has a deadline
//! - No retries: each request is forwarded exactly once

pub mod timeouts;
