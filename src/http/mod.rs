//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → server.rs (Axum setup, pipeline handler)
//!     → request.rs (request ID, body normalisation)
//!     → [routing decides method and timeout]
//!     → upstream.rs (outbound request to Ollama)
//!     → response.rs (CORS, streamed relay)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;
pub mod upstream;

pub use request::{RequestBody, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
pub use upstream::Dispatcher;
