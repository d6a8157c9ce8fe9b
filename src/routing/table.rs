//! The static endpoint table.
//!
//! Maps path prefixes of the native Ollama API and the OpenAI-compatible
//! API to the HTTP method the upstream expects, along with the streaming
//! and long-running classifications.

use axum::http::Method;

use crate::routing::matcher::PathPrefixMatcher;

/// A single proxied endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointRoute {
    matcher: PathPrefixMatcher,
    /// Method used for the upstream request, whatever the client sent.
    pub method: Method,
    /// The endpoint may answer incrementally when asked to stream.
    pub streaming: bool,
    /// The endpoint runs multi-minute operations (model pull/push).
    pub long_running: bool,
}

impl EndpointRoute {
    pub fn new(prefix: impl Into<String>, method: Method) -> Self {
        Self {
            matcher: PathPrefixMatcher::new(prefix),
            method,
            streaming: false,
            long_running: false,
        }
    }

    pub fn streaming(mut self) -> Self {
        self.streaming = true;
        self
    }

    pub fn long_running(mut self) -> Self {
        self.long_running = true;
        self
    }

    pub fn prefix(&self) -> &str {
        self.matcher.prefix()
    }

    pub fn matches(&self, path: &str) -> bool {
        self.matcher.matches(path)
    }
}

/// Ordered, immutable set of endpoint routes.
///
/// Lookup returns the first route in insertion order whose prefix matches,
/// so the order routes are added in is the tie-break.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTable {
    routes: Vec<EndpointRoute>,
}

impl EndpointTable {
    pub fn new(routes: Vec<EndpointRoute>) -> Self {
        Self { routes }
    }

    /// The Ollama native and OpenAI-compatible endpoint set.
    pub fn ollama() -> Self {
        let post = |prefix: &str| EndpointRoute::new(prefix, Method::POST);
        let get = |prefix: &str| EndpointRoute::new(prefix, Method::GET);

        Self::new(vec![
            // Native API
            post("/api/chat").streaming(),
            post("/api/generate").streaming(),
            post("/api/embeddings"),
            post("/api/pull").long_running(),
            post("/api/push").long_running(),
            post("/api/create").long_running(),
            post("/api/copy"),
            post("/api/delete"),
            post("/api/show").long_running(),
            get("/api/tags"),
            get("/api/ls"),
            post("/api/stop"),
            get("/api/version"),
            post("/api/serve"),
            post("/api/unload"),
            // OpenAI-compatible API
            post("/v1/chat/completions").streaming(),
            post("/v1/completions").streaming(),
            get("/v1/models"),
            post("/v1/embeddings"),
        ])
    }

    /// Find the first route whose prefix the path starts with.
    pub fn resolve(&self, path: &str) -> Option<&EndpointRoute> {
        self.routes.iter().find(|route| route.matches(path))
    }

    pub fn routes(&self) -> &[EndpointRoute] {
        &self.routes
    }
}

impl Default for EndpointTable {
    fn default() -> Self {
        Self::ollama()
    }
}
