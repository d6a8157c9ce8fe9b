//! Path prefix matching.
//!
//! # Design Decisions
//! - Matching is a plain `starts_with` on the raw path, case-sensitive
//! - Query strings are never part of the tested path
//! - No regex, no segment awareness: `/api/chatty` matches `/api/chat`

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// The prefix this matcher tests for.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` starts with the prefix.
    ///
    /// Anything after a `?` is ignored, so callers may pass a path with
    /// its query attached.
    pub fn matches(&self, path: &str) -> bool {
        let path = path.split_once('?').map_or(path, |(p, _)| p);
        path.starts_with(&self.prefix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_matcher() {
        let matcher = PathPrefixMatcher::new("/api/chat");

        assert!(matcher.matches("/api/chat"));
        assert!(matcher.matches("/api/chat/extra"));
        assert!(matcher.matches("/api/chatty"));
        assert!(!matcher.matches("/api/cha"));
        assert!(!matcher.matches("/API/chat"));
        assert!(!matcher.matches("/v1/api/chat"));
    }

    #[test]
    fn test_query_is_ignored() {
        let matcher = PathPrefixMatcher::new("/api/tags");
        assert!(matcher.matches("/api/tags?verbose=true"));

        let matcher = PathPrefixMatcher::new("/api/tags?x");
        assert!(!matcher.matches("/api/tags?x=1"));
    }
}
