//! Result and error types for webpilot.
//!
//! Domain failures (a query that resolved to the wrong number of nodes, a
//! node that vanished, a condition that never held) are kept apart from
//! transport failures so that a failed scenario reports *which* accessor or
//! query broke rather than a raw protocol error.

use thiserror::Error;

/// Result type for webpilot operations
pub type PilotResult<T> = Result<T, PilotError>;

/// Errors that can occur while driving an application under test
#[derive(Debug, Error)]
pub enum PilotError {
    /// Process failed to start or never exposed an introspection endpoint
    #[error("Failed to launch {executable}: {message}")]
    Launch {
        /// Executable that was launched
        executable: String,
        /// Error message
        message: String,
    },

    /// A single-node query matched nothing
    #[error("No node matches {query}")]
    NotFound {
        /// Rendered query
        query: String,
    },

    /// A single-node query matched more than one node
    #[error("{count} nodes match {query}, expected exactly one")]
    Ambiguous {
        /// Rendered query
        query: String,
        /// Number of matches
        count: usize,
    },

    /// A previously resolved node no longer exists
    #[error("Node {id} no longer exists")]
    StaleNode {
        /// Node identifier
        id: u64,
    },

    /// An `eventually` condition never held within its budget
    #[error("Timed out after {ms}ms waiting for {description}; last observed: {last_observed}")]
    AssertionTimeout {
        /// What was being waited for
        description: String,
        /// Last value the accessor returned
        last_observed: String,
        /// Timeout in milliseconds
        ms: u64,
    },

    /// The node has no property with this name
    #[error("Node {id} has no property `{name}`")]
    UnknownProperty {
        /// Node identifier
        id: u64,
        /// Property name
        name: String,
    },

    /// A property could not be converted to the requested type
    #[error("Property `{name}` is {actual}, expected {expected}")]
    TypeMismatch {
        /// Property name
        name: String,
        /// Requested type
        expected: &'static str,
        /// Actual value kind
        actual: String,
    },

    /// Transport-level failure (connection, protocol, closed session)
    #[error("Transport error: {message}")]
    Transport {
        /// Error message
        message: String,
    },

    /// Input simulation error
    #[error("Input simulation failed: {message}")]
    Input {
        /// Error message
        message: String,
    },

    /// Key combo string could not be parsed
    #[error("Invalid key combo `{combo}`")]
    InvalidKeyCombo {
        /// The offending combo
        combo: String,
    },

    /// Fixture server error
    #[error("Fixture server error: {message}")]
    Fixture {
        /// Error message
        message: String,
    },

    /// Temporary profile error
    #[error("Profile error: {message}")]
    Profile {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// SQLite error while seeding a profile
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl PilotError {
    /// Create a transport error
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create an input error
    #[must_use]
    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    /// Create a fixture error
    #[must_use]
    pub fn fixture(message: impl Into<String>) -> Self {
        Self::Fixture {
            message: message.into(),
        }
    }

    /// Create a profile error
    #[must_use]
    pub fn profile(message: impl Into<String>) -> Self {
        Self::Profile {
            message: message.into(),
        }
    }

    /// True for "zero matches" failures, the case tests assert on when
    /// checking that a surface is absent.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True when the node behind a handle has been destroyed
    #[must_use]
    pub const fn is_stale(&self) -> bool {
        matches!(self, Self::StaleNode { .. })
    }

    /// True when an `eventually` wait ran out of time
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::AssertionTimeout { .. })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_message_names_query() {
        let err = PilotError::NotFound {
            query: "//AddressBar[objectName=\"addressBar\"]".to_string(),
        };
        assert!(err.to_string().contains("addressBar"));
        assert!(err.is_not_found());
        assert!(!err.is_stale());
    }

    #[test]
    fn test_ambiguous_message_has_count() {
        let err = PilotError::Ambiguous {
            query: "//Dialog".to_string(),
            count: 3,
        };
        assert_eq!(
            err.to_string(),
            "3 nodes match //Dialog, expected exactly one"
        );
    }

    #[test]
    fn test_timeout_carries_last_observed() {
        let err = PilotError::AssertionTimeout {
            description: "title == \"OK\"".to_string(),
            last_observed: "\"CANCEL\"".to_string(),
            ms: 100,
        };
        assert!(err.is_timeout());
        assert!(err.to_string().contains("CANCEL"));
        assert!(err.to_string().contains("100ms"));
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PilotError = io.into();
        assert!(matches!(err, PilotError::Io(_)));
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(
            PilotError::transport("x"),
            PilotError::Transport { .. }
        ));
        assert!(matches!(PilotError::input("x"), PilotError::Input { .. }));
        assert!(matches!(
            PilotError::fixture("x"),
            PilotError::Fixture { .. }
        ));
        assert!(matches!(
            PilotError::profile("x"),
            PilotError::Profile { .. }
        ));
    }
}
