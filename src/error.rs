// src/error.rs

//! Crate-wide error type and result alias.
//!
//! Resolution failures form a chain: the top-level constraint that was being
//! solved wraps the dependency frame that failed, which wraps either a
//! plain not-found error or the aggregated disqualification reasons. The
//! `source()` chain is enough to render a multi-line explanation of why a
//! request could not be satisfied.

use std::fmt;
use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// One eliminated candidate and the reason it was eliminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disqualification {
    /// Filename of the candidate (`name-version.apk`).
    pub package: String,
    /// Human-readable reason recorded when the candidate was disqualified.
    pub reason: String,
}

impl fmt::Display for Disqualification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {} disqualified because {}", self.package, self.reason)
    }
}

/// Errors produced by the resolver and the configuration layer.
#[derive(Debug, Error)]
pub enum Error {
    /// A version string could not be parsed under APK version rules.
    #[error("invalid version {0:?}")]
    InvalidVersion(String),

    /// No candidate anywhere in the indexes can satisfy a name.
    #[error("{0}")]
    NotFound(String),

    /// A user-supplied request could not be solved; preserves the request text.
    #[error("solving {token:?} constraint: {source}")]
    Constraint {
        token: String,
        #[source]
        source: Box<Error>,
    },

    /// A dependency of `package` could not be satisfied; nests into a trail.
    #[error("resolving {package:?} deps:\n{source}")]
    Dependency {
        package: String,
        #[source]
        source: Box<Error>,
    },

    /// Every remaining candidate for a name was disqualified; lists each reason.
    #[error("{}", .0.iter().map(ToString::to_string).collect::<Vec<_>>().join("\n"))]
    Unsatisfiable(Vec<Disqualification>),

    /// The caller's cancellation token fired.
    #[error("resolution cancelled")]
    Cancelled,

    /// Filesystem failure in the configuration layer.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Invalid or rejected configuration contents.
    #[error("configuration error: {0}")]
    ConfigError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disqualification_display() {
        let d = Disqualification {
            package: "foo-1.0.apk".to_string(),
            reason: "bar-2.0.apk already provides foo".to_string(),
        };
        assert_eq!(
            d.to_string(),
            "  foo-1.0.apk disqualified because bar-2.0.apk already provides foo"
        );
    }

    #[test]
    fn test_unsatisfiable_lists_every_reason() {
        let err = Error::Unsatisfiable(vec![
            Disqualification {
                package: "a-1.apk".to_string(),
                reason: "excluded by !a".to_string(),
            },
            Disqualification {
                package: "a-2.apk".to_string(),
                reason: "excluded by !a".to_string(),
            },
        ]);
        let rendered = err.to_string();
        assert!(rendered.contains("a-1.apk disqualified"));
        assert!(rendered.contains("a-2.apk disqualified"));
        assert_eq!(rendered.lines().count(), 2);
    }

    #[test]
    fn test_error_chain_renders_trail() {
        let inner = Error::NotFound("could not find package \"c\" in indexes".to_string());
        let dep = Error::Dependency {
            package: "b-1.0.apk".to_string(),
            source: Box::new(inner),
        };
        let outer = Error::Constraint {
            token: "a".to_string(),
            source: Box::new(dep),
        };
        let rendered = outer.to_string();
        assert!(rendered.starts_with("solving \"a\" constraint:"));
        assert!(rendered.contains("resolving \"b-1.0.apk\" deps:"));
        assert!(rendered.contains("could not find package"));
    }
}
