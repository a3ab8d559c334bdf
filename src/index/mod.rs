// src/index/mod.rs

//! Index view: packages and the named indexes that contain them
//!
//! The resolver consumes pre-parsed repository indexes. Each index is a
//! named, sourced collection of packages; the name doubles as the pin label
//! that constraints can reference with `name@pin`. Parsing of the on-disk
//! index format is the feeding subsystem's concern, not ours.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A package as listed by a repository index.
///
/// Immutable once handed to a resolver. `dependencies`, `provides` and
/// `install_if` hold raw constraint tokens exactly as the index declared
/// them; negative dependencies (`!name`) express conflicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub version: String,
    /// Source package grouping label; packages built together share it.
    #[serde(default)]
    pub origin: String,
    /// URI of the index this package came from.
    #[serde(default)]
    pub repository: String,
    /// Rank among competing providers of the same virtual name.
    #[serde(default)]
    pub provider_priority: u64,
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Virtual names this package satisfies, each optionally `name=version`.
    #[serde(default)]
    pub provides: Vec<String>,
    /// Install this package automatically once all listed tokens are met.
    #[serde(default)]
    pub install_if: Vec<String>,
}

impl Package {
    /// Create a package with just a name and version.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            ..Self::default()
        }
    }

    /// The archive filename this package would be fetched as.
    pub fn filename(&self) -> String {
        format!("{}-{}.apk", self.name, self.version)
    }
}

/// A named, sourced collection of packages enumerable by the resolver.
///
/// `name` is the pin label (`@name` in constraint tokens and repository
/// lines); `source` is the index URI, used for diagnostics and for the
/// same-repository preference during candidate comparison. Neither needs to
/// be unique across indexes.
pub trait NamedIndex {
    fn name(&self) -> &str;
    fn source(&self) -> &str;
    fn packages(&self) -> &[Arc<Package>];

    fn count(&self) -> usize {
        self.packages().len()
    }
}

/// In-memory `NamedIndex` over an already-parsed package list.
#[derive(Debug, Clone, Default)]
pub struct RepositoryIndex {
    name: String,
    source: String,
    packages: Vec<Arc<Package>>,
}

impl RepositoryIndex {
    /// Build an index from parsed packages.
    ///
    /// Packages that do not yet know their repository URI are stamped with
    /// this index's source.
    pub fn new(
        name: impl Into<String>,
        source: impl Into<String>,
        packages: Vec<Package>,
    ) -> Self {
        let source = source.into();
        let packages = packages
            .into_iter()
            .map(|mut pkg| {
                if pkg.repository.is_empty() {
                    pkg.repository = source.clone();
                }
                Arc::new(pkg)
            })
            .collect();
        Self {
            name: name.into(),
            source,
            packages,
        }
    }
}

impl NamedIndex for RepositoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    fn source(&self) -> &str {
        &self.source
    }

    fn packages(&self) -> &[Arc<Package>] {
        &self.packages
    }
}
