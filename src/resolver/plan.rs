// src/resolver/plan.rs

//! Resolution result data structures

use crate::index::Package;
use std::sync::Arc;

/// Result of resolving a batch of requests.
#[derive(Debug, Clone, Default)]
pub struct ResolutionPlan {
    /// Packages to install, dependencies before dependents.
    pub to_install: Vec<Arc<Package>>,
    /// Stripped negative tokens collected from the walked dependencies.
    pub conflicts: Vec<String>,
}

impl ResolutionPlan {
    /// Install-order package names, for display and assertions.
    pub fn package_names(&self) -> Vec<&str> {
        self.to_install.iter().map(|p| p.name.as_str()).collect()
    }
}

/// Result of resolving a single request with its dependency closure.
#[derive(Debug, Clone)]
pub struct DependencyResolution {
    /// The package selected for the request itself.
    pub package: Arc<Package>,
    /// Its dependency closure, dependencies before dependents, deduplicated,
    /// with any triggered install-if packages appended at the end.
    pub dependencies: Vec<Arc<Package>>,
    /// Stripped negative tokens collected during the walk.
    pub conflicts: Vec<String>,
}
