// src/resolver/mod.rs

//! Package dependency resolution
//!
//! The resolver answers one question: given a set of repository indexes and
//! a set of requested constraint tokens, which concrete packages should be
//! installed, and in what order? It selects candidates deterministically
//! with heuristics (no backtracking), walks dependencies depth-first, and
//! expands install-if triggers once the selection settles.
//!
//! A [`Resolver`] is built once per index set and is read-only afterward;
//! if the indexes change, build a new resolver. Per-resolution state (the
//! disqualification set, the selected set, output lists) belongs to each
//! call.

mod compare;
mod disqualify;
mod engine;
mod filter;
mod plan;

pub use disqualify::Disqualified;
pub use plan::{DependencyResolution, ResolutionPlan};

use crate::constraint::Constraint;
use crate::error::Result;
use crate::index::{NamedIndex, Package};
use crate::version::Version;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;

/// A package paired with the pin label of the index it came from.
#[derive(Debug, Clone)]
pub(crate) struct PinnedPackage {
    pub package: Arc<Package>,
    /// Name of the containing index; empty for untagged indexes.
    pub pinned_name: String,
}

/// Resolves packages against a fixed set of repository indexes.
///
/// Construction pre-builds two lookup maps: `name_map` lists, per name,
/// every candidate that carries or provides that name; `install_if_map`
/// lists, per trigger token, every package whose `install_if` mentions it.
/// Parsed versions and constraints are memoized in shared caches so the
/// resolver can be used from multiple threads without an outer lock.
pub struct Resolver {
    pub(crate) name_map: HashMap<String, Vec<PinnedPackage>>,
    pub(crate) install_if_map: HashMap<String, Vec<PinnedPackage>>,

    parsed_versions: DashMap<String, Version>,
    parsed_constraints: DashMap<String, Constraint>,
}

impl Resolver {
    /// Build a resolver over the given indexes.
    ///
    /// Both passes iterate indexes and packages in presentation order, so
    /// candidate lists come out in a reproducible order before sorting.
    pub fn new(indexes: &[&dyn NamedIndex]) -> Self {
        let package_count: usize = indexes.iter().map(|index| index.count()).sum();
        let mut name_map: HashMap<String, Vec<PinnedPackage>> =
            HashMap::with_capacity(package_count);
        let mut install_if_map: HashMap<String, Vec<PinnedPackage>> = HashMap::new();
        let parsed_constraints: DashMap<String, Constraint> = DashMap::new();

        // first pass: every package under its own name, plus install-if
        // triggers under their raw token
        for index in indexes {
            for pkg in index.packages() {
                let pinned = PinnedPackage {
                    package: Arc::clone(pkg),
                    pinned_name: index.name().to_string(),
                };
                name_map
                    .entry(pkg.name.clone())
                    .or_default()
                    .push(pinned.clone());
                for trigger in &pkg.install_if {
                    install_if_map
                        .entry(trigger.clone())
                        .or_default()
                        .push(pinned.clone());
                }
            }
        }

        // second pass: the same candidates again under every name they
        // provide, so `name_map[p]` aggregates all providers of `p`
        for index in indexes {
            for pkg in index.packages() {
                for provide in &pkg.provides {
                    let name = cached_constraint(&parsed_constraints, provide).name;
                    name_map.entry(name).or_default().push(PinnedPackage {
                        package: Arc::clone(pkg),
                        pinned_name: index.name().to_string(),
                    });
                }
            }
        }

        Self {
            name_map,
            install_if_map,
            parsed_versions: DashMap::new(),
            parsed_constraints,
        }
    }

    /// Parse a version through the shared memo cache. Failures are not
    /// cached; they are rare and cheap to reproduce.
    pub(crate) fn parse_version(&self, version: &str) -> Result<Version> {
        if let Some(cached) = self.parsed_versions.get(version) {
            return Ok(cached.value().clone());
        }
        let parsed = Version::parse(version)?;
        self.parsed_versions
            .insert(version.to_string(), parsed.clone());
        Ok(parsed)
    }

    /// Parse a constraint token through the shared memo cache.
    pub(crate) fn parse_constraint(&self, token: &str) -> Constraint {
        cached_constraint(&self.parsed_constraints, token)
    }

    /// The version under which a candidate satisfies `name`: its own
    /// version when the name is its own, otherwise the version of the first
    /// matching provides entry (falling back to the package version when
    /// the entry is versionless). Empty when the candidate does not satisfy
    /// the name at all.
    pub(crate) fn dep_version_for_name(&self, candidate: &PinnedPackage, name: &str) -> String {
        if name.is_empty() || name == candidate.package.name {
            return candidate.package.version.clone();
        }
        for provide in &candidate.package.provides {
            let parsed = self.parse_constraint(provide);
            if parsed.name == name {
                return if parsed.version.is_empty() {
                    candidate.package.version.clone()
                } else {
                    parsed.version
                };
            }
        }
        String::new()
    }
}

fn cached_constraint(cache: &DashMap<String, Constraint>, token: &str) -> Constraint {
    if let Some(cached) = cache.get(token) {
        return cached.value().clone();
    }
    let parsed = Constraint::parse(token);
    cache.insert(token.to_string(), parsed.clone());
    parsed
}
