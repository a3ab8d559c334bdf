// src/resolver/filter.rs

//! Candidate filter pipeline
//!
//! A candidate list is narrowed by a stack of predicates before selection.
//! Disqualified candidates are always excluded first; the remaining
//! predicates are applied in the order given. `Version` and `AllowPin` are
//! per-candidate; `PreferPin` and `Installed` are soft set-level pins that
//! only narrow the list when at least one candidate matches.

use crate::index::Package;
use crate::resolver::disqualify::Disqualified;
use crate::resolver::{PinnedPackage, Resolver};
use crate::version::Op;
use std::sync::Arc;

/// One predicate in the filter stack.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Filter<'a> {
    /// Keep candidates whose effective version for the queried name
    /// satisfies `op version`. Malformed versions drop the candidate
    /// silently; they are not disqualified here.
    Version { op: Op, version: &'a str },
    /// Soft pin to an index label: when any candidate carries the pin, the
    /// ones that do not are dropped; otherwise all are kept. Empty pins are
    /// a no-op.
    PreferPin(&'a str),
    /// Hard pin boundary used while descending into dependencies: a
    /// candidate tagged with a pin label must match `pin`; untagged
    /// candidates always pass.
    AllowPin(&'a str),
    /// Soft pin to an already-selected package: when any candidate matches
    /// its name and version, the rest are dropped.
    Installed(Option<&'a Arc<Package>>),
}

impl Resolver {
    /// Apply a filter stack to a candidate list for `name`.
    pub(crate) fn filter_packages(
        &self,
        name: &str,
        candidates: &[PinnedPackage],
        dq: &Disqualified,
        filters: &[Filter<'_>],
    ) -> Vec<PinnedPackage> {
        let mut kept: Vec<PinnedPackage> = candidates
            .iter()
            .filter(|c| !dq.contains(&c.package))
            .cloned()
            .collect();

        for filter in filters {
            match filter {
                Filter::Version { op, version } => {
                    if *op == Op::Any {
                        continue;
                    }
                    let required = self.parse_version(version).ok();
                    kept.retain(|c| {
                        let Some(required) = required.as_ref() else {
                            return false;
                        };
                        let effective = self.dep_version_for_name(c, name);
                        match self.parse_version(&effective) {
                            Ok(actual) => op.satisfies(&actual, Some(required)),
                            Err(_) => false,
                        }
                    });
                }
                Filter::PreferPin(pin) => {
                    if pin.is_empty() {
                        continue;
                    }
                    if kept.iter().any(|c| c.pinned_name == *pin) {
                        kept.retain(|c| c.pinned_name == *pin);
                    }
                }
                Filter::AllowPin(pin) => {
                    kept.retain(|c| c.pinned_name.is_empty() || c.pinned_name == *pin);
                }
                Filter::Installed(existing) => {
                    let Some(existing) = existing else {
                        continue;
                    };
                    let matches = |c: &PinnedPackage| {
                        c.package.name == existing.name && c.package.version == existing.version
                    };
                    if kept.iter().any(matches) {
                        kept.retain(matches);
                    }
                }
            }
        }

        kept
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{NamedIndex, RepositoryIndex};

    fn world(indexes: Vec<RepositoryIndex>) -> Resolver {
        let refs: Vec<&dyn NamedIndex> = indexes.iter().map(|i| i as &dyn NamedIndex).collect();
        Resolver::new(&refs)
    }

    fn versions(candidates: &[PinnedPackage]) -> Vec<&str> {
        candidates.iter().map(|c| c.package.version.as_str()).collect()
    }

    #[test]
    fn test_version_filter() {
        let resolver = world(vec![RepositoryIndex::new(
            "",
            "https://pkgs.example.org/main",
            vec![
                Package::new("foo", "1.0"),
                Package::new("foo", "2.0"),
                Package::new("foo", "not-a-version"),
            ],
        )]);
        let dq = Disqualified::new();

        let kept = resolver.filter_packages(
            "foo",
            &resolver.name_map["foo"],
            &dq,
            &[Filter::Version {
                op: Op::Less,
                version: "2.0",
            }],
        );
        // the malformed candidate is dropped silently, not disqualified
        assert_eq!(versions(&kept), vec!["1.0"]);
        assert!(dq.is_empty());
    }

    #[test]
    fn test_version_filter_uses_provides_version() {
        let mut bar = Package::new("bar", "9.9");
        bar.provides = vec!["foo=1.2".to_string()];
        let resolver = world(vec![RepositoryIndex::new(
            "",
            "https://pkgs.example.org/main",
            vec![bar],
        )]);
        let dq = Disqualified::new();

        let kept = resolver.filter_packages(
            "foo",
            &resolver.name_map["foo"],
            &dq,
            &[Filter::Version {
                op: Op::Less,
                version: "2.0",
            }],
        );
        assert_eq!(kept.len(), 1);

        let kept = resolver.filter_packages(
            "foo",
            &resolver.name_map["foo"],
            &dq,
            &[Filter::Version {
                op: Op::Greater,
                version: "2.0",
            }],
        );
        assert!(kept.is_empty());
    }

    #[test]
    fn test_prefer_pin_is_soft() {
        let resolver = world(vec![
            RepositoryIndex::new("", "https://pkgs.example.org/main", vec![Package::new("foo", "1.0")]),
            RepositoryIndex::new("edge", "https://pkgs.example.org/edge", vec![Package::new("foo", "2.0")]),
        ]);
        let dq = Disqualified::new();
        let candidates = &resolver.name_map["foo"];

        // a matching candidate exists: non-matching ones are dropped
        let kept = resolver.filter_packages("foo", candidates, &dq, &[Filter::PreferPin("edge")]);
        assert_eq!(versions(&kept), vec!["2.0"]);

        // no candidate matches: everything is kept
        let kept = resolver.filter_packages("foo", candidates, &dq, &[Filter::PreferPin("testing")]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_allow_pin_is_exclusive() {
        let resolver = world(vec![
            RepositoryIndex::new("", "https://pkgs.example.org/main", vec![Package::new("foo", "1.0")]),
            RepositoryIndex::new("edge", "https://pkgs.example.org/edge", vec![Package::new("foo", "2.0")]),
        ]);
        let dq = Disqualified::new();
        let candidates = &resolver.name_map["foo"];

        // without the pin, tagged candidates are unreachable
        let kept = resolver.filter_packages("foo", candidates, &dq, &[Filter::AllowPin("")]);
        assert_eq!(versions(&kept), vec!["1.0"]);

        // with the pin, untagged candidates still pass
        let kept = resolver.filter_packages("foo", candidates, &dq, &[Filter::AllowPin("edge")]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_installed_filter_is_soft() {
        let resolver = world(vec![RepositoryIndex::new(
            "",
            "https://pkgs.example.org/main",
            vec![Package::new("foo", "1.0"), Package::new("foo", "2.0")],
        )]);
        let dq = Disqualified::new();
        let candidates = &resolver.name_map["foo"];

        let installed = Arc::new(Package::new("foo", "1.0"));
        let kept =
            resolver.filter_packages("foo", candidates, &dq, &[Filter::Installed(Some(&installed))]);
        assert_eq!(versions(&kept), vec!["1.0"]);

        // an installed version no index carries keeps the full list
        let missing = Arc::new(Package::new("foo", "0.9"));
        let kept =
            resolver.filter_packages("foo", candidates, &dq, &[Filter::Installed(Some(&missing))]);
        assert_eq!(kept.len(), 2);

        let kept = resolver.filter_packages("foo", candidates, &dq, &[Filter::Installed(None)]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_disqualified_always_excluded() {
        let resolver = world(vec![RepositoryIndex::new(
            "",
            "https://pkgs.example.org/main",
            vec![Package::new("foo", "1.0"), Package::new("foo", "2.0")],
        )]);
        let mut dq = Disqualified::new();
        let candidates = resolver.name_map["foo"].clone();
        dq.insert(&candidates[1].package, "test exclusion");

        let kept = resolver.filter_packages("foo", &candidates, &dq, &[]);
        assert_eq!(versions(&kept), vec!["1.0"]);
    }
}
