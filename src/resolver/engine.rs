// src/resolver/engine.rs

//! Resolution driver
//!
//! The driver runs in two stages. First it settles the requested tokens
//! themselves: it narrows the candidate space with negative and pinned
//! version constraints, then repeatedly picks the most-constrained request
//! (fewest surviving candidates), selects its best candidate, and
//! disqualifies everything that now conflicts. Second it descends into
//! dependencies depth-first per request, children emitted before parents,
//! and finally appends install-if packages whose trigger conditions the
//! selected set fully meets.
//!
//! The walk never backtracks. Once a candidate is disqualified it stays
//! invisible for the rest of the resolution, and a selection made earlier
//! is not revisited when a later elimination would have invalidated it.

use crate::error::{Disqualification, Error, Result};
use crate::index::Package;
use crate::resolver::compare::CompareContext;
use crate::resolver::disqualify::Disqualified;
use crate::resolver::filter::Filter;
use crate::resolver::plan::{DependencyResolution, ResolutionPlan};
use crate::resolver::{PinnedPackage, Resolver};
use crate::version::Op;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

impl Resolver {
    /// Resolve a single token to every candidate that satisfies it, sorted
    /// best-first.
    ///
    /// The first entry is the package the resolver would select; the rest
    /// are the alternatives in preference order. Fails with the collected
    /// disqualification reasons when every candidate has been eliminated,
    /// or with a plain not-found error when nothing carries the name.
    pub fn resolve_package(&self, token: &str, dq: &Disqualified) -> Result<Vec<Arc<Package>>> {
        let parsed = self.parse_constraint(token);
        let Some(candidates) = self.name_map.get(&parsed.name) else {
            return Err(Error::NotFound(format!(
                "could not find package that provides {} in indexes",
                token
            )));
        };

        let mut filtered = self.filter_packages(
            &parsed.name,
            candidates,
            dq,
            &[
                Filter::Version {
                    op: parsed.op,
                    version: &parsed.version,
                },
                Filter::PreferPin(&parsed.pin),
            ],
        );
        if filtered.is_empty() {
            return Err(self.disqualified_error(token, candidates, dq));
        }

        let ctx = CompareContext {
            name: &parsed.name,
            pin: &parsed.pin,
            ..CompareContext::default()
        };
        self.sort_candidates(&mut filtered, &ctx);
        Ok(filtered.into_iter().map(|c| c.package).collect())
    }

    /// Like [`Resolver::resolve_package`], but only the best match.
    fn best_package_for(&self, token: &str, dq: &Disqualified) -> Result<Arc<Package>> {
        let parsed = self.parse_constraint(token);
        let Some(candidates) = self.name_map.get(&parsed.name) else {
            return Err(Error::NotFound(format!(
                "could not find package, alias or a package that provides {} in indexes",
                token
            )));
        };

        let filtered = self.filter_packages(
            &parsed.name,
            candidates,
            dq,
            &[
                Filter::Version {
                    op: parsed.op,
                    version: &parsed.version,
                },
                Filter::PreferPin(&parsed.pin),
            ],
        );

        let ctx = CompareContext {
            name: &parsed.name,
            pin: &parsed.pin,
            ..CompareContext::default()
        };
        match self.best_candidate(&filtered, &ctx) {
            Some(best) => Ok(Arc::clone(&best.package)),
            None => Err(self.disqualified_error(token, candidates, dq)),
        }
    }

    /// Resolve a batch of requested tokens to an ordered install list and
    /// the conflicts discovered along the way.
    ///
    /// The cancellation token is checked opportunistically between
    /// selection rounds; resolution itself is synchronous and CPU-bound.
    pub fn packages_with_dependencies(
        &self,
        cancel: &CancellationToken,
        packages: &[String],
    ) -> Result<ResolutionPlan> {
        let mut dq = Disqualified::new();

        // narrow the space up front, then drop the negative tokens: they
        // are exclusions, not install requests
        let mut constraints: Vec<String> = packages.to_vec();
        self.constrain(&constraints, &mut dq)?;
        constraints.retain(|token| !token.starts_with('!'));

        let mut dependencies_map: HashMap<String, Arc<Package>> =
            HashMap::with_capacity(packages.len());

        while !constraints.is_empty() {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let next = self.next_package(&constraints, &dq)?;
            let pkg = self
                .best_package_for(&next, &dq)
                .map_err(|e| Error::Constraint {
                    token: next.clone(),
                    source: Box::new(e),
                })?;
            debug!("selected {} for request {:?}", pkg.filename(), next);

            dependencies_map.insert(pkg.name.clone(), Arc::clone(&pkg));
            constraints.retain(|token| token != &next);
            self.disqualify_conflicts(&pkg, &mut dq);
        }

        let mut to_install: Vec<Arc<Package>> = Vec::new();
        let mut tracked: HashMap<String, Arc<Package>> = HashMap::new();
        let mut conflicts: Vec<String> = Vec::new();

        for token in packages {
            if token.starts_with('!') {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let (pkg, deps, confs) = self
                .resolve_request(token, &dependencies_map, &mut dq)
                .map_err(|e| Error::Constraint {
                    token: token.clone(),
                    source: Box::new(e),
                })?;

            for dep in deps {
                if !tracked.contains_key(&dep.name) {
                    tracked.insert(dep.name.clone(), Arc::clone(&dep));
                    to_install.push(Arc::clone(&dep));
                }
                dependencies_map.entry(dep.name.clone()).or_insert(dep);
            }
            if !tracked.contains_key(&pkg.name) {
                tracked.insert(pkg.name.clone(), Arc::clone(&pkg));
                to_install.push(Arc::clone(&pkg));
            }
            dependencies_map.entry(pkg.name.clone()).or_insert(pkg);
            conflicts.extend(confs);
        }

        // with the whole selection settled, append any install-if packages
        // whose triggers it satisfies
        let seeds = to_install.clone();
        self.expand_install_if(&seeds, &mut tracked, &mut to_install);

        Ok(ResolutionPlan {
            to_install,
            conflicts: uniqify(conflicts),
        })
    }

    /// Resolve a single token together with its dependency closure.
    ///
    /// `existing` carries packages already selected by previous calls;
    /// competing options lean toward those selections. The map itself is
    /// never modified.
    pub fn package_with_dependencies(
        &self,
        token: &str,
        existing: &HashMap<String, Arc<Package>>,
        dq: &mut Disqualified,
    ) -> Result<DependencyResolution> {
        let (package, mut dependencies, conflicts) = self.resolve_request(token, existing, dq)?;

        let mut added: HashMap<String, Arc<Package>> = dependencies
            .iter()
            .map(|dep| (dep.name.clone(), Arc::clone(dep)))
            .collect();
        added.insert(package.name.clone(), Arc::clone(&package));

        let mut seeds: Vec<Arc<Package>> = dependencies.clone();
        seeds.push(Arc::clone(&package));
        self.expand_install_if(&seeds, &mut added, &mut dependencies);

        Ok(DependencyResolution {
            package,
            dependencies,
            conflicts,
        })
    }

    /// Resolve one token and walk its dependencies; no install-if
    /// expansion, dependencies deduplicated by name in first-seen order.
    fn resolve_request(
        &self,
        token: &str,
        existing: &HashMap<String, Arc<Package>>,
        dq: &mut Disqualified,
    ) -> Result<(Arc<Package>, Vec<Arc<Package>>, Vec<String>)> {
        let mut local_existing = existing.clone();
        let mut existing_origins: HashSet<String> = existing
            .values()
            .filter(|pkg| !pkg.origin.is_empty())
            .map(|pkg| pkg.origin.clone())
            .collect();

        let pkg = self.best_package_for(token, dq)?;
        let pin = self.parse_constraint(token).pin;

        let parents = HashSet::new();
        let (deps, conflicts) = self.package_dependencies(
            &pkg,
            &pin,
            true,
            &parents,
            &mut local_existing,
            &mut existing_origins,
            dq,
        )?;

        let mut seen: HashSet<String> = HashSet::with_capacity(deps.len());
        let mut dependencies = Vec::with_capacity(deps.len());
        for dep in deps {
            if seen.insert(dep.name.clone()) {
                dependencies.push(dep);
            }
        }

        Ok((pkg, dependencies, conflicts))
    }

    /// Pick the request with the fewest surviving candidates; ties break
    /// lexicographically on the token text.
    fn next_package(&self, tokens: &[String], dq: &Disqualified) -> Result<String> {
        let mut next: Option<(&String, usize)> = None;
        for token in tokens {
            let candidates = self
                .resolve_package(token, dq)
                .map_err(|e| Error::Constraint {
                    token: token.clone(),
                    source: Box::new(e),
                })?;
            let count = candidates.len();
            let better = match next {
                None => true,
                Some((best, least)) => count < least || (count == least && token < best),
            };
            if better {
                next = Some((token, count));
            }
        }
        match next {
            Some((token, _)) => Ok(token.clone()),
            None => Err(Error::NotFound("no pending requests to resolve".to_string())),
        }
    }

    /// Disqualify candidates that can never satisfy the given constraints:
    /// negated tokens eliminate their providers outright, versioned tokens
    /// eliminate every candidate (by name or by provides) whose version
    /// does not satisfy them.
    ///
    /// A malformed version on a *requested* constraint is a hard error that
    /// aborts the resolution; malformed candidate versions only disqualify
    /// the candidate.
    pub(crate) fn constrain(&self, constraints: &[String], dq: &mut Disqualified) -> Result<()> {
        for token in constraints {
            let parsed = self.parse_constraint(token);
            if parsed.negated {
                self.disqualify_providers(&parsed, dq);
                continue;
            }
            if parsed.op == Op::Any {
                continue;
            }
            let Some(providers) = self.name_map.get(&parsed.name) else {
                continue;
            };

            let required = self
                .parse_version(&parsed.version)
                .map_err(|e| Error::Constraint {
                    token: token.clone(),
                    source: Box::new(e),
                })?;

            for provider in providers {
                if provider.package.name == parsed.name {
                    match self.parse_version(&provider.package.version) {
                        Err(e) => dq.insert(
                            &provider.package,
                            format!(
                                "parsing version {:?} failed: {}",
                                provider.package.version, e
                            ),
                        ),
                        Ok(actual) => {
                            if !parsed.op.satisfies(&actual, Some(&required)) {
                                dq.insert(
                                    &provider.package,
                                    format!(
                                        "{:?} does not satisfy {:?}",
                                        provider.package.version, token
                                    ),
                                );
                            }
                        }
                    }
                } else {
                    for provide in &provider.package.provides {
                        let pp = self.parse_constraint(provide);
                        if pp.name != parsed.name {
                            continue;
                        }
                        match self.parse_version(&pp.version) {
                            Err(e) => dq.insert(
                                &provider.package,
                                format!("parsing {:?}: {}", pp.version, e),
                            ),
                            Ok(actual) => {
                                if !parsed.op.satisfies(&actual, Some(&required)) {
                                    dq.insert(
                                        &provider.package,
                                        format!(
                                            "{} provides {:?} which does not satisfy {:?}",
                                            provider.package.filename(),
                                            provide,
                                            token
                                        ),
                                    );
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Depth-first dependency walker.
    ///
    /// Children are emitted before their parent. Each recursion carries a
    /// branch-local copy of the ancestor set and self-aborts at any
    /// ancestor reencounter, so dependency cycles terminate. `existing` and
    /// `existing_origins` are shared down the walk on purpose: sibling
    /// branches must observe each other's selections to converge on shared
    /// dependencies.
    #[allow(clippy::too_many_arguments)]
    fn package_dependencies(
        &self,
        pkg: &Arc<Package>,
        allow_pin: &str,
        allow_self_fulfill: bool,
        parents: &HashSet<String>,
        existing: &mut HashMap<String, Arc<Package>>,
        existing_origins: &mut HashSet<String>,
        dq: &mut Disqualified,
    ) -> Result<(Vec<Arc<Package>>, Vec<String>)> {
        if parents.contains(&pkg.name) {
            return Ok((Vec::new(), Vec::new()));
        }

        let mut my_provides: HashSet<String> = HashSet::with_capacity(2 * pkg.provides.len());
        for provide in &pkg.provides {
            my_provides.insert(provide.clone());
            my_provides.insert(self.parse_constraint(provide).name);
        }

        let mut constraints: Vec<String> = pkg.dependencies.clone();
        self.constrain(&constraints, dq)
            .map_err(|e| Error::Dependency {
                package: pkg.filename(),
                source: Box::new(e),
            })?;

        let mut dependencies: Vec<Arc<Package>> = Vec::new();
        let mut conflicts: Vec<String> = Vec::new();

        while !constraints.is_empty() {
            let mut options: HashMap<String, Vec<PinnedPackage>> = HashMap::new();

            for dep in &constraints {
                let parsed = self.parse_constraint(dep);

                // a negated dependency is a conflict declaration, not
                // something to search for
                if parsed.negated {
                    conflicts.push(parsed.stripped());
                    continue;
                }

                if my_provides.contains(&parsed.name) || my_provides.contains(dep) {
                    continue;
                }

                if allow_self_fulfill && pkg.name == parsed.name {
                    let actual = self.parse_version(&pkg.version);
                    let required = if parsed.op == Op::Any {
                        Ok(None)
                    } else {
                        self.parse_version(&parsed.version).map(Some)
                    };
                    // a malformed self-version falls through to the index
                    // search instead of erroring
                    if let (Ok(actual), Ok(required)) = (actual, required) {
                        if parsed.op.satisfies(&actual, required.as_ref()) {
                            continue;
                        }
                    }
                }

                let Some(candidates) = self.name_map.get(&parsed.name) else {
                    return Err(Error::NotFound(format!(
                        "could not find package either named {} or that provides {} for {}",
                        dep, dep, pkg.name
                    )));
                };

                let filtered = self.filter_packages(
                    &parsed.name,
                    candidates,
                    dq,
                    &[
                        Filter::Version {
                            op: parsed.op,
                            version: &parsed.version,
                        },
                        Filter::AllowPin(allow_pin),
                        Filter::Installed(existing.get(&parsed.name)),
                    ],
                );
                if filtered.is_empty() {
                    return Err(Error::Dependency {
                        package: pkg.filename(),
                        source: Box::new(self.disqualified_error(dep, candidates, dq)),
                    });
                }
                options.insert(dep.clone(), filtered);
            }

            if options.is_empty() {
                break;
            }

            // most-constrained token first; lexicographic tiebreak keeps
            // the walk deterministic regardless of map iteration order
            let Some(lowest) = options
                .iter()
                .min_by(|(a_token, a), (b_token, b)| {
                    a.len().cmp(&b.len()).then(a_token.cmp(b_token))
                })
                .map(|(token, _)| token.clone())
            else {
                break;
            };
            let Some(chosen) = options.remove(&lowest) else {
                break;
            };
            let name = self.parse_constraint(&lowest).name;
            constraints = options.keys().cloned().collect();

            let best = {
                let ctx = CompareContext {
                    name: &name,
                    existing: Some(&*existing),
                    existing_origins: Some(&*existing_origins),
                    ..CompareContext::default()
                };
                match self.best_candidate(&chosen, &ctx) {
                    Some(best) => Arc::clone(&best.package),
                    None => {
                        return Err(Error::NotFound(format!(
                            "could not find package for {:?}",
                            name
                        )))
                    }
                }
            };
            debug!(
                "picked {} for dependency {:?} of {}",
                best.filename(),
                lowest,
                pkg.name
            );

            self.disqualify_conflicts(&best, dq);

            // each child sees the full ancestor chain but must not extend
            // its siblings' chains
            let mut child_parents = parents.clone();
            child_parents.insert(pkg.name.clone());
            let (sub_deps, confs) = self
                .package_dependencies(
                    &best,
                    allow_pin,
                    true,
                    &child_parents,
                    existing,
                    existing_origins,
                    dq,
                )
                .map_err(|e| Error::Dependency {
                    package: pkg.filename(),
                    source: Box::new(e),
                })?;

            for dep in &sub_deps {
                existing.insert(dep.name.clone(), Arc::clone(dep));
                existing_origins.insert(dep.origin.clone());
            }
            dependencies.extend(sub_deps);
            dependencies.push(best);
            conflicts.extend(confs);
        }

        Ok((dependencies, conflicts))
    }

    /// One expansion pass over `seeds`: any install-if package whose
    /// triggers the `added` set fully satisfies is appended to `out`.
    ///
    /// A trigger matches on the exact token (for bare names) or on
    /// name plus *literal* version equality; triggered packages do not
    /// trigger further packages.
    fn expand_install_if(
        &self,
        seeds: &[Arc<Package>],
        added: &mut HashMap<String, Arc<Package>>,
        out: &mut Vec<Arc<Package>>,
    ) {
        for seed in seeds {
            let triggered = match self.install_if_map.get(&seed.name) {
                Some(list) => list,
                None => {
                    let keyed = format!("{}={}", seed.name, seed.version);
                    match self.install_if_map.get(&keyed) {
                        Some(list) => list,
                        None => continue,
                    }
                }
            };

            for candidate in triggered {
                if added.contains_key(&candidate.package.name) {
                    continue;
                }
                let all_met = candidate.package.install_if.iter().all(|trigger| {
                    if added.contains_key(trigger) {
                        return true;
                    }
                    let parsed = self.parse_constraint(trigger);
                    added
                        .get(&parsed.name)
                        .is_some_and(|chosen| chosen.version == parsed.version)
                });
                if all_met {
                    debug!(
                        "install-if: {} triggered by {}",
                        candidate.package.filename(),
                        seed.name
                    );
                    added.insert(
                        candidate.package.name.clone(),
                        Arc::clone(&candidate.package),
                    );
                    out.push(Arc::clone(&candidate.package));
                }
            }
        }
    }

    /// Aggregate the DQ reasons for a dead candidate list into one error,
    /// or a plain not-found error when nothing was ever disqualified.
    fn disqualified_error(
        &self,
        token: &str,
        candidates: &[PinnedPackage],
        dq: &Disqualified,
    ) -> Error {
        let mut seen: HashSet<usize> = HashSet::with_capacity(candidates.len());
        let mut reasons = Vec::new();
        for candidate in candidates {
            if let Some(reason) = dq.reason(&candidate.package) {
                if seen.insert(Arc::as_ptr(&candidate.package) as usize) {
                    reasons.push(Disqualification {
                        package: candidate.package.filename(),
                        reason: reason.to_string(),
                    });
                }
            }
        }
        if reasons.is_empty() {
            Error::NotFound(format!("could not find package {:?} in indexes", token))
        } else {
            Error::Unsatisfiable(reasons)
        }
    }
}

/// Order-preserving deduplication.
fn uniqify(values: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::with_capacity(values.len());
    values.into_iter().filter(|v| seen.insert(v.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{NamedIndex, RepositoryIndex};

    fn world(packages: Vec<Package>) -> Resolver {
        let index = RepositoryIndex::new("", "https://pkgs.example.org/main", packages);
        Resolver::new(&[&index as &dyn NamedIndex])
    }

    #[test]
    fn test_resolve_package_sorted_best_first() {
        let resolver = world(vec![
            Package::new("foo", "1.0"),
            Package::new("foo", "3.0"),
            Package::new("foo", "2.0"),
        ]);
        let dq = Disqualified::new();
        let candidates = resolver.resolve_package("foo", &dq).unwrap();
        let versions: Vec<&str> = candidates.iter().map(|p| p.version.as_str()).collect();
        assert_eq!(versions, vec!["3.0", "2.0", "1.0"]);
    }

    #[test]
    fn test_resolve_package_not_found() {
        let resolver = world(vec![Package::new("foo", "1.0")]);
        let dq = Disqualified::new();
        let err = resolver.resolve_package("nonexistent", &dq).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_resolve_package_reports_dq_reasons() {
        let resolver = world(vec![Package::new("foo", "1.0")]);
        let mut dq = Disqualified::new();
        dq.insert(&resolver.name_map["foo"][0].package, "held back for testing");

        let err = resolver.resolve_package("foo", &dq).unwrap_err();
        match err {
            Error::Unsatisfiable(reasons) => {
                assert_eq!(reasons.len(), 1);
                assert_eq!(reasons[0].package, "foo-1.0.apk");
                assert_eq!(reasons[0].reason, "held back for testing");
            }
            other => panic!("expected Unsatisfiable, got {:?}", other),
        }
    }

    #[test]
    fn test_package_with_dependencies_returns_closure() {
        let mut app = Package::new("app", "1.0");
        app.dependencies = vec!["lib".to_string()];
        let resolver = world(vec![app, Package::new("lib", "1.0")]);

        let mut dq = Disqualified::new();
        let resolution = resolver
            .package_with_dependencies("app", &HashMap::new(), &mut dq)
            .unwrap();
        assert_eq!(resolution.package.name, "app");
        assert_eq!(resolution.dependencies.len(), 1);
        assert_eq!(resolution.dependencies[0].name, "lib");
        assert!(resolution.conflicts.is_empty());
    }

    #[test]
    fn test_package_with_dependencies_triggers_install_if() {
        let mut docs = Package::new("docs", "1.0");
        docs.install_if = vec!["app".to_string()];
        let resolver = world(vec![Package::new("app", "1.0"), docs]);

        let mut dq = Disqualified::new();
        let resolution = resolver
            .package_with_dependencies("app", &HashMap::new(), &mut dq)
            .unwrap();
        // the selected package itself counts toward the trigger set
        assert_eq!(resolution.dependencies.len(), 1);
        assert_eq!(resolution.dependencies[0].name, "docs");
    }

    #[test]
    fn test_existing_selection_steers_dependency_choice() {
        let mut app = Package::new("app", "1.0");
        app.dependencies = vec!["lib".to_string()];
        let resolver = world(vec![
            app,
            Package::new("lib", "1.0"),
            Package::new("lib", "2.0"),
        ]);

        let mut existing = HashMap::new();
        existing.insert("lib".to_string(), Arc::new(Package::new("lib", "1.0")));

        let mut dq = Disqualified::new();
        let resolution = resolver
            .package_with_dependencies("app", &existing, &mut dq)
            .unwrap();
        assert_eq!(resolution.dependencies[0].version, "1.0");
    }

    #[test]
    fn test_cancelled_token_aborts() {
        let resolver = world(vec![Package::new("foo", "1.0")]);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = resolver
            .packages_with_dependencies(&cancel, &["foo".to_string()])
            .unwrap_err();
        assert!(matches!(err, Error::Cancelled));
    }

    #[test]
    fn test_constrain_rejects_malformed_requested_version() {
        let resolver = world(vec![Package::new("foo", "1.0")]);
        let mut dq = Disqualified::new();
        let err = resolver
            .constrain(&["foo=not-a-version".to_string()], &mut dq)
            .unwrap_err();
        assert!(matches!(err, Error::Constraint { .. }));
    }

    #[test]
    fn test_uniqify_preserves_first_occurrence() {
        let values = vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ];
        assert_eq!(uniqify(values), vec!["b", "a", "c"]);
    }
}
