// src/resolver/compare.rs

//! Candidate ordering and selection
//!
//! A total order over candidates, smallest first, decides every selection
//! the resolver makes. The order is built from the resolution context:
//! repository and origin affinity to a reference package, stability toward
//! already-selected packages and origins, pin preference, provider
//! priority, effective version, and finally the package name so that equal
//! candidates still order deterministically.

use crate::index::Package;
use crate::resolver::{PinnedPackage, Resolver};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Reference context for one comparison pass.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CompareContext<'a> {
    /// Prefer candidates from this package's repository and origin.
    pub compare: Option<&'a Package>,
    /// The name being resolved; effective versions are computed against it.
    pub name: &'a str,
    /// Already-selected packages by name.
    pub existing: Option<&'a HashMap<String, Arc<Package>>>,
    /// Origins of already-selected packages.
    pub existing_origins: Option<&'a HashSet<String>>,
    /// Preferred index pin label; empty for none.
    pub pin: &'a str,
}

impl Resolver {
    /// Total order over candidates; `Less` means `a` is the better choice.
    pub(crate) fn compare_candidates(
        &self,
        ctx: &CompareContext<'_>,
        a: &PinnedPackage,
        b: &PinnedPackage,
    ) -> Ordering {
        let a_version_str = self.dep_version_for_name(a, ctx.name);
        let b_version_str = self.dep_version_for_name(b, ctx.name);

        if let Some(compare) = ctx.compare {
            let a_repo = a.package.repository == compare.repository;
            let b_repo = b.package.repository == compare.repository;
            if a_repo != b_repo {
                return if a_repo { Ordering::Less } else { Ordering::Greater };
            }
            let a_origin = a.package.origin == compare.origin;
            let b_origin = b.package.origin == compare.origin;
            if a_origin != b_origin {
                return if a_origin { Ordering::Less } else { Ordering::Greater };
            }
        }

        // an already-selected name at the same version stays selected
        let selected = |c: &PinnedPackage| {
            ctx.existing
                .and_then(|existing| existing.get(&c.package.name))
                .is_some_and(|chosen| chosen.version == c.package.version)
        };
        let a_selected = selected(a);
        let b_selected = selected(b);
        if a_selected != b_selected {
            return if a_selected { Ordering::Less } else { Ordering::Greater };
        }

        let origin_known = |c: &PinnedPackage| {
            ctx.existing_origins
                .is_some_and(|origins| origins.contains(&c.package.origin))
        };
        let a_origin = origin_known(a);
        let b_origin = origin_known(b);
        if a_origin != b_origin {
            return if a_origin { Ordering::Less } else { Ordering::Greater };
        }

        let a_pinned = a.pinned_name == ctx.pin;
        let b_pinned = b.pinned_name == ctx.pin;
        if a_pinned != b_pinned {
            return if a_pinned { Ordering::Less } else { Ordering::Greater };
        }

        if a.package.provider_priority != b.package.provider_priority {
            // higher priority wins
            return b
                .package
                .provider_priority
                .cmp(&a.package.provider_priority);
        }

        // higher effective version wins; a parse failure loses outright
        let a_version = match self.parse_version(&a_version_str) {
            Ok(version) => version,
            Err(_) => return Ordering::Greater,
        };
        let b_version = match self.parse_version(&b_version_str) {
            Ok(version) => version,
            Err(_) => return Ordering::Less,
        };
        match b_version.cmp(&a_version) {
            Ordering::Equal => {}
            ord => return ord,
        }

        // effective versions tied through provides: fall back to the
        // candidates' own package versions
        if a_version_str != a.package.version || b_version_str != b.package.version {
            let a_own = match self.parse_version(&a.package.version) {
                Ok(version) => version,
                Err(_) => return Ordering::Greater,
            };
            let b_own = match self.parse_version(&b.package.version) {
                Ok(version) => version,
                Err(_) => return Ordering::Less,
            };
            match b_own.cmp(&a_own) {
                Ordering::Equal => {}
                ord => return ord,
            }
        }

        a.package.name.cmp(&b.package.name)
    }

    /// The best candidate under [`Resolver::compare_candidates`]; first wins
    /// on full ties.
    pub(crate) fn best_candidate<'p>(
        &self,
        candidates: &'p [PinnedPackage],
        ctx: &CompareContext<'_>,
    ) -> Option<&'p PinnedPackage> {
        candidates.iter().reduce(|best, candidate| {
            if self.compare_candidates(ctx, candidate, best) == Ordering::Less {
                candidate
            } else {
                best
            }
        })
    }

    /// Sort candidates best-first.
    pub(crate) fn sort_candidates(
        &self,
        candidates: &mut [PinnedPackage],
        ctx: &CompareContext<'_>,
    ) {
        candidates.sort_by(|a, b| self.compare_candidates(ctx, a, b));
    }
}
