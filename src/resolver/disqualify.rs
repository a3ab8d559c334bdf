// src/resolver/disqualify.rs

//! Disqualification tracking
//!
//! Candidates eliminated during one resolution are recorded here with a
//! human-readable reason. Disqualification is permanent for the resolution
//! and never ripples backward: a choice already made is not revisited when a
//! later elimination would have invalidated it.

use crate::constraint::Constraint;
use crate::error::Disqualification;
use crate::index::Package;
use crate::resolver::filter::Filter;
use crate::resolver::Resolver;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

/// Identity of a candidate package within one resolver.
///
/// The same `Arc<Package>` is listed once per name it can satisfy; pointer
/// identity collapses those aliases to a single disqualification entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PackageId(usize);

impl PackageId {
    fn of(pkg: &Arc<Package>) -> Self {
        Self(Arc::as_ptr(pkg) as usize)
    }
}

/// The set of disqualified candidates for a single resolution.
///
/// All writes go through [`Disqualified::insert`], which keeps the first
/// reason recorded for a package and ignores later ones.
#[derive(Debug, Default)]
pub struct Disqualified {
    reasons: HashMap<PackageId, (Arc<Package>, String)>,
}

impl Disqualified {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a disqualification reason; first reason wins.
    pub fn insert(&mut self, pkg: &Arc<Package>, reason: impl Into<String>) {
        self.reasons
            .entry(PackageId::of(pkg))
            .or_insert_with(|| {
                let reason = reason.into();
                trace!("disqualified {}: {}", pkg.filename(), reason);
                (Arc::clone(pkg), reason)
            });
    }

    pub fn contains(&self, pkg: &Arc<Package>) -> bool {
        self.reasons.contains_key(&PackageId::of(pkg))
    }

    /// The recorded reason for a package, if it was disqualified.
    pub fn reason(&self, pkg: &Arc<Package>) -> Option<&str> {
        self.reasons
            .get(&PackageId::of(pkg))
            .map(|(_, reason)| reason.as_str())
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

impl Resolver {
    /// Disqualify everything that provides the negated token's name.
    ///
    /// Implements `!token` constraints: every candidate whose effective
    /// version satisfies the token's version filter is excluded.
    pub(crate) fn disqualify_providers(&self, parsed: &Constraint, dq: &mut Disqualified) {
        let Some(providers) = self.name_map.get(&parsed.name) else {
            return;
        };

        let conflicting = self.filter_packages(
            &parsed.name,
            providers,
            dq,
            &[
                Filter::Version {
                    op: parsed.op,
                    version: &parsed.version,
                },
                Filter::PreferPin(&parsed.pin),
            ],
        );

        let reason = format!("excluded by !{}", parsed.stripped());
        for candidate in &conflicting {
            dq.insert(&candidate.package, reason.clone());
        }
    }

    /// Disqualify everything that conflicts with a definitively selected
    /// package: for each name it provides, every other candidate listed
    /// under that name loses.
    pub(crate) fn disqualify_conflicts(&self, pkg: &Arc<Package>, dq: &mut Disqualified) {
        for provide in &pkg.provides {
            let name = self.parse_constraint(provide).name;
            let Some(providers) = self.name_map.get(&name) else {
                continue;
            };
            for candidate in providers {
                if Arc::ptr_eq(&candidate.package, pkg) {
                    continue;
                }
                dq.insert(
                    &candidate.package,
                    format!("{} already provides {}", pkg.filename(), name),
                );
            }
        }
    }
}
