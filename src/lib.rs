// src/lib.rs

//! APK-style package dependency resolver
//!
//! Given a set of repository indexes and a set of requested packages with
//! optional version constraints, the resolver produces an ordered install
//! list and a conflict list that satisfy every constraint, or fails with a
//! structured explanation of what was eliminated and why.
//!
//! # Architecture
//!
//! - Deterministic: heuristic candidate selection with explicit
//!   tie-breaking, no backtracking; the same inputs always produce the
//!   same install order
//! - Depth-first: dependencies are emitted before their dependents, so the
//!   install list is a topological order of the discovered subgraph
//! - Disqualification-driven: eliminated candidates carry human-readable
//!   reasons that surface in errors when a request becomes unsatisfiable
//! - Read-only inputs: a resolver is built once per index set; all
//!   per-resolution state lives in the individual call

pub mod config;
pub mod constraint;
mod error;
pub mod index;
pub mod resolver;
pub mod version;

pub use constraint::Constraint;
pub use error::{Disqualification, Error, Result};
pub use index::{NamedIndex, Package, RepositoryIndex};
pub use resolver::{DependencyResolution, Disqualified, ResolutionPlan, Resolver};
pub use version::{Op, Version};
