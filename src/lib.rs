//! Core of an abstract-interpretation static-analysis framework.
//!
//! The crate provides the machinery that sits between a front-end (which
//! produces opaque statement, declaration and CFG-node handles) and a
//! fixpoint driver: an [`analysis::AnalysisManager`] that registers
//! analyses, resolves their dependencies and dispatches event callbacks;
//! immutable, hash-consed [`state::ProgramState`]s mapping abstract
//! domains to lattice values; and the [`domain::DomainOps`] contract a
//! pluggable domain implements so states can compose it with the rest.
//!
//! The usual lifecycle: register analyses and their domains, seed the
//! required set from the configuration filter, compute the dependency
//! closure and the full order, build a [`state::StateManager`], then let
//! the driver walk the CFG invoking `run_analyses_for_*` with an
//! [`context::AnalysisContext`] carrying the current state.

pub mod analysis;
pub mod config;
pub mod context;
pub mod domain;
pub mod domains;
pub mod error;
pub mod frame;
pub mod frontend;
pub mod globs;
pub mod ids;
pub mod region;
pub mod state;

pub use analysis::{Analysis, AnalysisManager, RegisterableAnalysis, StmtVisitKind};
pub use context::AnalysisContext;
pub use domain::{AbstractDom, DomainDescriptor, DomainOps, OwnedVal, SharedVal};
pub use error::{Error, Result};
pub use ids::{AnalysisDescriptor, AnalysisId, CheckerDescriptor, CheckerId, DomId, KindRegistry};
pub use state::{ProgramState, ProgramStateRef, StateManager};
