//! Bundled reference domains.
//!
//! These are the demo domains the crate ships with: an interval lattice
//! over machine integers and a non-relational map from declarations to
//! intervals. They double as the lattice-law test fixtures.

pub mod interval;
pub mod map;

pub use interval::Interval;
pub use map::VarMap;
