//! Developer Tooling: read-only inspection of vehicles and rail junctions.
//!
//! # Invariants
//! - Inspection never mutates the world or the entity store.

mod inspector;

pub use inspector::{JunctionInfo, RailInspector, RailSummary};
