//! World Kernel: authoritative block state, block-family registry, deterministic replay.
//!
//! # Invariants
//! - All block mutations flow through explicit operations and are logged.
//! - A forced update replaces the block but keeps its bound block entity.

pub mod block;
pub mod world;

pub use block::{BlockError, BlockFamily, BlockId, BlockManager, BlockType, BlockUri, FamilyId};
pub use world::{BlockWorld, WorldEvent};
