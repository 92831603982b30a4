//! Shared value types used across the railwrench crates.
//!
//! # Invariants
//! - `EntityId` ordering is total and stable: `(index, generation)`.
//! - A `ConnectivityMask` is a plain byte; its meaning is one bit per side.

mod mask;
mod types;

pub use mask::{ConnectivityMask, MaskParseError, Side};
pub use types::{BlockPos, EntityId, Location};
