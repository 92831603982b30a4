//! Wrench actions: what happens when a player activates a wrench on a target.
//!
//! Two handlers share one trigger. On a rail vehicle the wrench looks for the
//! nearest other vehicle to couple with; on a rail block it flips a
//! T-junction between its normal and inverted orientation.
//!
//! # Invariants
//! - Handlers never create or destroy entities or blocks.
//! - A rail toggle issues at most one forced block update.
//! - Join search is deterministic: equidistant candidates resolve to the lowest id.

pub mod collab;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod join;
pub mod rail;
pub mod spatial;

pub use collab::{
    BlockFamilyRegistry, DiagnosticLevel, Diagnostics, DiagnosticsLog, EntityQuery,
    TracingDiagnostics, WorldMutate, WorldQuery,
};
pub use config::{MAX_VEHICLE_JOIN_DISTANCE, WrenchConfig};
pub use dispatch::{ActionContext, ActionOutcome, ActivateEvent, Handler, WrenchAction};
pub use error::{ActionError, Attribute, ConfigError};
pub use join::{ProximityVehicleFinder, find_join_candidate};
pub use rail::{NoOpReason, RailOrientation, RailOrientationToggler, ToggleOutcome};
pub use spatial::{VehicleGrid, find_join_candidate_indexed};
