use railwrench_common::EntityId;
use railwrench_ecs::Capability;

use crate::collab::{BlockFamilyRegistry, Diagnostics, EntityQuery, WorldMutate};
use crate::config::WrenchConfig;
use crate::error::ActionError;
use crate::join::ProximityVehicleFinder;
use crate::rail::{RailOrientationToggler, ToggleOutcome};

/// A player used `instigator` on `target`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivateEvent {
    pub instigator: EntityId,
    pub target: EntityId,
}

/// The two wrench handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handler {
    CartJoin,
    RailFlip,
}

/// What a single handler did with an activation.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    JoinSearch {
        vehicle: EntityId,
        candidate: Option<EntityId>,
    },
    RailToggle {
        rail: EntityId,
        outcome: ToggleOutcome,
    },
    /// The handler failed; the failure was reported and dropped.
    Discarded { handler: Handler, error: ActionError },
}

/// Host services a dispatch runs against.
pub struct ActionContext<'a> {
    pub entities: &'a dyn EntityQuery,
    pub world: &'a mut dyn WorldMutate,
    pub registry: &'a dyn BlockFamilyRegistry,
    pub diagnostics: &'a mut dyn Diagnostics,
}

/// Routes wrench activations to the join and rail handlers.
#[derive(Debug, Clone)]
pub struct WrenchAction {
    finder: ProximityVehicleFinder,
    toggler: RailOrientationToggler,
}

impl WrenchAction {
    pub fn new(config: &WrenchConfig) -> Self {
        Self {
            finder: ProximityVehicleFinder::new(config.max_vehicle_join_distance),
            toggler: RailOrientationToggler::from_config(config),
        }
    }

    pub fn finder(&self) -> &ProximityVehicleFinder {
        &self.finder
    }

    pub fn toggler(&self) -> &RailOrientationToggler {
        &self.toggler
    }

    /// Run every handler that applies to the event, in handler order.
    ///
    /// A handler applies when the instigator is a wrench and the target has
    /// the handler's capability. Handler failures never escape: they are
    /// logged and returned as [`ActionOutcome::Discarded`].
    pub fn on_activate(&self, event: ActivateEvent, ctx: &mut ActionContext<'_>) -> Vec<ActionOutcome> {
        let _span = tracing::info_span!(
            "wrench_activate",
            instigator = %event.instigator,
            target = %event.target
        )
        .entered();

        if !ctx.entities.has_capability(event.instigator, Capability::Wrench) {
            tracing::trace!("instigator is not a wrench");
            return Vec::new();
        }

        let mut outcomes = Vec::new();
        if let Some(outcome) = self.on_cart_join(event, ctx.entities, &mut *ctx.diagnostics) {
            outcomes.push(outcome);
        }
        if let Some(outcome) = self.on_rail_flip(
            event,
            ctx.entities,
            &mut *ctx.world,
            ctx.registry,
            &mut *ctx.diagnostics,
        ) {
            outcomes.push(outcome);
        }
        outcomes
    }

    /// Join handler: look for a vehicle the target could couple with.
    pub fn on_cart_join(
        &self,
        event: ActivateEvent,
        entities: &dyn EntityQuery,
        diagnostics: &mut dyn Diagnostics,
    ) -> Option<ActionOutcome> {
        let vehicle = event.target;
        if !entities.has_capability(vehicle, Capability::Vehicle) {
            return None;
        }
        let outcome = match self.finder.find(entities, vehicle) {
            Ok(candidate) => {
                match candidate {
                    Some(other) => {
                        tracing::info!(%vehicle, %other, "joinable vehicle");
                        diagnostics.info("Found joinable vehicle");
                    }
                    None => diagnostics.info("No joinable vehicle found"),
                }
                ActionOutcome::JoinSearch { vehicle, candidate }
            }
            Err(error) => discard(Handler::CartJoin, error, diagnostics),
        };
        Some(outcome)
    }

    /// Rail handler: flip the target junction between its two orientations.
    pub fn on_rail_flip(
        &self,
        event: ActivateEvent,
        entities: &dyn EntityQuery,
        world: &mut dyn WorldMutate,
        registry: &dyn BlockFamilyRegistry,
        diagnostics: &mut dyn Diagnostics,
    ) -> Option<ActionOutcome> {
        let rail = event.target;
        if !entities.has_capability(rail, Capability::Rail) {
            return None;
        }
        let outcome = match self
            .toggler
            .try_toggle_orientation(rail, entities, world, registry)
        {
            Ok(outcome) => {
                tracing::info!(%rail, ?outcome, "rail flip");
                ActionOutcome::RailToggle { rail, outcome }
            }
            Err(error) => discard(Handler::RailFlip, error, diagnostics),
        };
        Some(outcome)
    }
}

fn discard(handler: Handler, error: ActionError, diagnostics: &mut dyn Diagnostics) -> ActionOutcome {
    tracing::warn!(?handler, %error, "wrench action discarded");
    diagnostics.warn(&format!("{handler:?} skipped: {error}"));
    ActionOutcome::Discarded { handler, error }
}
