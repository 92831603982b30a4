use railwrench_common::{EntityId, Location};
use railwrench_ecs::Capability;

use crate::collab::EntityQuery;
use crate::error::{ActionError, Attribute};

/// Nearest vehicle, other than `source`, strictly closer than `threshold`.
///
/// Single pass over `vehicles`, comparing squared distances. Exact ties go to
/// the lowest `EntityId`, so the result does not depend on input order. A
/// candidate without a location aborts the search.
pub fn find_join_candidate<Q>(
    entities: &Q,
    source: EntityId,
    source_location: &Location,
    vehicles: &[EntityId],
    threshold: f32,
) -> Result<Option<EntityId>, ActionError>
where
    Q: EntityQuery + ?Sized,
{
    let limit_sq = threshold * threshold;
    let mut best: Option<(EntityId, f32)> = None;

    for &candidate in vehicles {
        if candidate == source {
            continue;
        }
        let location = entities
            .location(candidate)
            .ok_or(ActionError::MissingAttribute {
                entity: candidate,
                attribute: Attribute::Location,
            })?;
        let dist_sq = location.distance_squared(source_location);
        if dist_sq.is_nan() || dist_sq >= limit_sq {
            continue;
        }
        let closer = match best {
            None => true,
            Some((best_id, best_sq)) => {
                dist_sq < best_sq || (dist_sq == best_sq && candidate < best_id)
            }
        };
        if closer {
            best = Some((candidate, dist_sq));
        }
    }

    Ok(best.map(|(id, _)| id))
}

/// Finds a coupling partner for a rail vehicle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityVehicleFinder {
    max_distance: f32,
}

impl ProximityVehicleFinder {
    pub fn new(max_distance: f32) -> Self {
        Self { max_distance }
    }

    pub fn max_distance(&self) -> f32 {
        self.max_distance
    }

    /// Search every known vehicle for the nearest one to `vehicle`.
    pub fn find<Q>(&self, entities: &Q, vehicle: EntityId) -> Result<Option<EntityId>, ActionError>
    where
        Q: EntityQuery + ?Sized,
    {
        let location = entities
            .location(vehicle)
            .ok_or(ActionError::MissingAttribute {
                entity: vehicle,
                attribute: Attribute::Location,
            })?;
        let vehicles = entities.entities_with(Capability::Vehicle);
        let found = find_join_candidate(entities, vehicle, &location, &vehicles, self.max_distance)?;
        tracing::debug!(
            %vehicle,
            scanned = vehicles.len(),
            candidate = ?found,
            "join search"
        );
        Ok(found)
    }
}
