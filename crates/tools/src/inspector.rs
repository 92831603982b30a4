use railwrench_action::rail::connections_of;
use railwrench_action::{RailOrientation, RailOrientationToggler};
use railwrench_common::{BlockPos, ConnectivityMask, EntityId};
use railwrench_ecs::{Capability, EntityStore};
use railwrench_kernel::{BlockManager, BlockWorld};

/// Rail network inspector for developer tooling.
///
/// Provides read-only queries against entities and blocks for debugging.
pub struct RailInspector;

impl RailInspector {
    /// Produce a summary of vehicles and rail segments.
    pub fn summary(
        entities: &EntityStore,
        world: &BlockWorld,
        registry: &BlockManager,
        toggler: &RailOrientationToggler,
    ) -> RailSummary {
        let junctions = Self::junctions(entities, world, registry, toggler);
        let count = |o: Option<RailOrientation>| junctions.iter().filter(|j| j.orientation == o).count();
        RailSummary {
            vehicles: entities.entities_with(Capability::Vehicle).len(),
            rails: entities.entities_with(Capability::Rail).len(),
            normal_junctions: count(Some(RailOrientation::Normal)),
            inverted_junctions: count(Some(RailOrientation::Inverted)),
            foreign_junctions: count(None),
        }
    }

    /// Every rail entity whose block is a T-junction, in entity order.
    ///
    /// Rails without a position or with an unreadable block are skipped.
    pub fn junctions(
        entities: &EntityStore,
        world: &BlockWorld,
        registry: &BlockManager,
        toggler: &RailOrientationToggler,
    ) -> Vec<JunctionInfo> {
        let mut result = Vec::new();
        for rail in entities.entities_with(Capability::Rail) {
            let Some(block) = entities.get_block(rail) else {
                continue;
            };
            let Some(block_type) = registry.block(world.block_at(block.position)) else {
                continue;
            };
            let mask = match connections_of(block_type) {
                Ok(mask) => mask,
                Err(error) => {
                    tracing::debug!(%rail, %error, "skipping unreadable rail");
                    continue;
                }
            };
            if !mask.is_junction() {
                continue;
            }
            result.push(JunctionInfo {
                rail,
                position: block.position,
                mask,
                orientation: toggler.orientation_of(registry, block_type.family),
                uri: block_type.uri.to_string(),
            });
        }
        result
    }
}

/// Summary of the rail network for the inspector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailSummary {
    pub vehicles: usize,
    pub rails: usize,
    pub normal_junctions: usize,
    pub inverted_junctions: usize,
    /// Junction-shaped rails in neither rail family.
    pub foreign_junctions: usize,
}

impl std::fmt::Display for RailSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rails: vehicles={} rails={} junctions(normal={} inverted={} foreign={})",
            self.vehicles,
            self.rails,
            self.normal_junctions,
            self.inverted_junctions,
            self.foreign_junctions
        )
    }
}

/// Detailed info about a single junction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JunctionInfo {
    pub rail: EntityId,
    pub position: BlockPos,
    pub mask: ConnectivityMask,
    pub orientation: Option<RailOrientation>,
    pub uri: String,
}

impl std::fmt::Display for JunctionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let orientation = match self.orientation {
            Some(RailOrientation::Normal) => "normal",
            Some(RailOrientation::Inverted) => "inverted",
            None => "foreign",
        };
        write!(
            f,
            "Junction [{}] at {} mask={} {} ({})",
            self.rail, self.position, self.mask, orientation, self.uri
        )
    }
}
