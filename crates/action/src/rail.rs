use railwrench_common::{BlockPos, ConnectivityMask, EntityId};
use railwrench_ecs::Capability;
use railwrench_kernel::{BlockId, BlockType, FamilyId};

use crate::collab::{BlockFamilyRegistry, EntityQuery, WorldMutate};
use crate::config::WrenchConfig;
use crate::error::{ActionError, Attribute};

/// Which of the two junction families a rail block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RailOrientation {
    Normal,
    Inverted,
}

impl RailOrientation {
    pub fn opposite(self) -> Self {
        match self {
            Self::Normal => Self::Inverted,
            Self::Inverted => Self::Normal,
        }
    }
}

/// Why a toggle request left the world untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoOpReason {
    /// Target is not a rail segment.
    NotRail,
    /// Only T-junctions (three connections) can be flipped.
    NotJunction(ConnectivityMask),
    /// Block belongs to neither rail family.
    UnknownFamily(FamilyId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Toggled {
        position: BlockPos,
        orientation: RailOrientation,
        block: BlockId,
    },
    NoOp(NoOpReason),
}

/// Flips T-junction rails between the normal and inverted families.
///
/// The flip keeps the connectivity mask and swaps only the family, so
/// applying it twice restores the original block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RailOrientationToggler {
    normal_family: String,
    inverted_family: String,
}

impl RailOrientationToggler {
    pub fn new(normal_family: impl Into<String>, inverted_family: impl Into<String>) -> Self {
        Self {
            normal_family: normal_family.into(),
            inverted_family: inverted_family.into(),
        }
    }

    pub fn from_config(config: &WrenchConfig) -> Self {
        Self::new(
            config.normal_rail_family.clone(),
            config.inverted_rail_family.clone(),
        )
    }

    fn family_name(&self, orientation: RailOrientation) -> &str {
        match orientation {
            RailOrientation::Normal => &self.normal_family,
            RailOrientation::Inverted => &self.inverted_family,
        }
    }

    /// Orientation of a family, if it is one of the two rail families.
    pub fn orientation_of<R>(&self, registry: &R, family: FamilyId) -> Option<RailOrientation>
    where
        R: BlockFamilyRegistry + ?Sized,
    {
        [RailOrientation::Normal, RailOrientation::Inverted]
            .into_iter()
            .find(|o| registry.family_by_name(self.family_name(*o)) == Some(family))
    }

    /// Flip the rail junction `target` stands for.
    ///
    /// Issues exactly one forced block update when the outcome is `Toggled`
    /// and none otherwise. Errors leave the world unchanged.
    pub fn try_toggle_orientation<Q, W, R>(
        &self,
        target: EntityId,
        entities: &Q,
        world: &mut W,
        registry: &R,
    ) -> Result<ToggleOutcome, ActionError>
    where
        Q: EntityQuery + ?Sized,
        W: WorldMutate + ?Sized,
        R: BlockFamilyRegistry + ?Sized,
    {
        if !entities.has_capability(target, Capability::Rail) {
            return Ok(ToggleOutcome::NoOp(NoOpReason::NotRail));
        }
        let position = entities
            .block_position(target)
            .ok_or(ActionError::MissingAttribute {
                entity: target,
                attribute: Attribute::BlockPosition,
            })?;

        let block_id = world.block_at(position);
        if block_id == BlockId::AIR {
            return Err(ActionError::MissingAttribute {
                entity: target,
                attribute: Attribute::Block,
            });
        }
        let block = registry
            .block_type(block_id)
            .ok_or(ActionError::UnknownBlock {
                position,
                block: block_id.0,
            })?;

        let mask = connections_of(block)?;
        if !mask.is_junction() {
            return Ok(ToggleOutcome::NoOp(NoOpReason::NotJunction(mask)));
        }

        let Some(current) = self.orientation_of(registry, block.family) else {
            return Ok(ToggleOutcome::NoOp(NoOpReason::UnknownFamily(block.family)));
        };
        let orientation = current.opposite();
        let family_name = self.family_name(orientation);
        let replacement = registry
            .family_by_name(family_name)
            .and_then(|family| registry.block_by_connection(family, mask))
            .ok_or_else(|| ActionError::MissingVariant {
                family: family_name.to_string(),
                mask,
            })?;

        world.set_block_force_update(position, replacement);
        tracing::debug!(%position, ?current, ?orientation, %mask, "rail junction flipped");
        Ok(ToggleOutcome::Toggled {
            position,
            orientation,
            block: replacement,
        })
    }
}

/// Connectivity of a block: the explicit attribute when present, otherwise
/// the decimal mask encoded in its identifier.
pub fn connections_of(block: &BlockType) -> Result<ConnectivityMask, ActionError> {
    match block.connections {
        Some(mask) => Ok(mask),
        None => Ok(ConnectivityMask::parse_identifier(&block.uri.identifier)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{INVERTED_RAIL_FAMILY, NORMAL_RAIL_FAMILY};
    use railwrench_ecs::EntityStore;
    use railwrench_kernel::{BlockManager, BlockWorld, WorldEvent};

    struct Fixture {
        entities: EntityStore,
        world: BlockWorld,
        registry: BlockManager,
        toggler: RailOrientationToggler,
        normal: FamilyId,
        inverted: FamilyId,
    }

    impl Fixture {
        fn new() -> Self {
            let mut registry = BlockManager::new();
            let all = (0..=u8::MAX).map(ConnectivityMask);
            let junctions = all.clone().filter(|m| m.is_junction());
            let normal = registry
                .register_connection_family(NORMAL_RAIL_FAMILY, all)
                .unwrap();
            let inverted = registry
                .register_connection_family(INVERTED_RAIL_FAMILY, junctions)
                .unwrap();
            Self {
                entities: EntityStore::new(),
                world: BlockWorld::new(),
                registry,
                toggler: RailOrientationToggler::from_config(&WrenchConfig::default()),
                normal,
                inverted,
            }
        }

        fn place(&mut self, pos: BlockPos, block: BlockId) -> EntityId {
            self.world.set_block(pos, block);
            let rail = self.entities.spawn();
            self.entities.add_rail(rail);
            self.entities.set_block(rail, pos);
            self.world.bind_entity(pos, rail);
            rail
        }

        fn variant(&self, family: FamilyId, mask: u8) -> BlockId {
            self.registry
                .family(family)
                .unwrap()
                .block_by_connection(ConnectivityMask(mask))
                .unwrap()
        }

        fn toggle(&mut self, rail: EntityId) -> Result<ToggleOutcome, ActionError> {
            self.toggler.try_toggle_orientation(
                rail,
                &self.entities,
                &mut self.world,
                &self.registry,
            )
        }

        fn forced_updates(&self) -> usize {
            self.world
                .events()
                .iter()
                .filter(|e| matches!(e, WorldEvent::BlockForceUpdated { .. }))
                .count()
        }
    }

    #[test]
    fn normal_junction_flips_to_inverted() {
        let mut fx = Fixture::new();
        let pos = BlockPos::new(3, 0, 1);
        let rail = fx.place(pos, fx.variant(fx.normal, 7));

        let outcome = fx.toggle(rail).unwrap();
        let expected = fx.variant(fx.inverted, 7);
        assert_eq!(
            outcome,
            ToggleOutcome::Toggled {
                position: pos,
                orientation: RailOrientation::Inverted,
                block: expected
            }
        );
        assert_eq!(fx.world.block_at(pos), expected);
        assert_eq!(fx.forced_updates(), 1);
        assert_eq!(fx.world.entity_at(pos), Some(rail));
    }

    #[test]
    fn inverted_junction_flips_to_normal() {
        let mut fx = Fixture::new();
        let pos = BlockPos::new(0, 0, 0);
        let rail = fx.place(pos, fx.variant(fx.inverted, 7));

        let outcome = fx.toggle(rail).unwrap();
        assert!(matches!(
            outcome,
            ToggleOutcome::Toggled {
                orientation: RailOrientation::Normal,
                ..
            }
        ));
        assert_eq!(fx.world.block_at(pos), fx.variant(fx.normal, 7));
    }

    #[test]
    fn straight_rail_is_left_alone() {
        let mut fx = Fixture::new();
        let pos = BlockPos::new(0, 0, 0);
        let block = fx.variant(fx.normal, 3);
        let rail = fx.place(pos, block);

        assert_eq!(
            fx.toggle(rail).unwrap(),
            ToggleOutcome::NoOp(NoOpReason::NotJunction(ConnectivityMask(3)))
        );
        assert_eq!(fx.world.block_at(pos), block);
        assert_eq!(fx.forced_updates(), 0);
    }

    #[test]
    fn every_non_junction_mask_is_a_noop() {
        let mut fx = Fixture::new();
        for bits in (0..=u8::MAX).filter(|b| b.count_ones() != 3) {
            let pos = BlockPos::new(bits as i32, 0, 0);
            let rail = fx.place(pos, fx.variant(fx.normal, bits));
            assert!(matches!(
                fx.toggle(rail).unwrap(),
                ToggleOutcome::NoOp(NoOpReason::NotJunction(_))
            ));
        }
        assert_eq!(fx.forced_updates(), 0);
    }

    #[test]
    fn every_junction_round_trips() {
        let mut fx = Fixture::new();
        for bits in (0..=u8::MAX).filter(|b| b.count_ones() == 3) {
            for start in [fx.normal, fx.inverted] {
                let pos = BlockPos::new(bits as i32, 0, start.0 as i32);
                let original = fx.variant(start, bits);
                let rail = fx.place(pos, original);
                let before = fx.world.state_hash();

                let first = fx.toggle(rail).unwrap();
                let flipped = fx.world.block_at(pos);
                assert_ne!(flipped, original);
                let flipped_type = fx.registry.block(flipped).unwrap();
                assert_eq!(flipped_type.connections, Some(ConnectivityMask(bits)));
                assert_ne!(flipped_type.family, start);
                assert!(matches!(first, ToggleOutcome::Toggled { .. }));

                fx.toggle(rail).unwrap();
                assert_eq!(fx.world.block_at(pos), original);
                assert_eq!(fx.world.state_hash(), before);
            }
        }
    }

    #[test]
    fn foreign_family_is_a_noop() {
        let mut fx = Fixture::new();
        let fences = fx
            .registry
            .register_connection_family("Fences:fence", [ConnectivityMask(7)])
            .unwrap();
        let pos = BlockPos::new(0, 0, 0);
        let rail = fx.place(pos, fx.variant(fences, 7));

        assert_eq!(
            fx.toggle(rail).unwrap(),
            ToggleOutcome::NoOp(NoOpReason::UnknownFamily(fences))
        );
        assert_eq!(fx.forced_updates(), 0);
    }

    #[test]
    fn non_rail_target_is_a_noop() {
        let mut fx = Fixture::new();
        let cart = fx.entities.spawn();
        fx.entities.add_vehicle(cart);
        assert_eq!(fx.toggle(cart).unwrap(), ToggleOutcome::NoOp(NoOpReason::NotRail));
    }

    #[test]
    fn legacy_identifier_is_parsed() {
        let mut fx = Fixture::new();
        let legacy = fx.registry.register_legacy_variant(fx.normal, "11").unwrap();
        let pos = BlockPos::new(0, 0, 0);
        let rail = fx.place(pos, legacy);

        fx.toggle(rail).unwrap();
        assert_eq!(fx.world.block_at(pos), fx.variant(fx.inverted, 11));

        // Flipping back lands on the family's registered variant, not the
        // legacy block, with the same family and connections.
        fx.toggle(rail).unwrap();
        let restored = fx.world.block_at(pos);
        assert_eq!(restored, fx.variant(fx.normal, 11));
        assert_ne!(restored, legacy);
        let block = fx.registry.block(restored).unwrap();
        assert_eq!(block.family, fx.normal);
        assert_eq!(connections_of(block).unwrap(), ConnectivityMask(11));
    }

    #[test]
    fn malformed_identifier_aborts_without_mutation() {
        let mut fx = Fixture::new();
        let odd = fx.registry.register_legacy_variant(fx.normal, "tee").unwrap();
        let pos = BlockPos::new(0, 0, 0);
        let rail = fx.place(pos, odd);

        let err = fx.toggle(rail).unwrap_err();
        assert!(matches!(err, ActionError::MalformedIdentifier { ref identifier, .. } if identifier == "tee"));
        assert_eq!(fx.world.block_at(pos), odd);
        assert_eq!(fx.forced_updates(), 0);
    }

    #[test]
    fn rail_without_block_position_is_an_error() {
        let mut fx = Fixture::new();
        let rail = fx.entities.spawn();
        fx.entities.add_rail(rail);
        assert_eq!(
            fx.toggle(rail).unwrap_err(),
            ActionError::MissingAttribute {
                entity: rail,
                attribute: Attribute::BlockPosition
            }
        );
    }

    #[test]
    fn rail_over_air_is_an_error() {
        let mut fx = Fixture::new();
        let rail = fx.place(BlockPos::new(0, 0, 0), BlockId::AIR);
        assert!(matches!(
            fx.toggle(rail),
            Err(ActionError::MissingAttribute {
                attribute: Attribute::Block,
                ..
            })
        ));
    }

    #[test]
    fn missing_inverted_variant_is_an_error() {
        let mut registry = BlockManager::new();
        let normal = registry
            .register_connection_family(NORMAL_RAIL_FAMILY, [ConnectivityMask(7)])
            .unwrap();
        registry
            .register_connection_family(INVERTED_RAIL_FAMILY, [ConnectivityMask(11)])
            .unwrap();
        let mut fx = Fixture {
            registry,
            ..Fixture::new()
        };
        let block = fx.registry.family(normal).unwrap().block_by_connection(ConnectivityMask(7)).unwrap();
        let pos = BlockPos::new(0, 0, 0);
        let rail = fx.place(pos, block);

        assert!(matches!(
            fx.toggle(rail),
            Err(ActionError::MissingVariant { .. })
        ));
        assert_eq!(fx.world.block_at(pos), block);
    }

    #[test]
    fn orientation_opposite_is_an_involution() {
        for o in [RailOrientation::Normal, RailOrientation::Inverted] {
            assert_ne!(o.opposite(), o);
            assert_eq!(o.opposite().opposite(), o);
        }
    }
}
