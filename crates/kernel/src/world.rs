use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use railwrench_common::{BlockPos, EntityId};

use crate::block::BlockId;

/// An event record produced by every mutation to the block world.
///
/// Each event captures enough information to reconstruct or reverse the mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldEvent {
    /// Block replaced; any bound block entity was released.
    BlockSet {
        pos: BlockPos,
        old: BlockId,
        new: BlockId,
    },
    /// Block replaced in place; the bound block entity was kept and refreshed.
    BlockForceUpdated {
        pos: BlockPos,
        old: BlockId,
        new: BlockId,
    },
    /// A block entity was attached to a position.
    EntityBound { pos: BlockPos, entity: EntityId },
    /// A block entity was detached from a position.
    EntityUnbound { pos: BlockPos, entity: EntityId },
}

/// The authoritative block state.
///
/// Positions that were never set read as `BlockId::AIR`. Uses BTreeMap for
/// deterministic iteration order across all platforms.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockWorld {
    blocks: BTreeMap<BlockPos, BlockId>,
    block_entities: BTreeMap<BlockPos, EntityId>,
    /// Append-only event log of all mutations.
    #[serde(skip)]
    event_log: Vec<WorldEvent>,
}

impl BlockWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of non-air blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Drain and return the event log.
    pub fn drain_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.event_log)
    }

    /// Read-only access to the event log.
    pub fn events(&self) -> &[WorldEvent] {
        &self.event_log
    }

    /// All non-air blocks in position order.
    pub fn blocks(&self) -> &BTreeMap<BlockPos, BlockId> {
        &self.blocks
    }

    pub fn block_at(&self, pos: BlockPos) -> BlockId {
        self.blocks.get(&pos).copied().unwrap_or(BlockId::AIR)
    }

    pub fn entity_at(&self, pos: BlockPos) -> Option<EntityId> {
        self.block_entities.get(&pos).copied()
    }

    /// Attach a block entity to a position, replacing any previous binding.
    pub fn bind_entity(&mut self, pos: BlockPos, entity: EntityId) {
        if let Some(previous) = self.block_entities.insert(pos, entity) {
            self.event_log.push(WorldEvent::EntityUnbound {
                pos,
                entity: previous,
            });
        }
        self.event_log.push(WorldEvent::EntityBound { pos, entity });
    }

    /// Place a block. The block entity at this position, if any, is released.
    /// Returns the block that was there before.
    pub fn set_block(&mut self, pos: BlockPos, new: BlockId) -> BlockId {
        let old = self.write(pos, new);
        self.event_log.push(WorldEvent::BlockSet { pos, old, new });
        if let Some(entity) = self.block_entities.remove(&pos) {
            self.event_log
                .push(WorldEvent::EntityUnbound { pos, entity });
        }
        old
    }

    /// Replace a block in place, keeping its block entity bound.
    /// Returns the block that was there before.
    pub fn set_block_force_update(&mut self, pos: BlockPos, new: BlockId) -> BlockId {
        let old = self.write(pos, new);
        tracing::debug!(%pos, ?old, ?new, "forced block update");
        self.event_log
            .push(WorldEvent::BlockForceUpdated { pos, old, new });
        old
    }

    fn write(&mut self, pos: BlockPos, new: BlockId) -> BlockId {
        let old = if new == BlockId::AIR {
            self.blocks.remove(&pos)
        } else {
            self.blocks.insert(pos, new)
        };
        old.unwrap_or(BlockId::AIR)
    }

    /// Reconstruct world state from a sequence of events (for replay).
    pub fn replay(events: &[WorldEvent]) -> Self {
        let mut world = Self::new();
        for event in events {
            match event {
                WorldEvent::BlockSet { pos, new, .. }
                | WorldEvent::BlockForceUpdated { pos, new, .. } => {
                    world.write(*pos, *new);
                }
                WorldEvent::EntityBound { pos, entity } => {
                    world.block_entities.insert(*pos, *entity);
                }
                WorldEvent::EntityUnbound { pos, .. } => {
                    world.block_entities.remove(pos);
                }
            }
        }
        world
    }

    /// Compute a deterministic hash of the world state for comparison.
    /// Uses canonical (BTreeMap) iteration order.
    pub fn state_hash(&self) -> u64 {
        let mut h: u64 = 0xcbf2_9ce4_8422_2325; // FNV offset basis
        let mix = |h: &mut u64, bytes: &[u8]| {
            for &b in bytes {
                *h ^= b as u64;
                *h = h.wrapping_mul(0x0100_0000_01b3);
            }
        };
        let mix_pos = |h: &mut u64, pos: &BlockPos| {
            mix(h, &pos.x.to_le_bytes());
            mix(h, &pos.y.to_le_bytes());
            mix(h, &pos.z.to_le_bytes());
        };
        for (pos, block) in &self.blocks {
            mix_pos(&mut h, pos);
            mix(&mut h, &block.0.to_le_bytes());
        }
        for (pos, entity) in &self.block_entities {
            mix_pos(&mut h, pos);
            mix(&mut h, &entity.index.to_le_bytes());
            mix(&mut h, &entity.generation.to_le_bytes());
        }
        h
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STONE: BlockId = BlockId(1);
    const RAIL: BlockId = BlockId(2);

    #[test]
    fn world_starts_empty() {
        let w = BlockWorld::new();
        assert_eq!(w.block_count(), 0);
        assert_eq!(w.block_at(BlockPos::new(0, 0, 0)), BlockId::AIR);
    }

    #[test]
    fn set_block_returns_previous() {
        let mut w = BlockWorld::new();
        let pos = BlockPos::new(1, 2, 3);
        assert_eq!(w.set_block(pos, STONE), BlockId::AIR);
        assert_eq!(w.set_block(pos, RAIL), STONE);
        assert_eq!(w.block_at(pos), RAIL);
    }

    #[test]
    fn setting_air_removes_block() {
        let mut w = BlockWorld::new();
        let pos = BlockPos::new(0, 0, 0);
        w.set_block(pos, STONE);
        w.set_block(pos, BlockId::AIR);
        assert_eq!(w.block_count(), 0);
    }

    #[test]
    fn plain_set_releases_block_entity() {
        let mut w = BlockWorld::new();
        let pos = BlockPos::new(0, 0, 0);
        let entity = EntityId::new(4, 0);
        w.set_block(pos, RAIL);
        w.bind_entity(pos, entity);

        w.set_block(pos, STONE);
        assert_eq!(w.entity_at(pos), None);
        assert!(matches!(
            w.events().last(),
            Some(WorldEvent::EntityUnbound { .. })
        ));
    }

    #[test]
    fn forced_update_keeps_block_entity() {
        let mut w = BlockWorld::new();
        let pos = BlockPos::new(0, 0, 0);
        let entity = EntityId::new(4, 0);
        w.set_block(pos, RAIL);
        w.bind_entity(pos, entity);

        assert_eq!(w.set_block_force_update(pos, STONE), RAIL);
        assert_eq!(w.entity_at(pos), Some(entity));
        assert_eq!(
            w.events().last(),
            Some(&WorldEvent::BlockForceUpdated {
                pos,
                old: RAIL,
                new: STONE
            })
        );
    }

    #[test]
    fn rebinding_logs_unbind_of_previous() {
        let mut w = BlockWorld::new();
        let pos = BlockPos::new(0, 0, 0);
        w.bind_entity(pos, EntityId::new(1, 0));
        w.bind_entity(pos, EntityId::new(2, 0));
        // bound + unbound + bound
        assert_eq!(w.events().len(), 3);
        assert_eq!(w.entity_at(pos), Some(EntityId::new(2, 0)));
    }

    #[test]
    fn drain_events_clears_log() {
        let mut w = BlockWorld::new();
        w.set_block(BlockPos::default(), STONE);
        assert_eq!(w.drain_events().len(), 1);
        assert!(w.events().is_empty());
    }

    #[test]
    fn replay_equivalence() {
        let mut w = BlockWorld::new();
        for i in 0..10 {
            w.set_block(BlockPos::new(i, 0, 0), STONE);
        }
        let pos = BlockPos::new(3, 0, 0);
        w.bind_entity(pos, EntityId::new(0, 0));
        w.set_block_force_update(pos, RAIL);
        w.set_block(BlockPos::new(5, 0, 0), BlockId::AIR);

        let replayed = BlockWorld::replay(w.events());
        assert_eq!(replayed.state_hash(), w.state_hash());
        assert_eq!(replayed.block_count(), 9);
        assert_eq!(replayed.entity_at(pos), Some(EntityId::new(0, 0)));
    }

    #[test]
    fn state_hash_tracks_block_changes() {
        let mut w = BlockWorld::new();
        let pos = BlockPos::default();
        w.set_block(pos, STONE);
        let before = w.state_hash();
        w.set_block_force_update(pos, RAIL);
        assert_ne!(before, w.state_hash());
        w.set_block_force_update(pos, STONE);
        assert_eq!(before, w.state_hash());
    }
}
