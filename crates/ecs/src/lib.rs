//! Capability-tagged entity store with generational handles.
//!
//! Capabilities are stored in BTreeMaps keyed by EntityId for deterministic
//! iteration order. Each capability has its own storage.
//!
//! # Invariants
//! - All capability mutations produce events.
//! - Iteration order is ascending EntityId.
//! - A handle whose slot has been reused never resolves.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use railwrench_common::{BlockPos, EntityId, Location};

/// Marks a rail-bound vehicle eligible for coupling search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RailVehicle;

/// Marks a tool entity that triggers wrench actions on activation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Wrench;

/// Marks a block entity as a rail-track segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Rail;

/// Ties an entity to the block it represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockComponent {
    pub position: BlockPos,
}

/// Capability tags an entity can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Capability {
    Vehicle,
    Wrench,
    Rail,
    Block,
    Location,
}

/// Events produced by entity and capability mutations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentEvent {
    Spawned { entity: EntityId },
    Despawned { entity: EntityId },
    Tagged { entity: EntityId, capability: Capability },
    Untagged { entity: EntityId, capability: Capability },
    LocationUpdated { entity: EntityId, old: Location, new: Location },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct Slot {
    generation: u32,
    alive: bool,
}

/// Deterministic entity storage for all capability types.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    vehicles: BTreeSet<EntityId>,
    wrenches: BTreeSet<EntityId>,
    rails: BTreeSet<EntityId>,
    blocks: BTreeMap<EntityId, BlockComponent>,
    locations: BTreeMap<EntityId, Location>,
    #[serde(skip)]
    events: Vec<ComponentEvent>,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain and return all pending component events.
    pub fn drain_events(&mut self) -> Vec<ComponentEvent> {
        std::mem::take(&mut self.events)
    }

    /// Read-only access to pending events.
    pub fn events(&self) -> &[ComponentEvent] {
        &self.events
    }

    /// Allocate a fresh entity, reusing a freed slot when one is available.
    pub fn spawn(&mut self) -> EntityId {
        let entity = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.alive = true;
                EntityId::new(index, slot.generation)
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    alive: true,
                });
                EntityId::new(index, 0)
            }
        };
        self.events.push(ComponentEvent::Spawned { entity });
        entity
    }

    /// Remove an entity and all of its capabilities. Returns false for stale handles.
    pub fn despawn(&mut self, entity: EntityId) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        for capability in self.capabilities(entity) {
            self.untag(entity, capability);
        }
        let slot = &mut self.slots[entity.index as usize];
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(entity.index);
        self.events.push(ComponentEvent::Despawned { entity });
        true
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.slots
            .get(entity.index as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // --- Marker capabilities ---
    pub fn add_vehicle(&mut self, entity: EntityId) -> bool {
        self.tag(entity, Capability::Vehicle)
    }

    pub fn add_wrench(&mut self, entity: EntityId) -> bool {
        self.tag(entity, Capability::Wrench)
    }

    pub fn add_rail(&mut self, entity: EntityId) -> bool {
        self.tag(entity, Capability::Rail)
    }

    // --- Block ---
    pub fn set_block(&mut self, entity: EntityId, position: BlockPos) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        if self
            .blocks
            .insert(entity, BlockComponent { position })
            .is_none()
        {
            self.events.push(ComponentEvent::Tagged {
                entity,
                capability: Capability::Block,
            });
        }
        true
    }

    pub fn get_block(&self, entity: EntityId) -> Option<&BlockComponent> {
        self.blocks.get(&entity)
    }

    // --- Location ---
    pub fn set_location(&mut self, entity: EntityId, location: Location) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        match self.locations.insert(entity, location) {
            Some(old) => self.events.push(ComponentEvent::LocationUpdated {
                entity,
                old,
                new: location,
            }),
            None => self.events.push(ComponentEvent::Tagged {
                entity,
                capability: Capability::Location,
            }),
        }
        true
    }

    pub fn get_location(&self, entity: EntityId) -> Option<&Location> {
        self.locations.get(&entity)
    }

    /// Whether a live entity carries the capability.
    pub fn has(&self, entity: EntityId, capability: Capability) -> bool {
        match capability {
            Capability::Vehicle => self.vehicles.contains(&entity),
            Capability::Wrench => self.wrenches.contains(&entity),
            Capability::Rail => self.rails.contains(&entity),
            Capability::Block => self.blocks.contains_key(&entity),
            Capability::Location => self.locations.contains_key(&entity),
        }
    }

    /// All entities carrying the capability, in ascending id order.
    pub fn entities_with(&self, capability: Capability) -> Vec<EntityId> {
        match capability {
            Capability::Vehicle => self.vehicles.iter().copied().collect(),
            Capability::Wrench => self.wrenches.iter().copied().collect(),
            Capability::Rail => self.rails.iter().copied().collect(),
            Capability::Block => self.blocks.keys().copied().collect(),
            Capability::Location => self.locations.keys().copied().collect(),
        }
    }

    /// Capabilities currently attached to an entity.
    pub fn capabilities(&self, entity: EntityId) -> Vec<Capability> {
        [
            Capability::Vehicle,
            Capability::Wrench,
            Capability::Rail,
            Capability::Block,
            Capability::Location,
        ]
        .into_iter()
        .filter(|c| self.has(entity, *c))
        .collect()
    }

    fn tag(&mut self, entity: EntityId, capability: Capability) -> bool {
        if !self.is_alive(entity) {
            return false;
        }
        let set = match capability {
            Capability::Vehicle => &mut self.vehicles,
            Capability::Wrench => &mut self.wrenches,
            Capability::Rail => &mut self.rails,
            Capability::Block | Capability::Location => {
                tracing::debug!(?capability, "capability carries data; use its setter");
                return false;
            }
        };
        if set.insert(entity) {
            self.events.push(ComponentEvent::Tagged { entity, capability });
        }
        true
    }

    /// Remove a capability from an entity. Returns true if it was present.
    pub fn untag(&mut self, entity: EntityId, capability: Capability) -> bool {
        let removed = match capability {
            Capability::Vehicle => self.vehicles.remove(&entity),
            Capability::Wrench => self.wrenches.remove(&entity),
            Capability::Rail => self.rails.remove(&entity),
            Capability::Block => self.blocks.remove(&entity).is_some(),
            Capability::Location => self.locations.remove(&entity).is_some(),
        };
        if removed {
            self.events
                .push(ComponentEvent::Untagged { entity, capability });
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn spawn_and_despawn() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        assert!(store.is_alive(id));
        assert_eq!(store.len(), 1);

        assert!(store.despawn(id));
        assert!(!store.is_alive(id));
        assert!(store.is_empty());
        assert!(!store.despawn(id));
    }

    #[test]
    fn reused_slot_gets_new_generation() {
        let mut store = EntityStore::new();
        let old = store.spawn();
        store.add_vehicle(old);
        store.despawn(old);

        let new = store.spawn();
        assert_eq!(new.index, old.index);
        assert_ne!(new.generation, old.generation);
        assert!(!store.is_alive(old));
        assert!(!store.has(new, Capability::Vehicle));
        assert!(!store.add_rail(old));
    }

    #[test]
    fn capabilities_are_tracked() {
        let mut store = EntityStore::new();
        let cart = store.spawn();
        store.add_vehicle(cart);
        store.set_location(cart, Location::at(Vec3::new(1.0, 0.0, 0.0)));

        assert!(store.has(cart, Capability::Vehicle));
        assert!(store.has(cart, Capability::Location));
        assert!(!store.has(cart, Capability::Rail));
        assert_eq!(
            store.capabilities(cart),
            vec![Capability::Vehicle, Capability::Location]
        );
    }

    #[test]
    fn data_capabilities_need_their_setter() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        assert!(!store.tag(id, Capability::Block));
        assert!(store.set_block(id, BlockPos::new(1, 2, 3)));
        assert_eq!(store.get_block(id).unwrap().position, BlockPos::new(1, 2, 3));
    }

    #[test]
    fn entities_with_is_sorted() {
        let mut store = EntityStore::new();
        let ids: Vec<EntityId> = (0..20).map(|_| store.spawn()).collect();
        for id in ids.iter().rev() {
            store.add_vehicle(*id);
        }
        let listed = store.entities_with(Capability::Vehicle);
        let mut sorted = listed.clone();
        sorted.sort();
        assert_eq!(listed, sorted);
        assert_eq!(listed.len(), 20);
    }

    #[test]
    fn location_update_produces_event() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.set_location(id, Location::default());
        store.set_location(id, Location::at(Vec3::ONE));
        // Spawned + Tagged + LocationUpdated
        assert_eq!(store.events().len(), 3);
        assert!(matches!(
            store.events()[2],
            ComponentEvent::LocationUpdated { .. }
        ));
    }

    #[test]
    fn despawn_clears_all_capabilities() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.add_rail(id);
        store.set_block(id, BlockPos::default());
        store.set_location(id, Location::default());

        store.despawn(id);
        assert!(store.entities_with(Capability::Rail).is_empty());
        assert!(store.get_block(id).is_none());
        assert!(store.get_location(id).is_none());
    }

    #[test]
    fn drain_events() {
        let mut store = EntityStore::new();
        let id = store.spawn();
        store.add_wrench(id);
        let events = store.drain_events();
        assert_eq!(events.len(), 2);
        assert!(store.events().is_empty());
    }
}
