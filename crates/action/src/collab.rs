//! Interfaces the wrench handlers need from the host, and their implementations
//! for the workspace's own entity store, block world and block registry.

use railwrench_common::{BlockPos, ConnectivityMask, EntityId, Location};
use railwrench_ecs::{Capability, EntityStore};
use railwrench_kernel::{BlockId, BlockManager, BlockType, BlockWorld, FamilyId};

/// Read access to entities and their capabilities.
pub trait EntityQuery {
    fn has_capability(&self, entity: EntityId, capability: Capability) -> bool;

    /// All entities carrying the capability.
    fn entities_with(&self, capability: Capability) -> Vec<EntityId>;

    fn location(&self, entity: EntityId) -> Option<Location>;

    fn block_position(&self, entity: EntityId) -> Option<BlockPos>;
}

pub trait WorldQuery {
    fn block_at(&self, pos: BlockPos) -> BlockId;
}

pub trait WorldMutate: WorldQuery {
    /// Replace the block at `pos` in place, keeping its block entity.
    fn set_block_force_update(&mut self, pos: BlockPos, block: BlockId);
}

/// Lookup of block families and their connection variants.
pub trait BlockFamilyRegistry {
    fn family_by_name(&self, name: &str) -> Option<FamilyId>;

    fn block_type(&self, block: BlockId) -> Option<&BlockType>;

    fn block_by_connection(&self, family: FamilyId, mask: ConnectivityMask) -> Option<BlockId>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticLevel {
    Info,
    Warn,
}

/// Sink for human-readable handler messages.
pub trait Diagnostics {
    fn emit(&mut self, level: DiagnosticLevel, message: &str);

    fn info(&mut self, message: &str) {
        self.emit(DiagnosticLevel::Info, message);
    }

    fn warn(&mut self, message: &str) {
        self.emit(DiagnosticLevel::Warn, message);
    }
}

/// Forwards diagnostics to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn emit(&mut self, level: DiagnosticLevel, message: &str) {
        match level {
            DiagnosticLevel::Info => tracing::info!("{message}"),
            DiagnosticLevel::Warn => tracing::warn!("{message}"),
        }
    }
}

/// Buffers diagnostics in memory, for hosts that display them later.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticsLog {
    entries: Vec<(DiagnosticLevel, String)>,
}

impl DiagnosticsLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[(DiagnosticLevel, String)] {
        &self.entries
    }

    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(_, m)| m.as_str())
    }

    pub fn drain(&mut self) -> Vec<(DiagnosticLevel, String)> {
        std::mem::take(&mut self.entries)
    }
}

impl Diagnostics for DiagnosticsLog {
    fn emit(&mut self, level: DiagnosticLevel, message: &str) {
        self.entries.push((level, message.to_string()));
    }
}

impl EntityQuery for EntityStore {
    fn has_capability(&self, entity: EntityId, capability: Capability) -> bool {
        self.is_alive(entity) && self.has(entity, capability)
    }

    fn entities_with(&self, capability: Capability) -> Vec<EntityId> {
        EntityStore::entities_with(self, capability)
    }

    fn location(&self, entity: EntityId) -> Option<Location> {
        self.get_location(entity).copied()
    }

    fn block_position(&self, entity: EntityId) -> Option<BlockPos> {
        self.get_block(entity).map(|b| b.position)
    }
}

impl WorldQuery for BlockWorld {
    fn block_at(&self, pos: BlockPos) -> BlockId {
        BlockWorld::block_at(self, pos)
    }
}

impl WorldMutate for BlockWorld {
    fn set_block_force_update(&mut self, pos: BlockPos, block: BlockId) {
        BlockWorld::set_block_force_update(self, pos, block);
    }
}

impl BlockFamilyRegistry for BlockManager {
    fn family_by_name(&self, name: &str) -> Option<FamilyId> {
        BlockManager::family_by_name(self, name).map(|f| f.id)
    }

    fn block_type(&self, block: BlockId) -> Option<&BlockType> {
        self.block(block)
    }

    fn block_by_connection(&self, family: FamilyId, mask: ConnectivityMask) -> Option<BlockId> {
        self.family(family)?.block_by_connection(mask)
    }
}
