use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use railwrench_common::ConnectivityMask;

/// Index of a registered block type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockId(pub u16);

impl BlockId {
    /// The universal "empty" block, registered by every `BlockManager`.
    pub const AIR: BlockId = BlockId(0);
}

/// Index of a registered block family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FamilyId(pub u16);

/// Fully qualified block name: the family name plus a per-variant identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockUri {
    pub family: String,
    pub identifier: String,
}

impl std::fmt::Display for BlockUri {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.family, self.identifier)
    }
}

/// A concrete block type variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockType {
    pub id: BlockId,
    pub uri: BlockUri,
    pub family: FamilyId,
    /// Connectivity of this variant, when the family is connection based.
    pub connections: Option<ConnectivityMask>,
}

/// A named group of block variants sharing connectivity behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockFamily {
    pub id: FamilyId,
    pub name: String,
    variants: BTreeMap<ConnectivityMask, BlockId>,
}

impl BlockFamily {
    /// The variant of this family drawn for a connectivity pattern.
    pub fn block_by_connection(&self, mask: ConnectivityMask) -> Option<BlockId> {
        self.variants.get(&mask).copied()
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}

/// Errors from block registration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BlockError {
    #[error("block family {0:?} is already registered")]
    DuplicateFamily(String),
    #[error("block family {0:?} is not registered")]
    UnknownFamily(FamilyId),
    #[error("block id space exhausted")]
    IdsExhausted,
}

/// Registry of block families and block types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockManager {
    blocks: Vec<BlockType>,
    families: Vec<BlockFamily>,
    by_name: BTreeMap<String, FamilyId>,
}

pub const AIR_FAMILY: &str = "engine:air";

impl Default for BlockManager {
    fn default() -> Self {
        let mut manager = Self {
            blocks: Vec::new(),
            families: Vec::new(),
            by_name: BTreeMap::new(),
        };
        // Slot 0 is always air so `BlockId::AIR` resolves.
        let family = FamilyId(0);
        manager.families.push(BlockFamily {
            id: family,
            name: AIR_FAMILY.into(),
            variants: BTreeMap::new(),
        });
        manager.by_name.insert(AIR_FAMILY.into(), family);
        manager.blocks.push(BlockType {
            id: BlockId::AIR,
            uri: BlockUri {
                family: AIR_FAMILY.into(),
                identifier: "air".into(),
            },
            family,
            connections: None,
        });
        manager
    }
}

impl BlockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a family with one variant per connectivity mask.
    ///
    /// Each variant's identifier is the decimal form of its mask.
    pub fn register_connection_family(
        &mut self,
        name: &str,
        masks: impl IntoIterator<Item = ConnectivityMask>,
    ) -> Result<FamilyId, BlockError> {
        let family = self.new_family(name)?;
        for mask in masks {
            let id = self.push_block(family, mask.bits().to_string(), Some(mask))?;
            self.families[family.0 as usize].variants.insert(mask, id);
        }
        tracing::debug!(
            name,
            variants = self.families[family.0 as usize].variant_count(),
            "registered connection family"
        );
        Ok(family)
    }

    /// Register a single-variant family whose identifier is free-form.
    pub fn register_simple_block(
        &mut self,
        name: &str,
        identifier: &str,
    ) -> Result<BlockId, BlockError> {
        let family = self.new_family(name)?;
        self.push_block(family, identifier.to_string(), None)
    }

    /// Register a variant whose mask lives only in its identifier string.
    ///
    /// Content packs predating explicit connectivity attributes load this way.
    /// The variant is not added to the family's connection table, so
    /// `block_by_connection` keeps returning the registered variant for its
    /// mask and a toggled legacy block comes back as that variant.
    pub fn register_legacy_variant(
        &mut self,
        family: FamilyId,
        identifier: &str,
    ) -> Result<BlockId, BlockError> {
        self.push_block(family, identifier.to_string(), None)
    }

    pub fn family_by_name(&self, name: &str) -> Option<&BlockFamily> {
        self.by_name
            .get(name)
            .map(|id| &self.families[id.0 as usize])
    }

    pub fn family(&self, id: FamilyId) -> Option<&BlockFamily> {
        self.families.get(id.0 as usize)
    }

    pub fn block(&self, id: BlockId) -> Option<&BlockType> {
        self.blocks.get(id.0 as usize)
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    fn new_family(&mut self, name: &str) -> Result<FamilyId, BlockError> {
        if self.by_name.contains_key(name) {
            return Err(BlockError::DuplicateFamily(name.into()));
        }
        let id = FamilyId(
            u16::try_from(self.families.len()).map_err(|_| BlockError::IdsExhausted)?,
        );
        self.families.push(BlockFamily {
            id,
            name: name.into(),
            variants: BTreeMap::new(),
        });
        self.by_name.insert(name.into(), id);
        Ok(id)
    }

    fn push_block(
        &mut self,
        family: FamilyId,
        identifier: String,
        connections: Option<ConnectivityMask>,
    ) -> Result<BlockId, BlockError> {
        let id = BlockId(u16::try_from(self.blocks.len()).map_err(|_| BlockError::IdsExhausted)?);
        let family_name = self
            .families
            .get(family.0 as usize)
            .ok_or(BlockError::UnknownFamily(family))?
            .name
            .clone();
        self.blocks.push(BlockType {
            id,
            uri: BlockUri {
                family: family_name,
                identifier,
            },
            family,
            connections,
        });
        Ok(id)
    }
}
