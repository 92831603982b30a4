use railwrench_common::{BlockPos, ConnectivityMask, EntityId};

/// Data an entity was expected to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    Location,
    BlockPosition,
    Block,
}

impl std::fmt::Display for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Location => "location",
            Self::BlockPosition => "block position",
            Self::Block => "block",
        };
        f.write_str(name)
    }
}

/// Failures surfaced by the wrench handlers.
///
/// None of these are transient; the dispatcher logs and discards them.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ActionError {
    #[error("entity {entity} has no {attribute}")]
    MissingAttribute { entity: EntityId, attribute: Attribute },
    #[error("block identifier {identifier:?} is not a connectivity mask: {reason}")]
    MalformedIdentifier { identifier: String, reason: String },
    #[error("no registered block type for block id {block} at {position}")]
    UnknownBlock { position: BlockPos, block: u16 },
    #[error("family {family:?} has no variant for connections {mask}")]
    MissingVariant { family: String, mask: ConnectivityMask },
}

impl From<railwrench_common::MaskParseError> for ActionError {
    fn from(e: railwrench_common::MaskParseError) -> Self {
        Self::MalformedIdentifier {
            identifier: e.identifier,
            reason: e.reason,
        }
    }
}

/// Errors from loading or validating a [`crate::WrenchConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("max vehicle join distance must be finite and positive, got {0}")]
    InvalidDistance(f32),
    #[error("rail family name for {0} orientation is empty")]
    EmptyFamilyName(&'static str),
    #[error("normal and inverted rail families must differ, both are {0:?}")]
    SameFamily(String),
}
