use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;

/// Farthest distance, in world units, at which two rail vehicles can couple.
pub const MAX_VEHICLE_JOIN_DISTANCE: f32 = 2.0;

/// Family holding the normal orientation of every rail shape.
pub const NORMAL_RAIL_FAMILY: &str = "Rails:rails";

/// Family holding the flipped orientation of T-junction rails.
pub const INVERTED_RAIL_FAMILY: &str = "railsTBlockInverted";

/// Wrench action configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WrenchConfig {
    /// Linear join distance; compared against squared distances.
    pub max_vehicle_join_distance: f32,
    pub normal_rail_family: String,
    pub inverted_rail_family: String,
}

impl Default for WrenchConfig {
    fn default() -> Self {
        Self {
            max_vehicle_join_distance: MAX_VEHICLE_JOIN_DISTANCE,
            normal_rail_family: NORMAL_RAIL_FAMILY.into(),
            inverted_rail_family: INVERTED_RAIL_FAMILY.into(),
        }
    }
}

impl WrenchConfig {
    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path.as_ref())?;
        let config: Self = serde_json::from_reader(std::io::BufReader::new(file))?;
        config.validate()?;
        tracing::debug!(?config, "loaded wrench config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let d = self.max_vehicle_join_distance;
        if !d.is_finite() || d <= 0.0 {
            return Err(ConfigError::InvalidDistance(d));
        }
        if self.normal_rail_family.is_empty() {
            return Err(ConfigError::EmptyFamilyName("normal"));
        }
        if self.inverted_rail_family.is_empty() {
            return Err(ConfigError::EmptyFamilyName("inverted"));
        }
        if self.normal_rail_family == self.inverted_rail_family {
            return Err(ConfigError::SameFamily(self.normal_rail_family.clone()));
        }
        Ok(())
    }

    pub fn max_join_distance_sq(&self) -> f32 {
        self.max_vehicle_join_distance * self.max_vehicle_join_distance
    }
}
