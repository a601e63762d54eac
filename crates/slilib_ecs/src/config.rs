//! # ECS Configuration
//!
//! Sizing for registries and storage blocks, loaded once at startup.
//!
//! ```toml
//! component_capacity = 256
//! block_capacity = 256
//! initial_blocks = 16
//! entity_blocks = 64
//! entity_resizable = true
//! removal_batch_size = 0
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ecs::MAX_COMPONENTS;
use crate::error::{EcsError, EcsResult};

/// Configuration for a [`crate::World`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EcsConfig {
    /// Maximum number of component types (at most 4096).
    pub component_capacity: usize,
    /// Entity slots per storage block.
    pub block_capacity: usize,
    /// Blocks pre-allocated per archetype; also the number added per expansion.
    pub initial_blocks: usize,
    /// Initial entity-id blocks (512 ids each).
    pub entity_blocks: usize,
    /// Whether the entity-id registry doubles when full.
    pub entity_resizable: bool,
    /// Removals parked before slots are freed in one batch; 0 or 1 is immediate.
    pub removal_batch_size: usize,
}

impl Default for EcsConfig {
    fn default() -> Self {
        Self {
            component_capacity: 256,
            block_capacity: 256,
            initial_blocks: 16,
            entity_blocks: 64,
            entity_resizable: true,
            removal_batch_size: 0,
        }
    }
}

impl EcsConfig {
    /// Small footprint for tests and tools.
    #[must_use]
    pub const fn compact() -> Self {
        Self {
            component_capacity: 64,
            block_capacity: 64,
            initial_blocks: 2,
            entity_blocks: 4,
            entity_resizable: true,
            removal_batch_size: 0,
        }
    }

    /// Production config: large blocks and batched removal.
    ///
    /// 1024 slots per block keeps a 16-byte component column at 16KB, and
    /// parking 256 removals amortizes slot release across a tick.
    #[must_use]
    pub const fn production() -> Self {
        Self {
            component_capacity: 1024,
            block_capacity: 1024,
            initial_blocks: 16,
            entity_blocks: 256,
            entity_resizable: true,
            removal_batch_size: 256,
        }
    }

    /// Parses and validates a TOML document.
    ///
    /// Missing keys take their default values.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] on a parse failure or invalid value.
    pub fn from_toml_str(text: &str) -> EcsResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|err| EcsError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the file cannot be read or parsed,
    /// or holds an invalid value.
    pub fn load(path: impl AsRef<Path>) -> EcsResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| EcsError::InvalidConfig(format!("{}: {err}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Checks every field is in range.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> EcsResult<()> {
        if self.component_capacity == 0 || self.component_capacity > MAX_COMPONENTS {
            return Err(EcsError::InvalidConfig(format!(
                "component_capacity must be in 1..={MAX_COMPONENTS}, got {}",
                self.component_capacity
            )));
        }
        if self.block_capacity == 0 {
            return Err(EcsError::InvalidConfig(
                "block_capacity must be greater than zero".into(),
            ));
        }
        if self.initial_blocks == 0 {
            return Err(EcsError::InvalidConfig(
                "initial_blocks must be greater than zero".into(),
            ));
        }
        if self.entity_blocks == 0 {
            return Err(EcsError::InvalidConfig(
                "entity_blocks must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_are_valid() {
        assert!(EcsConfig::default().validate().is_ok());
        assert!(EcsConfig::compact().validate().is_ok());
        assert!(EcsConfig::production().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EcsConfig::from_toml_str("block_capacity = 32\nremoval_batch_size = 8\n").unwrap();
        assert_eq!(config.block_capacity, 32);
        assert_eq!(config.removal_batch_size, 8);
        assert_eq!(config.component_capacity, 256);
        assert!(config.entity_resizable);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let err = EcsConfig::from_toml_str("component_capacity = 5000").unwrap_err();
        assert!(err.to_string().contains("component_capacity"));

        let err = EcsConfig::from_toml_str("initial_blocks = 0").unwrap_err();
        assert!(err.to_string().contains("initial_blocks"));

        assert!(matches!(
            EcsConfig::from_toml_str("block_capacity = \"big\""),
            Err(EcsError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = EcsConfig::production();
        let text = toml::to_string(&config).unwrap();
        assert_eq!(EcsConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = EcsConfig::load("/nonexistent/slilib.toml").unwrap_err();
        assert!(err.to_string().contains("slilib.toml"));
    }
}
