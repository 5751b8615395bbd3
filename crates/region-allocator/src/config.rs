// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocator configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! alignment = 64
//! capacity = 512
//! ```

use crate::table::DEFAULT_CAPACITY;
use crate::{Alignment, RegionError};
use std::path::Path;

/// Configuration fixed at allocator initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AllocatorConfig {
    /// Boundary every allocated block starts on.
    #[serde(default)]
    pub alignment: Alignment,
    /// Maximum number of rows in the region table.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl AllocatorConfig {
    /// Creates a configuration with the given alignment and default capacity.
    pub fn with_alignment(alignment: Alignment) -> Self {
        Self {
            alignment,
            ..Default::default()
        }
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, RegionError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RegionError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, RegionError> {
        let config: Self = toml::from_str(toml_str)
            .map_err(|e| RegionError::Config(format!("TOML parse error: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, RegionError> {
        toml::to_string_pretty(self)
            .map_err(|e| RegionError::Config(format!("TOML serialise error: {e}")))
    }

    /// Rejects a zero-row table.
    pub fn validate(&self) -> Result<(), RegionError> {
        if self.capacity == 0 {
            return Err(RegionError::Config(
                "capacity must allow at least one region".into(),
            ));
        }
        Ok(())
    }
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            alignment: Alignment::B64,
            capacity: DEFAULT_CAPACITY,
        }
    }
}
