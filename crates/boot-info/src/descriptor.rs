// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The boot descriptor: node identity plus the raw memory extent list.
//!
//! # TOML Format
//! ```toml
//! node_id = 0
//! num_nodes = 1
//!
//! [[extents]]
//! base = 0x100000
//! size_exponent = 20
//!
//! [[extents]]
//! base = 0xfee00000
//! size_exponent = 12
//! is_device = true
//! ```
//!
//! The same fields are accepted as JSON. Extents may appear in any order.

use crate::BootInfoError;
use region_allocator::Extent;
use std::fmt;
use std::path::Path;

/// Most extents a boot descriptor may list.
pub const MAX_BOOT_EXTENTS: usize = 230;

/// Memory layout handed over at boot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct BootInfo {
    /// Index of the node this descriptor belongs to.
    #[serde(default)]
    pub node_id: u32,
    /// Number of nodes in the system.
    #[serde(default = "default_num_nodes")]
    pub num_nodes: u32,
    /// Raw extents, unsorted, device extents included.
    pub extents: Vec<Extent>,
}

fn default_num_nodes() -> u32 {
    1
}

impl BootInfo {
    /// Loads a descriptor, choosing the format from the file extension.
    pub fn from_file(path: &Path) -> Result<Self, BootInfoError> {
        let content = std::fs::read_to_string(path).map_err(|source| BootInfoError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let info = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml(&content)?,
            Some("json") => Self::from_json(&content)?,
            _ => return Err(BootInfoError::UnknownFormat(path.to_path_buf())),
        };

        tracing::info!("loaded boot descriptor '{}': {}", path.display(), info.summary());
        Ok(info)
    }

    /// Parses and validates a TOML descriptor.
    pub fn from_toml(toml_str: &str) -> Result<Self, BootInfoError> {
        let info: Self = toml::from_str(toml_str)?;
        info.validate()?;
        Ok(info)
    }

    /// Parses and validates a JSON descriptor.
    pub fn from_json(json: &str) -> Result<Self, BootInfoError> {
        let info: Self = serde_json::from_str(json)?;
        info.validate()?;
        Ok(info)
    }

    /// Checks the descriptor describes a possible layout.
    ///
    /// # Checks
    /// - `node_id < num_nodes`.
    /// - At most [`MAX_BOOT_EXTENTS`] extents.
    /// - Every size exponent is below 64 and no extent runs past the top of
    ///   the address space.
    pub fn validate(&self) -> Result<(), BootInfoError> {
        if self.node_id >= self.num_nodes {
            return Err(BootInfoError::Invalid(format!(
                "node id {} out of range for {} nodes",
                self.node_id, self.num_nodes
            )));
        }

        if self.extents.len() > MAX_BOOT_EXTENTS {
            return Err(BootInfoError::Invalid(format!(
                "{} extents listed, at most {MAX_BOOT_EXTENTS} supported",
                self.extents.len()
            )));
        }

        for extent in &self.extents {
            extent.end()?;
        }

        Ok(())
    }

    /// Extents usable as memory (device extents dropped), in listed order.
    pub fn memory_extents(&self) -> Vec<Extent> {
        self.extents.iter().filter(|e| !e.is_device).copied().collect()
    }

    /// Device extents, in listed order.
    pub fn device_extents(&self) -> Vec<Extent> {
        self.extents.iter().filter(|e| e.is_device).copied().collect()
    }

    /// Bytes across all memory extents. Saturates instead of overflowing.
    pub fn total_memory_bytes(&self) -> u64 {
        self.extents
            .iter()
            .filter(|e| !e.is_device)
            .filter_map(|e| e.size_bytes().ok())
            .fold(0u64, |acc, size| acc.saturating_add(size))
    }

    /// One-line description for logs.
    pub fn summary(&self) -> String {
        let devices = self.extents.iter().filter(|e| e.is_device).count();
        format!(
            "node {} of {}, {} extents ({} memory, {} device), {} usable",
            self.node_id,
            self.num_nodes,
            self.extents.len(),
            self.extents.len() - devices,
            devices,
            ByteSize(self.total_memory_bytes()),
        )
    }

    /// A synthetic single-node layout: low memory in two pieces, 15 MiB of
    /// RAM made of four touching extents starting at 1 MiB, and two device
    /// windows.
    pub fn sample() -> Self {
        Self {
            node_id: 0,
            num_nodes: 1,
            extents: vec![
                Extent::new(0x0080_0000, 23),
                Extent::new(0x0000_1000, 12),
                Extent::device(0xfee0_0000, 12),
                Extent::new(0x0000_2000, 13),
                Extent::new(0x0010_0000, 20),
                Extent::new(0x0040_0000, 22),
                Extent::device(0xe000_0000, 28),
                Extent::new(0x0020_0000, 21),
                Extent::new(0x0000_8000, 15),
            ],
        }
    }
}

impl fmt::Display for BootInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Node ID:   {} (of {})", self.node_id, self.num_nodes)?;
        writeln!(f, "{:>4}  {:<12}  {:>5}  {}", "Idx", "Base", "Bits", "Device")?;
        for (i, e) in self.extents.iter().enumerate() {
            writeln!(
                f,
                "{:>4}  {:#010x}  {:>5}  {}",
                i,
                e.base,
                e.size_exponent,
                if e.is_device { "yes" } else { "no" }
            )?;
        }
        Ok(())
    }
}

/// Displays a byte count in the largest binary unit that divides it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteSize(pub u64);

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const KIB: u64 = 1024;
        const MIB: u64 = KIB * 1024;
        const GIB: u64 = MIB * 1024;

        let b = self.0;
        if b >= GIB && b % GIB == 0 {
            write!(f, "{} GiB", b / GIB)
        } else if b >= MIB && b % MIB == 0 {
            write!(f, "{} MiB", b / MIB)
        } else if b >= KIB && b % KIB == 0 {
            write!(f, "{} KiB", b / KIB)
        } else {
            write!(f, "{b} B")
        }
    }
}
