// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Raw physical memory extents as reported at boot, and their ordering.
//!
//! The boot environment hands over extents in no particular order. Device
//! extents are never allocatable, so they are dropped before the remaining
//! extents are sorted by base address for the coalescer.

use crate::{PhysAddr, RegionError};
use std::fmt;

/// A single pre-merge memory block: `2^size_exponent` bytes at `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Extent {
    /// Physical start address.
    pub base: PhysAddr,
    /// Size as a power of two (`0..=63`).
    pub size_exponent: u8,
    /// Device memory (MMIO etc.); excluded from allocation.
    #[serde(default)]
    pub is_device: bool,
}

impl Extent {
    /// Creates a RAM extent.
    pub fn new(base: PhysAddr, size_exponent: u8) -> Self {
        Self {
            base,
            size_exponent,
            is_device: false,
        }
    }

    /// Creates a device extent.
    pub fn device(base: PhysAddr, size_exponent: u8) -> Self {
        Self {
            base,
            size_exponent,
            is_device: true,
        }
    }

    /// Returns the extent size in bytes.
    pub fn size_bytes(&self) -> Result<u64, RegionError> {
        size_from_exponent(self.size_exponent)
    }

    /// Returns the first address past the extent.
    pub fn end(&self) -> Result<PhysAddr, RegionError> {
        self.base
            .checked_add(self.size_bytes()?)
            .ok_or(RegionError::ExtentOverflow {
                base: self.base,
                size_exponent: self.size_exponent,
            })
    }
}

impl fmt::Display for Extent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#010x} 2^{}{}",
            self.base,
            self.size_exponent,
            if self.is_device { " (device)" } else { "" }
        )
    }
}

/// Converts a power-of-two exponent into a byte count.
pub fn size_from_exponent(size_exponent: u8) -> Result<u64, RegionError> {
    1u64
        .checked_shl(u32::from(size_exponent))
        .ok_or(RegionError::InvalidSizeExponent(size_exponent))
}

/// Returns the non-device extents ordered by ascending base address.
///
/// Equal bases keep their input order.
pub fn sort_extents(extents: &[Extent]) -> Vec<Extent> {
    let mut memory: Vec<Extent> = extents.iter().filter(|e| !e.is_device).copied().collect();
    memory.sort_by_key(|e| e.base);
    memory
}
