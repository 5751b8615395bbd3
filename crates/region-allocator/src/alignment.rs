// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation alignment configuration and parsing.
//!
//! An [`Alignment`] is chosen once when the allocator is initialized and
//! applies to every later `allocate` call. Only 8, 16, 32 and 64 byte
//! boundaries are supported.

use crate::{PhysAddr, RegionError};
use std::fmt;

/// Byte boundary every allocated block starts on.
///
/// # Parsing
/// Accepts the byte value with an optional `B` suffix:
/// - `"64"` or `"64B"` → 64-byte alignment
/// - `"8"` → 8-byte alignment
///
/// # Examples
/// ```
/// use region_allocator::Alignment;
///
/// let a = Alignment::parse("32").unwrap();
/// assert_eq!(a.as_bytes(), 32);
/// assert_eq!(a.mask(), 31);
/// assert_eq!(a.align_up(0x41), Some(0x60));
///
/// assert!(Alignment::parse("12").is_err());
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub enum Alignment {
    /// 8-byte boundary.
    B8,
    /// 16-byte boundary.
    B16,
    /// 32-byte boundary.
    B32,
    /// 64-byte boundary.
    #[default]
    B64,
}

impl Alignment {
    /// All supported alignments, smallest first.
    pub const ALL: [Alignment; 4] = [Self::B8, Self::B16, Self::B32, Self::B64];

    /// Creates an alignment from a byte count.
    pub fn from_bytes(bytes: u64) -> Result<Self, RegionError> {
        match bytes {
            8 => Ok(Self::B8),
            16 => Ok(Self::B16),
            32 => Ok(Self::B32),
            64 => Ok(Self::B64),
            other => Err(RegionError::UnsupportedAlignment(other)),
        }
    }

    /// Returns the alignment in bytes.
    pub fn as_bytes(&self) -> u64 {
        match self {
            Self::B8 => 8,
            Self::B16 => 16,
            Self::B32 => 32,
            Self::B64 => 64,
        }
    }

    /// Returns the alignment mask: an address is aligned when
    /// `addr & mask == 0`.
    pub fn mask(&self) -> u64 {
        self.as_bytes() - 1
    }

    /// Whether `addr` already sits on this boundary.
    pub fn is_aligned(&self, addr: PhysAddr) -> bool {
        addr & self.mask() == 0
    }

    /// Rounds `addr` up to the next boundary.
    ///
    /// Returns `None` if the rounded address would not fit in the address
    /// space.
    pub fn align_up(&self, addr: PhysAddr) -> Option<PhysAddr> {
        let mask = self.mask();
        addr.checked_add(mask).map(|a| a & !mask)
    }

    /// Parses an alignment string such as `"64"` or `"16B"`.
    ///
    /// Case-insensitive, surrounding whitespace ignored.
    pub fn parse(s: &str) -> Result<Self, RegionError> {
        let s = s.trim();
        let digits = s
            .strip_suffix('B')
            .or_else(|| s.strip_suffix('b'))
            .unwrap_or(s)
            .trim();

        let bytes: u64 = digits.parse().map_err(|_| {
            RegionError::Config(format!(
                "invalid alignment '{s}': expected one of 8, 16, 32, 64"
            ))
        })?;

        Self::from_bytes(bytes)
    }
}

impl TryFrom<u64> for Alignment {
    type Error = RegionError;

    fn try_from(bytes: u64) -> Result<Self, Self::Error> {
        Self::from_bytes(bytes)
    }
}

impl From<Alignment> for u64 {
    fn from(a: Alignment) -> Self {
        a.as_bytes()
    }
}

impl std::str::FromStr for Alignment {
    type Err = RegionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} B", self.as_bytes())
    }
}
