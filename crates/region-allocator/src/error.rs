// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for region allocation and release.

use crate::PhysAddr;

/// Errors reported by the region allocator.
///
/// Every failure is returned to the caller; no operation signals failure
/// through a sentinel address, so a block at address zero is a valid result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegionError {
    /// Initialization received no usable (non-device) extents.
    #[error("no memory: the boot extent list contains no usable extents")]
    NoExtents,

    /// No free region can hold an aligned block of the requested size.
    #[error("allocation exhausted: no free region fits an aligned block of 2^{size_exponent} bytes")]
    AllocationExhausted { size_exponent: u8 },

    /// Splitting a region would need more rows than the table can hold.
    /// The table is left exactly as it was before the call.
    #[error("region table full: a split would exceed the capacity of {capacity} rows")]
    TableCapacityExceeded { capacity: usize },

    /// `release` was given an address that does not start any table row.
    #[error("invalid address {0:#x}: not the base of any allocated block")]
    InvalidAddress(PhysAddr),

    /// `release` was given the base of a block that is already free.
    #[error("double release of block at {0:#x}")]
    DoubleRelease(PhysAddr),

    /// A size exponent outside `0..64`.
    #[error("size exponent {0} out of range (expected 0..=63)")]
    InvalidSizeExponent(u8),

    /// An alignment outside the supported set.
    #[error("unsupported alignment {0} (expected 8, 16, 32 or 64)")]
    UnsupportedAlignment(u64),

    /// An extent whose end lies beyond the top of the address space.
    #[error("extent at {base:#x} with size 2^{size_exponent} overflows the address space")]
    ExtentOverflow { base: PhysAddr, size_exponent: u8 },

    /// Configuration could not be read, parsed or serialised.
    #[error("configuration error: {0}")]
    Config(String),

    /// A thread panicked while holding the shared allocator lock.
    #[error("allocator lock poisoned")]
    LockPoisoned,
}
