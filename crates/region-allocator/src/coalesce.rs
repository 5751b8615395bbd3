// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Merging sorted extents into contiguous regions.
//!
//! Two extents belong to the same region when the lower one ends exactly
//! where the upper one starts:
//!
//! ```text
//! extents   [0x00, 2^4) [0x10, 2^4)        [0x30, 2^4)
//!           └─────── adjacent ──────┘  gap  └─ alone
//! regions   {0x00, 32, free}               {0x30, 16, free}
//! ```
//!
//! The largest region found here seeds the allocator's working table.

use crate::extent::size_from_exponent;
use crate::{Extent, Region, RegionError};

/// Regions built from the boot extents, plus the largest of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoalescedRegions {
    /// Free regions in ascending address order.
    pub regions: Vec<Region>,
    /// The largest region; the first one wins ties.
    pub largest: Region,
}

impl CoalescedRegions {
    /// Total bytes across all regions.
    pub fn total_bytes(&self) -> u64 {
        self.regions.iter().map(|r| r.size).sum()
    }

    /// Number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Whether there are no regions. Never the case for a value returned
    /// by [`coalesce`], which rejects an empty extent list with
    /// [`RegionError::NoExtents`].
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Merges adjacent extents into regions.
///
/// `sorted` must already be ordered by base address with device extents
/// removed (see [`crate::sort_extents`]). Every resulting region starts out
/// unallocated.
pub fn coalesce(sorted: &[Extent]) -> Result<CoalescedRegions, RegionError> {
    let (first, rest) = sorted.split_first().ok_or(RegionError::NoExtents)?;

    first.end()?;
    let mut regions = vec![Region::free(first.base, first.size_bytes()?)];
    let mut prev = first;

    for extent in rest {
        let size = extent.size_bytes()?;
        extent.end()?;

        let adjacent = extent.base.checked_sub(prev.base) == Some(prev.size_bytes()?);
        if adjacent {
            // `regions` is never empty here.
            if let Some(current) = regions.last_mut() {
                current.size = current.size.checked_add(size).ok_or(
                    RegionError::ExtentOverflow {
                        base: extent.base,
                        size_exponent: extent.size_exponent,
                    },
                )?;
            }
        } else {
            regions.push(Region::free(extent.base, size));
        }
        prev = extent;
    }

    let mut largest = regions[0];
    for region in &regions[1..] {
        if region.size > largest.size {
            largest = *region;
        }
    }

    tracing::debug!(
        "coalesced {} extents into {} regions (largest {:#x} + {} B)",
        sorted.len(),
        regions.len(),
        largest.base,
        largest.size,
    );

    Ok(CoalescedRegions { regions, largest })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_no_extents() {
        assert_eq!(coalesce(&[]), Err(RegionError::NoExtents));
    }

    #[test]
    fn test_single_extent() {
        let c = coalesce(&[Extent::new(0x1000, 12)]).unwrap();
        assert_eq!(c.regions, vec![Region::free(0x1000, 4096)]);
        assert_eq!(c.largest, Region::free(0x1000, 4096));
        assert!(!c.is_empty());
    }

    #[test]
    fn test_is_empty_tracks_regions() {
        let mut c = coalesce(&[Extent::new(0x0, 4)]).unwrap();
        c.regions.clear();
        assert!(c.is_empty());
        assert_eq!(c.len(), 0);
    }

    #[test]
    fn test_adjacent_and_isolated() {
        let c = coalesce(&[
            Extent::new(0x0, 4),
            Extent::new(0x10, 4),
            Extent::new(0x30, 4),
        ])
        .unwrap();
        assert_eq!(
            c.regions,
            vec![Region::free(0x0, 32), Region::free(0x30, 16)]
        );
        assert_eq!(c.largest, Region::free(0x0, 32));
        assert_eq!(c.total_bytes(), 48);
    }

    #[test]
    fn test_mixed_sizes_merge() {
        // 4 KiB followed by 8 KiB followed by 1 KiB, all touching.
        let c = coalesce(&[
            Extent::new(0x1000, 12),
            Extent::new(0x2000, 13),
            Extent::new(0x4000, 10),
        ])
        .unwrap();
        assert_eq!(c.regions, vec![Region::free(0x1000, 0x3400)]);
    }

    #[test]
    fn test_largest_first_wins_ties() {
        let c = coalesce(&[
            Extent::new(0x0, 6),
            Extent::new(0x100, 6),
            Extent::new(0x1000, 5),
        ])
        .unwrap();
        assert_eq!(c.largest.base, 0x0);
    }

    #[test]
    fn test_largest_can_be_last() {
        let c = coalesce(&[
            Extent::new(0x0, 4),
            Extent::new(0x100, 8),
            Extent::new(0x200, 8),
        ])
        .unwrap();
        assert_eq!(c.largest, Region::free(0x100, 512));
    }

    #[test]
    fn test_invalid_exponent() {
        assert_eq!(
            coalesce(&[Extent::new(0, 64)]),
            Err(RegionError::InvalidSizeExponent(64))
        );
    }

    #[test]
    fn test_overflowing_extent() {
        assert!(matches!(
            coalesce(&[Extent::new(u64::MAX - 15, 5)]),
            Err(RegionError::ExtentOverflow { .. })
        ));
    }

    #[test]
    fn test_regions_start_free() {
        let c = coalesce(&[Extent::new(0, 4), Extent::new(0x100, 4)]).unwrap();
        assert!(c.regions.iter().all(|r| r.is_free()));
    }
}
