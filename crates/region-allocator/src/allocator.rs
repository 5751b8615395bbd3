// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! First-fit region allocator with split-on-allocate and
//! coalesce-on-release.
//!
//! The [`RegionAllocator`] owns the region table. It:
//!
//! 1. Builds the table once from the boot extents: device extents are
//!    dropped, the rest sorted and coalesced, and the largest resulting
//!    region becomes the single free row the table starts with.
//! 2. Serves `allocate(size_exponent)` first-fit: the first free row whose
//!    lowest aligned start leaves room for `2^size_exponent` bytes is split
//!    around the reserved block.
//! 3. Serves `release(addr)` for exact block bases only, merging the freed
//!    row with whichever neighbours are free.
//!
//! # Splitting
//!
//! ```text
//! exact    |######## reserved ########|
//! head     |## reserved ##|   free    |        +1 row
//! tail     |   free   |## reserved ##|         +1 row
//! middle   | free |## reserved ##| free |      +2 rows
//! ```
//!
//! # Search Limitation
//! Only the lowest aligned start of each candidate row is tried. If the
//! block does not fit there the scan moves on to the next row. Any higher
//! aligned start in the same row would leave even less room, so no
//! placement is missed for a single fixed alignment.

use crate::coalesce::{coalesce, CoalescedRegions};
use crate::extent::{size_from_exponent, sort_extents};
use crate::{
    Alignment, AllocationStats, AllocatorConfig, Extent, PhysAddr, Region, RegionError,
    RegionTable,
};
use std::fmt;

/// Where the reserved block landed inside the row it was cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// The block is the whole row.
    Exact,
    /// The block starts the row; the remainder stays free after it.
    Head,
    /// The block ends the row; the leading space stays free.
    Tail,
    /// Free space remains on both sides.
    Middle,
}

impl Placement {
    /// Rows added to the table by this placement.
    pub fn rows_added(&self) -> usize {
        match self {
            Self::Exact => 0,
            Self::Head | Self::Tail => 1,
            Self::Middle => 2,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Exact => "exact",
            Self::Head => "head",
            Self::Tail => "tail",
            Self::Middle => "middle",
        };
        f.write_str(s)
    }
}

/// Which free neighbours absorbed a released row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// Both neighbours allocated (or absent): the row just turns free.
    None,
    /// Merged with the previous row.
    Previous,
    /// Merged with the next row.
    Next,
    /// Previous, released and next rows became one.
    Both,
}

impl Merge {
    /// Rows removed from the table by this merge.
    pub fn rows_removed(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Previous | Self::Next => 1,
            Self::Both => 2,
        }
    }
}

impl fmt::Display for Merge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "none",
            Self::Previous => "previous",
            Self::Next => "next",
            Self::Both => "both",
        };
        f.write_str(s)
    }
}

/// The physical memory region allocator.
///
/// # Example
/// ```
/// use region_allocator::{AllocatorConfig, Extent, RegionAllocator, RegionError};
///
/// let extents = [Extent::new(0x0, 6)];
/// let mut alloc = RegionAllocator::initialize(&extents, AllocatorConfig::default()).unwrap();
///
/// let a = alloc.allocate(4).unwrap();
/// assert_eq!(a, 0x0);
/// assert_eq!(alloc.regions().len(), 2);
///
/// alloc.release(a).unwrap();
/// assert_eq!(alloc.release(a), Err(RegionError::DoubleRelease(0x0)));
/// assert_eq!(alloc.regions().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct RegionAllocator {
    config: AllocatorConfig,
    coalesced: CoalescedRegions,
    table: RegionTable,
    stats: AllocationStats,
}

impl RegionAllocator {
    /// Builds the allocator from the raw boot extents.
    ///
    /// Returns `Err(NoExtents)` if no non-device extent is supplied.
    pub fn initialize(extents: &[Extent], config: AllocatorConfig) -> Result<Self, RegionError> {
        config.validate()?;

        let sorted = sort_extents(extents);
        let coalesced = coalesce(&sorted)?;
        let table = RegionTable::seeded(coalesced.largest, config.capacity)?;

        let mut stats = AllocationStats::default();
        stats.observe_table_len(table.len());

        tracing::info!(
            "region allocator ready: {} usable extents ({} device skipped), {} regions, \
             working region {:#x} + {} B, alignment {}",
            sorted.len(),
            extents.len() - sorted.len(),
            coalesced.len(),
            coalesced.largest.base,
            coalesced.largest.size,
            config.alignment,
        );

        Ok(Self {
            config,
            coalesced,
            table,
            stats,
        })
    }

    /// Reserves an aligned block of `2^size_exponent` bytes and returns its
    /// base address.
    ///
    /// Returns `Err(AllocationExhausted)` if no free row can hold the block
    /// and `Err(TableCapacityExceeded)` if the required split does not fit
    /// in the table. On error the table is unchanged.
    pub fn allocate(&mut self, size_exponent: u8) -> Result<PhysAddr, RegionError> {
        match self.try_allocate(size_exponent) {
            Ok((addr, size, placement)) => {
                self.stats
                    .record_allocation(size, placement.rows_added(), self.table.len());
                tracing::debug!(
                    "allocate(2^{size_exponent}) -> {addr:#x} ({placement} split, {} rows)",
                    self.table.len(),
                );
                Ok(addr)
            }
            Err(e) => {
                self.stats.record_failed_allocation();
                tracing::warn!("allocate(2^{size_exponent}) failed: {e}");
                Err(e)
            }
        }
    }

    /// Returns the block starting at `addr` to the free pool.
    ///
    /// Only exact block bases are accepted: an address inside a block, or
    /// one that starts no row, is `Err(InvalidAddress)`. Releasing a free
    /// row's base is `Err(DoubleRelease)`. On error the table is unchanged.
    pub fn release(&mut self, addr: PhysAddr) -> Result<(), RegionError> {
        match self.try_release(addr) {
            Ok((size, merge)) => {
                self.stats.record_release(size, merge.rows_removed());
                tracing::debug!(
                    "release({addr:#x}) freed {size} B (merged with {merge}, {} rows)",
                    self.table.len(),
                );
                Ok(())
            }
            Err(e) => {
                self.stats.record_failed_release();
                tracing::warn!("release({addr:#x}) failed: {e}");
                Err(e)
            }
        }
    }

    fn try_allocate(&mut self, size_exponent: u8) -> Result<(PhysAddr, u64, Placement), RegionError> {
        let size = size_from_exponent(size_exponent)?;
        let (idx, addr) = self
            .find_first_fit(size)
            .ok_or(RegionError::AllocationExhausted { size_exponent })?;
        let placement = self.split(idx, addr, size)?;
        Ok((addr, size, placement))
    }

    /// Finds the first free row that fits `size` bytes at its lowest
    /// aligned start.
    fn find_first_fit(&self, size: u64) -> Option<(usize, PhysAddr)> {
        let alignment = self.config.alignment;

        for (idx, region) in self.table.iter().enumerate() {
            if region.allocated || region.size < size {
                continue;
            }
            let Some(addr) = alignment.align_up(region.base) else {
                continue;
            };
            let lead = addr - region.base;
            if lead <= region.size - size {
                return Some((idx, addr));
            }
        }

        None
    }

    /// Cuts `[addr, addr + size)` out of row `idx` and marks it allocated.
    fn split(&mut self, idx: usize, addr: PhysAddr, size: u64) -> Result<Placement, RegionError> {
        let region = self.table[idx];
        let lead = addr - region.base;
        let trail = region.size - lead - size;

        let placement = match (lead == 0, trail == 0) {
            (true, true) => Placement::Exact,
            (true, false) => Placement::Head,
            (false, true) => Placement::Tail,
            (false, false) => Placement::Middle,
        };
        self.table.reserve_rows(placement.rows_added())?;

        match placement {
            Placement::Exact => {
                self.table.row_mut(idx).allocated = true;
            }
            Placement::Head => {
                *self.table.row_mut(idx) = Region::allocated(addr, size);
                self.table.insert_at(idx + 1, Region::free(addr + size, trail))?;
            }
            Placement::Tail => {
                self.table.row_mut(idx).size = lead;
                self.table.insert_at(idx + 1, Region::allocated(addr, size))?;
            }
            Placement::Middle => {
                self.table.row_mut(idx).size = lead;
                self.table.insert_at(idx + 1, Region::allocated(addr, size))?;
                self.table.insert_at(idx + 2, Region::free(addr + size, trail))?;
            }
        }

        Ok(placement)
    }

    fn try_release(&mut self, addr: PhysAddr) -> Result<(u64, Merge), RegionError> {
        let idx = self
            .table
            .position_of_base(addr)
            .ok_or(RegionError::InvalidAddress(addr))?;

        let region = self.table[idx];
        if region.is_free() {
            return Err(RegionError::DoubleRelease(addr));
        }

        let prev_free = idx > 0 && self.table[idx - 1].is_free();
        let next_free = self.table.get(idx + 1).is_some_and(|r| r.is_free());

        self.table.row_mut(idx).allocated = false;

        let merge = match (prev_free, next_free) {
            (false, false) => Merge::None,
            (false, true) => {
                let next = self.table.remove_at(idx + 1);
                self.table.row_mut(idx).size += next.size;
                Merge::Next
            }
            (true, false) => {
                let released = self.table.remove_at(idx);
                self.table.row_mut(idx - 1).size += released.size;
                Merge::Previous
            }
            (true, true) => {
                let absorbed = region.size + self.table[idx + 1].size;
                self.table.remove_range(idx, 2);
                self.table.row_mut(idx - 1).size += absorbed;
                Merge::Both
            }
        };

        Ok((region.size, merge))
    }

    /// The working region table.
    pub fn regions(&self) -> &RegionTable {
        &self.table
    }

    /// The regions built from the boot extents.
    pub fn coalesced(&self) -> &CoalescedRegions {
        &self.coalesced
    }

    /// The largest coalesced region as found at initialization. Not updated
    /// by later allocations.
    pub fn largest_region(&self) -> Region {
        self.coalesced.largest
    }

    /// The configuration the allocator was built with.
    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// The alignment applied to every allocation.
    pub fn alignment(&self) -> Alignment {
        self.config.alignment
    }

    /// The row containing `addr`, if any.
    pub fn region_containing(&self, addr: PhysAddr) -> Option<&Region> {
        self.table.iter().find(|r| r.contains(addr))
    }

    /// Whether `addr` is the base of a currently allocated block.
    pub fn is_allocated(&self, addr: PhysAddr) -> bool {
        self.table
            .position_of_base(addr)
            .is_some_and(|idx| self.table[idx].allocated)
    }

    /// Bytes currently handed out.
    pub fn allocated_bytes(&self) -> u64 {
        self.table.allocated_bytes()
    }

    /// Bytes still free in the working table.
    pub fn free_bytes(&self) -> u64 {
        self.table.free_bytes()
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> AllocationStats {
        self.stats.clone()
    }
}

impl fmt::Display for RegionAllocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "alignment {}", self.config.alignment)?;
        write!(f, "{}", self.table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn allocator(extents: &[Extent], alignment: Alignment) -> RegionAllocator {
        RegionAllocator::initialize(extents, AllocatorConfig::with_alignment(alignment)).unwrap()
    }

    /// A single free 64-byte region at 0x0.
    fn small() -> RegionAllocator {
        allocator(&[Extent::new(0x0, 6)], Alignment::B8)
    }

    fn rows(a: &RegionAllocator) -> Vec<Region> {
        a.regions().rows().to_vec()
    }

    #[test]
    fn test_initialize_seeds_largest_region() {
        let a = allocator(
            &[
                Extent::new(0x30, 4),
                Extent::new(0x0, 4),
                Extent::new(0x10, 4),
            ],
            Alignment::B8,
        );
        assert_eq!(a.coalesced().len(), 2);
        assert_eq!(rows(&a), vec![Region::free(0x0, 32)]);
        assert_eq!(a.largest_region(), Region::free(0x0, 32));
    }

    #[test]
    fn test_initialize_empty() {
        let err = RegionAllocator::initialize(&[], AllocatorConfig::default()).unwrap_err();
        assert_eq!(err, RegionError::NoExtents);
    }

    #[test]
    fn test_initialize_only_devices() {
        let err = RegionAllocator::initialize(
            &[Extent::device(0x0, 12), Extent::device(0x1000, 12)],
            AllocatorConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, RegionError::NoExtents);
    }

    #[test]
    fn test_initialize_with_huge_capacity_from_toml() {
        let config = AllocatorConfig::from_toml("capacity = 9000000000000000000").unwrap();
        let mut a = RegionAllocator::initialize(&[Extent::new(0x0, 12)], config).unwrap();
        assert_eq!(a.regions().capacity(), 9_000_000_000_000_000_000);
        assert_eq!(a.allocate(6).unwrap(), 0x0);
        assert_eq!(a.regions().len(), 2);
    }

    #[test]
    fn test_exact_fit() {
        let mut a = small();
        assert_eq!(a.allocate(6).unwrap(), 0x0);
        assert_eq!(rows(&a), vec![Region::allocated(0x0, 64)]);
    }

    #[test]
    fn test_head_split() {
        let mut a = small();
        assert_eq!(a.allocate(4).unwrap(), 0x0);
        assert_eq!(
            rows(&a),
            vec![Region::allocated(0x0, 16), Region::free(0x10, 48)]
        );
    }

    #[test]
    fn test_tail_split() {
        // 16 bytes at 0x38 with 64-byte alignment: the aligned start 0x40
        // leaves exactly 16 bytes before the row ends at 0x50.
        let mut a = allocator(&[Extent::new(0x38, 3), Extent::new(0x40, 4)], Alignment::B64);
        assert_eq!(rows(&a), vec![Region::free(0x38, 24)]);

        assert_eq!(a.allocate(4).unwrap(), 0x40);
        assert_eq!(
            rows(&a),
            vec![Region::free(0x38, 8), Region::allocated(0x40, 16)]
        );
    }

    #[test]
    fn test_middle_split() {
        let mut a = allocator(
            &[Extent::new(0x38, 3), Extent::new(0x40, 6)],
            Alignment::B64,
        );
        assert_eq!(a.allocate(4).unwrap(), 0x40);
        assert_eq!(
            rows(&a),
            vec![
                Region::free(0x38, 8),
                Region::allocated(0x40, 16),
                Region::free(0x50, 48),
            ]
        );
    }

    #[test]
    fn test_exhausted() {
        let mut a = small();
        assert_eq!(
            a.allocate(7),
            Err(RegionError::AllocationExhausted { size_exponent: 7 })
        );
        a.allocate(6).unwrap();
        assert_eq!(
            a.allocate(0),
            Err(RegionError::AllocationExhausted { size_exponent: 0 })
        );
    }

    #[test]
    fn test_alignment_can_exhaust_region() {
        // 16 bytes at 0x38: large enough, but the 64-byte aligned start 0x40
        // leaves only 8.
        let mut a = allocator(&[Extent::new(0x38, 3), Extent::new(0x40, 3)], Alignment::B64);
        assert_eq!(rows(&a), vec![Region::free(0x38, 16)]);
        assert_eq!(
            a.allocate(4),
            Err(RegionError::AllocationExhausted { size_exponent: 4 })
        );
        assert_eq!(rows(&a), vec![Region::free(0x38, 16)]);

        // The same request succeeds at 8-byte alignment.
        let mut b = allocator(&[Extent::new(0x38, 3), Extent::new(0x40, 3)], Alignment::B8);
        assert_eq!(b.allocate(4).unwrap(), 0x38);
    }

    #[test]
    fn test_invalid_size_exponent() {
        let mut a = small();
        assert_eq!(a.allocate(64), Err(RegionError::InvalidSizeExponent(64)));
        assert_eq!(a.stats().failed_allocations, 1);
    }

    #[test]
    fn test_first_fit_order() {
        let mut a = allocator(&[Extent::new(0x0, 8)], Alignment::B8);
        let x = a.allocate(4).unwrap();
        let y = a.allocate(4).unwrap();
        let z = a.allocate(4).unwrap();
        assert_eq!((x, y, z), (0x0, 0x10, 0x20));

        // Freeing the middle block leaves a 16-byte hole that is reused
        // before the large tail.
        a.release(y).unwrap();
        assert_eq!(a.allocate(3).unwrap(), 0x10);
    }

    #[test]
    fn test_capacity_exceeded_leaves_table_unchanged() {
        let config = AllocatorConfig {
            alignment: Alignment::B8,
            capacity: 2,
        };
        let mut a = RegionAllocator::initialize(&[Extent::new(0x0, 8)], config).unwrap();
        a.allocate(4).unwrap();
        let before = rows(&a);

        assert_eq!(
            a.allocate(4),
            Err(RegionError::TableCapacityExceeded { capacity: 2 })
        );
        assert_eq!(rows(&a), before);

        // An exact fit needs no new row and still succeeds.
        let mut b = RegionAllocator::initialize(&[Extent::new(0x0, 4)], config).unwrap();
        assert_eq!(b.allocate(4).unwrap(), 0x0);
    }

    #[test]
    fn test_middle_split_needs_two_rows() {
        let config = AllocatorConfig {
            alignment: Alignment::B64,
            capacity: 2,
        };
        let mut a = RegionAllocator::initialize(
            &[Extent::new(0x38, 3), Extent::new(0x40, 6)],
            config,
        )
        .unwrap();
        assert_eq!(
            a.allocate(4),
            Err(RegionError::TableCapacityExceeded { capacity: 2 })
        );
        assert_eq!(rows(&a), vec![Region::free(0x38, 72)]);
    }

    #[test]
    fn test_release_first_merges_with_next() {
        let mut a = small();
        let x = a.allocate(4).unwrap();
        a.release(x).unwrap();
        assert_eq!(rows(&a), vec![Region::free(0x0, 64)]);
    }

    #[test]
    fn test_release_last_merges_with_previous() {
        let mut a = small();
        let x = a.allocate(5).unwrap();
        let y = a.allocate(5).unwrap();
        a.release(x).unwrap();
        assert_eq!(
            rows(&a),
            vec![Region::free(0x0, 32), Region::allocated(0x20, 32)]
        );
        a.release(y).unwrap();
        assert_eq!(rows(&a), vec![Region::free(0x0, 64)]);
    }

    #[test]
    fn test_release_between_allocated_neighbours() {
        let mut a = small();
        let x = a.allocate(4).unwrap();
        let y = a.allocate(4).unwrap();
        let _z = a.allocate(4).unwrap();
        a.release(y).unwrap();
        assert_eq!(
            rows(&a),
            vec![
                Region::allocated(x, 16),
                Region::free(0x10, 16),
                Region::allocated(0x20, 16),
                Region::free(0x30, 16),
            ]
        );
    }

    #[test]
    fn test_release_merges_both_neighbours() {
        let mut a = small();
        let x = a.allocate(4).unwrap();
        let y = a.allocate(4).unwrap();
        let z = a.allocate(4).unwrap();
        a.release(x).unwrap();
        a.release(z).unwrap();
        assert_eq!(a.regions().len(), 3);

        a.release(y).unwrap();
        assert_eq!(rows(&a), vec![Region::free(0x0, 64)]);
        assert_eq!(a.stats().rows_merged, 3);
    }

    #[test]
    fn test_release_interior_address_is_invalid() {
        let mut a = small();
        let x = a.allocate(5).unwrap();
        assert_eq!(a.release(x + 1), Err(RegionError::InvalidAddress(x + 1)));
        assert!(a.is_allocated(x));
    }

    #[test]
    fn test_release_unknown_address() {
        let mut a = small();
        assert_eq!(
            a.release(0x1000),
            Err(RegionError::InvalidAddress(0x1000))
        );
    }

    #[test]
    fn test_double_release() {
        let mut a = small();
        let x = a.allocate(4).unwrap();
        a.release(x).unwrap();
        let after_first = rows(&a);

        assert_eq!(a.release(x), Err(RegionError::DoubleRelease(x)));
        assert_eq!(rows(&a), after_first);
        assert_eq!(a.stats().failed_releases, 1);
    }

    #[test]
    fn test_byte_accounting() {
        let mut a = small();
        a.allocate(4).unwrap();
        a.allocate(3).unwrap();
        assert_eq!(a.allocated_bytes(), 24);
        assert_eq!(a.free_bytes(), 40);
        assert_eq!(a.stats().allocated_bytes, 24);
    }

    #[test]
    fn test_region_containing() {
        let mut a = small();
        let x = a.allocate(4).unwrap();
        assert_eq!(a.region_containing(x + 3), Some(&Region::allocated(0x0, 16)));
        assert_eq!(a.region_containing(0x20), Some(&Region::free(0x10, 48)));
        assert_eq!(a.region_containing(0x40), None);
    }

    #[test]
    fn test_placement_rows() {
        assert_eq!(Placement::Exact.rows_added(), 0);
        assert_eq!(Placement::Middle.rows_added(), 2);
        assert_eq!(Merge::Both.rows_removed(), 2);
        assert_eq!(format!("{}", Placement::Tail), "tail");
    }

    #[test]
    fn test_display() {
        let a = small();
        let out = format!("{a}");
        assert!(out.contains("alignment 8 B"));
        assert!(out.contains("free"));
    }
}
