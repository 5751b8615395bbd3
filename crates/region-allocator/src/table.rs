// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The fixed-capacity region table.
//!
//! Rows are kept ordered by base address. Inserting or removing a row
//! shifts the rows after it, so indices of later rows change on every
//! split or merge.
//!
//! ```text
//!  idx    base      size   state
//!   0   0x00000    0x040   allocated
//!   1   0x00040    0xfc0   free
//!   2   0x01000    0x1000  allocated
//!   3   0x02000    0xe000  free
//!                  └─ row[i].base + row[i].size == row[i+1].base
//! ```
//!
//! The table never grows past the capacity it was created with. An insert
//! that would need more rows fails with `TableCapacityExceeded` and leaves
//! the table untouched.

use crate::{PhysAddr, RegionError};
use std::fmt;

/// Default table capacity.
pub const DEFAULT_CAPACITY: usize = 512;

/// One row of the region table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Region {
    /// First address of the region.
    pub base: PhysAddr,
    /// Size in bytes.
    pub size: u64,
    /// Whether the region is handed out.
    pub allocated: bool,
}

impl Region {
    /// Creates an unallocated region.
    pub fn free(base: PhysAddr, size: u64) -> Self {
        Self {
            base,
            size,
            allocated: false,
        }
    }

    /// Creates an allocated region.
    pub fn allocated(base: PhysAddr, size: u64) -> Self {
        Self {
            base,
            size,
            allocated: true,
        }
    }

    /// First address past the region. Saturates at the top of the
    /// address space.
    pub fn end(&self) -> PhysAddr {
        self.base.saturating_add(self.size)
    }

    /// Whether `addr` lies inside the region.
    pub fn contains(&self, addr: PhysAddr) -> bool {
        addr >= self.base && addr - self.base < self.size
    }

    /// Whether the region is free.
    pub fn is_free(&self) -> bool {
        !self.allocated
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:#010x}, {:#010x}) {:>10} B {}",
            self.base,
            self.end(),
            self.size,
            if self.allocated { "allocated" } else { "free" }
        )
    }
}

/// An ordered, gap-free table of regions with a fixed row capacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionTable {
    rows: Vec<Region>,
    capacity: usize,
}

impl RegionTable {
    /// Creates an empty table that will hold at most `capacity` rows.
    ///
    /// Storage grows on demand; `capacity` is a limit, not a reservation.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            rows: Vec::with_capacity(capacity.min(DEFAULT_CAPACITY)),
            capacity,
        }
    }

    /// Creates a table holding a single free region.
    pub fn seeded(region: Region, capacity: usize) -> Result<Self, RegionError> {
        let mut table = Self::with_capacity(capacity);
        table.push(region)?;
        Ok(table)
    }

    /// Number of rows in use.
    #[inline]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Maximum number of rows.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of rows still available before the table is full.
    #[inline]
    pub fn headroom(&self) -> usize {
        self.capacity - self.rows.len()
    }

    /// All rows in address order.
    pub fn rows(&self) -> &[Region] {
        &self.rows
    }

    /// Row `idx`, if it exists.
    pub fn get(&self, idx: usize) -> Option<&Region> {
        self.rows.get(idx)
    }

    /// Mutable access to row `idx`. Panics if `idx` is out of bounds.
    pub(crate) fn row_mut(&mut self, idx: usize) -> &mut Region {
        &mut self.rows[idx]
    }

    /// Iterates over the rows in address order.
    pub fn iter(&self) -> std::slice::Iter<'_, Region> {
        self.rows.iter()
    }

    /// Index of the row starting exactly at `addr`.
    pub fn position_of_base(&self, addr: PhysAddr) -> Option<usize> {
        self.rows.iter().position(|r| r.base == addr)
    }

    /// Fails unless `additional` more rows fit.
    pub(crate) fn reserve_rows(&self, additional: usize) -> Result<(), RegionError> {
        if additional > self.headroom() {
            return Err(RegionError::TableCapacityExceeded {
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Appends a row at the end.
    pub(crate) fn push(&mut self, region: Region) -> Result<(), RegionError> {
        self.reserve_rows(1)?;
        self.rows.push(region);
        Ok(())
    }

    /// Inserts `region` at `idx`, shifting later rows right by one.
    pub(crate) fn insert_at(&mut self, idx: usize, region: Region) -> Result<(), RegionError> {
        self.reserve_rows(1)?;
        self.rows.insert(idx, region);
        Ok(())
    }

    /// Removes and returns the row at `idx`, shifting later rows left.
    pub(crate) fn remove_at(&mut self, idx: usize) -> Region {
        self.rows.remove(idx)
    }

    /// Removes `count` rows starting at `idx`.
    pub(crate) fn remove_range(&mut self, idx: usize, count: usize) {
        self.rows.drain(idx..idx + count);
    }

    /// Total bytes covered by allocated rows.
    pub fn allocated_bytes(&self) -> u64 {
        self.rows.iter().filter(|r| r.allocated).map(|r| r.size).sum()
    }

    /// Total bytes covered by free rows.
    pub fn free_bytes(&self) -> u64 {
        self.rows.iter().filter(|r| r.is_free()).map(|r| r.size).sum()
    }

    /// Size of the largest free row, or 0 if none is free.
    pub fn largest_free(&self) -> u64 {
        self.rows
            .iter()
            .filter(|r| r.is_free())
            .map(|r| r.size)
            .max()
            .unwrap_or(0)
    }

    /// Checks the table-wide invariants.
    ///
    /// # Checks
    /// - The row count does not exceed the capacity.
    /// - No row is empty.
    /// - Each row ends exactly where the next one starts.
    /// - No two neighbouring rows are both free.
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.rows.len() > self.capacity {
            return Err(format!(
                "{} rows exceed capacity {}",
                self.rows.len(),
                self.capacity
            ));
        }

        for (i, row) in self.rows.iter().enumerate() {
            if row.size == 0 {
                return Err(format!("row {i} at {:#x} is empty", row.base));
            }
        }

        for (i, pair) in self.rows.windows(2).enumerate() {
            let (a, b) = (&pair[0], &pair[1]);
            let a_end = a
                .base
                .checked_add(a.size)
                .ok_or_else(|| format!("row {i} at {:#x} overflows", a.base))?;
            if a_end != b.base {
                return Err(format!(
                    "row {i} ends at {a_end:#x} but row {} starts at {:#x}",
                    i + 1,
                    b.base
                ));
            }
            if a.is_free() && b.is_free() {
                return Err(format!("rows {i} and {} are both free", i + 1));
            }
        }

        Ok(())
    }
}

impl std::ops::Index<usize> for RegionTable {
    type Output = Region;

    fn index(&self, idx: usize) -> &Region {
        &self.rows[idx]
    }
}

impl<'a> IntoIterator for &'a RegionTable {
    type Item = &'a Region;
    type IntoIter = std::slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for RegionTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:>4}  {:<10}  {:<10}  {:>12}  {}",
            "Idx", "Base", "End", "Size", "State"
        )?;
        for (i, r) in self.rows.iter().enumerate() {
            writeln!(
                f,
                "{:>4}  {:#010x}  {:#010x}  {:>12}  {}",
                i,
                r.base,
                r.end(),
                r.size,
                if r.allocated { "allocated" } else { "free" }
            )?;
        }
        write!(f, "{} / {} rows", self.rows.len(), self.capacity)
    }
}
