// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation statistics for profiling and diagnostics.
//!
//! [`AllocationStats`] tracks cumulative counters about how the region
//! table is being used: request outcomes, peak usage, and how often
//! regions were split or merged.

/// Cumulative statistics about allocator usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    /// Successful `allocate` calls.
    pub total_allocations: u64,
    /// `allocate` calls that returned an error.
    pub failed_allocations: u64,
    /// Successful `release` calls.
    pub total_releases: u64,
    /// `release` calls that returned an error.
    pub failed_releases: u64,
    /// Bytes currently handed out.
    pub allocated_bytes: u64,
    /// High-water mark of `allocated_bytes`.
    pub peak_allocated_bytes: u64,
    /// Rows added by splitting free regions.
    pub rows_split: u64,
    /// Rows removed by merging free neighbours.
    pub rows_merged: u64,
    /// Largest row count the table reached.
    pub peak_table_len: usize,
}

impl AllocationStats {
    /// Fraction of `allocate` calls that succeeded, in `[0.0, 1.0]`.
    ///
    /// Returns `0.0` if nothing has been requested.
    pub fn success_ratio(&self) -> f64 {
        let total = self.total_allocations + self.failed_allocations;
        if total == 0 {
            return 0.0;
        }
        self.total_allocations as f64 / total as f64
    }

    pub(crate) fn record_allocation(&mut self, size: u64, new_rows: usize, table_len: usize) {
        self.total_allocations += 1;
        self.rows_split += new_rows as u64;
        self.allocated_bytes += size;
        self.peak_allocated_bytes = self.peak_allocated_bytes.max(self.allocated_bytes);
        self.peak_table_len = self.peak_table_len.max(table_len);
    }

    pub(crate) fn record_failed_allocation(&mut self) {
        self.failed_allocations += 1;
    }

    pub(crate) fn record_release(&mut self, size: u64, merged_rows: usize) {
        self.total_releases += 1;
        self.rows_merged += merged_rows as u64;
        self.allocated_bytes = self.allocated_bytes.saturating_sub(size);
    }

    pub(crate) fn record_failed_release(&mut self) {
        self.failed_releases += 1;
    }

    pub(crate) fn observe_table_len(&mut self, table_len: usize) {
        self.peak_table_len = self.peak_table_len.max(table_len);
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        format!(
            "Allocations: {} ok, {} failed ({:.0}% success); releases: {} ok, {} failed; \
             live {} B, peak {} B; {} splits, {} merges, peak {} rows",
            self.total_allocations,
            self.failed_allocations,
            self.success_ratio() * 100.0,
            self.total_releases,
            self.failed_releases,
            self.allocated_bytes,
            self.peak_allocated_bytes,
            self.rows_split,
            self.rows_merged,
            self.peak_table_len,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let s = AllocationStats::default();
        assert_eq!(s.total_allocations, 0);
        assert_eq!(s.success_ratio(), 0.0);
    }

    #[test]
    fn test_success_ratio() {
        let mut s = AllocationStats::default();
        s.record_allocation(64, 1, 2);
        s.record_allocation(64, 0, 2);
        s.record_failed_allocation();
        assert!((s.success_ratio() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_peak_tracking() {
        let mut s = AllocationStats::default();
        s.record_allocation(100, 1, 2);
        s.record_allocation(50, 1, 3);
        s.record_release(100, 1);
        assert_eq!(s.allocated_bytes, 50);
        assert_eq!(s.peak_allocated_bytes, 150);
        assert_eq!(s.peak_table_len, 3);
    }

    #[test]
    fn test_split_and_merge_counts() {
        let mut s = AllocationStats::default();
        s.record_allocation(16, 2, 3);
        s.record_release(16, 2);
        assert_eq!(s.rows_split, 2);
        assert_eq!(s.rows_merged, 2);
    }

    #[test]
    fn test_summary() {
        let mut s = AllocationStats::default();
        s.record_allocation(64, 1, 2);
        s.record_failed_release();
        let summary = s.summary();
        assert!(summary.contains("1 ok, 0 failed"));
        assert!(summary.contains("releases: 0 ok, 1 failed"));
    }
}
