// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! A cloneable, thread-safe handle to one region allocator.
//!
//! [`RegionAllocator`] itself takes `&mut self` for every mutating call, so
//! it cannot be reached from two threads at once. [`SharedAllocator`] wraps
//! it in `Arc<Mutex<_>>`: every clone refers to the same table and each
//! `allocate` or `release` runs under the lock from start to finish.
//!
//! # Thread Safety
//! `SharedAllocator` is `Send + Sync`. If a thread panics while holding the
//! lock, later calls return [`RegionError::LockPoisoned`].

use crate::extent::size_from_exponent;
use crate::{
    AllocationStats, AllocatorConfig, Extent, PhysAddr, RegionAllocator, RegionError,
    RegionTable, ReservedBlock,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a [`RegionAllocator`].
///
/// # Example
/// ```
/// use region_allocator::{AllocatorConfig, Extent, SharedAllocator};
///
/// let shared = SharedAllocator::initialize(&[Extent::new(0x0, 12)], AllocatorConfig::default())
///     .unwrap();
///
/// let block = shared.allocate_guarded(6).unwrap();
/// assert_eq!(block.addr(), 0x0);
/// assert_eq!(shared.allocated_bytes().unwrap(), 64);
///
/// drop(block);
/// assert_eq!(shared.allocated_bytes().unwrap(), 0);
/// ```
#[derive(Debug, Clone)]
pub struct SharedAllocator {
    inner: Arc<Mutex<RegionAllocator>>,
}

impl SharedAllocator {
    /// Wraps an existing allocator.
    pub fn new(allocator: RegionAllocator) -> Self {
        Self {
            inner: Arc::new(Mutex::new(allocator)),
        }
    }

    /// Builds an allocator from boot extents and wraps it.
    pub fn initialize(extents: &[Extent], config: AllocatorConfig) -> Result<Self, RegionError> {
        RegionAllocator::initialize(extents, config).map(Self::new)
    }

    fn lock(&self) -> Result<MutexGuard<'_, RegionAllocator>, RegionError> {
        self.inner.lock().map_err(|_| RegionError::LockPoisoned)
    }

    /// See [`RegionAllocator::allocate`].
    pub fn allocate(&self, size_exponent: u8) -> Result<PhysAddr, RegionError> {
        self.lock()?.allocate(size_exponent)
    }

    /// See [`RegionAllocator::release`].
    pub fn release(&self, addr: PhysAddr) -> Result<(), RegionError> {
        self.lock()?.release(addr)
    }

    /// Allocates a block that is released again when the returned guard
    /// is dropped.
    pub fn allocate_guarded(&self, size_exponent: u8) -> Result<ReservedBlock, RegionError> {
        let addr = self.allocate(size_exponent)?;
        let size = size_from_exponent(size_exponent)?;
        Ok(ReservedBlock::new(addr, size, Arc::clone(&self.inner)))
    }

    /// Runs `f` with exclusive access to the allocator.
    pub fn with<R>(&self, f: impl FnOnce(&mut RegionAllocator) -> R) -> Result<R, RegionError> {
        let mut allocator = self.lock()?;
        Ok(f(&mut allocator))
    }

    /// Copy of the current region table.
    pub fn snapshot(&self) -> Result<RegionTable, RegionError> {
        Ok(self.lock()?.regions().clone())
    }

    /// Bytes currently handed out.
    pub fn allocated_bytes(&self) -> Result<u64, RegionError> {
        Ok(self.lock()?.allocated_bytes())
    }

    /// Returns a snapshot of allocation statistics.
    pub fn stats(&self) -> Result<AllocationStats, RegionError> {
        Ok(self.lock()?.stats())
    }
}

impl From<RegionAllocator> for SharedAllocator {
    fn from(allocator: RegionAllocator) -> Self {
        Self::new(allocator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Alignment;
    use std::thread;

    fn shared() -> SharedAllocator {
        SharedAllocator::initialize(
            &[Extent::new(0x0, 16)],
            AllocatorConfig::with_alignment(Alignment::B64),
        )
        .unwrap()
    }

    #[test]
    fn test_clones_share_state() {
        let a = shared();
        let b = a.clone();
        let addr = a.allocate(8).unwrap();
        assert_eq!(b.allocated_bytes().unwrap(), 256);
        b.release(addr).unwrap();
        assert_eq!(a.allocated_bytes().unwrap(), 0);
    }

    #[test]
    fn test_concurrent_allocations_do_not_overlap() {
        let alloc = shared();
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = alloc.clone();
                thread::spawn(move || {
                    (0..16)
                        .map(|_| alloc.allocate(6).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut addrs: Vec<PhysAddr> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        addrs.sort_unstable();
        assert_eq!(addrs.len(), 128);
        for pair in addrs.windows(2) {
            assert!(pair[1] - pair[0] >= 64);
        }

        let table = alloc.snapshot().unwrap();
        assert!(table.check_invariants().is_ok());
        assert_eq!(table.allocated_bytes(), 128 * 64);
    }

    #[test]
    fn test_concurrent_round_trip() {
        let alloc = shared();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let alloc = alloc.clone();
                thread::spawn(move || {
                    for _ in 0..50 {
                        let addr = alloc.allocate(7).unwrap();
                        alloc.release(addr).unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let table = alloc.snapshot().unwrap();
        assert_eq!(table.len(), 1);
        assert!(table[0].is_free());
        assert_eq!(alloc.stats().unwrap().total_releases, 200);
    }

    #[test]
    fn test_poisoned_lock_is_an_error() {
        let alloc = shared();
        let poisoner = alloc.clone();
        let _ = thread::spawn(move || {
            let _ = poisoner.with(|_| panic!("poison the lock"));
        })
        .join();

        assert_eq!(alloc.allocate(6), Err(RegionError::LockPoisoned));
        assert_eq!(alloc.release(0x0), Err(RegionError::LockPoisoned));
    }

    #[test]
    fn test_with_exposes_allocator() {
        let alloc = shared();
        let rows = alloc.with(|a| a.regions().len()).unwrap();
        assert_eq!(rows, 1);
    }
}
