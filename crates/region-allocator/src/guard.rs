// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII block guard that releases its region on drop.
//!
//! [`ReservedBlock`] ties the lifetime of an allocation to a Rust value.
//! Dropping the guard hands the block back to the allocator it came from,
//! so a block reserved for the duration of a scope cannot leak.

use crate::{PhysAddr, RegionAllocator, RegionError};
use std::sync::{Arc, Mutex};

/// A block reserved through [`SharedAllocator`](crate::SharedAllocator).
///
/// # Example
/// ```
/// use region_allocator::{AllocatorConfig, Extent, SharedAllocator};
///
/// let shared = SharedAllocator::initialize(&[Extent::new(0x0, 12)], AllocatorConfig::default())
///     .unwrap();
///
/// {
///     let block = shared.allocate_guarded(8).unwrap();
///     assert_eq!(block.size(), 256);
/// } // released here
///
/// let kept = shared.allocate_guarded(8).unwrap().into_addr();
/// assert_eq!(shared.allocated_bytes().unwrap(), 256);
/// shared.release(kept).unwrap();
/// ```
pub struct ReservedBlock {
    addr: PhysAddr,
    size: u64,
    /// `None` once the block has been released or detached.
    allocator: Option<Arc<Mutex<RegionAllocator>>>,
}

impl ReservedBlock {
    pub(crate) fn new(addr: PhysAddr, size: u64, allocator: Arc<Mutex<RegionAllocator>>) -> Self {
        Self {
            addr,
            size,
            allocator: Some(allocator),
        }
    }

    /// Base address of the block.
    pub fn addr(&self) -> PhysAddr {
        self.addr
    }

    /// Size of the block in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Detaches the guard and returns the bare address. The block stays
    /// allocated until released by hand.
    pub fn into_addr(mut self) -> PhysAddr {
        self.allocator = None;
        self.addr
    }

    /// Releases the block now, reporting any error instead of logging it.
    pub fn release(mut self) -> Result<(), RegionError> {
        match self.allocator.take() {
            Some(allocator) => release_into(&allocator, self.addr),
            None => Ok(()),
        }
    }
}

fn release_into(allocator: &Mutex<RegionAllocator>, addr: PhysAddr) -> Result<(), RegionError> {
    allocator
        .lock()
        .map_err(|_| RegionError::LockPoisoned)?
        .release(addr)
}

impl Drop for ReservedBlock {
    fn drop(&mut self) {
        if let Some(allocator) = self.allocator.take() {
            if let Err(e) = release_into(&allocator, self.addr) {
                tracing::warn!("dropping reserved block {:#x} failed: {e}", self.addr);
            }
        }
    }
}

impl std::fmt::Debug for ReservedBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReservedBlock")
            .field("addr", &format_args!("{:#x}", self.addr))
            .field("size", &self.size)
            .field("attached", &self.allocator.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{AllocatorConfig, Extent, Region, RegionError, SharedAllocator};

    fn shared() -> SharedAllocator {
        SharedAllocator::initialize(&[Extent::new(0x0, 10)], AllocatorConfig::default()).unwrap()
    }

    #[test]
    fn test_drop_releases() {
        let alloc = shared();
        let a = alloc.allocate_guarded(6).unwrap();
        let b = alloc.allocate_guarded(6).unwrap();
        assert_eq!((a.addr(), b.addr()), (0x0, 0x40));

        drop(a);
        drop(b);
        let table = alloc.snapshot().unwrap();
        assert_eq!(table.rows(), &[Region::free(0x0, 1024)]);
    }

    #[test]
    fn test_into_addr_keeps_block() {
        let alloc = shared();
        let addr = alloc.allocate_guarded(7).unwrap().into_addr();
        assert_eq!(alloc.allocated_bytes().unwrap(), 128);
        alloc.release(addr).unwrap();
        assert_eq!(alloc.allocated_bytes().unwrap(), 0);
    }

    #[test]
    fn test_explicit_release_reports_errors() {
        let alloc = shared();
        let block = alloc.allocate_guarded(6).unwrap();
        alloc.release(block.addr()).unwrap();
        assert_eq!(block.release(), Err(RegionError::DoubleRelease(0x0)));
    }

    #[test]
    fn test_drop_after_manual_release_is_logged_not_panicking() {
        let alloc = shared();
        let block = alloc.allocate_guarded(6).unwrap();
        alloc.release(block.addr()).unwrap();
        drop(block);
        assert_eq!(alloc.stats().unwrap().failed_releases, 1);
    }

    #[test]
    fn test_debug() {
        let alloc = shared();
        let block = alloc.allocate_guarded(6).unwrap();
        let out = format!("{block:?}");
        assert!(out.contains("0x0"));
        assert!(out.contains("attached: true"));
    }
}
