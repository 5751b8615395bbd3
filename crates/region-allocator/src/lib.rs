// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # region-allocator
//!
//! A first-fit, alignment-aware allocator for physical memory regions,
//! built from the memory extents a boot loader reports.
//!
//! # Key Components
//!
//! - [`Extent`] and [`sort_extents`]: boot extents of `2^k` bytes, with
//!   device extents dropped and the rest ordered by base address.
//! - [`coalesce`]: merges touching extents into [`Region`]s and picks the
//!   largest one.
//! - [`RegionTable`]: the ordered, gap-free, fixed-capacity table the
//!   allocator works on.
//! - [`RegionAllocator`]: first-fit allocation with head/tail/middle
//!   splitting, and exact-base release with neighbour merging.
//! - [`SharedAllocator`] and [`ReservedBlock`]: a mutex-guarded handle for
//!   concurrent callers and an RAII block released on drop.
//! - [`AllocationStats`]: cumulative counters (peak usage, splits, merges).
//!
//! # Lifecycle
//!
//! ```text
//! boot extents ──► sort_extents ──► coalesce ──► largest region
//!                                                     │
//!                                                     ▼
//!                       allocate(k) ◄──────── RegionTable (1 free row)
//!                           │   ▲
//!                  split    │   │  merge
//!                           ▼   │
//!                        release(addr)
//! ```
//!
//! # Example
//! ```
//! use region_allocator::{Alignment, AllocatorConfig, Extent, RegionAllocator};
//!
//! let extents = [
//!     Extent::new(0x0000, 12),
//!     Extent::new(0x1000, 12),
//!     Extent::device(0xfee0_0000, 12),
//! ];
//! let config = AllocatorConfig::with_alignment(Alignment::B64);
//! let mut alloc = RegionAllocator::initialize(&extents, config).unwrap();
//!
//! let a = alloc.allocate(6).unwrap();   // 64 B
//! let b = alloc.allocate(12).unwrap();  // 4 KiB
//! assert_eq!((a, b), (0x0, 0x40));
//! assert_eq!(alloc.allocated_bytes(), 64 + 4096);
//!
//! alloc.release(b).unwrap();
//! alloc.release(a).unwrap();
//! assert_eq!(alloc.regions().len(), 1);
//! ```

mod alignment;
pub mod allocator;
pub mod coalesce;
mod config;
mod error;
pub mod extent;
mod guard;
mod shared;
mod stats;
pub mod table;

/// A physical address.
pub type PhysAddr = u64;

pub use alignment::Alignment;
pub use allocator::{Merge, Placement, RegionAllocator};
pub use coalesce::{coalesce, CoalescedRegions};
pub use config::AllocatorConfig;
pub use error::RegionError;
pub use extent::{size_from_exponent, sort_extents, Extent};
pub use guard::ReservedBlock;
pub use shared::SharedAllocator;
pub use stats::AllocationStats;
pub use table::{Region, RegionTable, DEFAULT_CAPACITY};
