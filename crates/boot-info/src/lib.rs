// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # boot-info
//!
//! Boot-time memory descriptors for the region allocator.
//!
//! A [`BootInfo`] carries what the boot environment reports about a node:
//! its identity and the raw list of physical memory extents, device windows
//! included, in whatever order they were discovered. Descriptors are read
//! from TOML or JSON files, or taken from [`BootInfo::sample`] when no file
//! is given.
//!
//! # Example
//! ```
//! use boot_info::BootInfo;
//! use region_allocator::{AllocatorConfig, RegionAllocator};
//!
//! let info = BootInfo::sample();
//! let alloc = RegionAllocator::initialize(&info.extents, AllocatorConfig::default()).unwrap();
//! assert_eq!(alloc.largest_region().base, 0x0010_0000);
//! ```

mod descriptor;
mod error;

pub use descriptor::{BootInfo, ByteSize, MAX_BOOT_EXTENTS};
pub use error::BootInfoError;
