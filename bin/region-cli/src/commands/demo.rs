// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `regionctl demo` command: exercise every split and merge case.
//!
//! ```text
//! allocate 2^6, 2^12, 2^4          head splits off the working region
//! release  last row's base         free tail: reported as a double release
//! release  2^12                    merges with neither neighbour
//! release  2^4                     merges with both neighbours
//! release  2^6                     merges with the next row
//! release  2^6 + 1                 not a block base: invalid address
//! ```

use anyhow::Context;
use region_allocator::{PhysAddr, RegionAllocator};
use std::path::PathBuf;

pub fn execute(
    boot: Option<PathBuf>,
    config: Option<PathBuf>,
    alignment: Option<String>,
) -> anyhow::Result<()> {
    super::banner("regionctl · Allocator Demo");

    let info = super::load_boot(boot.as_deref())?;
    let config = super::load_config(config.as_deref(), alignment.as_deref())?;
    let mut alloc = RegionAllocator::initialize(&info.extents, config)
        .context("failed to initialize the region allocator")?;

    println!("  Boot:      {}", info.summary());
    println!("  Alignment: {}", alloc.alignment());
    println!();

    // ── Allocate ───────────────────────────────────────────────
    let mut blocks = Vec::new();
    for k in [6u8, 12, 4] {
        let addr = alloc
            .allocate(k)
            .with_context(|| format!("allocate({k}) failed"))?;
        println!("  allocate({k}): 0x{addr:08x}");
        blocks.push(addr);
    }
    println!();
    super::print_table(alloc.regions());
    println!();

    // ── Release ────────────────────────────────────────────────
    let (b6, b12, b4) = (blocks[0], blocks[1], blocks[2]);
    let last = alloc.regions().rows().last().map(|r| r.base);

    if let Some(base) = last {
        release(&mut alloc, base);
    }
    for addr in [b12, b4, b6, b6 + 1] {
        release(&mut alloc, addr);
    }
    println!();
    super::print_table(alloc.regions());
    println!();

    println!("  Stats:");
    println!("   {}", alloc.stats().summary());
    println!();
    Ok(())
}

/// Releases `addr` and prints the outcome. Failures are expected for some
/// steps, so they are reported rather than returned.
fn release(alloc: &mut RegionAllocator, addr: PhysAddr) {
    match alloc.release(addr) {
        Ok(()) => println!("  release(0x{addr:08x}): ok"),
        Err(e) => println!("  release(0x{addr:08x}): {e}"),
    }
}
