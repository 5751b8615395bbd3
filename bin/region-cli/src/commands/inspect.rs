// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `regionctl inspect` command: show what the allocator would start from.
//!
//! Prints the boot descriptor as given, the memory extents after sorting,
//! the coalesced regions, and the region the working table is seeded with.

use boot_info::ByteSize;
use region_allocator::{coalesce, sort_extents};
use std::path::PathBuf;

pub fn execute(boot: Option<PathBuf>, config: Option<PathBuf>) -> anyhow::Result<()> {
    super::banner("regionctl · Boot Inspector");

    let info = super::load_boot(boot.as_deref())?;
    let config = super::load_config(config.as_deref(), None)?;

    // ── Boot Descriptor ────────────────────────────────────────
    println!("  {}", info.summary());
    println!();
    for line in info.to_string().lines() {
        println!("  {line}");
    }
    println!();

    // ── Sorted Memory Extents ──────────────────────────────────
    let sorted = sort_extents(&info.extents);
    println!("  Memory extents (sorted, devices dropped):");
    println!("  {:<4} {:<12} {:>5} {:>12}", "Idx", "Base", "Bits", "Size");
    println!("  {}", "-".repeat(36));
    for (i, e) in sorted.iter().enumerate() {
        println!(
            "  {:<4} 0x{:08x}   {:>5} {:>12}",
            i,
            e.base,
            e.size_exponent,
            ByteSize(e.size_bytes()?).to_string(),
        );
    }
    println!();

    // ── Coalesced Regions ──────────────────────────────────────
    let coalesced = coalesce(&sorted)?;
    println!("  Coalesced regions:");
    println!("  {:<4} {:<12} {:<12} {:>12}", "Idx", "Base", "End", "Size");
    println!("  {}", "-".repeat(44));
    for (i, r) in coalesced.regions.iter().enumerate() {
        let marker = if *r == coalesced.largest { "  <- largest" } else { "" };
        println!(
            "  {:<4} 0x{:08x}   0x{:08x}   {:>12}{marker}",
            i,
            r.base,
            r.end(),
            ByteSize(r.size).to_string(),
        );
    }
    println!();

    println!("  Total usable:  {}", ByteSize(coalesced.total_bytes()));
    println!(
        "  Working region: 0x{:08x} + {}",
        coalesced.largest.base,
        ByteSize(coalesced.largest.size)
    );
    println!(
        "  Allocator:     alignment {}, {} table rows",
        config.alignment, config.capacity
    );
    println!();
    Ok(())
}
