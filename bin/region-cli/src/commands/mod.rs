// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Subcommands and the helpers they share.

pub mod demo;
pub mod inspect;
pub mod run;

use anyhow::Context;
use boot_info::BootInfo;
use region_allocator::{Alignment, AllocatorConfig, RegionTable};
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Installs the log subscriber. `RUST_LOG` wins over `-v` when set.
pub fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "regionctl={level},region_allocator={level},boot_info={level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();
}

/// Loads the boot descriptor, or the built-in sample when none is given.
pub fn load_boot(path: Option<&Path>) -> anyhow::Result<BootInfo> {
    match path {
        Some(path) => BootInfo::from_file(path)
            .with_context(|| format!("failed to load boot descriptor '{}'", path.display())),
        None => {
            tracing::info!("no boot descriptor given, using the built-in sample");
            Ok(BootInfo::sample())
        }
    }
}

/// Builds the allocator configuration from the optional config file and
/// the optional `--alignment` override.
pub fn load_config(
    path: Option<&Path>,
    alignment: Option<&str>,
) -> anyhow::Result<AllocatorConfig> {
    let mut config = match path {
        Some(path) => AllocatorConfig::from_file(path)?,
        None => AllocatorConfig::default(),
    };
    if let Some(a) = alignment {
        config.alignment = Alignment::parse(a)?;
    }
    Ok(config)
}

/// Prints a boxed title banner.
pub fn banner(title: &str) {
    println!("╔══════════════════════════════════════════════════════╗");
    println!("║{title:^54}║");
    println!("╚══════════════════════════════════════════════════════╝");
    println!();
}

/// Prints the region table with one row per line.
pub fn print_table(table: &RegionTable) {
    println!(
        "  {:<6} {:<12} {:<12} {:>12}  {}",
        "Region", "Base", "End", "Size", "State"
    );
    println!("  {}", "-".repeat(58));
    for (i, r) in table.iter().enumerate() {
        println!(
            "  {:<6} 0x{:08x}   0x{:08x}   {:>12}  {}",
            i,
            r.base,
            r.end(),
            r.size,
            if r.allocated { "allocated" } else { "free" },
        );
    }
    println!("  {} / {} rows", table.len(), table.capacity());
}
