// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! `regionctl run` command: apply a scripted list of operations.
//!
//! Operations are comma-separated:
//! - `alloc:<exponent>` reserves `2^exponent` bytes.
//! - `free:<address>` releases a block; the address may be decimal or
//!   `0x`-prefixed hex.
//!
//! Every operation runs even if an earlier one failed; the outcome of each
//! is printed, followed by the final table.

use anyhow::{bail, Context};
use region_allocator::{PhysAddr, RegionAllocator};
use std::path::PathBuf;
use std::str::FromStr;

/// One scripted step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Alloc(u8),
    Free(PhysAddr),
}

impl FromStr for Op {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let Some((verb, arg)) = s.split_once(':') else {
            bail!("operation '{s}' is missing ':' (expected alloc:<k> or free:<addr>)");
        };
        let arg = arg.trim();

        match verb.trim().to_lowercase().as_str() {
            "alloc" | "allocate" => {
                let k = arg
                    .parse()
                    .with_context(|| format!("invalid size exponent '{arg}'"))?;
                Ok(Op::Alloc(k))
            }
            "free" | "release" => Ok(Op::Free(parse_addr(arg)?)),
            other => bail!("unknown operation '{other}' (expected alloc or free)"),
        }
    }
}

fn parse_addr(s: &str) -> anyhow::Result<PhysAddr> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => PhysAddr::from_str_radix(hex, 16),
        None => s.parse(),
    };
    parsed.with_context(|| format!("invalid address '{s}'"))
}

/// Parses a comma-separated operation list. Empty entries are skipped.
pub fn parse_ops(ops: &str) -> anyhow::Result<Vec<Op>> {
    ops.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(Op::from_str)
        .collect()
}

pub fn execute(
    ops: String,
    boot: Option<PathBuf>,
    config: Option<PathBuf>,
    alignment: Option<String>,
) -> anyhow::Result<()> {
    super::banner("regionctl · Scripted Run");

    let ops = parse_ops(&ops)?;
    let info = super::load_boot(boot.as_deref())?;
    let config = super::load_config(config.as_deref(), alignment.as_deref())?;
    let mut alloc = RegionAllocator::initialize(&info.extents, config)
        .context("failed to initialize the region allocator")?;

    println!("  Alignment: {}", alloc.alignment());
    println!("  Operations: {}", ops.len());
    println!();

    for (i, op) in ops.iter().enumerate() {
        match *op {
            Op::Alloc(k) => match alloc.allocate(k) {
                Ok(addr) => println!("  [{i:>3}] allocate({k}): 0x{addr:08x}"),
                Err(e) => println!("  [{i:>3}] allocate({k}): {e}"),
            },
            Op::Free(addr) => match alloc.release(addr) {
                Ok(()) => println!("  [{i:>3}] release(0x{addr:08x}): ok"),
                Err(e) => println!("  [{i:>3}] release(0x{addr:08x}): {e}"),
            },
        }
    }
    println!();

    super::print_table(alloc.regions());
    println!();
    println!("  Stats:");
    println!("   {}", alloc.stats().summary());
    println!();
    Ok(())
}
