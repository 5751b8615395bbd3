// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # regionctl
//!
//! Command-line interface for the region allocator.
//!
//! ## Usage
//! ```bash
//! # Show the boot extents and the regions built from them
//! regionctl inspect --boot demos/boot.toml
//!
//! # Walk through every split and merge case
//! regionctl demo --alignment 64
//!
//! # Run a scripted sequence of allocations and releases
//! regionctl run --ops "alloc:6,alloc:12,free:0x100000"
//! ```

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "regionctl",
    about = "First-fit physical memory region allocator: inspect, demo and scripted runs",
    version,
    author
)]
struct Cli {
    /// Path to an allocator TOML configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (repeat for more: -v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the boot descriptor, sorted extents and coalesced regions.
    Inspect {
        /// Boot descriptor (.toml or .json). Uses a built-in layout if omitted.
        #[arg(short, long)]
        boot: Option<PathBuf>,
    },

    /// Allocate and release a fixed set of blocks, printing the table.
    Demo {
        /// Boot descriptor (.toml or .json). Uses a built-in layout if omitted.
        #[arg(short, long)]
        boot: Option<PathBuf>,

        /// Alignment in bytes: 8, 16, 32 or 64 (overrides the config file).
        #[arg(short, long)]
        alignment: Option<String>,
    },

    /// Run a comma-separated list of operations such as "alloc:6,free:0x40".
    Run {
        /// Operations: `alloc:<exponent>` or `free:<address>`.
        #[arg(short, long)]
        ops: String,

        /// Boot descriptor (.toml or .json). Uses a built-in layout if omitted.
        #[arg(short, long)]
        boot: Option<PathBuf>,

        /// Alignment in bytes: 8, 16, 32 or 64 (overrides the config file).
        #[arg(short, long)]
        alignment: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging based on verbosity.
    commands::init_tracing(cli.verbose);

    match cli.command {
        Commands::Inspect { boot } => commands::inspect::execute(boot, cli.config),
        Commands::Demo { boot, alignment } => {
            commands::demo::execute(boot, cli.config, alignment)
        }
        Commands::Run {
            ops,
            boot,
            alignment,
        } => commands::run::execute(ops, boot, cli.config, alignment),
    }
}
