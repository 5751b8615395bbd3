// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for boot descriptor loading and validation.

use std::path::PathBuf;

/// Errors that can occur while loading a boot descriptor.
#[derive(Debug, thiserror::Error)]
pub enum BootInfoError {
    /// The descriptor file could not be read.
    #[error("cannot read boot descriptor '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file extension is neither `.toml` nor `.json`.
    #[error("unknown boot descriptor format for '{0}' (expected .toml or .json)")]
    UnknownFormat(PathBuf),

    /// TOML parse failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON parse failure.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The descriptor parsed but describes an impossible layout.
    #[error("invalid boot descriptor: {0}")]
    Invalid(String),

    /// An extent failed the allocator's own checks.
    #[error("invalid extent: {0}")]
    Extent(#[from] region_allocator::RegionError),
}
