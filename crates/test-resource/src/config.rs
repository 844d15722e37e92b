// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Resource options, loadable from TOML files or constructed in code.
//!
//! # TOML Format
//! ```toml
//! name = "widget-under-test"
//! verbose = true
//! quiet = false
//! no_abort = true
//! allocation_limit = -1
//! ```

use std::path::Path;

/// Construction-time options for a test resource.
///
/// All flags except `name` can also be changed later through the
/// resource's setters; the options struct exists so test fixtures can
/// keep their allocator configuration in a file next to the rest of
/// their configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ResourceOptions {
    /// Name included in every report this resource emits.
    #[serde(default)]
    pub name: String,
    /// Report every allocation and deallocation.
    #[serde(default)]
    pub verbose: bool,
    /// Suppress all error reporting (implies no abort).
    #[serde(default)]
    pub quiet: bool,
    /// Keep running after detecting an error instead of aborting.
    #[serde(default)]
    pub no_abort: bool,
    /// Allocations permitted before an injected failure; negative means
    /// unlimited.
    #[serde(default = "default_allocation_limit")]
    pub allocation_limit: i64,
}

fn default_allocation_limit() -> i64 {
    -1
}

impl Default for ResourceOptions {
    fn default() -> Self {
        Self {
            name: String::new(),
            verbose: false,
            quiet: false,
            no_abort: false,
            allocation_limit: -1,
        }
    }
}

impl ResourceOptions {
    /// Loads options from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, OptionsError> {
        let content = std::fs::read_to_string(path).map_err(|e| OptionsError::Io {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Parses options from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, OptionsError> {
        toml::from_str(toml_str).map_err(|e| OptionsError::Parse(e.to_string()))
    }

    /// Serialises options to TOML.
    pub fn to_toml(&self) -> Result<String, OptionsError> {
        toml::to_string_pretty(self).map_err(|e| OptionsError::Serialise(e.to_string()))
    }
}

/// Errors raised while loading or saving [`ResourceOptions`].
#[derive(Debug, thiserror::Error)]
pub enum OptionsError {
    /// The options file could not be read.
    #[error("cannot read options file '{path}': {detail}")]
    Io { path: String, detail: String },

    /// The TOML content did not parse.
    #[error("TOML parse error: {0}")]
    Parse(String),

    /// The options could not be serialised.
    #[error("TOML serialise error: {0}")]
    Serialise(String),
}
