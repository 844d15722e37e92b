// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Point-in-time statistics snapshots.
//!
//! A [`StatsSnapshot`] captures every counter of a test resource at one
//! moment. It serialises with `serde`, so CI jobs can archive allocator
//! behavior next to test results.

/// All counters of a test resource, frozen at one point in time.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct StatsSnapshot {
    /// Name of the resource the snapshot was taken from.
    pub name: String,
    /// Allocation attempts, including failed and injected-failure ones.
    pub allocations: i64,
    /// Deallocation attempts, including invalid ones.
    pub deallocations: i64,
    /// Blocks currently live.
    pub blocks_in_use: i64,
    /// High-water mark of live blocks.
    pub max_blocks: i64,
    /// Successfully allocated blocks, cumulative.
    pub total_blocks: i64,
    /// Bytes currently live (user-requested sizes).
    pub bytes_in_use: i64,
    /// High-water mark of live bytes.
    pub max_bytes: i64,
    /// Successfully allocated bytes, cumulative.
    pub total_bytes: i64,
    /// Deallocations of blocks this resource does not own (wrong magic,
    /// double free, or foreign owner).
    pub mismatches: i64,
    /// Buffer under- and overruns detected at deallocation time.
    pub bounds_errors: i64,
    /// Size/alignment mismatches and other bad deallocate arguments.
    pub bad_deallocate_params: i64,
}

impl StatsSnapshot {
    /// Total number of detected errors.
    pub fn errors(&self) -> i64 {
        self.mismatches + self.bounds_errors + self.bad_deallocate_params
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        let name = if self.name.is_empty() {
            String::new()
        } else {
            format!(" {}", self.name)
        };
        format!(
            "test_resource{name}: {} blocks ({} bytes) in use, \
             peak {} blocks ({} bytes), {} blocks ({} bytes) total, \
             {} mismatches, {} bounds errors, {} param errors",
            self.blocks_in_use,
            self.bytes_in_use,
            self.max_blocks,
            self.max_bytes,
            self.total_blocks,
            self.total_bytes,
            self.mismatches,
            self.bounds_errors,
            self.bad_deallocate_params,
        )
    }
}
