// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Change-over-time observation of a test resource.
//!
//! A monitor snapshots the block counters of one resource at
//! construction and answers "did it go up / down / stay put" questions
//! against the live values. Monitored statistics are block counts only;
//! they do not depend on the sizes of the allocated blocks.

use crate::TestResource;

/// Observes changes in a [`TestResource`]'s block statistics.
///
/// The borrow ties the monitor to its subject, so a monitor can never
/// outlive the resource it watches.
///
/// # Example
/// ```
/// use test_resource::{TestResource, TestResourceMonitor};
///
/// let tr = TestResource::with_name("monitored");
/// let monitor = TestResourceMonitor::new(&tr);
///
/// let p = tr.allocate(32, 8).unwrap();
/// assert!(monitor.is_in_use_up());
/// assert!(monitor.is_total_up());
/// assert_eq!(monitor.delta_blocks_in_use(), 1);
///
/// unsafe { tr.deallocate(p.as_ptr(), 32, 8) };
/// assert!(monitor.is_in_use_same());
/// ```
pub struct TestResourceMonitor<'a> {
    monitored: &'a TestResource,
    initial_in_use: i64,
    initial_max: i64,
    initial_total: i64,
}

impl<'a> TestResourceMonitor<'a> {
    /// Snapshots `monitored`'s block counters.
    pub fn new(monitored: &'a TestResource) -> Self {
        Self {
            monitored,
            initial_in_use: monitored.blocks_in_use(),
            initial_max: monitored.max_blocks(),
            initial_total: monitored.total_blocks(),
        }
    }

    /// Re-snapshots the counters, making the current state the new
    /// baseline.
    pub fn reset(&mut self) {
        self.initial_in_use = self.monitored.blocks_in_use();
        self.initial_max = self.monitored.max_blocks();
        self.initial_total = self.monitored.total_blocks();
    }

    pub fn is_in_use_down(&self) -> bool {
        self.monitored.blocks_in_use() < self.initial_in_use
    }

    pub fn is_in_use_same(&self) -> bool {
        self.monitored.blocks_in_use() == self.initial_in_use
    }

    pub fn is_in_use_up(&self) -> bool {
        self.monitored.blocks_in_use() > self.initial_in_use
    }

    pub fn is_max_same(&self) -> bool {
        self.monitored.max_blocks() == self.initial_max
    }

    pub fn is_max_up(&self) -> bool {
        self.monitored.max_blocks() != self.initial_max
    }

    pub fn is_total_same(&self) -> bool {
        self.monitored.total_blocks() == self.initial_total
    }

    pub fn is_total_up(&self) -> bool {
        self.monitored.total_blocks() != self.initial_total
    }

    /// Signed change in live blocks since the last snapshot.
    pub fn delta_blocks_in_use(&self) -> i64 {
        self.monitored.blocks_in_use() - self.initial_in_use
    }

    /// Signed change in the block high-water mark since the last snapshot.
    pub fn delta_max_blocks(&self) -> i64 {
        self.monitored.max_blocks() - self.initial_max
    }

    /// Signed change in cumulative blocks since the last snapshot.
    pub fn delta_total_blocks(&self) -> i64 {
        self.monitored.total_blocks() - self.initial_total
    }
}
