// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Demonstrates leak detection and the state dump.
//!
//! Run with:
//! ```bash
//! cargo run --example leak_detection
//! ```

use test_resource::{ResourceOptions, TestResource, TestResourceMonitor};

fn main() {
    let tr = TestResource::with_options(ResourceOptions {
        name: "demo".into(),
        verbose: true,
        no_abort: true, // report the leak instead of aborting the demo
        ..Default::default()
    });
    let monitor = TestResourceMonitor::new(&tr);

    // A well-behaved allocation.
    let fine = tr.allocate(128, 16).expect("allocation failed");
    unsafe { tr.deallocate(fine.as_ptr(), 128, 16) };

    // A sloppy one: never freed.
    let _leaked = tr.allocate(6, 1).expect("allocation failed");

    println!("\n{}", tr.stats().summary());
    println!(
        "monitor: delta_blocks_in_use = {}, total went up = {}",
        monitor.delta_blocks_in_use(),
        monitor.is_total_up()
    );
    println!("status = {} (-1 means a leak, no errors)", tr.status());

    // Dropping the resource prints the state dump (verbose) and the
    // MEMORY_LEAK report.
}
