// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # test-resource
//!
//! An instrumented, thread-safe memory resource for test environments.
//!
//! [`TestResource`] wraps an upstream allocator behind the
//! [`MemoryResource`](memory_resource::MemoryResource) contract and
//! records, per allocation, enough bookkeeping to detect at
//! deallocation time: leaks, double frees, buffer under- and overruns,
//! mismatched size/alignment arguments, and frees of blocks owned by
//! another resource instance.
//!
//! # Key Components
//!
//! - [`TestResource`] — the instrumented resource: detection logic,
//!   statistics, configuration flags, event dispatch.
//! - [`Reporter`] — the polymorphic sink for events; ships with stream,
//!   file, and null implementations plus a process-wide default.
//! - [`TestResourceMonitor`] — snapshots block counters and answers
//!   delta/direction questions, for property-style assertions.
//! - [`exception_test_loop`] — exercises a closure under every possible
//!   injected allocation-failure position.
//! - [`ResourceOptions`] — construction options, loadable from TOML.
//! - [`StatsSnapshot`] — all counters at a point in time, serialisable.
//!
//! # Block Layout
//!
//! Every user block lives inside an outer buffer obtained upstream:
//! a header (magic, size, alignment, allocation index, registry node,
//! owner), canary padding up to the user segment, the user segment
//! itself, and a trailing canary region. Deviations from the canary
//! byte found at deallocation time pin down the exact overrun offset.
//!
//! # Example
//!
//! ```
//! use test_resource::{TestResource, TestResourceMonitor};
//!
//! let tr = TestResource::with_name("doc");
//! let monitor = TestResourceMonitor::new(&tr);
//!
//! let p = tr.allocate(48, 16).unwrap();
//! assert!(monitor.is_in_use_up());
//!
//! unsafe { tr.deallocate(p.as_ptr(), 48, 16) };
//! assert_eq!(tr.status(), 0);
//! ```

mod block;
mod config;
mod failure;
mod monitor;
mod registry;
mod reporter;
mod resource;
mod stats;

pub use block::{MAX_NATURAL_ALIGNMENT, MAX_SUPPORTED_ALIGNMENT};
pub use config::{OptionsError, ResourceOptions};
pub use failure::{exception_test_loop, FailureSource, InjectedFailureInfo};
pub use monitor::TestResourceMonitor;
pub use reporter::{
    console_reporter, default_reporter, null_reporter, set_default_reporter, BlockFault,
    FileReporter, InvalidBlockReport, NullReporter, Reporter, StreamReporter,
};
pub use resource::TestResource;
pub use stats::StatsSnapshot;
