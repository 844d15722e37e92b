// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types shared across the allocator workspace.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// A process-unique identity for an allocator instance.
///
/// Identities are handed out by [`ResourceId::next`] from a global
/// counter, so they stay stable even if the owning resource value is
/// moved. A block records the id of the resource that produced it; a
/// deallocation through a resource with a different id is a
/// cross-allocator free.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

impl ResourceId {
    /// Reserves the next unused identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the raw identity value.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resource#{}", self.0)
    }
}

/// Errors surfaced by [`MemoryResource::allocate`](crate::MemoryResource::allocate).
///
/// Deallocation never returns an error: instrumented resources count and
/// report what they find instead, so tests that deliberately corrupt
/// memory can keep running and inspect the counters afterwards.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ResourceError {
    /// The upstream allocator refused the request.
    #[error("out of memory: failed to allocate {bytes} bytes aligned to {align}")]
    OutOfMemory { bytes: usize, align: usize },

    /// The resource's allocation-limit countdown reached zero.
    ///
    /// This is the signal the allocation-failure test loop keys on; it
    /// carries the originating resource so the loop can tell a failure
    /// it induced apart from one injected by an unrelated resource.
    #[error("injected allocation failure from {origin}: {bytes} bytes aligned to {align}")]
    InjectedFailure {
        origin: ResourceId,
        bytes: usize,
        align: usize,
    },

    /// The requested alignment is not a power of two in `[1, 4096]`.
    ///
    /// Carries the same fields as [`ResourceError::InjectedFailure`] so
    /// test code can treat either as "this allocation did not happen".
    #[error("bad alignment {align} for a {bytes}-byte request from {origin}")]
    BadAlignment {
        origin: ResourceId,
        bytes: usize,
        align: usize,
    },
}
