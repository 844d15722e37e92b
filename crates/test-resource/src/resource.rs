// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The instrumented memory resource.
//!
//! [`TestResource`] implements the [`MemoryResource`] contract on top of
//! an upstream allocator and records, for every block it hands out,
//! enough bookkeeping to detect at deallocation time: leaks, double
//! frees, buffer under- and overruns, mismatched size/alignment
//! arguments, and frees of blocks owned by another resource. It also
//! supports deterministic injection of allocation failures through a
//! countdown limit.
//!
//! # Thread Safety
//!
//! All counters and flags are atomics with relaxed ordering; every
//! `allocate` and `deallocate` additionally takes the resource's mutex
//! for the duration of the header and registry work, so per-resource
//! operations are linearized. Upstream calls happen inside the lock.
//!
//! # Error Policy
//!
//! Allocation failures (out of memory, injected, bad alignment) are
//! returned as [`ResourceError`]s. Deallocation-time findings are
//! *never* returned: they are counted, reported through the
//! [`Reporter`], and — unless the resource is in no-abort or quiet mode
//! — terminate the process. Tests that deliberately corrupt memory set
//! `no_abort` and inspect the counters afterwards.

use crate::block::{self, BlockHeader};
use crate::config::ResourceOptions;
use crate::registry::{BlockList, BlockNode};
use crate::reporter::{default_reporter, BlockFault, InvalidBlockReport, Reporter};
use crate::stats::StatsSnapshot;
use memory_resource::{
    same_resource, system_resource, MemoryResource, ResourceError, ResourceId,
};
use std::mem::{align_of, size_of};
use std::process;
use std::ptr::{self, NonNull};
use std::slice;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering::Relaxed};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A thread-safe, instrumented memory resource for test environments.
///
/// # Example
/// ```
/// use test_resource::TestResource;
///
/// let tr = TestResource::with_name("example");
/// let p = tr.allocate(32, 8).unwrap();
/// assert_eq!(tr.blocks_in_use(), 1);
/// unsafe { tr.deallocate(p.as_ptr(), 32, 8) };
/// assert_eq!(tr.status(), 0);
/// ```
pub struct TestResource {
    name: String,
    id: ResourceId,
    upstream: Arc<dyn MemoryResource>,
    reporter: Arc<dyn Reporter>,

    verbose: AtomicBool,
    quiet: AtomicBool,
    no_abort: AtomicBool,
    allocation_limit: AtomicI64,

    allocations: AtomicI64,
    deallocations: AtomicI64,
    blocks_in_use: AtomicI64,
    max_blocks: AtomicI64,
    total_blocks: AtomicI64,
    bounds_errors: AtomicI64,
    bad_deallocate_params: AtomicI64,
    mismatches: AtomicI64,
    bytes_in_use: AtomicI64,
    max_bytes: AtomicI64,
    total_bytes: AtomicI64,

    last_allocated_address: AtomicUsize,
    last_allocated_bytes: AtomicUsize,
    last_allocated_alignment: AtomicUsize,
    last_allocated_index: AtomicI64,
    last_deallocated_address: AtomicUsize,
    last_deallocated_bytes: AtomicUsize,
    last_deallocated_alignment: AtomicUsize,
    last_deallocated_index: AtomicI64,

    blocks: Mutex<BlockList>,
}

impl TestResource {
    /// Creates an unnamed resource over the system allocator and the
    /// process-wide default reporter.
    pub fn new() -> Self {
        Self::with_options(ResourceOptions::default())
    }

    /// Creates a named resource with otherwise default options.
    pub fn with_name(name: impl Into<String>) -> Self {
        Self::with_options(ResourceOptions {
            name: name.into(),
            ..Default::default()
        })
    }

    /// Creates a resource from `options`, over the system allocator and
    /// the process-wide default reporter.
    pub fn with_options(options: ResourceOptions) -> Self {
        Self::with_parts(options, system_resource(), default_reporter())
    }

    /// Creates a resource from `options` over a specific upstream.
    pub fn with_upstream(options: ResourceOptions, upstream: Arc<dyn MemoryResource>) -> Self {
        Self::with_parts(options, upstream, default_reporter())
    }

    /// Creates a resource from `options`, `upstream`, and `reporter`.
    ///
    /// The reporter is shared, never owned: the resource reads through
    /// the `Arc` and leaves its lifetime to the caller.
    pub fn with_parts(
        options: ResourceOptions,
        upstream: Arc<dyn MemoryResource>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let id = ResourceId::next();
        tracing::debug!(name = %options.name, %id, "created test resource");
        Self {
            name: options.name,
            id,
            upstream,
            reporter,
            verbose: AtomicBool::new(options.verbose),
            quiet: AtomicBool::new(options.quiet),
            no_abort: AtomicBool::new(options.no_abort),
            allocation_limit: AtomicI64::new(options.allocation_limit),
            allocations: AtomicI64::new(0),
            deallocations: AtomicI64::new(0),
            blocks_in_use: AtomicI64::new(0),
            max_blocks: AtomicI64::new(0),
            total_blocks: AtomicI64::new(0),
            bounds_errors: AtomicI64::new(0),
            bad_deallocate_params: AtomicI64::new(0),
            mismatches: AtomicI64::new(0),
            bytes_in_use: AtomicI64::new(0),
            max_bytes: AtomicI64::new(0),
            total_bytes: AtomicI64::new(0),
            last_allocated_address: AtomicUsize::new(0),
            last_allocated_bytes: AtomicUsize::new(0),
            last_allocated_alignment: AtomicUsize::new(0),
            last_allocated_index: AtomicI64::new(0),
            last_deallocated_address: AtomicUsize::new(0),
            last_deallocated_bytes: AtomicUsize::new(0),
            last_deallocated_alignment: AtomicUsize::new(0),
            last_deallocated_index: AtomicI64::new(0),
            blocks: Mutex::new(BlockList::new()),
        }
    }

    fn lock_blocks(&self) -> MutexGuard<'_, BlockList> {
        self.blocks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ── Allocation ─────────────────────────────────────────────

    /// Allocates `bytes` bytes aligned to `align`.
    ///
    /// `align` must be a power of two in `[1, 4096]`, or zero to request
    /// the natural alignment for `bytes`. Fails with
    /// [`ResourceError::InjectedFailure`] when the allocation-limit
    /// countdown reaches zero, with [`ResourceError::BadAlignment`] for
    /// an unsupported alignment, and propagates upstream failures.
    pub fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, ResourceError> {
        let mut blocks = self.lock_blocks();
        let index = self.allocations.fetch_add(1, Relaxed);

        if self.allocation_limit.load(Relaxed) >= 0
            && self.allocation_limit.fetch_sub(1, Relaxed) - 1 < 0
        {
            return Err(ResourceError::InjectedFailure {
                origin: self.id,
                bytes,
                align,
            });
        }

        let align = if align == 0 {
            block::natural_alignment(bytes)
        } else {
            align
        };
        if !block::is_supported_alignment(align) {
            return Err(ResourceError::BadAlignment {
                origin: self.id,
                bytes,
                align,
            });
        }

        let header_size = block::header_size(align);
        let outer_bytes = match header_size
            .checked_add(bytes)
            .and_then(|n| n.checked_add(block::POST_PAD_SIZE))
        {
            Some(n) => n,
            None => return Err(ResourceError::OutOfMemory { bytes, align }),
        };
        let outer = self
            .upstream
            .allocate(outer_bytes, block::effective_alignment(align))?
            .as_ptr();

        self.last_allocated_bytes.store(bytes, Relaxed);
        self.last_allocated_alignment.store(align, Relaxed);

        let node = match blocks.push_back(index, &*self.upstream) {
            Ok(node) => node,
            Err(err) => {
                // SAFETY: `outer` came from this upstream with exactly
                // this size and alignment.
                unsafe {
                    self.upstream.deallocate(
                        outer,
                        outer_bytes,
                        block::effective_alignment(align),
                    );
                }
                return Err(err);
            }
        };

        // SAFETY: `outer` points to `outer_bytes` writable bytes at the
        // effective alignment, which is what `write_block` requires.
        let user = unsafe { block::write_block(outer, bytes, align, index, node, self.id) };

        self.blocks_in_use.fetch_add(1, Relaxed);
        self.max_blocks
            .fetch_max(self.blocks_in_use.load(Relaxed), Relaxed);
        self.total_blocks.fetch_add(1, Relaxed);
        self.bytes_in_use.fetch_add(bytes as i64, Relaxed);
        self.max_bytes
            .fetch_max(self.bytes_in_use.load(Relaxed), Relaxed);
        self.total_bytes.fetch_add(bytes as i64, Relaxed);

        self.last_allocated_address.store(user as usize, Relaxed);
        self.last_allocated_index.store(index, Relaxed);

        if self.is_verbose() {
            self.reporter.allocation(self);
        }

        // SAFETY: `user` is `outer` plus the header offset and `outer`
        // is non-null.
        Ok(unsafe { NonNull::new_unchecked(user) })
    }

    // ── Deallocation ───────────────────────────────────────────

    /// Returns a block to this resource, verifying it on the way.
    ///
    /// The canaries, magic, owner, and the caller's `(bytes, align)` are
    /// checked against the block's records. Any finding is counted and
    /// reported, the block is *not* returned upstream (so follow-up
    /// tooling can inspect the still-live buffer), and the process
    /// aborts unless quiet or no-abort is set. On a clean check the
    /// header is stamped as deallocated and the user segment scribbled
    /// over before the outer buffer goes back upstream.
    ///
    /// # Safety
    ///
    /// `ptr` must be null or a pointer previously returned by a
    /// `TestResource`'s `allocate` whose block has not been returned
    /// upstream yet. Passing a freed-and-recycled pointer makes this
    /// read recycled memory; that risk is inherent to double-free
    /// detection and is bounded by keeping the upstream buffer alive
    /// (e.g. with a quarantining upstream) in tests that exercise it.
    pub unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        let mut blocks = self.lock_blocks();
        self.deallocations.fetch_add(1, Relaxed);
        self.last_deallocated_address.store(ptr as usize, Relaxed);

        if ptr.is_null() {
            if bytes != 0 {
                self.bad_deallocate_params.fetch_add(1, Relaxed);
                tracing::warn!(
                    name = %self.name,
                    bytes,
                    align,
                    "freeing a null pointer with non-zero size"
                );
                if !self.is_quiet() {
                    self.reporter.log(format_args!(
                        "*** freeing a null pointer with non-zero size {bytes} (aligned {align}). ***\n"
                    ));
                    if !self.is_no_abort() {
                        process::abort();
                    }
                }
            } else {
                self.last_deallocated_bytes.store(0, Relaxed);
                self.last_deallocated_alignment.store(align, Relaxed);
            }
            return;
        }

        let align = if align == 0 {
            block::natural_alignment(bytes)
        } else {
            align
        };
        if !block::is_supported_alignment(align) {
            self.bad_deallocate_params.fetch_add(1, Relaxed);
            tracing::warn!(name = %self.name, align, "freeing with unsupported alignment");
            if !self.is_quiet() {
                self.reporter.log(format_args!(
                    "*** freeing {bytes} bytes using unsupported alignment {align}. ***\n"
                ));
                if !self.is_no_abort() {
                    process::abort();
                }
            }
            return;
        }

        // SAFETY (whole verification below): the caller promises `ptr`
        // came from a test resource's allocate, so the header region in
        // front of it is addressable. The magic is read first, without
        // assuming alignment; the word-sized fields are only touched
        // once the magic proves this really is one of our live headers.
        let header = unsafe { block::header_ptr(ptr, align) };
        let magic = unsafe { BlockHeader::read_magic(header) };

        let mut misc_error = false;
        let mut recorded_bytes = 0usize;
        let mut recorded_align = 0usize;
        if magic != block::ALLOCATED_MAGIC
            || unsafe { BlockHeader::read_owner(header) } != self.id
        {
            misc_error = true;
        } else {
            recorded_bytes = unsafe { (*header).bytes };
            recorded_align = unsafe { (*header).align };
        }

        // Freed memory may legitimately contain anything, so the canary
        // scans only run when the magic and owner checked out.
        let mut underrun = None;
        let mut overrun = None;
        let mut param_error = false;
        if !misc_error {
            underrun = unsafe { block::scan_underrun(ptr, align) };
            if underrun.is_none() {
                overrun = unsafe { block::scan_overrun(ptr, recorded_bytes) };
            }
            param_error = bytes != recorded_bytes || align != recorded_align;
        }

        if misc_error || param_error || underrun.is_some() || overrun.is_some() {
            if misc_error {
                self.mismatches.fetch_add(1, Relaxed);
            }
            if param_error {
                self.bad_deallocate_params.fetch_add(1, Relaxed);
            }
            if underrun.is_some() || overrun.is_some() {
                self.bounds_errors.fetch_add(1, Relaxed);
            }
            tracing::warn!(
                name = %self.name,
                address = ptr as usize,
                misc_error,
                param_error,
                ?underrun,
                ?overrun,
                "invalid block passed to deallocate"
            );

            if self.is_quiet() {
                return;
            }
            let report = unsafe {
                self.build_invalid_report(
                    ptr,
                    bytes,
                    align,
                    magic,
                    misc_error,
                    recorded_bytes,
                    recorded_align,
                    underrun,
                    overrun,
                )
            };
            self.reporter.invalid_block(self, &report);
            if !self.is_no_abort() {
                process::abort();
            }
            return;
        }

        // The block is almost certainly ours and intact: retire its
        // registry node, update the statistics, stamp and scribble it,
        // and hand the outer buffer back.
        unsafe {
            let node: *mut BlockNode = (*header).node;
            let index = (*header).index;
            self.upstream.deallocate(
                blocks.remove(node).cast(),
                size_of::<BlockNode>(),
                align_of::<BlockNode>(),
            );

            self.last_deallocated_bytes.store(recorded_bytes, Relaxed);
            self.last_deallocated_alignment.store(align, Relaxed);
            self.last_deallocated_index.store(index, Relaxed);
            self.blocks_in_use.fetch_sub(1, Relaxed);
            self.bytes_in_use.fetch_sub(recorded_bytes as i64, Relaxed);

            // Stamp before the upstream free so a second deallocate of
            // the same pointer reads the freed-block magic.
            (*header).magic = block::DEALLOCATED_MAGIC;
            ptr::write_bytes(ptr, block::SCRIBBLE_BYTE, recorded_bytes);

            if self.is_verbose() {
                self.reporter.deallocation(self);
            }

            self.upstream.deallocate(
                header.cast(),
                block::outer_size(recorded_bytes, align),
                block::effective_alignment(align),
            );
        }
    }

    #[allow(clippy::too_many_arguments)]
    unsafe fn build_invalid_report(
        &self,
        user: *mut u8,
        bytes: usize,
        align: usize,
        magic: u32,
        misc_error: bool,
        recorded_bytes: usize,
        recorded_align: usize,
        underrun: Option<usize>,
        overrun: Option<usize>,
    ) -> InvalidBlockReport {
        let header_size = block::header_size(align);
        let header = unsafe { block::header_ptr(user, align) };

        let mut faults = Vec::new();
        if magic != block::ALLOCATED_MAGIC {
            if magic == block::DEALLOCATED_MAGIC {
                faults.push(BlockFault::AlreadyDeallocated);
            } else {
                faults.push(BlockFault::WrongMagic { found: magic });
            }
        } else if misc_error {
            faults.push(BlockFault::ForeignOwner);
        } else {
            if bytes != recorded_bytes {
                faults.push(BlockFault::SizeMismatch {
                    expected: recorded_bytes,
                    provided: bytes,
                });
            }
            if align != recorded_align {
                faults.push(BlockFault::AlignMismatch {
                    expected: recorded_align,
                    provided: align,
                });
            }
            if let Some(offset) = underrun {
                faults.push(BlockFault::Underrun { offset });
            }
            if let Some(offset) = overrun {
                faults.push(BlockFault::Overrun { offset });
            }
        }

        // The bytes field is trustworthy for any block this crate
        // stamped, live or freed; otherwise fall back to the caller's
        // claim for the dump length.
        let stamped = magic == block::ALLOCATED_MAGIC || magic == block::DEALLOCATED_MAGIC;
        let display_bytes = if stamped {
            unsafe { ptr::addr_of!((*header).bytes).read_unaligned() }
        } else {
            bytes
        };

        unsafe {
            InvalidBlockReport {
                address: user as usize,
                bytes,
                align,
                underrun,
                overrun,
                faults,
                header_bytes: slice::from_raw_parts(header.cast::<u8>(), header_size).to_vec(),
                user_prefix: slice::from_raw_parts(user, display_bytes.min(64)).to_vec(),
                trailer_bytes: if misc_error {
                    Vec::new()
                } else {
                    slice::from_raw_parts(user.add(recorded_bytes), block::POST_PAD_SIZE)
                        .to_vec()
                },
                trailer_address: user as usize + recorded_bytes,
            }
        }
    }

    // ── Lifecycle ──────────────────────────────────────────────

    /// Releases the resource's bookkeeping.
    ///
    /// In verbose mode the full state is printed first. Registry nodes
    /// are returned upstream; leaked user blocks are *not* freed — a
    /// leak stays observable in the counters. Unless quiet, the release
    /// event is emitted; the stream reporters abort the process on a
    /// leak unless no-abort is set. Called automatically on drop.
    pub fn release(&self) {
        let mut blocks = self.lock_blocks();
        tracing::debug!(
            name = %self.name,
            blocks_in_use = self.blocks_in_use.load(Relaxed),
            "releasing test resource"
        );

        if self.is_verbose() {
            let outstanding = blocks.indices();
            self.reporter.print(self, &outstanding);
        }

        // SAFETY: every node in the registry was allocated from this
        // upstream by `allocate`.
        unsafe { blocks.clear(&*self.upstream) };

        if !self.is_quiet() {
            self.reporter.release(self);
        }
    }

    /// Emits the state-dump event with the indices of all live blocks.
    pub fn print(&self) {
        let blocks = self.lock_blocks();
        let outstanding = blocks.indices();
        self.reporter.print(self, &outstanding);
    }

    /// Overall verdict: the number of detected errors if any, `-1` if
    /// blocks are still live (a leak) without errors, `0` if clean.
    pub fn status(&self) -> i64 {
        let _blocks = self.lock_blocks();
        let errors = self.mismatches.load(Relaxed)
            + self.bounds_errors.load(Relaxed)
            + self.bad_deallocate_params.load(Relaxed);
        if errors > 0 {
            errors
        } else if self.has_allocations() {
            -1
        } else {
            0
        }
    }

    /// Captures all counters into a serialisable snapshot.
    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            name: self.name.clone(),
            allocations: self.allocations.load(Relaxed),
            deallocations: self.deallocations.load(Relaxed),
            blocks_in_use: self.blocks_in_use.load(Relaxed),
            max_blocks: self.max_blocks.load(Relaxed),
            total_blocks: self.total_blocks.load(Relaxed),
            bytes_in_use: self.bytes_in_use.load(Relaxed),
            max_bytes: self.max_bytes.load(Relaxed),
            total_bytes: self.total_bytes.load(Relaxed),
            mismatches: self.mismatches.load(Relaxed),
            bounds_errors: self.bounds_errors.load(Relaxed),
            bad_deallocate_params: self.bad_deallocate_params.load(Relaxed),
        }
    }

    // ── Configuration ──────────────────────────────────────────

    /// Sets how many further allocations succeed before an injected
    /// failure; a negative value removes the limit.
    pub fn set_allocation_limit(&self, limit: i64) {
        self.allocation_limit.store(limit, Relaxed);
    }

    /// Remaining allocations before an injected failure; negative means
    /// unlimited.
    pub fn allocation_limit(&self) -> i64 {
        self.allocation_limit.load(Relaxed)
    }

    /// When set, detected errors are reported but the process keeps
    /// running.
    pub fn set_no_abort(&self, no_abort: bool) {
        self.no_abort.store(no_abort, Relaxed);
    }

    pub fn is_no_abort(&self) -> bool {
        self.no_abort.load(Relaxed)
    }

    /// When set, detected errors are counted but neither reported nor
    /// fatal (quiet implies no-abort).
    pub fn set_quiet(&self, quiet: bool) {
        self.quiet.store(quiet, Relaxed);
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet.load(Relaxed)
    }

    /// When set, every allocation and deallocation is reported.
    pub fn set_verbose(&self, verbose: bool) {
        self.verbose.store(verbose, Relaxed);
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose.load(Relaxed)
    }

    // ── Introspection ──────────────────────────────────────────

    pub fn name(&self) -> &str {
        &self.name
    }

    /// This resource's process-unique identity.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// The upstream resource all storage comes from.
    pub fn upstream(&self) -> &Arc<dyn MemoryResource> {
        &self.upstream
    }

    /// The reporter receiving this resource's events.
    pub fn reporter(&self) -> &Arc<dyn Reporter> {
        &self.reporter
    }

    /// Allocation attempts, including failed ones.
    pub fn allocations(&self) -> i64 {
        self.allocations.load(Relaxed)
    }

    /// Deallocation attempts, including invalid ones.
    pub fn deallocations(&self) -> i64 {
        self.deallocations.load(Relaxed)
    }

    pub fn blocks_in_use(&self) -> i64 {
        self.blocks_in_use.load(Relaxed)
    }

    pub fn max_blocks(&self) -> i64 {
        self.max_blocks.load(Relaxed)
    }

    pub fn total_blocks(&self) -> i64 {
        self.total_blocks.load(Relaxed)
    }

    pub fn bounds_errors(&self) -> i64 {
        self.bounds_errors.load(Relaxed)
    }

    pub fn bad_deallocate_params(&self) -> i64 {
        self.bad_deallocate_params.load(Relaxed)
    }

    pub fn mismatches(&self) -> i64 {
        self.mismatches.load(Relaxed)
    }

    pub fn bytes_in_use(&self) -> i64 {
        self.bytes_in_use.load(Relaxed)
    }

    pub fn max_bytes(&self) -> i64 {
        self.max_bytes.load(Relaxed)
    }

    pub fn total_bytes(&self) -> i64 {
        self.total_bytes.load(Relaxed)
    }

    pub fn last_allocated_address(&self) -> usize {
        self.last_allocated_address.load(Relaxed)
    }

    pub fn last_allocated_bytes(&self) -> usize {
        self.last_allocated_bytes.load(Relaxed)
    }

    pub fn last_allocated_alignment(&self) -> usize {
        self.last_allocated_alignment.load(Relaxed)
    }

    /// Allocation index of the most recently allocated block.
    pub fn last_allocated_index(&self) -> i64 {
        self.last_allocated_index.load(Relaxed)
    }

    pub fn last_deallocated_address(&self) -> usize {
        self.last_deallocated_address.load(Relaxed)
    }

    pub fn last_deallocated_bytes(&self) -> usize {
        self.last_deallocated_bytes.load(Relaxed)
    }

    pub fn last_deallocated_alignment(&self) -> usize {
        self.last_deallocated_alignment.load(Relaxed)
    }

    /// Allocation index of the most recently deallocated block.
    pub fn last_deallocated_index(&self) -> i64 {
        self.last_deallocated_index.load(Relaxed)
    }

    /// True if any mismatch, bounds, or parameter error was detected.
    pub fn has_errors(&self) -> bool {
        self.mismatches.load(Relaxed) != 0
            || self.bounds_errors.load(Relaxed) != 0
            || self.bad_deallocate_params.load(Relaxed) != 0
    }

    /// True if any blocks or bytes are still live.
    pub fn has_allocations(&self) -> bool {
        self.blocks_in_use.load(Relaxed) > 0 || self.bytes_in_use.load(Relaxed) > 0
    }
}

impl Default for TestResource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryResource for TestResource {
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, ResourceError> {
        TestResource::allocate(self, bytes, align)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        unsafe { TestResource::deallocate(self, ptr, bytes, align) }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_resource(self, other)
    }
}

impl Drop for TestResource {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for TestResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestResource")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("blocks_in_use", &self.blocks_in_use.load(Relaxed))
            .field("bytes_in_use", &self.bytes_in_use.load(Relaxed))
            .field("has_errors", &self.has_errors())
            .finish()
    }
}
