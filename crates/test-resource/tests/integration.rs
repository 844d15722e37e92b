// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Integration tests: end-to-end misuse scenarios.
//!
//! These tests exercise the complete detection pipeline — allocate
//! through a `TestResource`, misuse the block on purpose, and verify
//! that the right counters move, the right events fire, and well-behaved
//! sequences stay clean.

use memory_resource::{
    default_resource, same_resource, system_resource, DefaultResourceGuard, MemoryResource,
    ResourceError, SystemResource,
};
use std::io::{self, Write};
use std::ptr::NonNull;
use std::sync::{Arc, Mutex};
use test_resource::{
    exception_test_loop, null_reporter, ResourceOptions, StreamReporter, TestResource,
    TestResourceMonitor, MAX_NATURAL_ALIGNMENT,
};

// ── Helpers ────────────────────────────────────────────────────

/// A resource that counts and reports but never aborts the process.
fn lenient(name: &str) -> TestResource {
    TestResource::with_parts(
        ResourceOptions {
            name: name.into(),
            no_abort: true,
            ..Default::default()
        },
        system_resource(),
        null_reporter(),
    )
}

/// An upstream that delays every free until it is dropped.
///
/// Keeping freed outer buffers mapped makes double-free and
/// scribble-inspection tests read stable memory instead of whatever the
/// heap recycled it into.
struct QuarantineUpstream {
    inner: Arc<SystemResource>,
    held: Mutex<Vec<(usize, usize, usize)>>,
}

impl QuarantineUpstream {
    fn new() -> Self {
        Self {
            inner: system_resource(),
            held: Mutex::new(Vec::new()),
        }
    }
}

impl MemoryResource for QuarantineUpstream {
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, ResourceError> {
        self.inner.allocate(bytes, align)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        self.held.lock().unwrap().push((ptr as usize, bytes, align));
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_resource(self, other)
    }
}

impl Drop for QuarantineUpstream {
    fn drop(&mut self) {
        for &(ptr, bytes, align) in self.held.lock().unwrap().iter() {
            unsafe { self.inner.deallocate(ptr as *mut u8, bytes, align) };
        }
    }
}

/// An upstream that records the most recent request it served.
struct CountingUpstream {
    inner: Arc<SystemResource>,
    last_request: Mutex<Option<(usize, usize)>>,
}

impl CountingUpstream {
    fn new() -> Self {
        Self {
            inner: system_resource(),
            last_request: Mutex::new(None),
        }
    }

    fn last_request(&self) -> Option<(usize, usize)> {
        *self.last_request.lock().unwrap()
    }
}

impl MemoryResource for CountingUpstream {
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, ResourceError> {
        *self.last_request.lock().unwrap() = Some((bytes, align));
        self.inner.allocate(bytes, align)
    }

    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        unsafe { self.inner.deallocate(ptr, bytes, align) };
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_resource(self, other)
    }
}

/// A writer whose buffer the test can read back after reporting.
#[derive(Clone, Default)]
struct CaptureBuf(Arc<Mutex<Vec<u8>>>);

impl CaptureBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CaptureBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// ── Leak Detection ─────────────────────────────────────────────

#[test]
fn test_leaked_block_is_observable() {
    let tr = lenient("stage1");
    let _leaked = tr.allocate(6, 1).unwrap();

    assert!(tr.has_allocations());
    assert!(!tr.has_errors());
    assert_eq!(tr.status(), -1);
    assert_eq!(tr.bytes_in_use(), 6);
    assert_eq!(tr.blocks_in_use(), 1);
    // Dropping the resource reports the leak; with no_abort set the
    // process survives to finish the test.
}

#[test]
fn test_release_leak_report_names_counts() {
    let buf = CaptureBuf::default();
    {
        let tr = TestResource::with_parts(
            ResourceOptions {
                name: "stage1-report".into(),
                no_abort: true,
                ..Default::default()
            },
            system_resource(),
            Arc::new(StreamReporter::new(buf.clone())),
        );
        let _leaked = tr.allocate(6, 1).unwrap();
    }
    let out = buf.contents();
    assert!(out.contains("MEMORY_LEAK from stage1-report"));
    assert!(out.contains("number of blocks in use = 1"));
    assert!(out.contains("number of bytes in use = 6"));
}

// ── Bad Deallocate Arguments ───────────────────────────────────

#[test]
fn test_inconsistent_alignment_free() {
    let tr = lenient("stage2");
    let p = tr.allocate(6, 1).unwrap();

    // Copy a C string's worth of data: six characters plus the
    // terminator that does not fit.
    unsafe { std::ptr::copy_nonoverlapping(b"foobar\0".as_ptr(), p.as_ptr(), 7) };

    unsafe { tr.deallocate(p.as_ptr(), 6, 2) };

    assert!(tr.has_allocations());
    assert!(tr.has_errors());
    assert_eq!(tr.bounds_errors(), 1);
    assert_eq!(tr.bad_deallocate_params(), 1);
    assert_eq!(tr.bytes_in_use(), 6);
}

#[test]
fn test_wrong_size_free() {
    let tr = lenient("stage3");
    let p = tr.allocate(7, 1).unwrap();

    unsafe { tr.deallocate(p.as_ptr(), 6, 1) };

    assert!(tr.has_allocations());
    assert!(tr.has_errors());
    assert_eq!(tr.bad_deallocate_params(), 1);
    assert_eq!(tr.bytes_in_use(), 7);
}

// ── Double Free ────────────────────────────────────────────────

#[test]
fn test_double_free_reads_freed_magic() {
    let upstream = Arc::new(QuarantineUpstream::new());
    let tr = TestResource::with_parts(
        ResourceOptions {
            name: "stage4a".into(),
            no_abort: true,
            ..Default::default()
        },
        upstream.clone(),
        null_reporter(),
    );

    let p = tr.allocate(6, 1).unwrap();
    unsafe {
        tr.deallocate(p.as_ptr(), 6, 1);
        // The quarantining upstream keeps the buffer mapped, so the
        // second free deterministically reads the freed-block magic.
        tr.deallocate(p.as_ptr(), 6, 1);
    }

    assert!(!tr.has_allocations());
    assert!(tr.has_errors());
    assert_eq!(tr.mismatches(), 1);
    assert_eq!(tr.status(), 1);
    assert_eq!(tr.bytes_in_use(), 0);
}

#[test]
fn test_double_free_report_wording() {
    let upstream = Arc::new(QuarantineUpstream::new());
    let buf = CaptureBuf::default();
    let tr = TestResource::with_parts(
        ResourceOptions {
            name: "stage4b".into(),
            no_abort: true,
            ..Default::default()
        },
        upstream.clone(),
        Arc::new(StreamReporter::new(buf.clone())),
    );

    let p = tr.allocate(6, 1).unwrap();
    unsafe {
        tr.deallocate(p.as_ptr(), 6, 1);
        tr.deallocate(p.as_ptr(), 6, 1);
    }
    assert!(buf
        .contents()
        .contains("deallocating previously deallocated memory"));
}

// ── Canary Violations ──────────────────────────────────────────

#[test]
fn test_overrun_past_the_segment() {
    let buf = CaptureBuf::default();
    let tr = TestResource::with_parts(
        ResourceOptions {
            name: "overrun".into(),
            no_abort: true,
            ..Default::default()
        },
        system_resource(),
        Arc::new(StreamReporter::new(buf.clone())),
    );

    let size = 6usize;
    let p = tr.allocate(size, 1).unwrap();
    unsafe {
        std::ptr::copy_nonoverlapping(b"foobar".as_ptr(), p.as_ptr(), size);
        // One byte into the post-pad, three past the segment end.
        *p.as_ptr().add(size + 3) = 0x65;
        tr.deallocate(p.as_ptr(), size, 1);
    }

    assert_eq!(tr.bounds_errors(), 1);
    let out = buf.contents();
    assert!(out.contains("corrupted 4 bytes past the segment"));
    assert!(out.contains("Pad area after user segment:"));
}

#[test]
fn test_underrun_before_the_segment() {
    let tr = lenient("underrun");
    let p = tr.allocate(6, 1).unwrap();
    unsafe {
        *p.as_ptr().sub(4) = 0x65;
        tr.deallocate(p.as_ptr(), 6, 1);
    }
    assert_eq!(tr.bounds_errors(), 1);
    // Nothing else was wrong with the free.
    assert_eq!(tr.bad_deallocate_params(), 0);
    assert_eq!(tr.mismatches(), 0);
}

#[test]
fn test_intact_canaries_free_cleanly() {
    let tr = lenient("clean");
    let p = tr.allocate(64, 8).unwrap();
    unsafe {
        // Write every user byte; the canaries stay untouched.
        std::ptr::write_bytes(p.as_ptr(), 0xFF, 64);
        tr.deallocate(p.as_ptr(), 64, 8);
    }
    assert_eq!(tr.bounds_errors(), 0);
    assert_eq!(tr.status(), 0);
}

// ── Scribble-On-Free ───────────────────────────────────────────

#[test]
fn test_clean_free_stamps_and_scribbles() {
    let upstream = Arc::new(QuarantineUpstream::new());
    let tr = TestResource::with_parts(
        ResourceOptions {
            name: "scribble".into(),
            no_abort: true,
            ..Default::default()
        },
        upstream.clone(),
        null_reporter(),
    );

    let size = 40usize;
    let p = tr.allocate(size, 8).unwrap();
    unsafe {
        std::ptr::write_bytes(p.as_ptr(), 0x11, size);
        tr.deallocate(p.as_ptr(), size, 8);

        // The quarantining upstream keeps the buffer mapped. The header
        // for any alignment up to 64 occupies one cache line, so the
        // magic sits 64 bytes before the user pointer.
        let magic = p.as_ptr().sub(64).cast::<u32>().read_unaligned();
        assert_eq!(magic, 0xDEAD_F00D);
        for offset in 0..size {
            assert_eq!(*p.as_ptr().add(offset), 0xA5, "offset {offset}");
        }
    }
}

// ── Cross-Resource Frees ───────────────────────────────────────

#[test]
fn test_free_through_wrong_resource() {
    let tr_a = lenient("owner");
    let tr_b = lenient("stranger");

    let p = tr_a.allocate(24, 8).unwrap();
    unsafe { tr_b.deallocate(p.as_ptr(), 24, 8) };

    assert_eq!(tr_b.mismatches(), 1);
    assert_eq!(tr_b.status(), 1);
    assert_eq!(tr_a.mismatches(), 0);
    assert_eq!(tr_a.blocks_in_use(), 1);

    unsafe { tr_a.deallocate(p.as_ptr(), 24, 8) };
    assert_eq!(tr_a.status(), 0);
}

// ── Alignment Property ─────────────────────────────────────────

#[test]
fn test_outer_request_per_alignment() {
    let upstream = Arc::new(CountingUpstream::new());
    let tr = TestResource::with_parts(
        ResourceOptions {
            name: "outer".into(),
            no_abort: true,
            ..Default::default()
        },
        upstream.clone(),
        null_reporter(),
    );

    let bytes = 10usize;
    for shift in 0..=12 {
        let align = 1usize << shift;
        let p = tr.allocate(bytes, align).unwrap();
        assert_eq!(p.as_ptr() as usize % align, 0, "align {align}");

        // Header is one cache line up to 64-byte alignment, then the
        // alignment itself; the outer buffer adds the post-pad.
        let header = if align <= 64 { 64 } else { align };

        let (outer_bytes, outer_align) = upstream.last_request().unwrap();
        assert_eq!(outer_bytes, header + bytes + MAX_NATURAL_ALIGNMENT, "align {align}");
        assert_eq!(outer_align, align.max(MAX_NATURAL_ALIGNMENT), "align {align}");

        unsafe { tr.deallocate(p.as_ptr(), bytes, align) };
    }
    assert_eq!(tr.status(), 0);
}

// ── Allocation-Failure Loop ────────────────────────────────────

#[test]
fn test_failure_loop_with_guarded_blocks() {
    /// A block that frees itself when dropped, like real code under
    /// test would; on an injected failure mid-closure the already
    /// allocated blocks drop while the `?` propagates.
    struct Guarded<'a> {
        tr: &'a TestResource,
        ptr: NonNull<u8>,
        bytes: usize,
    }

    impl<'a> Guarded<'a> {
        fn new(tr: &'a TestResource, bytes: usize) -> Result<Self, ResourceError> {
            Ok(Self {
                tr,
                ptr: tr.allocate(bytes, 8)?,
                bytes,
            })
        }
    }

    impl Drop for Guarded<'_> {
        fn drop(&mut self) {
            unsafe { self.tr.deallocate(self.ptr.as_ptr(), self.bytes, 8) };
        }
    }

    let tr = lenient("tester");
    let blocks = 6;
    let mut iterations = 0i64;

    exception_test_loop(&tr, |tr| {
        iterations += 1;
        let mut held = Vec::new();
        for i in 0..blocks {
            held.push(Guarded::new(tr, 16 + i)?);
        }
        // Everything allocated; guards free the blocks on return.
        Ok::<_, ResourceError>(())
    })
    .unwrap();

    assert!(iterations >= blocks as i64);
    // Every failed iteration unwound cleanly.
    assert_eq!(tr.blocks_in_use(), 0);
    assert_eq!(tr.status(), 0);
}

// ── Concurrency ────────────────────────────────────────────────

#[test]
fn test_concurrent_allocate_deallocate_pairs() {
    const THREADS: usize = 4;
    const PAIRS: usize = 100;

    let tr = lenient("threads");
    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let tr = &tr;
            scope.spawn(move || {
                for i in 0..PAIRS {
                    let bytes = 1 + (t * PAIRS + i) % 128;
                    let p = tr.allocate(bytes, 8).unwrap();
                    unsafe { tr.deallocate(p.as_ptr(), bytes, 8) };
                }
            });
        }
    });

    assert_eq!(tr.total_blocks(), (THREADS * PAIRS) as i64);
    assert_eq!(tr.blocks_in_use(), 0);
    assert_eq!(tr.bytes_in_use(), 0);
    assert!(!tr.has_errors());
    assert_eq!(tr.status(), 0);
}

// ── Monitor ────────────────────────────────────────────────────

#[test]
fn test_monitor_tracks_live_allocations() {
    let tr = lenient("monitored");
    let monitor = TestResourceMonitor::new(&tr);

    let k = 5usize;
    let held: Vec<_> = (0..k).map(|_| tr.allocate(32, 8).unwrap()).collect();

    assert_eq!(monitor.delta_blocks_in_use(), k as i64);
    assert!(monitor.is_total_up());
    assert!(monitor.is_max_up());

    for p in held {
        unsafe { tr.deallocate(p.as_ptr(), 32, 8) };
    }
    assert!(monitor.is_in_use_same());
}

// ── Default-Resource Guard ─────────────────────────────────────

#[test]
fn test_guard_redirects_default_allocations() {
    let tr = Arc::new(lenient("default"));
    {
        let _guard = DefaultResourceGuard::new(Some(tr.clone()));
        let through_default = default_resource();
        assert!(through_default.is_equal(&*tr));

        let p = through_default.allocate(20, 4).unwrap();
        assert_eq!(tr.blocks_in_use(), 1);
        unsafe { through_default.deallocate(p.as_ptr(), 20, 4) };
    }
    // Restored: the instrumented resource no longer sees traffic.
    let after = default_resource();
    assert!(!after.is_equal(&*tr));
    assert_eq!(tr.status(), 0);
}
