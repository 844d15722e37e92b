// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Reporter boundary: structured events rendered for humans.
//!
//! A [`Reporter`] is the polymorphic sink a [`TestResource`] sends its
//! events to. The resource assembles everything an event needs *before*
//! dispatching — counters are read from atomics, invalid-block details
//! arrive pre-packaged in an [`InvalidBlockReport`], and the print event
//! carries the outstanding allocation indices — so a reporter never has
//! to (and must not) reach back into the resource's lock.
//!
//! Implementations here write plain text to a stream
//! ([`StreamReporter`]), to a file ([`FileReporter`]), or nowhere
//! ([`NullReporter`]). The text format is not a protocol: tests key on
//! events and counter deltas, not on exact strings. Users wanting JSON,
//! XML, or a test-framework hook implement the trait themselves.

use crate::TestResource;
use std::fmt;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::mem;
use std::path::Path;
use std::process;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// What a deallocated pointer turned out to be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockFault {
    /// The header magic matches neither a live nor a freed block.
    WrongMagic { found: u32 },
    /// The header carries the freed-block magic: a double free.
    AlreadyDeallocated,
    /// The block is live but owned by a different resource.
    ForeignOwner,
    /// The caller's size does not match the recorded size.
    SizeMismatch { expected: usize, provided: usize },
    /// The caller's alignment does not match the recorded alignment.
    AlignMismatch { expected: usize, provided: usize },
    /// Canary bytes in front of the segment were overwritten; `offset`
    /// is the distance from the user pointer to the nearest trashed byte.
    Underrun { offset: usize },
    /// Canary bytes behind the segment were overwritten; `offset` is
    /// the 1-based position of the first trashed byte after the segment.
    Overrun { offset: usize },
}

/// Everything the resource learned about an invalid deallocation,
/// assembled under its lock and handed to the reporter by value.
#[derive(Debug, Clone)]
pub struct InvalidBlockReport {
    /// Address of the (supposed) user segment.
    pub address: usize,
    /// Size the caller passed to `deallocate`.
    pub bytes: usize,
    /// Normalized alignment the caller passed to `deallocate`.
    pub align: usize,
    /// Distance to the nearest trashed canary byte before the segment.
    pub underrun: Option<usize>,
    /// 1-based offset of the first trashed canary byte after the segment.
    pub overrun: Option<usize>,
    /// Classified findings, in detection order.
    pub faults: Vec<BlockFault>,
    /// Copy of the header and pad region preceding the user segment.
    pub header_bytes: Vec<u8>,
    /// Copy of the first bytes (at most 64) of the user segment.
    pub user_prefix: Vec<u8>,
    /// Copy of the post-pad region, when it was safe to read.
    pub trailer_bytes: Vec<u8>,
    /// Address `trailer_bytes` was copied from (the end of the segment
    /// as recorded in the header, which the caller's size may contradict).
    pub trailer_address: usize,
}

/// Sink for the events an instrumented resource emits.
pub trait Reporter: Send + Sync {
    /// A block was allocated (emitted only in verbose mode).
    fn allocation(&self, resource: &TestResource);

    /// A block was cleanly deallocated (emitted only in verbose mode).
    fn deallocation(&self, resource: &TestResource);

    /// The resource is being released; still-live blocks are a leak.
    fn release(&self, resource: &TestResource);

    /// `deallocate` received a corrupt, foreign, or mismatched block.
    fn invalid_block(&self, resource: &TestResource, report: &InvalidBlockReport);

    /// A state dump was requested; `outstanding` holds the allocation
    /// indices of all live blocks in allocation order.
    fn print(&self, resource: &TestResource, outstanding: &[i64]);

    /// Free-form diagnostic message.
    fn log(&self, message: fmt::Arguments<'_>);
}

// ── Text formatting ────────────────────────────────────────────

fn plural(n: usize) -> &'static str {
    if n == 1 {
        ""
    } else {
        "s"
    }
}

/// Hex dump in 16-byte lines, four groups of four, each line prefixed
/// with the address of its first byte.
fn hex_dump(w: &mut dyn Write, base: usize, bytes: &[u8]) -> io::Result<()> {
    for (line, chunk) in bytes.chunks(16).enumerate() {
        write!(w, "{:#018x}:  ", base + line * 16)?;
        for (group, four) in chunk.chunks(4).enumerate() {
            if group > 0 {
                write!(w, "  ")?;
            }
            for byte in four {
                write!(w, " {byte:02x}")?;
            }
        }
        writeln!(w)?;
    }
    Ok(())
}

fn write_resource_prefix(w: &mut dyn Write, resource: &TestResource) -> io::Result<()> {
    write!(w, "test_resource")?;
    if !resource.name().is_empty() {
        write!(w, " {}", resource.name())?;
    }
    Ok(())
}

fn write_allocation(w: &mut dyn Write, resource: &TestResource) -> io::Result<()> {
    let bytes = resource.last_allocated_bytes();
    write_resource_prefix(w, resource)?;
    writeln!(
        w,
        " [{}]: allocated {} byte{} (aligned {}) at {:#x}.",
        resource.last_allocated_index(),
        bytes,
        plural(bytes),
        resource.last_allocated_alignment(),
        resource.last_allocated_address(),
    )
}

fn write_deallocation(w: &mut dyn Write, resource: &TestResource) -> io::Result<()> {
    let bytes = resource.last_deallocated_bytes();
    write_resource_prefix(w, resource)?;
    writeln!(
        w,
        " [{}]: deallocated {} byte{} (aligned {}) at {:#x}.",
        resource.last_deallocated_index(),
        bytes,
        plural(bytes),
        resource.last_deallocated_alignment(),
        resource.last_deallocated_address(),
    )
}

fn write_invalid_block(
    w: &mut dyn Write,
    report: &InvalidBlockReport,
) -> io::Result<()> {
    let addr = report.address;
    for fault in &report.faults {
        match *fault {
            BlockFault::WrongMagic { found } => writeln!(
                w,
                "*** invalid magic number {found:#010x} at address {addr:#x}. ***"
            )?,
            BlockFault::AlreadyDeallocated => writeln!(
                w,
                "*** deallocating previously deallocated memory at {addr:#x}. ***"
            )?,
            BlockFault::ForeignOwner => writeln!(
                w,
                "*** freeing segment at {addr:#x} from wrong allocator. ***"
            )?,
            BlockFault::SizeMismatch { expected, provided } => writeln!(
                w,
                "*** freeing segment at {addr:#x} using wrong size ({provided} vs. {expected}). ***"
            )?,
            BlockFault::AlignMismatch { expected, provided } => writeln!(
                w,
                "*** freeing segment at {addr:#x} using wrong alignment ({provided} vs. {expected}). ***"
            )?,
            BlockFault::Underrun { offset } => writeln!(
                w,
                "*** memory corrupted {offset} byte{} before the segment at {addr:#x}. ***",
                plural(offset)
            )?,
            BlockFault::Overrun { offset } => writeln!(
                w,
                "*** memory corrupted {offset} byte{} past the segment at {addr:#x}. ***",
                plural(offset)
            )?,
        }
    }

    writeln!(w, "Header + padding:")?;
    hex_dump(w, addr - report.header_bytes.len(), &report.header_bytes)?;
    writeln!(w, "User segment:")?;
    hex_dump(w, addr, &report.user_prefix)?;
    if report.overrun.is_some() && !report.trailer_bytes.is_empty() {
        writeln!(w, "Pad area after user segment:")?;
        hex_dump(w, report.trailer_address, &report.trailer_bytes)?;
    }
    Ok(())
}

fn write_release(w: &mut dyn Write, resource: &TestResource) -> io::Result<()> {
    if !resource.has_allocations() {
        return Ok(());
    }
    write!(w, "MEMORY_LEAK")?;
    if !resource.name().is_empty() {
        write!(w, " from {}", resource.name())?;
    }
    writeln!(
        w,
        ":\n   number of blocks in use = {}\n   number of bytes in use = {}",
        resource.blocks_in_use(),
        resource.bytes_in_use(),
    )
}

fn write_state(
    w: &mut dyn Write,
    resource: &TestResource,
    outstanding: &[i64],
) -> io::Result<()> {
    let name = resource.name();
    writeln!(w, "\n======================================================")?;
    if name.is_empty() {
        writeln!(w, "  TEST RESOURCE STATE")?;
    } else {
        writeln!(w, "  TEST RESOURCE {name} STATE")?;
    }
    writeln!(w, "------------------------------------------------------")?;
    writeln!(w, "        category    blocks          bytes")?;
    writeln!(w, "        --------    ------          -----")?;
    writeln!(
        w,
        "          in use    {:<16}{}",
        resource.blocks_in_use(),
        resource.bytes_in_use()
    )?;
    writeln!(
        w,
        "             max    {:<16}{}",
        resource.max_blocks(),
        resource.max_bytes()
    )?;
    writeln!(
        w,
        "           total    {:<16}{}",
        resource.total_blocks(),
        resource.total_bytes()
    )?;
    writeln!(w, "      mismatches    {}", resource.mismatches())?;
    writeln!(w, "   bounds errors    {}", resource.bounds_errors())?;
    writeln!(w, "    param errors    {}", resource.bad_deallocate_params())?;
    writeln!(w, "------------------------------------------------------")?;

    if !outstanding.is_empty() {
        writeln!(w, " indices of outstanding memory allocations:")?;
        for row in outstanding.chunks(8) {
            write!(w, " ")?;
            for index in row {
                write!(w, "  {index}")?;
            }
            writeln!(w)?;
        }
    }
    Ok(())
}

// ── Stream reporter ────────────────────────────────────────────

/// Renders events as text lines on any writer.
///
/// The writer sits behind a mutex, so one reporter may serve resources
/// used from several threads. On a leaking release this reporter aborts
/// the process unless the resource is in no-abort mode; that is how
/// "expect no leak" tests fail hard at scope exit.
pub struct StreamReporter<W: Write + Send> {
    stream: Mutex<W>,
}

impl<W: Write + Send> StreamReporter<W> {
    pub fn new(stream: W) -> Self {
        Self {
            stream: Mutex::new(stream),
        }
    }

    fn with_stream(&self, f: impl FnOnce(&mut W) -> io::Result<()>) {
        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        // Reporting is best-effort; a broken pipe must not take the
        // allocator down with it.
        let _ = f(&mut stream);
        let _ = stream.flush();
    }
}

impl<W: Write + Send> Reporter for StreamReporter<W> {
    fn allocation(&self, resource: &TestResource) {
        self.with_stream(|w| write_allocation(w, resource));
    }

    fn deallocation(&self, resource: &TestResource) {
        self.with_stream(|w| write_deallocation(w, resource));
    }

    fn release(&self, resource: &TestResource) {
        self.with_stream(|w| write_release(w, resource));
        if resource.has_allocations() && !resource.is_no_abort() {
            process::abort();
        }
    }

    fn invalid_block(&self, _resource: &TestResource, report: &InvalidBlockReport) {
        self.with_stream(|w| write_invalid_block(w, report));
    }

    fn print(&self, resource: &TestResource, outstanding: &[i64]) {
        self.with_stream(|w| write_state(w, resource, outstanding));
    }

    fn log(&self, message: fmt::Arguments<'_>) {
        self.with_stream(|w| w.write_fmt(message));
    }
}

// ── File reporter ──────────────────────────────────────────────

/// A stream reporter bound to a file.
///
/// Every event is a no-op while no file is open, so a fixture can
/// construct the reporter up front and only open the log when a test
/// actually wants one.
pub struct FileReporter {
    file: Mutex<Option<BufWriter<File>>>,
}

impl FileReporter {
    /// Creates a reporter with no file attached.
    pub fn new() -> Self {
        Self {
            file: Mutex::new(None),
        }
    }

    /// Creates a reporter writing to a freshly created `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        let reporter = Self::new();
        reporter.open(path)?;
        Ok(reporter)
    }

    /// Opens (creating or truncating) `path` and directs future events
    /// to it, replacing any previously open file.
    pub fn open(&self, path: &Path) -> io::Result<()> {
        let file = BufWriter::new(File::create(path)?);
        *self.file.lock().unwrap_or_else(PoisonError::into_inner) = Some(file);
        Ok(())
    }

    /// Flushes and closes the current file, if any.
    pub fn close(&self) {
        let closed = mem::take(&mut *self.file.lock().unwrap_or_else(PoisonError::into_inner));
        if let Some(mut file) = closed {
            let _ = file.flush();
        }
    }

    /// Whether a file is currently attached.
    pub fn is_open(&self) -> bool {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    fn with_file(&self, f: impl FnOnce(&mut BufWriter<File>) -> io::Result<()>) {
        let mut guard = self.file.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(file) = guard.as_mut() {
            let _ = f(file);
            let _ = file.flush();
        }
    }
}

impl Default for FileReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for FileReporter {
    fn allocation(&self, resource: &TestResource) {
        self.with_file(|w| write_allocation(w, resource));
    }

    fn deallocation(&self, resource: &TestResource) {
        self.with_file(|w| write_deallocation(w, resource));
    }

    fn release(&self, resource: &TestResource) {
        if !self.is_open() {
            return;
        }
        self.with_file(|w| write_release(w, resource));
        if resource.has_allocations() && !resource.is_no_abort() {
            process::abort();
        }
    }

    fn invalid_block(&self, _resource: &TestResource, report: &InvalidBlockReport) {
        self.with_file(|w| write_invalid_block(w, report));
    }

    fn print(&self, resource: &TestResource, outstanding: &[i64]) {
        self.with_file(|w| write_state(w, resource, outstanding));
    }

    fn log(&self, message: fmt::Arguments<'_>) {
        self.with_file(|w| w.write_fmt(message));
    }
}

// ── Null reporter ──────────────────────────────────────────────

/// Discards every event and never aborts.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn allocation(&self, _resource: &TestResource) {}
    fn deallocation(&self, _resource: &TestResource) {}
    fn release(&self, _resource: &TestResource) {}
    fn invalid_block(&self, _resource: &TestResource, _report: &InvalidBlockReport) {}
    fn print(&self, _resource: &TestResource, _outstanding: &[i64]) {}
    fn log(&self, _message: fmt::Arguments<'_>) {}
}

// ── Process-wide reporters ─────────────────────────────────────

/// The immortal console reporter, writing to stdout.
pub fn console_reporter() -> Arc<StreamReporter<io::Stdout>> {
    static CONSOLE: OnceLock<Arc<StreamReporter<io::Stdout>>> = OnceLock::new();
    CONSOLE
        .get_or_init(|| Arc::new(StreamReporter::new(io::stdout())))
        .clone()
}

/// The immortal discarding reporter.
pub fn null_reporter() -> Arc<NullReporter> {
    static NULL: OnceLock<Arc<NullReporter>> = OnceLock::new();
    NULL.get_or_init(|| Arc::new(NullReporter)).clone()
}

fn default_slot() -> &'static Mutex<Arc<dyn Reporter>> {
    static DEFAULT: OnceLock<Mutex<Arc<dyn Reporter>>> = OnceLock::new();
    DEFAULT.get_or_init(|| Mutex::new(console_reporter()))
}

/// Returns the process-wide default reporter, used by resources that
/// were not given one explicitly.
pub fn default_reporter() -> Arc<dyn Reporter> {
    default_slot()
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .clone()
}

/// Installs `replacement` as the process-wide default reporter and
/// returns the previous one. `None` restores the console reporter.
pub fn set_default_reporter(replacement: Option<Arc<dyn Reporter>>) -> Arc<dyn Reporter> {
    let replacement = replacement.unwrap_or_else(|| console_reporter());
    let mut current = default_slot().lock().unwrap_or_else(PoisonError::into_inner);
    mem::replace(&mut *current, replacement)
}
