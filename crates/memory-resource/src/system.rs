// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The root allocator: global heap behind the [`MemoryResource`] contract.

use crate::{MemoryResource, ResourceError, ResourceId, same_resource};
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::{Arc, OnceLock};

/// The "malloc/free" resource at the bottom of every upstream chain.
///
/// Allocates from the Rust global allocator. There is exactly one
/// instance per process, obtained through [`system_resource`]; it is
/// constructed on first use and never destroyed, so resources released
/// during late process shutdown can still return memory to it.
pub struct SystemResource {
    id: ResourceId,
}

impl SystemResource {
    fn layout(&self, bytes: usize, align: usize) -> Result<Layout, ResourceError> {
        // The global allocator rejects zero-sized layouts; round up so
        // every successful allocation is a real, distinct heap pointer.
        Layout::from_size_align(bytes.max(1), align).map_err(|_| ResourceError::BadAlignment {
            origin: self.id,
            bytes,
            align,
        })
    }
}

impl MemoryResource for SystemResource {
    fn allocate(&self, bytes: usize, align: usize) -> Result<NonNull<u8>, ResourceError> {
        let layout = self.layout(bytes, align)?;
        // SAFETY: `layout` has non-zero size by construction.
        let ptr = unsafe { alloc::alloc(layout) };
        NonNull::new(ptr).ok_or(ResourceError::OutOfMemory { bytes, align })
    }

    unsafe fn deallocate(&self, ptr: *mut u8, bytes: usize, align: usize) {
        if ptr.is_null() {
            return;
        }
        // SAFETY: the caller promises `ptr` came from `allocate` with the
        // same `bytes` and `align`, which produced this exact layout.
        unsafe {
            alloc::dealloc(ptr, Layout::from_size_align_unchecked(bytes.max(1), align));
        }
    }

    fn is_equal(&self, other: &dyn MemoryResource) -> bool {
        same_resource(self, other)
    }
}

/// Returns the process-wide system resource.
///
/// The instance lives in a static and is deliberately never dropped;
/// the clone handed back shares it.
pub fn system_resource() -> Arc<SystemResource> {
    static SYSTEM: OnceLock<Arc<SystemResource>> = OnceLock::new();
    SYSTEM
        .get_or_init(|| {
            Arc::new(SystemResource {
                id: ResourceId::next(),
            })
        })
        .clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singleton_identity() {
        assert!(Arc::ptr_eq(&system_resource(), &system_resource()));
    }

    #[test]
    fn test_alignment_honored() {
        let r = system_resource();
        for align in [1usize, 2, 4, 8, 16, 32, 64, 128] {
            let p = r.allocate(24, align).unwrap();
            assert_eq!(p.as_ptr() as usize % align, 0, "align {align}");
            unsafe { r.deallocate(p.as_ptr(), 24, align) };
        }
    }

    #[test]
    fn test_bad_alignment_rejected() {
        let r = system_resource();
        assert!(matches!(
            r.allocate(8, 3),
            Err(ResourceError::BadAlignment { align: 3, .. })
        ));
    }

    #[test]
    fn test_null_deallocate_is_noop() {
        let r = system_resource();
        unsafe { r.deallocate(std::ptr::null_mut(), 0, 1) };
    }
}
