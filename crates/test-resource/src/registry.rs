// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The live-block registry: an intrusive doubly-linked list with one
//! node per currently-live allocation.
//!
//! Nodes are allocated from the *upstream* resource, never from the
//! instrumented resource itself, so the registry's own bookkeeping does
//! not disturb the statistics it exists to support. Insertion order is
//! allocation order; removal is O(1) because each block header stores a
//! pointer to its own node.

use memory_resource::{MemoryResource, ResourceError};
use std::mem::{align_of, size_of};
use std::ptr;

/// One registry entry.
pub(crate) struct BlockNode {
    pub(crate) index: i64,
    next: *mut BlockNode,
    prev: *mut BlockNode,
}

/// Head and tail of the registry list.
pub(crate) struct BlockList {
    head: *mut BlockNode,
    tail: *mut BlockNode,
}

// The raw node pointers are owned exclusively by this list and only
// reachable through the resource's mutex, so moving the list between
// threads cannot alias them.
unsafe impl Send for BlockList {}

impl BlockList {
    pub(crate) const fn new() -> Self {
        Self {
            head: ptr::null_mut(),
            tail: ptr::null_mut(),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_null()
    }

    /// Appends a node for allocation `index`, allocating the node from
    /// `upstream`. Returns the node pointer for storage in the block
    /// header.
    pub(crate) fn push_back(
        &mut self,
        index: i64,
        upstream: &dyn MemoryResource,
    ) -> Result<*mut BlockNode, ResourceError> {
        let node = upstream
            .allocate(size_of::<BlockNode>(), align_of::<BlockNode>())?
            .as_ptr()
            .cast::<BlockNode>();

        // SAFETY: `node` is a fresh, properly aligned allocation of
        // node size; `self.tail` is either null or a live node we own.
        unsafe {
            node.write(BlockNode {
                index,
                next: ptr::null_mut(),
                prev: self.tail,
            });
            if self.head.is_null() {
                self.head = node;
            } else {
                (*self.tail).next = node;
            }
        }
        self.tail = node;
        Ok(node)
    }

    /// Unlinks `node` and returns it; the caller gives the storage back
    /// to upstream.
    ///
    /// # Safety
    ///
    /// `node` must be a live member of this list.
    pub(crate) unsafe fn remove(&mut self, node: *mut BlockNode) -> *mut BlockNode {
        unsafe {
            if node == self.tail {
                self.tail = (*node).prev;
            } else {
                (*(*node).next).prev = (*node).prev;
            }
            if node == self.head {
                self.head = (*node).next;
            } else {
                (*(*node).prev).next = (*node).next;
            }
        }
        node
    }

    /// Returns every node to `upstream` and empties the list. Used only
    /// while releasing the owning resource.
    ///
    /// # Safety
    ///
    /// Every node in the list must have been allocated from `upstream`.
    pub(crate) unsafe fn clear(&mut self, upstream: &dyn MemoryResource) {
        let mut node = self.head;
        while !node.is_null() {
            // SAFETY: `node` is a live node owned by this list.
            let next = unsafe { (*node).next };
            unsafe {
                upstream.deallocate(node.cast(), size_of::<BlockNode>(), align_of::<BlockNode>());
            }
            node = next;
        }
        self.head = ptr::null_mut();
        self.tail = ptr::null_mut();
    }

    /// Collects the allocation indices of all live blocks in insertion
    /// (= allocation) order.
    pub(crate) fn indices(&self) -> Vec<i64> {
        let mut out = Vec::new();
        let mut node = self.head;
        while !node.is_null() {
            // SAFETY: the walk only visits nodes owned by this list.
            unsafe {
                out.push((*node).index);
                node = (*node).next;
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use memory_resource::system_resource;

    fn free_node(node: *mut BlockNode) {
        let upstream = system_resource();
        unsafe {
            upstream.deallocate(node.cast(), size_of::<BlockNode>(), align_of::<BlockNode>());
        }
    }

    #[test]
    fn test_insertion_order() {
        let upstream = system_resource();
        let mut list = BlockList::new();
        assert!(list.is_empty());

        for i in 0..4 {
            list.push_back(i, &*upstream).unwrap();
        }
        assert_eq!(list.indices(), vec![0, 1, 2, 3]);
        unsafe { list.clear(&*upstream) };
        assert!(list.is_empty());
    }

    #[test]
    fn test_remove_by_node_pointer() {
        let upstream = system_resource();
        let mut list = BlockList::new();

        let a = list.push_back(10, &*upstream).unwrap();
        let b = list.push_back(11, &*upstream).unwrap();
        let c = list.push_back(12, &*upstream).unwrap();

        // Middle, then tail, then head.
        free_node(unsafe { list.remove(b) });
        assert_eq!(list.indices(), vec![10, 12]);

        free_node(unsafe { list.remove(c) });
        assert_eq!(list.indices(), vec![10]);

        free_node(unsafe { list.remove(a) });
        assert!(list.is_empty());
        assert_eq!(list.indices(), Vec::<i64>::new());
    }

    #[test]
    fn test_clear_resets_both_ends() {
        let upstream = system_resource();
        let mut list = BlockList::new();
        list.push_back(1, &*upstream).unwrap();
        list.push_back(2, &*upstream).unwrap();
        unsafe { list.clear(&*upstream) };
        assert!(list.is_empty());

        // The list is reusable after a clear.
        list.push_back(3, &*upstream).unwrap();
        assert_eq!(list.indices(), vec![3]);
        unsafe { list.clear(&*upstream) };
    }
}
