// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Instrumented global allocator that inspects watched blocks on release.
//!
//! Install it in an integration test binary:
//!
//! ```rust,ignore
//! use dpapi_test_utils::ZeroCheckingAllocator;
//!
//! #[global_allocator]
//! static ALLOCATOR: ZeroCheckingAllocator = ZeroCheckingAllocator::new();
//! ```
//!
//! Blocks are watched either by address ([`ZeroCheckingAllocator::watch_address`])
//! or by exact size ([`ZeroCheckingAllocator::watch_size`]). When a watched
//! block is released, its full layout is checked for non-zero bytes before it
//! goes back to the system allocator.
//!
//! State is process-wide: tests using it must be serialized.

use std::alloc::{GlobalAlloc, Layout, System};
use std::sync::atomic::{AtomicUsize, Ordering};

use dpapi_util::is_slice_zeroized;

const SLOTS: usize = 64;
const FREE_SLOT: usize = 0;

static WATCHED_ADDRESSES: [AtomicUsize; SLOTS] = [const { AtomicUsize::new(FREE_SLOT) }; SLOTS];
static WATCHED_SIZE: AtomicUsize = AtomicUsize::new(0);
static CHECKED: AtomicUsize = AtomicUsize::new(0);
static DIRTY: AtomicUsize = AtomicUsize::new(0);

/// `GlobalAlloc` over [`System`] that counts watched blocks released dirty.
#[derive(Debug, Default)]
pub struct ZeroCheckingAllocator;

impl ZeroCheckingAllocator {
    /// Creates the allocator (usable in a `static`).
    pub const fn new() -> Self {
        Self
    }

    /// Watches the block starting at `ptr` until it is released.
    ///
    /// Returns false for a null pointer or when every slot is taken.
    pub fn watch_address(ptr: *const u8) -> bool {
        if ptr.is_null() {
            return false;
        }

        WATCHED_ADDRESSES.iter().any(|slot| {
            slot.compare_exchange(FREE_SLOT, ptr as usize, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        })
    }

    /// Watches every block of exactly `size` bytes (0 disables).
    pub fn watch_size(size: usize) {
        WATCHED_SIZE.store(size, Ordering::SeqCst);
    }

    /// Clears every watch and counter.
    pub fn reset() {
        for slot in &WATCHED_ADDRESSES {
            slot.store(FREE_SLOT, Ordering::SeqCst);
        }
        WATCHED_SIZE.store(0, Ordering::SeqCst);
        CHECKED.store(0, Ordering::SeqCst);
        DIRTY.store(0, Ordering::SeqCst);
    }

    /// Watched blocks released so far.
    pub fn checked() -> usize {
        CHECKED.load(Ordering::SeqCst)
    }

    /// Watched blocks released with at least one non-zero byte.
    pub fn dirty() -> usize {
        DIRTY.load(Ordering::SeqCst)
    }

    /// Watched addresses not released yet.
    pub fn pending() -> usize {
        WATCHED_ADDRESSES
            .iter()
            .filter(|slot| slot.load(Ordering::SeqCst) != FREE_SLOT)
            .count()
    }

    fn take_watch(ptr: *mut u8, size: usize) -> bool {
        let by_address = WATCHED_ADDRESSES.iter().any(|slot| {
            slot.compare_exchange(ptr as usize, FREE_SLOT, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
        });

        by_address || (size != 0 && WATCHED_SIZE.load(Ordering::SeqCst) == size)
    }
}

unsafe impl GlobalAlloc for ZeroCheckingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        if Self::take_watch(ptr, layout.size()) {
            // Safety: the block is still live and spans `layout.size()` bytes.
            let bytes = unsafe { core::slice::from_raw_parts(ptr, layout.size()) };

            CHECKED.fetch_add(1, Ordering::SeqCst);
            if !is_slice_zeroized(bytes) {
                DIRTY.fetch_add(1, Ordering::SeqCst);
            }
        }

        unsafe { System.dealloc(ptr, layout) }
    }
}
