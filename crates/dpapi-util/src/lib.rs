// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Zeroization helpers shared by the DPAPI crates.
//!
//! Every buffer that crosses the native boundary (input, entropy, and the
//! buffer allocated by the OS for the result) is wiped with these functions
//! before it is released.

#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

extern crate alloc;

use alloc::vec::Vec;

/// Returns `true` if every byte of the slice is zero.
///
/// # Example
///
/// ```
/// use dpapi_util::is_slice_zeroized;
///
/// assert!(is_slice_zeroized(&[0u8; 4]));
/// assert!(!is_slice_zeroized(&[0u8, 0, 7]));
/// ```
#[inline(always)]
pub fn is_slice_zeroized(slice: &[u8]) -> bool {
    slice.iter().all(|&b| b == 0)
}

/// Returns `true` if the whole allocation of `vec` (up to its capacity) is zero.
///
/// Bytes left behind in spare capacity by `truncate()` count as non-zero.
#[inline(never)]
pub fn is_vec_fully_zeroized(vec: &Vec<u8>) -> bool {
    let base = vec.as_ptr();

    // Vec guarantees `capacity` bytes are allocated behind `base`.
    (0..vec.capacity()).all(|i| unsafe { *base.add(i) == 0 })
}

/// Zeroes a slice with `write_bytes` followed by a volatile read so the
/// store cannot be elided.
///
/// ```
/// use dpapi_util::fast_zeroize_slice;
///
/// let mut data = vec![0xAAu8; 16];
/// fast_zeroize_slice(&mut data);
/// assert!(data.iter().all(|&b| b == 0));
/// ```
#[inline(always)]
pub fn fast_zeroize_slice<T>(slice: &mut [T]) {
    if slice.is_empty() {
        return;
    }

    let byte_len = core::mem::size_of_val(slice);

    // Safety: the slice is valid for `byte_len` bytes of writes.
    unsafe { fast_zeroize_raw(slice.as_mut_ptr() as *mut u8, byte_len) }
}

/// Zeroes the entire allocation of a `Vec`, spare capacity included.
#[inline(always)]
pub fn fast_zeroize_vec<T>(vec: &mut Vec<T>) {
    let byte_len = vec.capacity() * core::mem::size_of::<T>();

    // Safety: the allocation behind `as_mut_ptr()` spans `capacity` elements.
    unsafe { fast_zeroize_raw(vec.as_mut_ptr() as *mut u8, byte_len) }
}

/// Zeroes `len` bytes starting at `ptr`.
///
/// A null `ptr` or a zero `len` is a no-op.
///
/// # Safety
///
/// When `ptr` is non-null it must be valid for `len` bytes of writes.
/// Used for buffers owned by the native allocator, which are only reachable
/// through a raw pointer.
#[inline(always)]
pub unsafe fn fast_zeroize_raw(ptr: *mut u8, len: usize) {
    if ptr.is_null() || len == 0 {
        return;
    }

    unsafe {
        core::ptr::write_bytes(ptr, 0, len);
        // Volatile read prevents the optimizer from removing the write_bytes
        core::ptr::read_volatile(ptr);
    }
}
