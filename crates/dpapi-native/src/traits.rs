// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use crate::blob::DataBlob;

/// The native primitives a protection session is built on.
///
/// Mirrors the OS contract: the protect/unprotect calls report a bare
/// success flag, and the reason for a failure has to be fetched separately
/// with [`NativeApi::last_error`] before anything else touches it. On success
/// `data_out` points to a buffer owned by the native allocator, which must be
/// handed back through [`NativeApi::free`].
///
/// Implementations must be usable from several threads at once; the last
/// error is per-thread, as in the OS.
pub trait NativeApi: Send + Sync + core::fmt::Debug {
    /// Whether the facility exists on this platform.
    fn is_supported(&self) -> bool {
        crate::system::is_platform_supported()
    }

    /// `CryptProtectData`. Returns `true` on success.
    fn protect(
        &self,
        data_in: &DataBlob,
        description: Option<&str>,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool;

    /// `CryptUnprotectData` (the description out-parameter is not requested).
    /// Returns `true` on success.
    fn unprotect(
        &self,
        data_in: &DataBlob,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool;

    /// `GetLastError` for the calling thread.
    fn last_error(&self) -> i32;

    /// `LocalSize`: size of the native allocation behind `ptr`, which may
    /// exceed the `cb_data` reported for it. 0 if unknown.
    ///
    /// # Safety
    ///
    /// `ptr` must be a buffer returned in `data_out` by this implementation
    /// and not freed yet.
    unsafe fn allocation_size(&self, ptr: *mut u8) -> usize;

    /// `LocalFree`. Returns `true` on success.
    ///
    /// # Safety
    ///
    /// `ptr` must be a buffer returned in `data_out` by this implementation
    /// and not freed yet.
    unsafe fn free(&self, ptr: *mut u8) -> bool;
}
