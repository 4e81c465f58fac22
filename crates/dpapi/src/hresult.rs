// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Win32 error code to HRESULT translation (`HRESULT_FROM_WIN32`).

/// `FACILITY_WIN32`
pub const FACILITY_WIN32: i32 = 7;

/// `HRESULT_FROM_WIN32(ERROR_INVALID_DATA)`: reported for corrupted data,
/// mismatched entropy and foreign user or machine.
pub const HRESULT_INVALID_DATA: i32 = 0x8007_000Du32 as i32;

/// Translates a raw last-error code into an HRESULT.
///
/// Non-positive codes already are HRESULTs and pass through unchanged.
/// Otherwise the low 16 bits are combined with [`FACILITY_WIN32`] and the
/// severity bit.
///
/// ```
/// use dpapi::{HRESULT_INVALID_DATA, hresult_from_win32};
///
/// assert_eq!(hresult_from_win32(13), HRESULT_INVALID_DATA);
/// assert_eq!(hresult_from_win32(0), 0);
/// ```
pub const fn hresult_from_win32(code: i32) -> i32 {
    if code <= 0 {
        return code;
    }

    ((code as u32 & 0xFFFF) | ((FACILITY_WIN32 as u32) << 16) | 0x8000_0000) as i32
}
