// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Raw values shared with the OS headers (`dpapi.h`, `winerror.h`).

/// `CRYPTPROTECT_UI_FORBIDDEN`
pub const CRYPTPROTECT_UI_FORBIDDEN: u32 = 0x1;
/// `CRYPTPROTECT_LOCAL_MACHINE`
pub const CRYPTPROTECT_LOCAL_MACHINE: u32 = 0x4;
/// `CRYPTPROTECT_CRED_SYNC`
pub const CRYPTPROTECT_CRED_SYNC: u32 = 0x8;
/// `CRYPTPROTECT_AUDIT`
pub const CRYPTPROTECT_AUDIT: u32 = 0x10;
/// `CRYPTPROTECT_NO_RECOVERY`
pub const CRYPTPROTECT_NO_RECOVERY: u32 = 0x20;
/// `CRYPTPROTECT_VERIFY_PROTECTION`
pub const CRYPTPROTECT_VERIFY_PROTECTION: u32 = 0x40;
/// `CRYPTPROTECT_CRED_REGENERATE`
pub const CRYPTPROTECT_CRED_REGENERATE: u32 = 0x80;

/// `ERROR_INVALID_HANDLE`
pub const ERROR_INVALID_HANDLE: i32 = 6;
/// `ERROR_INVALID_DATA`: corrupted blob, wrong entropy, wrong user or machine.
pub const ERROR_INVALID_DATA: i32 = 13;
/// `ERROR_NOT_SUPPORTED`
pub const ERROR_NOT_SUPPORTED: i32 = 50;
/// `ERROR_INVALID_PARAMETER`
pub const ERROR_INVALID_PARAMETER: i32 = 87;
