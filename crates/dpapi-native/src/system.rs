// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! `NativeApi` backed by the operating system.

use core::ffi::CStr;

use crate::blob::DataBlob;
use crate::error::InitError;
use crate::traits::NativeApi;

/// Exports of `crypt32.dll` the binding needs.
pub(crate) const REQUIRED_EXPORTS: [&CStr; 2] = [c"CryptProtectData", c"CryptUnprotectData"];

/// Returns true on the Windows family, the only place the facility exists.
#[inline]
pub fn is_platform_supported() -> bool {
    cfg!(windows)
}

/// Recovers the Win32 error code packed into an HRESULT by
/// `HRESULT_FROM_WIN32`. Any other HRESULT is returned unchanged.
#[cfg_attr(not(windows), allow(dead_code))]
pub(crate) fn last_error_from_hresult(hresult: i32) -> i32 {
    let raw = hresult as u32;
    let code = raw & 0xFFFF;

    if raw & 0xFFFF_0000 == 0x8007_0000 && code != 0 {
        code as i32
    } else {
        hresult
    }
}

/// The OS implementation of [`NativeApi`] (`Crypt32` + `Kernel32`).
///
/// Only obtainable through [`SystemApi::load`], which fails off Windows.
///
/// A description handed to protect must not contain NUL characters: the OS
/// reads it as a NUL-terminated string, so the call fails with
/// `ERROR_INVALID_PARAMETER` instead of storing a truncated description.
#[derive(Debug, Clone, Copy)]
pub struct SystemApi {
    _private: (),
}

impl SystemApi {
    /// Binds to the OS facility.
    ///
    /// `crypt32.dll` is loaded and checked for `CryptProtectData` and
    /// `CryptUnprotectData` before a binding is handed out.
    ///
    /// # Errors
    ///
    /// - [`InitError::UnsupportedPlatform`] when not running on Windows
    /// - [`InitError::BindingUnavailable`] when `crypt32.dll` cannot be loaded
    ///   or lacks one of the exports
    pub fn load() -> Result<Self, InitError> {
        if !is_platform_supported() {
            return Err(InitError::UnsupportedPlatform);
        }

        Self::bind(imp::has_export)
    }

    pub(crate) fn bind(has_export: impl Fn(&CStr) -> bool) -> Result<Self, InitError> {
        if !REQUIRED_EXPORTS.iter().all(|name| has_export(name)) {
            return Err(InitError::BindingUnavailable);
        }

        Ok(Self { _private: () })
    }
}

#[cfg(windows)]
mod imp {
    use core::ffi::CStr;

    use windows::Win32::Foundation::{
        FreeLibrary, GetLastError, HLOCAL, LocalFree, SetLastError, WIN32_ERROR,
    };
    use windows::Win32::Security::Cryptography::{
        CRYPT_INTEGER_BLOB, CryptProtectData, CryptUnprotectData,
    };
    use windows::Win32::System::LibraryLoader::{GetProcAddress, LoadLibraryW};
    use windows::Win32::System::Memory::LocalSize;
    use windows::core::{PCSTR, PCWSTR, w};

    use crate::blob::DataBlob;
    use crate::codes::ERROR_INVALID_PARAMETER;

    use super::last_error_from_hresult;

    pub(super) fn has_export(name: &CStr) -> bool {
        let Ok(module) = (unsafe { LoadLibraryW(w!("crypt32.dll")) }) else {
            return false;
        };

        // Safety: `name` is NUL-terminated and `module` is loaded.
        let found = unsafe { GetProcAddress(module, PCSTR(name.as_ptr().cast())) }.is_some();
        let _ = unsafe { FreeLibrary(module) };

        found
    }

    fn to_crypt_blob(blob: &DataBlob) -> CRYPT_INTEGER_BLOB {
        CRYPT_INTEGER_BLOB {
            cbData: blob.cb_data,
            pbData: blob.pb_data,
        }
    }

    fn store_output(output: &CRYPT_INTEGER_BLOB, data_out: &mut DataBlob) {
        data_out.cb_data = output.cbData;
        data_out.pb_data = output.pbData;
    }

    fn fail(code: i32) -> bool {
        unsafe { SetLastError(WIN32_ERROR(code as u32)) };
        false
    }

    /// Turns the call result into the success flag. On failure the code
    /// carried by the error becomes the thread's last error.
    fn finish(result: windows::core::Result<()>) -> bool {
        match result {
            Ok(()) => true,
            Err(err) => fail(last_error_from_hresult(err.code().0)),
        }
    }

    pub(super) fn protect(
        data_in: &DataBlob,
        description: Option<&str>,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool {
        if description.is_some_and(|d| d.contains('\0')) {
            return fail(ERROR_INVALID_PARAMETER);
        }

        let input = to_crypt_blob(data_in);
        let entropy = entropy.map(to_crypt_blob);
        let wide: Option<Vec<u16>> =
            description.map(|d| d.encode_utf16().chain(core::iter::once(0)).collect());
        let description = wide
            .as_ref()
            .map_or(PCWSTR::null(), |w| PCWSTR(w.as_ptr()));
        let mut output = CRYPT_INTEGER_BLOB::default();

        // Safety: every blob points to memory that outlives the call, and the
        // description is NUL-terminated.
        let result = unsafe {
            CryptProtectData(
                &input,
                description,
                entropy.as_ref().map(|e| e as *const CRYPT_INTEGER_BLOB),
                None,
                None,
                flags,
                &mut output,
            )
        };

        store_output(&output, data_out);
        drop(wide);
        finish(result)
    }

    pub(super) fn unprotect(
        data_in: &DataBlob,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool {
        let input = to_crypt_blob(data_in);
        let entropy = entropy.map(to_crypt_blob);
        let mut output = CRYPT_INTEGER_BLOB::default();

        // Safety: see `protect`.
        let result = unsafe {
            CryptUnprotectData(
                &input,
                None,
                entropy.as_ref().map(|e| e as *const CRYPT_INTEGER_BLOB),
                None,
                None,
                flags,
                &mut output,
            )
        };

        store_output(&output, data_out);
        finish(result)
    }

    pub(super) fn last_error() -> i32 {
        unsafe { GetLastError() }.0 as i32
    }

    /// # Safety
    ///
    /// `ptr` must come from `CryptProtectData`/`CryptUnprotectData`.
    pub(super) unsafe fn allocation_size(ptr: *mut u8) -> usize {
        unsafe { LocalSize(HLOCAL(ptr as *mut core::ffi::c_void)) }
    }

    /// # Safety
    ///
    /// `ptr` must come from `CryptProtectData`/`CryptUnprotectData`.
    pub(super) unsafe fn free(ptr: *mut u8) -> bool {
        // LocalFree returns NULL on success.
        let remaining = unsafe { LocalFree(HLOCAL(ptr as *mut core::ffi::c_void)) };
        remaining.0.is_null()
    }
}

#[cfg(not(windows))]
mod imp {
    use core::ffi::CStr;

    use crate::blob::DataBlob;
    use crate::codes::ERROR_NOT_SUPPORTED;

    pub(super) fn has_export(_name: &CStr) -> bool {
        false
    }

    pub(super) fn protect(
        _data_in: &DataBlob,
        _description: Option<&str>,
        _entropy: Option<&DataBlob>,
        _flags: u32,
        _data_out: &mut DataBlob,
    ) -> bool {
        false
    }

    pub(super) fn unprotect(
        _data_in: &DataBlob,
        _entropy: Option<&DataBlob>,
        _flags: u32,
        _data_out: &mut DataBlob,
    ) -> bool {
        false
    }

    pub(super) fn last_error() -> i32 {
        ERROR_NOT_SUPPORTED
    }

    pub(super) unsafe fn allocation_size(_ptr: *mut u8) -> usize {
        0
    }

    pub(super) unsafe fn free(_ptr: *mut u8) -> bool {
        false
    }
}

impl NativeApi for SystemApi {
    fn protect(
        &self,
        data_in: &DataBlob,
        description: Option<&str>,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool {
        imp::protect(data_in, description, entropy, flags, data_out)
    }

    fn unprotect(
        &self,
        data_in: &DataBlob,
        entropy: Option<&DataBlob>,
        flags: u32,
        data_out: &mut DataBlob,
    ) -> bool {
        imp::unprotect(data_in, entropy, flags, data_out)
    }

    fn last_error(&self) -> i32 {
        imp::last_error()
    }

    unsafe fn allocation_size(&self, ptr: *mut u8) -> usize {
        // Safety: forwarded from the caller.
        unsafe { imp::allocation_size(ptr) }
    }

    unsafe fn free(&self, ptr: *mut u8) -> bool {
        // Safety: forwarded from the caller.
        unsafe { imp::free(ptr) }
    }
}
