// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use crate::InitError;
use crate::system::{REQUIRED_EXPORTS, SystemApi, last_error_from_hresult};

#[test]
fn test_bind_requires_every_export() {
    assert!(SystemApi::bind(|_| true).is_ok());
    assert_eq!(
        SystemApi::bind(|_| false).unwrap_err(),
        InitError::BindingUnavailable
    );

    for missing in REQUIRED_EXPORTS {
        assert_eq!(
            SystemApi::bind(|name| name != missing).unwrap_err(),
            InitError::BindingUnavailable
        );
    }
}

#[test]
fn test_last_error_from_win32_hresult() {
    // HRESULT_FROM_WIN32(ERROR_INVALID_DATA)
    assert_eq!(last_error_from_hresult(0x8007_000Du32 as i32), 13);
    assert_eq!(last_error_from_hresult(0x8007_0057u32 as i32), 87);
}

#[test]
fn test_last_error_from_other_hresult_passes_through() {
    // NTE_BAD_DATA (FACILITY_SECURITY)
    assert_eq!(
        last_error_from_hresult(0x8009_0005u32 as i32),
        0x8009_0005u32 as i32
    );
    assert_eq!(
        last_error_from_hresult(0x8007_0000u32 as i32),
        0x8007_0000u32 as i32
    );
    assert_eq!(last_error_from_hresult(-1), -1);
}

#[cfg(not(windows))]
#[test]
fn test_system_api_load_fails_off_windows() {
    use crate::is_platform_supported;

    assert!(!is_platform_supported());
    assert_eq!(SystemApi::load().unwrap_err(), InitError::UnsupportedPlatform);
}

#[cfg(windows)]
#[test]
fn test_system_api_roundtrip() {
    use crate::{DataBlob, NativeApi, is_platform_supported};

    assert!(is_platform_supported());
    let api = SystemApi::load().expect("Failed to load()");
    assert!(api.is_supported());

    let mut plaintext = *b"FooBar";
    let input = DataBlob {
        cb_data: plaintext.len() as u32,
        pb_data: plaintext.as_mut_ptr(),
    };
    let mut sealed = DataBlob::empty();
    assert!(api.protect(&input, Some("test"), None, 0x1, &mut sealed));
    assert!(!sealed.is_null());
    assert!(unsafe { api.allocation_size(sealed.pb_data) } >= sealed.len());

    let mut recovered = DataBlob::empty();
    assert!(api.unprotect(&sealed, None, 0x1, &mut recovered));
    let bytes = unsafe { core::slice::from_raw_parts(recovered.pb_data, recovered.len()) };
    assert_eq!(bytes, b"FooBar");

    unsafe {
        assert!(api.free(sealed.pb_data));
        assert!(api.free(recovered.pb_data));
    }
}

#[cfg(windows)]
#[test]
fn test_system_api_reports_invalid_data() {
    use crate::codes::ERROR_INVALID_DATA;
    use crate::{DataBlob, NativeApi};

    let api = SystemApi::load().expect("Failed to load()");
    let mut garbage = *b"not a protected blob";
    let input = DataBlob {
        cb_data: garbage.len() as u32,
        pb_data: garbage.as_mut_ptr(),
    };
    let mut out = DataBlob::empty();

    assert!(!api.unprotect(&input, None, 0x1, &mut out));
    assert_eq!(api.last_error(), ERROR_INVALID_DATA);
}

#[cfg(windows)]
#[test]
fn test_system_api_rejects_interior_nul_description() {
    use crate::codes::ERROR_INVALID_PARAMETER;
    use crate::{DataBlob, NativeApi};

    let api = SystemApi::load().expect("Failed to load()");
    let mut plaintext = *b"FooBar";
    let input = DataBlob {
        cb_data: plaintext.len() as u32,
        pb_data: plaintext.as_mut_ptr(),
    };
    let mut out = DataBlob::empty();

    assert!(!api.protect(&input, Some("a\0b"), None, 0x1, &mut out));
    assert!(out.is_null());
    assert_eq!(api.last_error(), ERROR_INVALID_PARAMETER);
}
