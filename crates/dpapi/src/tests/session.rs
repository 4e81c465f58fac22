// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use dpapi_native::codes::{ERROR_INVALID_HANDLE, ERROR_NOT_SUPPORTED};
use dpapi_native::test_utils::{MockBehaviour, MockNativeApi};

use crate::error::{CallFailure, DpapiError, HResultError, InitError};
use crate::flags::{CryptProtectFlag, FlagSet};
use crate::hresult::{HRESULT_INVALID_DATA, hresult_from_win32};
use crate::session::{FREE_OPERATION, PROTECT_OPERATION, ProtectionSession, UNPROTECT_OPERATION};

fn session(behaviour: MockBehaviour) -> ProtectionSession<MockNativeApi> {
    ProtectionSession::with_api(
        MockNativeApi::new(behaviour),
        FlagSet::from(CryptProtectFlag::UiForbidden),
    )
    .expect("Failed to with_api(..)")
}

#[test]
fn test_with_api_rejects_unsupported_adapter() {
    let result = ProtectionSession::with_api(
        MockNativeApi::new(MockBehaviour::Unsupported),
        FlagSet::empty(),
    );

    assert!(matches!(
        result,
        Err(DpapiError::InitializationFailed(InitError::UnsupportedPlatform))
    ));
}

#[cfg(not(windows))]
#[test]
fn test_new_fails_off_windows() {
    let result = ProtectionSession::new(&[CryptProtectFlag::UiForbidden]);

    assert!(matches!(
        result,
        Err(DpapiError::InitializationFailed(InitError::UnsupportedPlatform))
    ));
}

#[test]
fn test_flags_reach_native_call() {
    let flags = CryptProtectFlag::LocalMachine | CryptProtectFlag::Audit;
    let session = ProtectionSession::with_api(MockNativeApi::new(MockBehaviour::None), flags)
        .expect("Failed to with_api(..)");

    let protected = session.protect_data(b"data").expect("Failed to protect_data(..)");
    assert_eq!(session.native().last_flags(), 0x14);

    session
        .unprotect_data(&protected)
        .expect("Failed to unprotect_data(..)");
    assert_eq!(session.native().last_flags(), 0x14);
    assert_eq!(session.flags(), flags);
}

#[test]
fn test_foobar_roundtrip_and_corruption() {
    let session = session(MockBehaviour::None);

    let mut protected = session.protect_data(b"FooBar").expect("Failed to protect_data(..)");
    let plaintext = session
        .unprotect_data(&protected)
        .expect("Failed to unprotect_data(..)");
    assert_eq!(plaintext, b"FooBar");

    protected[2] ^= 0xFF;
    let err = session
        .unprotect_data(&protected)
        .expect_err("Corrupted data must not unprotect");

    assert!(err.is_status_bearing());
    assert_eq!(err.hresult(), Some(HRESULT_INVALID_DATA));
    assert!(matches!(
        err,
        DpapiError::NativeCallFailed { operation: UNPROTECT_OPERATION, .. }
    ));
    assert_eq!(session.native().live_allocations(), 0);
}

#[test]
fn test_description_is_passed_through() {
    let session = session(MockBehaviour::None);

    let with = session
        .protect(Some(b"data".as_slice()), None, Some("label"))
        .expect("Failed to protect(..)");
    let without = session.protect_data(b"data").expect("Failed to protect_data(..)");

    assert_eq!(with.len(), without.len() + "label".len());
    assert_eq!(
        session.unprotect_data(&with).expect("Failed to unprotect_data(..)"),
        b"data"
    );
}

#[test]
fn test_null_data_is_rejected_before_native_call() {
    let session = session(MockBehaviour::None);

    assert_eq!(
        session.protect(None, Some(b"entropy".as_slice()), Some("label")),
        Err(DpapiError::NullArgument("data"))
    );
    assert_eq!(
        session.unprotect(None, None),
        Err(DpapiError::NullArgument("data"))
    );
    assert_eq!(session.native().native_calls(), 0);
}

#[test]
fn test_protect_failure_is_translated() {
    let session = session(MockBehaviour::FailProtect(ERROR_NOT_SUPPORTED));

    let err = session
        .protect_data(b"data")
        .expect_err("Protect must fail");

    assert_eq!(
        err,
        DpapiError::NativeCallFailed {
            operation: PROTECT_OPERATION,
            source: HResultError::for_last_error(PROTECT_OPERATION, ERROR_NOT_SUPPORTED),
        }
    );
    assert_eq!(err.hresult(), Some(hresult_from_win32(ERROR_NOT_SUPPORTED)));
    assert_eq!(session.native().live_allocations(), 0);
}

#[test]
fn test_unprotect_failure_is_translated() {
    let session = session(MockBehaviour::FailUnprotect(-42));

    let err = session
        .unprotect_data(b"data")
        .expect_err("Unprotect must fail");

    // Already an HRESULT.
    assert_eq!(err.hresult(), Some(-42));
    assert!(matches!(
        err,
        DpapiError::NativeCallFailed { operation: UNPROTECT_OPERATION, .. }
    ));
}

#[test]
fn test_adapter_panic_is_contained() {
    let session = session(MockBehaviour::Panic);

    let err = session
        .protect_data(b"data")
        .expect_err("Protect must fail");

    assert_eq!(
        err,
        DpapiError::call_failed(PROTECT_OPERATION, CallFailure::Panicked)
    );
    assert!(!err.is_status_bearing());
}

#[test]
fn test_null_output_with_length_is_rejected() {
    let session = session(MockBehaviour::NullOutput);

    let err = session
        .unprotect_data(b"data")
        .expect_err("Unprotect must fail");

    assert_eq!(
        err,
        DpapiError::call_failed(UNPROTECT_OPERATION, CallFailure::MissingOutput)
    );
}

#[test]
fn test_free_failure_after_success_becomes_the_error() {
    let session = session(MockBehaviour::FailFree(ERROR_INVALID_HANDLE));

    let err = session
        .protect_data(b"data")
        .expect_err("Free failure must surface");

    assert_eq!(
        err,
        DpapiError::NativeCallFailed {
            operation: FREE_OPERATION,
            source: HResultError::for_last_error(FREE_OPERATION, ERROR_INVALID_HANDLE),
        }
    );
    assert_eq!(session.native().live_allocations(), 0);
    assert_eq!(session.native().dirty_frees(), 0);
}

#[test]
fn test_free_failure_is_suppressed_under_primary_error() {
    let session = session(MockBehaviour::FailWithOutput {
        call: ERROR_NOT_SUPPORTED,
        free: ERROR_INVALID_HANDLE,
    });

    let err = session
        .protect_data(b"data")
        .expect_err("Protect must fail");

    assert_eq!(err.hresult(), Some(hresult_from_win32(ERROR_NOT_SUPPORTED)));
    assert_eq!(
        err.suppressed(),
        [HResultError::for_last_error(FREE_OPERATION, ERROR_INVALID_HANDLE)]
    );
    assert_eq!(session.native().live_allocations(), 0);
    assert_eq!(session.native().dirty_frees(), 0);
}

#[test]
fn test_native_output_is_zeroed_before_free() {
    let session = session(MockBehaviour::None);

    for len in [0, 1, 7, 64, 4096] {
        let data = vec![0xA5; len];
        let protected = session.protect_data(&data).expect("Failed to protect_data(..)");
        let plaintext = session
            .unprotect_data(&protected)
            .expect("Failed to unprotect_data(..)");
        assert_eq!(plaintext, data);
    }

    assert_eq!(session.native().native_calls(), 10);
    assert_eq!(session.native().dirty_frees(), 0);
    assert_eq!(session.native().live_allocations(), 0);
}

#[test]
fn test_session_debug_does_not_leak() {
    let session = session(MockBehaviour::None);
    let _ = session.protect_data(b"SuperSecret").expect("Failed to protect_data(..)");

    let debug = format!("{session:?}");
    assert!(debug.contains("ProtectionSession"));
    assert!(!debug.contains("SuperSecret"));
}

#[test]
fn test_description_with_nul_is_rejected_before_native_call() {
    let session = session(MockBehaviour::None);

    let err = session
        .protect(Some(b"data".as_slice()), None, Some("a\0b"))
        .expect_err("Description must be rejected");

    assert_eq!(
        err,
        DpapiError::call_failed(PROTECT_OPERATION, CallFailure::InvalidDescription)
    );
    assert!(!err.is_status_bearing());
    assert_eq!(session.native().native_calls(), 0);
}

#[test]
fn test_native_allocation_slack_is_zeroed() {
    let session = session(MockBehaviour::OverAllocate(10));

    let protected = session.protect_data(b"FooBar").expect("Failed to protect_data(..)");
    let plaintext = session
        .unprotect_data(&protected)
        .expect("Failed to unprotect_data(..)");

    assert_eq!(plaintext, b"FooBar");
    assert_eq!(session.native().native_calls(), 2);
    assert_eq!(session.native().dirty_frees(), 0);
    assert_eq!(session.native().live_allocations(), 0);
}
