// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use dpapi_native::NativeApi;
use dpapi_native::codes::ERROR_INVALID_HANDLE;
use dpapi_native::test_utils::{MockBehaviour, MockNativeApi, SLACK_FILL};

use crate::error::BlobError;
use crate::input::InputBlob;
use crate::output::OutputBlob;

fn populate<'a>(api: &'a MockNativeApi, data: &[u8]) -> OutputBlob<'a, MockNativeApi> {
    let mut input = InputBlob::wrap(data).expect("Failed to wrap(..)");
    let mut output = OutputBlob::new(api);

    assert!(api.protect(&input.as_data_blob(), None, None, 0, output.as_data_blob_mut()));
    output
}

#[test]
fn test_unpopulated_output() {
    let api = MockNativeApi::new(MockBehaviour::None);
    let output = OutputBlob::new(&api);

    assert!(!output.is_populated());
    assert!(output.is_empty());
    assert_eq!(output.to_vec(), None);
    assert_eq!(output.zero_and_release(), Ok(()));
    assert_eq!(api.live_allocations(), 0);
}

#[test]
fn test_populated_output_to_vec_and_release() {
    let api = MockNativeApi::new(MockBehaviour::None);
    let output = populate(&api, b"FooBar");

    assert!(output.is_populated());
    let bytes = output.to_vec().expect("Failed to to_vec()");
    assert_eq!(bytes.len(), output.len());

    assert_eq!(output.zero_and_release(), Ok(()));
    assert_eq!(api.live_allocations(), 0);
    assert_eq!(api.dirty_frees(), 0);
}

#[test]
fn test_output_released_on_drop() {
    let api = MockNativeApi::new(MockBehaviour::None);
    {
        let _output = populate(&api, b"FooBar");
        assert_eq!(api.live_allocations(), 1);
    }

    assert_eq!(api.live_allocations(), 0);
    assert_eq!(api.dirty_frees(), 0);
}

#[test]
fn test_output_free_failure_reports_last_error() {
    let api = MockNativeApi::new(MockBehaviour::FailFree(ERROR_INVALID_HANDLE));
    let output = populate(&api, b"FooBar");

    assert_eq!(
        output.zero_and_release(),
        Err(BlobError::FreeFailed {
            last_error: ERROR_INVALID_HANDLE
        })
    );
    // Zeroed before the (failed) free, and not freed twice on drop.
    assert_eq!(api.dirty_frees(), 0);
    assert_eq!(api.live_allocations(), 0);
}

#[test]
fn test_output_free_failure_on_drop_is_swallowed() {
    let api = MockNativeApi::new(MockBehaviour::FailFree(ERROR_INVALID_HANDLE));
    {
        let _output = populate(&api, b"FooBar");
    }

    assert_eq!(api.dirty_frees(), 0);
}

#[test]
fn test_output_debug_redacts() {
    let api = MockNativeApi::new(MockBehaviour::None);
    let output = populate(&api, b"FooBar");

    let rendered = format!("{output:?}");
    assert!(rendered.starts_with("OutputBlob {"));
    assert!(rendered.contains("populated: true"));
}

#[test]
fn test_output_slack_beyond_reported_length_is_zeroed() {
    let api = MockNativeApi::new(MockBehaviour::OverAllocate(10));
    let mut output = populate(&api, b"FooBar");

    let ptr = output.as_data_blob_mut().pb_data;
    let size = unsafe { api.allocation_size(ptr) };
    assert_eq!(size, output.len() + 10);

    let slack = unsafe { core::slice::from_raw_parts(ptr.add(output.len()), 10) };
    assert!(slack.iter().all(|&b| b == SLACK_FILL));

    assert_eq!(output.zero_and_release(), Ok(()));
    assert_eq!(api.dirty_frees(), 0);
    assert_eq!(api.live_allocations(), 0);
}

#[test]
fn test_output_slack_is_zeroed_on_drop() {
    let api = MockNativeApi::new(MockBehaviour::OverAllocate(4096));
    {
        let _output = populate(&api, b"FooBar");
    }

    assert_eq!(api.dirty_frees(), 0);
    assert_eq!(api.live_allocations(), 0);
}
