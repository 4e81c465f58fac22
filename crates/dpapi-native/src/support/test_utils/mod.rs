// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test doubles for [`NativeApi`](crate::NativeApi).

mod mock_native_api;

pub use mock_native_api::{InputObserver, MockBehaviour, MockNativeApi, SLACK_FILL};
