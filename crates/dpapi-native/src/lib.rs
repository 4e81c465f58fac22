// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! # dpapi_native
//!
//! The native call boundary of the DPAPI stack.
//!
//! ## Core Types
//!
//! - [`DataBlob`]: `#[repr(C)]` length + pointer pair, layout-compatible with
//!   `CRYPT_INTEGER_BLOB`
//! - [`NativeApi`]: the four native primitives (protect, unprotect, last error,
//!   free) plus the platform probe
//! - [`SystemApi`]: `NativeApi` over `Crypt32`/`Kernel32` via the `windows` crate
//!
//! With the `test-utils` feature, [`test_utils::MockNativeApi`] provides a
//! software stand-in for the OS facility so the call path can be exercised on
//! every platform.

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
mod tests;

mod blob;
mod error;
mod support;
mod system;
mod traits;

pub mod codes;

pub use blob::DataBlob;
pub use error::InitError;
pub use system::{SystemApi, is_platform_supported};
pub use traits::NativeApi;

#[cfg(any(test, feature = "test-utils"))]
pub use support::test_utils;
