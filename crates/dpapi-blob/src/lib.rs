// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Blob marshaling for the DPAPI call path.
//!
//! Two owners, two release paths:
//!
//! - [`InputBlob`]: a core-owned copy of a caller buffer (data or entropy).
//!   Zeroed and released by `Drop`.
//! - [`OutputBlob`]: the buffer the native facility allocates for the result.
//!   Zeroed, then handed back through [`NativeApi::free`](dpapi_native::NativeApi::free)
//!   by [`OutputBlob::zero_and_release`], or by `Drop` as a fallback.
//!
//! Either way, no buffer that held plaintext or ciphertext is released
//! before it is overwritten with zeros.

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
mod tests;

mod error;
mod input;
mod output;

pub use error::BlobError;
pub use input::InputBlob;
pub use output::OutputBlob;
