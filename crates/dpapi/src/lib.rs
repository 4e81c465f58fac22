// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! # dpapi
//!
//! Safe protect/unprotect over the Windows Data Protection API
//! (`CryptProtectData` / `CryptUnprotectData`).
//!
//! Every buffer a call touches is zeroed before it is released: the copies of
//! the caller's data and entropy, and the buffer the OS allocates for the
//! result. This holds on success and on every error path.
//!
//! ## Core Types
//!
//! - [`ProtectionSession`]: immutable, thread-safe protect/unprotect entry point
//! - [`CryptProtectFlag`] / [`FlagSet`]: `CRYPTPROTECT_*` flags and their union
//! - [`DpapiError`]: initialization, null argument, status-bearing
//!   ([`HResultError`]) and no-status failures
//! - [`hresult_from_win32`]: last-error to HRESULT translation
//!
//! ## Example
//!
//! ```rust,no_run
//! use dpapi::{CryptProtectFlag, DpapiError, ProtectionSession};
//!
//! fn main() -> Result<(), DpapiError> {
//!     let session = ProtectionSession::new(&[CryptProtectFlag::UiForbidden])?;
//!
//!     let protected = session.protect(Some(b"secret".as_slice()), Some(b"pepper".as_slice()), Some("demo"))?;
//!     let plaintext = session.unprotect(Some(protected.as_slice()), Some(b"pepper".as_slice()))?;
//!     assert_eq!(plaintext, b"secret");
//!
//!     match session.unprotect_data(&protected) {
//!         Err(err) => assert_eq!(err.hresult(), Some(dpapi::HRESULT_INVALID_DATA)),
//!         Ok(_) => unreachable!("entropy is required"),
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! Off Windows [`ProtectionSession::new`] fails with
//! [`DpapiError::InitializationFailed`]. With the `test-utils` feature,
//! [`test_utils::MockNativeApi`] can be plugged in through
//! [`ProtectionSession::with_api`] on any platform.
//!
//! ## License
//!
//! GPL-3.0-only

#![warn(missing_docs)]
#![warn(unsafe_op_in_unsafe_fn)]

#[cfg(test)]
mod tests;

mod error;
mod flags;
mod hresult;
mod session;

pub use error::{CallFailure, DpapiError, HResultError, InitError};
pub use flags::{CryptProtectFlag, FlagSet, UnknownFlagError};
pub use hresult::{FACILITY_WIN32, HRESULT_INVALID_DATA, hresult_from_win32};
pub use session::{FREE_OPERATION, PROTECT_OPERATION, ProtectionSession, UNPROTECT_OPERATION};

pub use dpapi_native::{NativeApi, SystemApi, is_platform_supported};

#[cfg(feature = "test-utils")]
pub use dpapi_native::test_utils;
