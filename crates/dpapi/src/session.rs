// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use std::panic::{self, AssertUnwindSafe};

use dpapi_blob::{BlobError, InputBlob, OutputBlob};
use dpapi_native::{DataBlob, InitError, NativeApi, SystemApi, is_platform_supported};
use dpapi_util::fast_zeroize_vec;

use crate::error::{CallFailure, DpapiError, HResultError};
use crate::flags::{CryptProtectFlag, FlagSet};

/// Operation name reported for protect failures.
pub const PROTECT_OPERATION: &str = "Crypt32.CryptProtectData";
/// Operation name reported for unprotect failures.
pub const UNPROTECT_OPERATION: &str = "Crypt32.CryptUnprotectData";
/// Operation name reported when releasing the native output buffer fails.
pub const FREE_OPERATION: &str = "Kernel32.LocalFree";

#[derive(Clone, Copy)]
enum NativeCall<'a> {
    Protect { description: Option<&'a str> },
    Unprotect,
}

impl NativeCall<'_> {
    fn operation(self) -> &'static str {
        match self {
            Self::Protect { .. } => PROTECT_OPERATION,
            Self::Unprotect => UNPROTECT_OPERATION,
        }
    }
}

/// Protect/unprotect entry point bound to a fixed [`FlagSet`].
///
/// Immutable after construction. Every call allocates its own blobs and
/// zeroes all of them (input, entropy and the native output) before
/// returning, on success and on every error path.
///
/// # Example
///
/// ```rust,no_run
/// use dpapi::{CryptProtectFlag, ProtectionSession};
///
/// let session = ProtectionSession::new(&[CryptProtectFlag::UiForbidden])?;
/// let protected = session.protect_data(b"FooBar")?;
/// assert_eq!(session.unprotect_data(&protected)?, b"FooBar");
/// # Ok::<(), dpapi::DpapiError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ProtectionSession<A: NativeApi = SystemApi> {
    api: A,
    flags: FlagSet,
}

impl ProtectionSession<SystemApi> {
    /// Creates a session over the OS facility with the union of `flags`.
    ///
    /// # Errors
    ///
    /// [`DpapiError::InitializationFailed`] off Windows or when the native
    /// binding cannot be loaded.
    pub fn new(flags: &[CryptProtectFlag]) -> Result<Self, DpapiError> {
        if !is_platform_supported() {
            return Err(InitError::UnsupportedPlatform.into());
        }

        let api = SystemApi::load()?;
        Self::with_api(api, FlagSet::from_flags(flags))
    }
}

impl<A: NativeApi> ProtectionSession<A> {
    /// Creates a session over a custom adapter.
    ///
    /// # Errors
    ///
    /// [`DpapiError::InitializationFailed`] if the adapter reports the
    /// facility as unsupported.
    pub fn with_api(api: A, flags: FlagSet) -> Result<Self, DpapiError> {
        if !api.is_supported() {
            return Err(InitError::UnsupportedPlatform.into());
        }

        tracing::debug!(flags = flags.bits(), "protection session ready");
        Ok(Self { api, flags })
    }

    /// Flags applied to every call.
    pub fn flags(&self) -> FlagSet {
        self.flags
    }

    /// The underlying adapter.
    pub fn native(&self) -> &A {
        &self.api
    }

    /// Protects `data`, optionally mixing in `entropy` and embedding
    /// `description`.
    ///
    /// # Errors
    ///
    /// - [`DpapiError::NullArgument`] if `data` is `None` (no native call is made)
    /// - [`DpapiError::CallFailed`] with [`CallFailure::InvalidDescription`] if
    ///   `description` contains a NUL character (no native call is made)
    /// - [`DpapiError::NativeCallFailed`] with the HRESULT of the failure
    /// - [`DpapiError::CallFailed`] if the call could not be completed
    pub fn protect(
        &self,
        data: Option<&[u8]>,
        entropy: Option<&[u8]>,
        description: Option<&str>,
    ) -> Result<Vec<u8>, DpapiError> {
        let data = data.ok_or(DpapiError::NullArgument("data"))?;
        self.call(NativeCall::Protect { description }, data, entropy)
    }

    /// Recovers the plaintext of `data`. `entropy` must match the one given
    /// to protect byte for byte (absent if none was given).
    ///
    /// # Errors
    ///
    /// Same as [`protect`](Self::protect). Corrupted input and mismatched
    /// entropy are reported by the OS as
    /// [`HRESULT_INVALID_DATA`](crate::HRESULT_INVALID_DATA).
    pub fn unprotect(
        &self,
        data: Option<&[u8]>,
        entropy: Option<&[u8]>,
    ) -> Result<Vec<u8>, DpapiError> {
        let data = data.ok_or(DpapiError::NullArgument("data"))?;
        self.call(NativeCall::Unprotect, data, entropy)
    }

    /// Protects `data` without entropy or description.
    pub fn protect_data(&self, data: &[u8]) -> Result<Vec<u8>, DpapiError> {
        self.protect(Some(data), None, None)
    }

    /// Protects `data` bound to `entropy`.
    pub fn protect_data_with_entropy(
        &self,
        data: &[u8],
        entropy: &[u8],
    ) -> Result<Vec<u8>, DpapiError> {
        self.protect(Some(data), Some(entropy), None)
    }

    /// Unprotects data that was protected without entropy.
    pub fn unprotect_data(&self, data: &[u8]) -> Result<Vec<u8>, DpapiError> {
        self.unprotect(Some(data), None)
    }

    /// Unprotects data that was protected with `entropy`.
    pub fn unprotect_data_with_entropy(
        &self,
        data: &[u8],
        entropy: &[u8],
    ) -> Result<Vec<u8>, DpapiError> {
        self.unprotect(Some(data), Some(entropy))
    }

    fn call(
        &self,
        call: NativeCall<'_>,
        data: &[u8],
        entropy: Option<&[u8]>,
    ) -> Result<Vec<u8>, DpapiError> {
        let operation = call.operation();
        if let NativeCall::Protect { description: Some(description) } = call {
            if description.contains('\0') {
                return Err(DpapiError::call_failed(operation, CallFailure::InvalidDescription));
            }
        }

        let too_large = |_: BlobError| DpapiError::call_failed(operation, CallFailure::InputTooLarge);

        let mut data_blob = InputBlob::wrap(data).map_err(too_large)?;
        let mut entropy_blob = entropy.map(InputBlob::wrap).transpose().map_err(too_large)?;
        let mut output = OutputBlob::new(&self.api);

        tracing::debug!(
            operation,
            flags = self.flags.bits(),
            len = data_blob.len(),
            entropy = entropy_blob.is_some(),
            description = matches!(call, NativeCall::Protect { description: Some(_) }),
            "invoking native call"
        );

        let data_in = data_blob.as_data_blob();
        let entropy_in = entropy_blob.as_mut().map(InputBlob::as_data_blob);
        let mut result = self
            .invoke(call, &data_in, entropy_in.as_ref(), output.as_data_blob_mut())
            .and_then(|()| extract(operation, &output));

        data_blob.zero_and_release();
        if let Some(entropy_blob) = entropy_blob {
            entropy_blob.zero_and_release();
        }

        if let Err(BlobError::FreeFailed { last_error }) = output.zero_and_release() {
            let free_error = HResultError::for_last_error(FREE_OPERATION, last_error);
            tracing::warn!(%free_error, "releasing native output failed");

            result = match result {
                Ok(mut bytes) => {
                    fast_zeroize_vec(&mut bytes);
                    Err(DpapiError::NativeCallFailed {
                        operation: FREE_OPERATION,
                        source: free_error,
                    })
                }
                Err(mut primary) => {
                    primary.suppress(free_error);
                    Err(primary)
                }
            };
        }

        result
    }

    /// Runs the native call and turns its boolean outcome into a result,
    /// reading the last error before anything else can overwrite it.
    fn invoke(
        &self,
        call: NativeCall<'_>,
        data_in: &DataBlob,
        entropy_in: Option<&DataBlob>,
        data_out: &mut DataBlob,
    ) -> Result<(), DpapiError> {
        let operation = call.operation();
        let flags = self.flags.bits();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| match call {
            NativeCall::Protect { description } => {
                self.api
                    .protect(data_in, description, entropy_in, flags, data_out)
            }
            NativeCall::Unprotect => self.api.unprotect(data_in, entropy_in, flags, data_out),
        }));

        match outcome {
            Ok(true) => Ok(()),
            Ok(false) => {
                let source = HResultError::for_last_error(operation, self.api.last_error());
                tracing::debug!(operation, hresult = source.hresult(), "native call failed");
                Err(DpapiError::NativeCallFailed { operation, source })
            }
            Err(_) => {
                tracing::debug!(operation, "native adapter panicked");
                Err(DpapiError::call_failed(operation, CallFailure::Panicked))
            }
        }
    }
}

/// Copies the native output out. A null buffer is an empty result only when
/// the reported length is zero as well.
fn extract<A: NativeApi + ?Sized>(
    operation: &'static str,
    output: &OutputBlob<'_, A>,
) -> Result<Vec<u8>, DpapiError> {
    match output.to_vec() {
        Some(bytes) => Ok(bytes),
        None if output.is_empty() => Ok(Vec::new()),
        None => Err(DpapiError::call_failed(operation, CallFailure::MissingOutput)),
    }
}
