// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use thiserror::Error;

pub use dpapi_native::InitError;

use crate::hresult::hresult_from_win32;

/// A native failure that carries an HRESULT.
///
/// `suppressed` holds secondary failures (a failed release of the native
/// output buffer) that happened while this error was already pending.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{operation} HRESULT={hresult}")]
pub struct HResultError {
    operation: &'static str,
    hresult: i32,
    suppressed: Vec<HResultError>,
}

impl HResultError {
    /// Creates an error from an HRESULT.
    pub fn new(operation: &'static str, hresult: i32) -> Self {
        Self {
            operation,
            hresult,
            suppressed: Vec::new(),
        }
    }

    /// Creates an error from a raw last-error code, translated with
    /// [`hresult_from_win32`].
    pub fn for_last_error(operation: &'static str, last_error: i32) -> Self {
        Self::new(operation, hresult_from_win32(last_error))
    }

    /// Native operation that failed, e.g. `Crypt32.CryptUnprotectData`.
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// The translated status code.
    pub fn hresult(&self) -> i32 {
        self.hresult
    }

    /// Secondary failures attached to this one.
    pub fn suppressed(&self) -> &[HResultError] {
        &self.suppressed
    }

    /// Attaches a secondary failure.
    pub fn add_suppressed(&mut self, error: HResultError) {
        self.suppressed.push(error);
    }
}

/// Why a native call could not be completed (no status code available).
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum CallFailure {
    /// A buffer does not fit the 32-bit length of the native structure.
    #[error("buffer too large for a native blob")]
    InputTooLarge,
    /// The native adapter panicked.
    #[error("native adapter panicked")]
    Panicked,
    /// The description contains a NUL character, which the OS would read as
    /// the end of the string.
    #[error("description contains a NUL character")]
    InvalidDescription,
    /// The call succeeded but returned a null buffer with a non-zero length.
    #[error("native call returned no output buffer")]
    MissingOutput,
}

/// Errors returned by [`ProtectionSession`](crate::ProtectionSession).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DpapiError {
    /// The platform is unsupported or the native binding could not be loaded.
    #[error("DPAPI initialization failed: {0}")]
    InitializationFailed(#[from] InitError),

    /// A required buffer argument was absent.
    #[error("argument `{0}` must not be null")]
    NullArgument(&'static str),

    /// The native call failed and reported a status code.
    #[error("{operation} failed")]
    NativeCallFailed {
        /// Native operation that failed.
        operation: &'static str,
        /// Status-bearing cause.
        source: HResultError,
    },

    /// The native call could not be completed and no status code exists.
    #[error("{operation} could not be completed: {reason}")]
    CallFailed {
        /// Native operation that was attempted.
        operation: &'static str,
        /// What went wrong.
        reason: CallFailure,
        /// Secondary failures attached while this error was pending.
        suppressed: Vec<HResultError>,
    },
}

impl DpapiError {
    /// The HRESULT, for status-bearing errors.
    pub fn hresult(&self) -> Option<i32> {
        match self {
            Self::NativeCallFailed { source, .. } => Some(source.hresult()),
            _ => None,
        }
    }

    /// Returns true if the error carries a native status code.
    pub fn is_status_bearing(&self) -> bool {
        self.hresult().is_some()
    }

    /// Secondary failures attached to this error.
    pub fn suppressed(&self) -> &[HResultError] {
        match self {
            Self::NativeCallFailed { source, .. } => source.suppressed(),
            Self::CallFailed { suppressed, .. } => suppressed,
            Self::InitializationFailed(_) | Self::NullArgument(_) => &[],
        }
    }

    pub(crate) fn call_failed(operation: &'static str, reason: CallFailure) -> Self {
        Self::CallFailed {
            operation,
            reason,
            suppressed: Vec::new(),
        }
    }

    /// Attaches `error` as secondary failure.
    ///
    /// Only errors raised from within a native call carry suppressed failures;
    /// the others are returned before any native buffer exists.
    pub(crate) fn suppress(&mut self, error: HResultError) {
        match self {
            Self::NativeCallFailed { source, .. } => source.add_suppressed(error),
            Self::CallFailed { suppressed, .. } => suppressed.push(error),
            Self::InitializationFailed(_) | Self::NullArgument(_) => {
                tracing::warn!(%error, primary = %self, "secondary failure without a call error");
            }
        }
    }
}
