// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use thiserror::Error;

/// Errors from wrapping or releasing blobs.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum BlobError {
    /// The buffer does not fit the 32-bit length field of the native structure.
    #[error("buffer of {len} bytes does not fit a 32-bit blob length")]
    TooLarge {
        /// Length of the rejected buffer.
        len: usize,
    },

    /// The native free primitive reported failure.
    #[error("releasing native buffer failed (last error {last_error})")]
    FreeFailed {
        /// Raw last-error code read right after the failed free.
        last_error: i32,
    },
}
