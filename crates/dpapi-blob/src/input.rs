// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use dpapi_native::DataBlob;
use dpapi_util::fast_zeroize_slice;

use crate::error::BlobError;

pub(crate) fn blob_len(len: usize) -> Result<u32, BlobError> {
    u32::try_from(len).map_err(|_| BlobError::TooLarge { len })
}

/// Core-owned copy of a caller buffer, laid out for a native call.
///
/// The allocation is never zero-sized: empty input gets a 1-byte placeholder
/// while the recorded length stays 0, so the native side never sees a null
/// data pointer. The whole allocation (placeholder included) is zeroed on drop.
pub struct InputBlob {
    buf: Box<[u8]>,
    len: u32,
}

impl InputBlob {
    /// Copies `bytes` into a fresh allocation.
    ///
    /// # Errors
    ///
    /// [`BlobError::TooLarge`] if `bytes` is longer than `u32::MAX`.
    pub fn wrap(bytes: &[u8]) -> Result<Self, BlobError> {
        let len = blob_len(bytes.len())?;
        let buf: Box<[u8]> = if bytes.is_empty() {
            Box::new([0u8])
        } else {
            Box::from(bytes)
        };

        Ok(Self { buf, len })
    }

    /// Logical length (what the native call is told).
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns true if the logical length is zero.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Size of the underlying allocation, at least 1.
    pub fn allocated_len(&self) -> usize {
        self.buf.len()
    }

    /// Native view of this blob. Valid while `self` is alive and not moved
    /// out of its box.
    pub fn as_data_blob(&mut self) -> DataBlob {
        DataBlob {
            cb_data: self.len,
            pb_data: self.buf.as_mut_ptr(),
        }
    }

    /// Zeroes and releases the blob now instead of at the end of scope.
    pub fn zero_and_release(self) {
        drop(self);
    }
}

impl Drop for InputBlob {
    fn drop(&mut self) {
        fast_zeroize_slice(&mut self.buf);
        tracing::trace!(allocated = self.buf.len(), "input blob zeroized");
    }
}

impl core::fmt::Debug for InputBlob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InputBlob")
            .field("len", &self.len)
            .finish_non_exhaustive()
    }
}
