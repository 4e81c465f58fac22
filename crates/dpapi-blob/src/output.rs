// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use dpapi_native::{DataBlob, NativeApi};
use dpapi_util::fast_zeroize_raw;

use crate::error::BlobError;

/// Slot for a buffer allocated by the native facility.
///
/// Starts unpopulated (null, zero length). Once the native call fills it, the
/// buffer belongs to the native allocator: it is zeroed over its full
/// [`NativeApi::allocation_size`] and returned through
/// [`NativeApi::free`] exactly once, either by [`OutputBlob::zero_and_release`]
/// or, if that was never called, on drop.
pub struct OutputBlob<'a, A: NativeApi + ?Sized> {
    api: &'a A,
    raw: DataBlob,
    released: bool,
}

impl<'a, A: NativeApi + ?Sized> OutputBlob<'a, A> {
    /// Creates an unpopulated slot whose buffer will be freed through `api`.
    pub fn new(api: &'a A) -> Self {
        Self {
            api,
            raw: DataBlob::empty(),
            released: false,
        }
    }

    /// The native out-parameter.
    pub fn as_data_blob_mut(&mut self) -> &mut DataBlob {
        &mut self.raw
    }

    /// Returns true once the native call stored a buffer.
    pub fn is_populated(&self) -> bool {
        !self.raw.is_null()
    }

    /// Logical length reported by the native call.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns true if the reported length is zero.
    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// Copies the buffer out, sized to the reported length.
    ///
    /// Returns `None` if the blob was never populated.
    pub fn to_vec(&self) -> Option<Vec<u8>> {
        if self.released || self.raw.is_null() {
            return None;
        }

        // Safety: a populated blob points to `cb_data` readable bytes until freed.
        let bytes = unsafe { core::slice::from_raw_parts(self.raw.pb_data, self.raw.len()) };
        Some(bytes.to_vec())
    }

    /// Zeroes the whole native allocation (which may extend past the reported
    /// length) and frees it through the native allocator.
    ///
    /// An unpopulated blob is a no-op. The buffer is never freed twice, even
    /// when the free itself fails.
    ///
    /// # Errors
    ///
    /// [`BlobError::FreeFailed`] with the last-error code read right after
    /// the failed free.
    pub fn zero_and_release(mut self) -> Result<(), BlobError> {
        self.release()
    }

    fn release(&mut self) -> Result<(), BlobError> {
        if self.released || self.raw.is_null() {
            self.released = true;
            return Ok(());
        }

        let ptr = self.raw.pb_data;
        let len = self.raw.len();
        self.released = true;
        self.raw = DataBlob::empty();

        // Safety: `ptr` is the native buffer of at least `len` bytes and has
        // not been freed yet (`released` was false).
        let (size, freed) = unsafe {
            let size = len.max(self.api.allocation_size(ptr));
            fast_zeroize_raw(ptr, size);
            (size, self.api.free(ptr))
        };
        // Read before anything else can overwrite the thread's last error.
        let last_error = (!freed).then(|| self.api.last_error());
        tracing::trace!(len, size, freed, "native output blob zeroized");

        match last_error {
            None => Ok(()),
            Some(last_error) => Err(BlobError::FreeFailed { last_error }),
        }
    }
}

impl<A: NativeApi + ?Sized> Drop for OutputBlob<'_, A> {
    fn drop(&mut self) {
        if let Err(err) = self.release() {
            tracing::warn!(%err, "native output blob released on drop with error");
        }
    }
}

impl<A: NativeApi + ?Sized> core::fmt::Debug for OutputBlob<'_, A> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OutputBlob")
            .field("len", &self.raw.cb_data)
            .field("populated", &self.is_populated())
            .field("released", &self.released)
            .finish_non_exhaustive()
    }
}
