// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::ptr;

/// Fixed-layout `{ cbData, pbData }` pair handed to the native functions.
///
/// This is a borrowed view only: it never owns `pb_data`. Ownership lives in
/// the marshaling layer (`dpapi-blob`), which builds a `DataBlob` for the
/// duration of a single native call.
#[repr(C)]
pub struct DataBlob {
    /// Logical length in bytes.
    pub cb_data: u32,
    /// Start of the buffer, or null when the blob was never populated.
    pub pb_data: *mut u8,
}

impl DataBlob {
    /// An unpopulated blob (zero length, null pointer), used as output slot.
    pub const fn empty() -> Self {
        Self {
            cb_data: 0,
            pb_data: ptr::null_mut(),
        }
    }

    /// Returns true if the pointer is null.
    pub fn is_null(&self) -> bool {
        self.pb_data.is_null()
    }

    /// Logical length as `usize`.
    pub fn len(&self) -> usize {
        self.cb_data as usize
    }

    /// Returns true if the logical length is zero.
    pub fn is_empty(&self) -> bool {
        self.cb_data == 0
    }
}

impl Default for DataBlob {
    fn default() -> Self {
        Self::empty()
    }
}

impl core::fmt::Debug for DataBlob {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DataBlob")
            .field("cb_data", &self.cb_data)
            .field("is_null", &self.is_null())
            .finish()
    }
}
