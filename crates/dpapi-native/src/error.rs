// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use thiserror::Error;

/// Reasons the native binding cannot be used.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum InitError {
    /// The current OS is not part of the Windows family.
    #[error("this library only works on Windows operating systems")]
    UnsupportedPlatform,

    /// The platform is supported but the binding could not be loaded.
    #[error("native binding could not be loaded")]
    BindingUnavailable,
}
