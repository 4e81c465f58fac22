// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Test utilities for the DPAPI crates.
//!
//! ## License
//!
//! GPL-3.0-only

mod zero_checking_allocator;

pub use zero_checking_allocator::ZeroCheckingAllocator;
