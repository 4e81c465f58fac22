// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use clap::Parser;
use dpapi::CryptProtectFlag;

#[derive(Debug, Parser)]
#[command(name = "dpapi-sample")]
#[command(about = "Protects and unprotects a message with the Windows Data Protection API")]
#[command(version)]
pub struct Cli {
    /// Message to round-trip
    #[arg(default_value = "Hello World!")]
    pub message: String,

    /// Secondary entropy mixed into the protection
    #[arg(long)]
    pub entropy: Option<String>,

    /// Description embedded in the protected blob
    #[arg(long)]
    pub description: Option<String>,

    /// Protection flag, repeatable (default: ui-forbidden)
    #[arg(long = "flag", value_name = "NAME")]
    pub flags: Vec<CryptProtectFlag>,
}

impl Cli {
    /// Flags to apply, `ui-forbidden` when none were given.
    pub fn flags(&self) -> Vec<CryptProtectFlag> {
        if self.flags.is_empty() {
            vec![CryptProtectFlag::UiForbidden]
        } else {
            self.flags.clone()
        }
    }
}
