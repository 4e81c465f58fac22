// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

use core::fmt;
use core::ops::BitOr;
use core::str::FromStr;

use dpapi_native::codes;
use thiserror::Error;

/// `CRYPTPROTECT_*` flags accepted by protect and unprotect.
///
/// Any combination is passed to the OS as-is. The OS decides which
/// combinations it accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum CryptProtectFlag {
    /// Fail instead of showing a UI prompt.
    UiForbidden = codes::CRYPTPROTECT_UI_FORBIDDEN,
    /// Machine scope instead of the current user.
    LocalMachine = codes::CRYPTPROTECT_LOCAL_MACHINE,
    /// Force credential synchronization only.
    CredSync = codes::CRYPTPROTECT_CRED_SYNC,
    /// Emit an audit record.
    Audit = codes::CRYPTPROTECT_AUDIT,
    /// Use a non-recoverable key.
    NoRecovery = codes::CRYPTPROTECT_NO_RECOVERY,
    /// Verify-only mode.
    VerifyProtection = codes::CRYPTPROTECT_VERIFY_PROTECTION,
    /// Regenerate machine protection.
    CredRegenerate = codes::CRYPTPROTECT_CRED_REGENERATE,
}

impl CryptProtectFlag {
    /// Every flag, in bit order.
    pub const ALL: [CryptProtectFlag; 7] = [
        Self::UiForbidden,
        Self::LocalMachine,
        Self::CredSync,
        Self::Audit,
        Self::NoRecovery,
        Self::VerifyProtection,
        Self::CredRegenerate,
    ];

    /// Raw bit value.
    pub const fn value(self) -> u32 {
        self as u32
    }

    /// Kebab-case name, as accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Self::UiForbidden => "ui-forbidden",
            Self::LocalMachine => "local-machine",
            Self::CredSync => "cred-sync",
            Self::Audit => "audit",
            Self::NoRecovery => "no-recovery",
            Self::VerifyProtection => "verify-protection",
            Self::CredRegenerate => "cred-regenerate",
        }
    }
}

impl fmt::Display for CryptProtectFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned by [`CryptProtectFlag::from_str`] for an unknown name.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown protection flag `{0}`")]
pub struct UnknownFlagError(pub String);

impl FromStr for CryptProtectFlag {
    type Err = UnknownFlagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace('_', "-").to_ascii_lowercase();

        Self::ALL
            .into_iter()
            .find(|flag| flag.name() == wanted)
            .ok_or_else(|| UnknownFlagError(s.to_owned()))
    }
}

/// Bitwise union of [`CryptProtectFlag`]s.
///
/// Duplicates are idempotent and no combination is rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FlagSet(u32);

impl FlagSet {
    /// The empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// ORs together every flag in `flags`.
    pub fn from_flags(flags: &[CryptProtectFlag]) -> Self {
        flags.iter().copied().collect()
    }

    /// Returns true if `flag` is part of the set.
    pub const fn contains(self, flag: CryptProtectFlag) -> bool {
        self.0 & flag.value() != 0
    }

    /// Returns true if no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub(crate) const fn bits(self) -> u32 {
        self.0
    }
}

impl From<CryptProtectFlag> for FlagSet {
    fn from(flag: CryptProtectFlag) -> Self {
        Self(flag.value())
    }
}

impl FromIterator<CryptProtectFlag> for FlagSet {
    fn from_iter<I: IntoIterator<Item = CryptProtectFlag>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), BitOr::bitor)
    }
}

impl BitOr<CryptProtectFlag> for FlagSet {
    type Output = FlagSet;

    fn bitor(self, flag: CryptProtectFlag) -> FlagSet {
        Self(self.0 | flag.value())
    }
}

impl BitOr for FlagSet {
    type Output = FlagSet;

    fn bitor(self, other: FlagSet) -> FlagSet {
        Self(self.0 | other.0)
    }
}

impl BitOr for CryptProtectFlag {
    type Output = FlagSet;

    fn bitor(self, other: CryptProtectFlag) -> FlagSet {
        FlagSet::from(self) | other
    }
}
