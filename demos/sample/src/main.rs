// Copyright (c) 2025-2026 Federico Hoerth <memparanoid@gmail.com>
// SPDX-License-Identifier: GPL-3.0-only
// See LICENSE in the repository root for full license text.

//! Protects a message, unprotects it and prints the result.
//!
//! Exit codes:
//!
//! | Code | Meaning |
//! |------|---------|
//! | 0 | round-trip succeeded |
//! | 1 | DPAPI unavailable (initialization failed) |
//! | 2 | native call failed with an HRESULT |
//! | 3 | any other failure |

#[cfg(test)]
mod tests;

mod cli;

use std::process::ExitCode;

use clap::Parser;
use dpapi::{DpapiError, ProtectionSession};
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::Cli;

const LOG_ENV: &str = "DPAPI_LOG";

#[derive(Debug)]
enum Failure {
    Dpapi(DpapiError),
    Mismatch,
}

impl Failure {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Dpapi(DpapiError::InitializationFailed(_)) => 1,
            Self::Dpapi(err) if err.is_status_bearing() => 2,
            Self::Dpapi(_) | Self::Mismatch => 3,
        }
    }
}

impl From<DpapiError> for Failure {
    fn from(err: DpapiError) -> Self {
        Self::Dpapi(err)
    }
}

fn run(cli: &Cli) -> Result<String, Failure> {
    let session = ProtectionSession::new(&cli.flags())?;

    let protected = session.protect(
        Some(cli.message.as_bytes()),
        cli.entropy.as_deref().map(str::as_bytes),
        cli.description.as_deref(),
    )?;
    tracing::info!(len = protected.len(), "message protected");

    let plaintext =
        session.unprotect(Some(protected.as_slice()), cli.entropy.as_deref().map(str::as_bytes))?;
    let message = String::from_utf8(plaintext).map_err(|_| Failure::Mismatch)?;

    if message != cli.message {
        return Err(Failure::Mismatch);
    }

    Ok(message)
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_target(false).init();

    match run(&cli) {
        Ok(message) => {
            println!("{message}");
            ExitCode::SUCCESS
        }
        Err(failure) => {
            match &failure {
                Failure::Dpapi(err) => {
                    eprintln!("ERROR: {err}");
                    if let Some(hresult) = err.hresult() {
                        eprintln!("HRESULT: {hresult:#010X}");
                    }
                    for suppressed in err.suppressed() {
                        eprintln!("suppressed: {suppressed}");
                    }
                }
                Failure::Mismatch => eprintln!("ERROR: round-trip returned a different message"),
            }
            ExitCode::from(failure.exit_code())
        }
    }
}
