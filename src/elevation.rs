//! Privilege elevation for system operations
//!
//! Operational and configuration-mode commands run as an unprivileged user
//! and elevate only for specific operations:
//!
//! - **nft**: listing live chain state
//! - **systemctl**: restarting or stopping managed daemons
//!
//! # Elevation Strategy
//!
//! - **Default**: `sudo`, the convention for router operator accounts
//! - **Alternative**: `run0` (systemd v256+, no SUID) when selected
//!
//! # Environment Variables
//!
//! - `VYCFG_ELEVATION_METHOD`: force a specific elevation method (`sudo` or
//!   `run0`). Useful for images with sudoers NOPASSWD rules.
//! - `VYCFG_NFT_COMMAND`: replace the nft binary (run unelevated); used by
//!   the test suite to substitute a mock script.
//! - `VYCFG_TEST_NO_ELEVATION`: bypass elevation entirely (for testing only).
//!
//! # Security
//!
//! Only specific binaries can be elevated (nft, systemctl). Commands are
//! constructed without shell interpolation; arguments pass through verbatim.

use std::io;
use tokio::process::Command;

/// Error type for privilege elevation operations
#[derive(Debug, thiserror::Error)]
pub enum ElevationError {
    /// Requested elevation method is not available (binary not found)
    #[error("Elevation method '{0}' is not available (binary not found)")]
    MethodNotAvailable(String),

    /// Invalid value for `VYCFG_ELEVATION_METHOD`
    #[error("Invalid VYCFG_ELEVATION_METHOD '{0}'. Valid options: sudo, run0")]
    InvalidMethod(String),

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Checks if a binary exists in PATH
fn binary_exists(name: &str) -> bool {
    std::env::var_os("PATH")
        .and_then(|paths| {
            std::env::split_paths(&paths).find_map(|dir| {
                let full_path = dir.join(name);
                if full_path.is_file() {
                    Some(full_path)
                } else {
                    None
                }
            })
        })
        .is_some()
}

/// Internal helper to build an elevated command for a specific program.
///
/// Not exposed publicly: callers must use the specific constructors
/// ([`nft_command`], [`systemctl_command`]) so only approved binaries can be
/// elevated.
fn build_elevated_command(program: &str, args: &[&str]) -> Result<Command, ElevationError> {
    // Test override takes priority over everything else
    if std::env::var("VYCFG_TEST_NO_ELEVATION").is_ok() {
        let mut cmd = Command::new(program);
        cmd.args(args);
        return Ok(cmd);
    }

    // Running as root already: no wrapper needed
    if nix::unistd::getuid().is_root() {
        let mut cmd = Command::new(program);
        cmd.args(args);
        return Ok(cmd);
    }

    // Explicit method override
    if let Ok(method) = std::env::var("VYCFG_ELEVATION_METHOD") {
        let method = method.to_lowercase();
        if !method.is_empty() {
            return match method.as_str() {
                "sudo" | "run0" => {
                    if !binary_exists(&method) {
                        return Err(ElevationError::MethodNotAvailable(method));
                    }
                    let mut cmd = Command::new(&method);
                    cmd.arg(program).args(args);
                    Ok(cmd)
                }
                _ => Err(ElevationError::InvalidMethod(method)),
            };
        }
    }

    // Default: sudo, falling back to run0 where sudo is absent
    if binary_exists("sudo") {
        let mut cmd = Command::new("sudo");
        cmd.arg(program).args(args);
        return Ok(cmd);
    }
    if binary_exists("run0") {
        let mut cmd = Command::new("run0");
        cmd.arg(program).args(args);
        return Ok(cmd);
    }

    Err(ElevationError::MethodNotAvailable("sudo".into()))
}

/// Creates an elevated `nft` command with the specified arguments.
///
/// `VYCFG_NFT_COMMAND` replaces the nft binary entirely and runs it without
/// an elevation wrapper; tests point it at a mock script.
///
/// # Errors
///
/// Returns `Err` if no elevation method is available or the configured
/// method is invalid.
pub fn nft_command(args: &[&str]) -> Result<Command, ElevationError> {
    if let Ok(custom) = std::env::var("VYCFG_NFT_COMMAND")
        && !custom.is_empty()
    {
        let mut cmd = Command::new(custom);
        cmd.args(args);
        return Ok(cmd);
    }
    build_elevated_command("nft", args)
}

/// Creates an elevated `systemctl` command with the specified arguments.
///
/// # Errors
///
/// Returns `Err` if no elevation method is available or the configured
/// method is invalid.
pub fn systemctl_command(args: &[&str]) -> Result<Command, ElevationError> {
    build_elevated_command("systemctl", args)
}
