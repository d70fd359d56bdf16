//! Shared test utilities for core module tests
//!
//! Only compiled in test mode.

use std::sync::{Mutex, Once};

/// Mutex for tests that need exclusive access to environment variables.
///
/// Use this when a test temporarily changes env vars and restores them, or
/// tests behavior when env vars are absent.
pub static ENV_VAR_MUTEX: Mutex<()> = Mutex::new(());

/// One-time initialization flag for the offline nft setup
static OFFLINE_NFT_INIT: Once = Once::new();

/// Routes all nft invocations to a path that cannot exist.
///
/// Unit tests exercising the operational views must never reach the real
/// `nft` binary or an elevation prompt; with this in place every chain read
/// fails to spawn and degrades to an empty observation mapping, which is the
/// behavior those tests rely on.
///
/// Thread-safe and callable from any test; initialization happens once and
/// the variable is never removed, so there is no teardown race.
pub fn setup_offline_nft() {
    OFFLINE_NFT_INIT.call_once(|| {
        // SAFETY: called once under Once, in test binaries only.
        unsafe {
            std::env::set_var("VYCFG_NFT_COMMAND", "/nonexistent/vycfg-mock-nft");
        }
    });
}
