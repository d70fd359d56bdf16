//! Configuration-mode service translators
//!
//! Each submodule owns one third-party daemon and follows the same commit
//! pipeline: extract the service subtree from the configuration store,
//! verify it with hand-coded conditionals, render the daemon's config
//! file(s) to their fixed paths, then apply by restarting the daemon. An
//! absent subtree means the service was deleted: generated files are removed
//! and the daemon is stopped.
//!
//! Verification failures are fatal to the commit and surface as a
//! descriptive configuration error; there is no retry logic.

pub mod https;
pub mod munin;
pub mod smokeping;

use crate::core::error::{Error, Result};
use tracing::{info, warn};

async fn systemctl(verb: &str, unit: &str) -> Result<std::process::Output> {
    let output = crate::elevation::systemctl_command(&[verb, unit])
        .map_err(|e| Error::Elevation(e.to_string()))?
        .output()
        .await?;
    Ok(output)
}

/// Restarts a systemd unit; failure is a commit failure.
pub async fn restart_unit(unit: &str) -> Result<()> {
    let output = systemctl("restart", unit).await?;
    if output.status.success() {
        info!(unit, "Service restarted");
        Ok(())
    } else {
        Err(Error::ServiceControl {
            service: unit.to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Stops a systemd unit. A failing stop (unit not loaded, never started) is
/// logged and tolerated so that service deletion stays idempotent.
pub async fn stop_unit(unit: &str) {
    match systemctl("stop", unit).await {
        Ok(output) if output.status.success() => info!(unit, "Service stopped"),
        Ok(output) => warn!(
            unit,
            stderr = %String::from_utf8_lossy(&output.stderr).trim(),
            "Service stop failed"
        ),
        Err(e) => warn!(unit, error = %e, "Service stop failed"),
    }
}

/// Timestamped header line placed at the top of every generated file.
fn generated_header(tool: &str) -> String {
    format!(
        "### Autogenerated by {tool} on {} ###\n",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}
