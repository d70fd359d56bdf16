//! munin-node monitoring agent translator
//!
//! Renders `/etc/munin/munin-node.conf` and a systemd override unit. The
//! node name defaults to the router's hostname and the listen port to the
//! munin default; the allow-list regex is derived from the configured master
//! server address. Plugin provisioning is owned by the munin packaging, not
//! by this translator.

use crate::config::{self, ConfigTree};
use crate::core::error::{Error, Result};
use crate::files;
use std::fmt::Write;
use std::path::Path;

pub const CONFIG_FILE: &str = "/etc/munin/munin-node.conf";
pub const SYSTEMD_OVERRIDE: &str = "/run/systemd/system/munin-node.service.d/10-override.conf";
const UNIT: &str = "munin-node.service";

const DEFAULT_PORT: &str = "4949";

/// Extracted munin-node service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuninConfig {
    pub node_name: String,
    pub port: String,
    /// Master server address allowed to poll this node.
    pub server: Option<String>,
}

fn default_node_name() -> String {
    nix::unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "localhost".to_string())
}

/// Extracts the munin-node service subtree; `None` on deletion.
pub fn extract(config: &ConfigTree) -> Option<MuninConfig> {
    let service = config.get(&["service", "munin_node"])?;

    Some(MuninConfig {
        node_name: config::search_str(service, &["node_name"])
            .map_or_else(default_node_name, String::from),
        port: config::search_str(service, &["port"])
            .unwrap_or(DEFAULT_PORT)
            .to_string(),
        server: config::search_str(service, &["munin_server"]).map(String::from),
    })
}

/// The master server address is the one field with no sensible default.
pub fn verify(munin: &MuninConfig) -> Result<()> {
    if munin.server.is_none() {
        return Err(Error::config("Munin server address must be configured!"));
    }
    Ok(())
}

/// Munin allow-lists servers by regular expression; anchor and escape the
/// configured address so dots match literally.
fn allow_regex(server: &str) -> String {
    format!("^{}$", regex::escape(server))
}

/// Renders munin-node.conf.
pub fn render(munin: &MuninConfig) -> String {
    let mut out = super::generated_header("vycfg munin-node");
    out.push('\n');
    out.push_str("log_level 4\n");
    out.push_str("log_file /var/log/munin/munin-node.log\n");
    out.push_str("pid_file /run/munin/munin-node.pid\n\n");
    out.push_str("background 1\n");
    out.push_str("setsid 1\n\n");
    out.push_str("user root\ngroup root\n\n");
    let _ = writeln!(out, "host_name {}", munin.node_name);
    if let Some(server) = &munin.server {
        let _ = writeln!(out, "allow {}", allow_regex(server));
    }
    out.push('\n');
    out.push_str("host *\n");
    let _ = writeln!(out, "port {}", munin.port);
    out
}

/// Renders the systemd override unit.
pub fn render_override(_munin: &MuninConfig) -> String {
    let mut out = super::generated_header("vycfg munin-node");
    out.push_str("[Service]\n");
    out.push_str("Restart=on-failure\n");
    out.push_str("RestartSec=10\n");
    out
}

/// Removes stale generated files, then writes both the daemon config and the
/// systemd override. Deletion commits only clean up.
pub fn generate(munin: Option<&MuninConfig>) -> Result<()> {
    files::remove_generated(Path::new(CONFIG_FILE))?;
    files::remove_generated(Path::new(SYSTEMD_OVERRIDE))?;

    let Some(munin) = munin else {
        return Ok(());
    };

    files::install(Path::new(CONFIG_FILE), &render(munin), 0o644)?;
    files::install(Path::new(SYSTEMD_OVERRIDE), &render_override(munin), 0o644)?;
    Ok(())
}

/// Stops the daemon first, then restarts it unless the service was deleted.
pub async fn apply(munin: Option<&MuninConfig>) -> Result<()> {
    super::stop_unit(UNIT).await;
    if munin.is_none() {
        return Ok(());
    }
    super::restart_unit(UNIT).await
}

/// Full commit pipeline for `service munin-node`.
pub async fn commit(config: &ConfigTree) -> Result<()> {
    let munin = extract(config);
    if let Some(munin) = &munin {
        verify(munin)?;
    }
    generate(munin.as_ref())?;
    apply(munin.as_ref()).await
}
