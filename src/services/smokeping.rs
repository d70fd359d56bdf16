//! smokeping latency probe translator
//!
//! Renders the smokeping defaults file and the client secrets file. The
//! daemon is particular about the secrets file: mode 0400, owned by the
//! smokeping system user.

use crate::config::{self, ConfigTree};
use crate::core::error::{Error, Result};
use crate::files;
use std::fmt::Write;
use std::path::Path;

pub const CONFIG_FILE: &str = "/etc/default/smokeping";
pub const SECRET_FILE: &str = "/etc/smokeping/clientsecrets.conf";
const UNIT: &str = "smokeping.service";
const SYSTEM_USER: &str = "smokeping";

/// Extracted smokeping service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmokepingConfig {
    pub instrumentation_url: Option<String>,
    pub client_name: Option<String>,
    pub client_secret: Option<String>,
}

/// Extracts the smokeping service subtree; `None` on deletion.
pub fn extract(config: &ConfigTree) -> Option<SmokepingConfig> {
    let service = config.get(&["service", "smokeping"])?;

    let field = |key: &str| config::search_str(service, &[key]).map(String::from);
    Some(SmokepingConfig {
        instrumentation_url: field("instrumentation_url"),
        client_name: field("client_name"),
        client_secret: field("client_secret"),
    })
}

pub fn verify(smokeping: &SmokepingConfig) -> Result<()> {
    if smokeping.instrumentation_url.is_none() {
        return Err(Error::config("Instrumentation URL must be configured!"));
    }
    if smokeping.client_name.is_none() {
        return Err(Error::config("Client name must be configured!"));
    }
    if smokeping.client_secret.is_none() {
        return Err(Error::config("Client secret must be configured!"));
    }
    Ok(())
}

/// Renders /etc/default/smokeping.
pub fn render(smokeping: &SmokepingConfig) -> String {
    let mut out = super::generated_header("vycfg smokeping");
    out.push('\n');
    out.push_str("MODE=client\n");
    if let Some(url) = &smokeping.instrumentation_url {
        let _ = writeln!(out, "INSTRUMENTATION_URL={url}");
    }
    if let Some(name) = &smokeping.client_name {
        let _ = writeln!(out, "CLIENT_NAME={name}");
    }
    out
}

/// Renders the client secrets file: one `name:secret` line.
pub fn render_secrets(smokeping: &SmokepingConfig) -> String {
    match (&smokeping.client_name, &smokeping.client_secret) {
        (Some(name), Some(secret)) => format!("{name}:{secret}\n"),
        _ => String::new(),
    }
}

/// Removes stale generated files and writes fresh ones. The secrets file is
/// restricted to the smokeping user before the daemon comes back.
pub fn generate(smokeping: Option<&SmokepingConfig>) -> Result<()> {
    files::remove_generated(Path::new(CONFIG_FILE))?;
    files::remove_generated(Path::new(SECRET_FILE))?;

    let Some(smokeping) = smokeping else {
        return Ok(());
    };

    files::install(Path::new(CONFIG_FILE), &render(smokeping), 0o644)?;
    files::install(Path::new(SECRET_FILE), &render_secrets(smokeping), 0o400)?;
    files::chown_to_user(Path::new(SECRET_FILE), SYSTEM_USER)?;
    Ok(())
}

/// Stops the daemon first, then restarts it unless the service was deleted.
pub async fn apply(smokeping: Option<&SmokepingConfig>) -> Result<()> {
    super::stop_unit(UNIT).await;
    if smokeping.is_none() {
        return Ok(());
    }
    super::restart_unit(UNIT).await
}

/// Full commit pipeline for `service smokeping`.
pub async fn commit(config: &ConfigTree) -> Result<()> {
    let smokeping = extract(config);
    if let Some(smokeping) = &smokeping {
        verify(smokeping)?;
    }
    generate(smokeping.as_ref())?;
    apply(smokeping.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_config() -> SmokepingConfig {
        SmokepingConfig {
            instrumentation_url: Some("https://smoke.example.com/probe".into()),
            client_name: Some("edge-router".into()),
            client_secret: Some("s3cret".into()),
        }
    }

    #[test]
    fn test_extract_fields() {
        let config = ConfigTree::from_value(json!({
            "service": {"smokeping": {
                "instrumentation_url": "https://smoke.example.com/probe",
                "client_name": "edge-router",
                "client_secret": "s3cret"
            }}
        }));
        assert_eq!(extract(&config).unwrap(), full_config());
    }

    #[test]
    fn test_verify_missing_fields() {
        let mut conf = full_config();
        conf.instrumentation_url = None;
        assert!(
            verify(&conf)
                .unwrap_err()
                .to_string()
                .contains("Instrumentation URL")
        );

        let mut conf = full_config();
        conf.client_name = None;
        assert!(verify(&conf).unwrap_err().to_string().contains("Client name"));

        let mut conf = full_config();
        conf.client_secret = None;
        assert!(
            verify(&conf)
                .unwrap_err()
                .to_string()
                .contains("Client secret")
        );

        assert!(verify(&full_config()).is_ok());
    }

    #[test]
    fn test_render_defaults_file() {
        let text = render(&full_config());
        assert!(text.contains("MODE=client"));
        assert!(text.contains("INSTRUMENTATION_URL=https://smoke.example.com/probe"));
        assert!(text.contains("CLIENT_NAME=edge-router"));
    }

    #[test]
    fn test_render_secrets_line() {
        assert_eq!(render_secrets(&full_config()), "edge-router:s3cret\n");
    }
}
