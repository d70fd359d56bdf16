//! HTTPS frontend (nginx) translator
//!
//! Renders the nginx site configuration for the router's HTTPS service. Each
//! configured listen address becomes one TLS server block; without any, a
//! single catch-all default block is emitted. The HTTP API, when enabled, is
//! proxied from every block.

use crate::config::{self, ConfigTree};
use crate::core::error::{Error, Result};
use crate::files;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Write;
use std::path::Path;

pub const CONFIG_FILE: &str = "/etc/nginx/sites-available/default";
const UNIT: &str = "nginx.service";

/// nginx include carrying the system-generated certificate.
const SYSTEM_CERT_CONF: &str = "snippets/vyos-cert.conf";

/// API proxy settings for a server block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiSettings {
    pub port: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            port: "8080".to_string(),
        }
    }
}

/// One TLS server block.
///
/// The default block is the immutable baseline; operator-supplied listen
/// addresses override it rather than mutating a shared template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerBlock {
    pub address: String,
    pub port: String,
    pub names: Vec<String>,
    pub cert_include: Option<String>,
    pub api: Option<ApiSettings>,
}

impl Default for ServerBlock {
    fn default() -> Self {
        Self {
            address: "*".to_string(),
            port: "443".to_string(),
            names: vec!["_".to_string()],
            cert_include: None,
            api: None,
        }
    }
}

/// Extracted https service state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpsConfig {
    pub servers: Vec<ServerBlock>,
}

/// Extracts the https service subtree; `None` means the service is absent
/// from the running configuration (deletion commit).
pub fn extract(config: &ConfigTree) -> Option<HttpsConfig> {
    let service = config.get(&["service", "https"])?;

    let mut servers = Vec::new();
    if let Some(listen) = config::search(service, &["listen_address"]) {
        for (address, addr_conf) in config::entries(listen) {
            let mut block = ServerBlock {
                address: address.clone(),
                ..ServerBlock::default()
            };
            if let Some(port) = config::search_str(addr_conf, &["listen_port"]) {
                block.port = port.to_string();
            }
            if let Some(names) = config::search(addr_conf, &["server_name"]) {
                let names = config::leaf_values(names);
                if !names.is_empty() {
                    block.names = names;
                }
            }
            servers.push(block);
        }
    }
    if servers.is_empty() {
        servers.push(ServerBlock::default());
    }

    if config
        .exists(&["service", "https", "certificates", "system_generated_certificate"])
    {
        for block in &mut servers {
            block.cert_include = Some(SYSTEM_CERT_CONF.to_string());
        }
    }

    if let Some(api) = config::search(service, &["api"]) {
        let mut settings = ApiSettings::default();
        if let Some(port) = config::search_str(api, &["port"]) {
            settings.port = port.to_string();
        }
        for block in &mut servers {
            block.api = Some(settings.clone());
        }
    }

    Some(HttpsConfig { servers })
}

/// Verifies API authentication settings against the raw service subtree.
///
/// Every configured key id must carry a key string, and unless GraphQL token
/// authentication is enabled at least one valid key must exist.
pub fn verify(service: &Value) -> Result<()> {
    let Some(api) = config::search(service, &["api"]) else {
        return Ok(());
    };

    let token_auth = config::search_str(api, &["graphql", "authentication", "type"])
        == Some("token");

    let mut valid_keys_exist = false;
    if let Some(keys) = config::search(api, &["keys", "id"]) {
        for (key_id, key_conf) in config::entries(keys) {
            if config::search(key_conf, &["key"]).is_none() {
                return Err(Error::config(format!(
                    "Missing HTTPS API key string for key id \"{key_id}\""
                )));
            }
            valid_keys_exist = true;
        }
    }

    if !valid_keys_exist && !token_auth {
        return Err(Error::config(
            "At least one HTTPS API key is required unless GraphQL token authentication is enabled",
        ));
    }
    Ok(())
}

fn render_server_block(out: &mut String, block: &ServerBlock) {
    out.push_str("server {\n");
    out.push_str("        # SSL configuration\n");
    if block.address == "*" {
        out.push_str("        listen 443 ssl;\n");
        out.push_str("        listen [::]:443 ssl;\n");
    } else {
        let _ = writeln!(out, "        listen {}:{} ssl;", block.address, block.port);
    }
    out.push('\n');

    for name in &block.names {
        let _ = writeln!(out, "        server_name {name};");
    }
    out.push('\n');

    if let Some(include) = &block.cert_include {
        let _ = writeln!(out, "        include {include};");
    } else {
        // Self signed certs generated by the ssl-cert package.
        // Not intended for production use.
        out.push_str("        include snippets/snakeoil.conf;\n");
    }
    out.push('\n');

    out.push_str("        # proxy settings for HTTP API, if enabled; 503, if not\n");
    out.push_str("        location ~ /(retrieve|configure|config-file|image) {\n");
    if let Some(api) = &block.api {
        let _ = writeln!(out, "                proxy_pass http://localhost:{};", api.port);
        out.push_str("                proxy_read_timeout 600;\n");
        out.push_str("                proxy_buffering off;\n");
    } else {
        out.push_str("                return 503;\n");
    }
    out.push_str("        }\n\n");

    out.push_str("        error_page 501 502 503 =200 @50x_json;\n\n");
    out.push_str("        location @50x_json {\n");
    out.push_str("                default_type application/json;\n");
    out.push_str(
        "                return 200 '{\"error\": \"Start service in configuration mode: set service https api\"}';\n",
    );
    out.push_str("        }\n");
    out.push_str("}\n\n");
}

/// Renders the full nginx site configuration.
pub fn render(https: &HttpsConfig) -> String {
    let mut out = super::generated_header("vycfg https");
    out.push_str("# Default server configuration\n\n");
    out.push_str("server {\n");
    out.push_str("        listen 80 default_server;\n");
    out.push_str("        listen [::]:80 default_server;\n");
    out.push_str("        server_name _;\n");
    out.push_str("        return 301 https://$server_name$request_uri;\n");
    out.push_str("}\n\n");

    for block in &https.servers {
        render_server_block(&mut out, block);
    }
    out
}

/// Writes the nginx site configuration. A deletion commit leaves the file
/// alone; stopping the daemon is enough.
pub fn generate(https: Option<&HttpsConfig>) -> Result<()> {
    let Some(https) = https else {
        return Ok(());
    };
    files::install(Path::new(CONFIG_FILE), &render(https), 0o644)
}

/// Restarts nginx, or stops it when the service was deleted.
pub async fn apply(https: Option<&HttpsConfig>) -> Result<()> {
    if https.is_some() {
        super::restart_unit(UNIT).await
    } else {
        super::stop_unit(UNIT).await;
        Ok(())
    }
}

/// Full commit pipeline for `service https`.
pub async fn commit(config: &ConfigTree) -> Result<()> {
    let https = extract(config);
    if https.is_some()
        && let Some(service) = config.get(&["service", "https"])
    {
        verify(service)?;
    }
    generate(https.as_ref())?;
    apply(https.as_ref()).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_absent_service() {
        let config = ConfigTree::from_value(json!({"service": {}}));
        assert!(extract(&config).is_none());
    }

    #[test]
    fn test_extract_defaults_without_listen_addresses() {
        let config = ConfigTree::from_value(json!({"service": {"https": {}}}));
        let https = extract(&config).unwrap();
        assert_eq!(https.servers, vec![ServerBlock::default()]);
    }

    #[test]
    fn test_extract_listen_address_overrides() {
        let config = ConfigTree::from_value(json!({
            "service": {"https": {
                "listen_address": {
                    "192.0.2.1": {
                        "listen_port": "8443",
                        "server_name": ["router.example.com"]
                    }
                },
                "certificates": {"system_generated_certificate": {}},
                "api": {"port": "8081"}
            }}
        }));
        let https = extract(&config).unwrap();
        assert_eq!(https.servers.len(), 1);
        let block = &https.servers[0];
        assert_eq!(block.address, "192.0.2.1");
        assert_eq!(block.port, "8443");
        assert_eq!(block.names, ["router.example.com"]);
        assert_eq!(block.cert_include.as_deref(), Some(SYSTEM_CERT_CONF));
        assert_eq!(block.api.as_ref().unwrap().port, "8081");
    }

    #[test]
    fn test_verify_key_without_string_fails() {
        let service = json!({"api": {"keys": {"id": {"main": {}}}}});
        let err = verify(&service).unwrap_err();
        assert!(err.to_string().contains("key id \"main\""));
    }

    #[test]
    fn test_verify_requires_key_or_token_auth() {
        let service = json!({"api": {}});
        assert!(verify(&service).is_err());

        let token = json!({"api": {"graphql": {"authentication": {"type": "token"}}}});
        assert!(verify(&token).is_ok());

        let keyed = json!({"api": {"keys": {"id": {"main": {"key": "s3cret"}}}}});
        assert!(verify(&keyed).is_ok());
    }

    #[test]
    fn test_verify_without_api_is_ok() {
        assert!(verify(&json!({})).is_ok());
    }

    #[test]
    fn test_render_default_block() {
        let https = HttpsConfig {
            servers: vec![ServerBlock::default()],
        };
        let text = render(&https);
        assert!(text.contains("listen 80 default_server;"));
        assert!(text.contains("listen 443 ssl;"));
        assert!(text.contains("listen [::]:443 ssl;"));
        assert!(text.contains("server_name _;"));
        assert!(text.contains("include snippets/snakeoil.conf;"));
        assert!(text.contains("return 503;"));
    }

    #[test]
    fn test_render_explicit_address_and_api() {
        let https = HttpsConfig {
            servers: vec![ServerBlock {
                address: "192.0.2.1".into(),
                port: "8443".into(),
                names: vec!["router".into()],
                cert_include: Some(SYSTEM_CERT_CONF.into()),
                api: Some(ApiSettings {
                    port: "8080".into(),
                }),
            }],
        };
        let text = render(&https);
        assert!(text.contains("listen 192.0.2.1:8443 ssl;"));
        assert!(!text.contains("listen [::]:443 ssl;"));
        assert!(text.contains("server_name router;"));
        assert!(text.contains("include snippets/vyos-cert.conf;"));
        assert!(text.contains("proxy_pass http://localhost:8080;"));
        assert!(!text.contains("return 503;"));
    }
}
