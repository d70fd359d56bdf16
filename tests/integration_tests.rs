//! Integration tests for vycfg
//!
//! These tests drive the operational-mode views end to end: configuration
//! tree in, rendered tables out, with live chain state supplied by the mock
//! nft script in `tests/mock_nft.sh` (selected via `VYCFG_NFT_COMMAND`, so
//! no test requires privileges or touches real nftables).

use serde_json::json;
use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Once;

use vycfg::config::ConfigTree;
use vycfg::core::chain::Family;
use vycfg::{op, scrape_chain_dump, services};

static MOCK_NFT_INIT: Once = Once::new();

/// Routes all nft invocations to the mock script.
fn setup_mock_nft() {
    MOCK_NFT_INIT.call_once(|| {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("tests");
        path.push("mock_nft.sh");

        // The exec bit can get lost in packaging; restore it.
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();

        unsafe {
            std::env::set_var("VYCFG_NFT_COMMAND", &path);
        }
    });
}

fn firewall_config() -> ConfigTree {
    ConfigTree::from_value(json!({
        "firewall": {
            "ipv4": {
                "name": {
                    "WAN-IN": {
                        "default_action": "drop",
                        "description": "Inbound from WAN",
                        "rule": {
                            "10": {"action": "accept", "protocol": "tcp",
                                   "source": {"address": "192.0.2.1"}},
                            "20": {"action": "drop", "protocol": "tcp"}
                        }
                    }
                }
            }
        },
        "policy": {
            "route": {
                "PBR-LAN": {
                    "rule": {
                        "10": {"action": "set", "protocol": "udp"}
                    }
                }
            }
        },
        "interfaces": {
            "ethernet": {
                "eth1": {"policy": {"route": "PBR-LAN"}}
            }
        }
    }))
}

#[tokio::test]
async fn test_firewall_show_joins_live_counters() {
    setup_mock_nft();
    let out = op::firewall::show(&firewall_config(), Family::Ipv4, "name", "WAN-IN", None).await;

    assert!(out.contains("ipv4 Firewall \"name WAN-IN\""));

    let rule10 = out.lines().find(|l| l.starts_with("10")).expect("rule 10 row");
    assert!(rule10.contains("42"));
    assert!(rule10.contains("1000"));
    assert!(rule10.contains("ip saddr 192.0.2.1 accept"));

    // drop is an action verb: stripped from the condition column
    let rule20 = out.lines().find(|l| l.starts_with("20")).expect("rule 20 row");
    assert!(rule20.contains("tcp dport 22"));
    assert!(!rule20.contains("tcp dport 22 drop"));

    let default = out
        .lines()
        .find(|l| l.starts_with("default"))
        .expect("default row");
    assert!(default.contains('3'));
    assert!(default.contains("180"));
}

#[tokio::test]
async fn test_firewall_show_single_rule() {
    setup_mock_nft();
    let out =
        op::firewall::show(&firewall_config(), Family::Ipv4, "name", "WAN-IN", Some("20")).await;

    assert!(out.starts_with("Rule Information"));
    assert!(out.lines().any(|l| l.starts_with("20")));
    assert!(!out.lines().any(|l| l.starts_with("10 ")));
    assert!(!out.lines().any(|l| l.starts_with("default")));
}

#[tokio::test]
async fn test_firewall_show_unreadable_chain_renders_without_counters() {
    setup_mock_nft();
    let config = ConfigTree::from_value(json!({
        "firewall": {
            "ipv4": {
                "name": {
                    "NOT-APPLIED": {
                        "rule": {"10": {"action": "accept"}}
                    }
                }
            }
        }
    }));

    // The mock knows no such chain and exits non-zero; the view must still
    // render the declared rule, just without packet/byte columns.
    let out = op::firewall::show(&config, Family::Ipv4, "name", "NOT-APPLIED", None).await;
    let rule10 = out.lines().find(|l| l.starts_with("10")).expect("rule 10 row");
    assert_eq!(rule10.split_whitespace().collect::<Vec<_>>(), ["10", "accept", "all"]);
}

#[tokio::test]
async fn test_policy_route_show_with_bindings_and_counters() {
    setup_mock_nft();
    let out = op::policy_route::show(&firewall_config(), "PBR-LAN", false, None).await;

    assert!(out.contains("IPv4 Policy Route \"PBR-LAN\""));
    assert!(out.contains("Active on: (eth1,route)"));

    let rule10 = out.lines().find(|l| l.starts_with("10")).expect("rule 10 row");
    assert!(rule10.contains('9'));
    assert!(rule10.contains("900"));
    // return is an action verb: stripped from the condition column
    assert!(rule10.contains("udp dport 53"));
    assert!(!rule10.contains("return"));
}

#[tokio::test]
async fn test_show_all_covers_every_ruleset() {
    setup_mock_nft();
    let out = op::firewall::show_all(&firewall_config()).await;
    assert!(out.starts_with("Rulesets Information"));
    assert!(out.contains("WAN-IN"));
}

#[test]
fn test_scrape_matches_only_requested_priority() {
    // One dump concatenating two rulesets' markers; only the requested
    // priority's rules may appear.
    let dump = "\
ip saddr 10.0.0.1 counter packets 5 bytes 300 accept comment \"A-100-1\"
ip saddr 10.0.0.2 counter packets 6 bytes 360 accept comment \"B-200-1\"
";
    let out = scrape_chain_dump(dump, "100");
    assert_eq!(out.len(), 1);
    assert!(out.contains_key("1"));
    assert_eq!(out["1"].counters.unwrap().packets, 5);
}

#[test]
fn test_service_renders_install_to_disk() {
    // The render pipelines are pure; exercise them against a scratch dir the
    // way generate() wires them to the fixed system paths.
    let dir = tempfile::tempdir().unwrap();

    let https = services::https::HttpsConfig {
        servers: vec![services::https::ServerBlock::default()],
    };
    let nginx_path = dir.path().join("nginx-default");
    vycfg::files::install(&nginx_path, &services::https::render(&https), 0o644).unwrap();
    let written = std::fs::read_to_string(&nginx_path).unwrap();
    assert!(written.contains("listen 443 ssl;"));

    let munin = services::munin::MuninConfig {
        node_name: "edge".into(),
        port: "4949".into(),
        server: Some("192.0.2.7".into()),
    };
    let munin_path = dir.path().join("munin-node.conf");
    vycfg::files::install(&munin_path, &services::munin::render(&munin), 0o644).unwrap();
    assert!(std::fs::read_to_string(&munin_path)
        .unwrap()
        .contains("host_name edge"));

    let smoke = services::smokeping::SmokepingConfig {
        instrumentation_url: Some("https://probe.example.com".into()),
        client_name: Some("edge".into()),
        client_secret: Some("s3cret".into()),
    };
    let secret_path = dir.path().join("clientsecrets.conf");
    vycfg::files::install(
        &secret_path,
        &services::smokeping::render_secrets(&smoke),
        0o400,
    )
    .unwrap();
    let mode = std::fs::metadata(&secret_path).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o400);
}

#[tokio::test]
async fn test_config_tree_load_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, serde_json::to_string(firewall_config().root()).unwrap()).unwrap();

    let loaded = ConfigTree::load(&path).await.unwrap();
    assert!(loaded.exists(&["firewall", "ipv4", "name", "WAN-IN"]));
}
