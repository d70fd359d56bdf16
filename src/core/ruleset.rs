//! Declarative rule views
//!
//! Helpers that read display fields out of one configured rule node. The
//! source/destination/interface columns of the statistics view can come from
//! several alternative configuration nodes; each column is resolved through
//! an ordered list of extractor strategies, first match wins, with `any` as
//! the fallback when no strategy applies.

use crate::config::{leaf_display, search, search_str};
use serde_json::Value;

/// One way of extracting a display value from a rule subtree.
type Extractor = fn(&Value) -> Option<String>;

/// True when the rule is marked inactive and must be excluded from display.
pub fn is_disabled(rule: &Value) -> bool {
    search(rule, &["disable"]).is_some()
}

/// The rule's action, with the caller-supplied fallback for rules that
/// carry none (policy routes default to `set`).
pub fn action_or<'a>(rule: &'a Value, default: &'a str) -> &'a str {
    search_str(rule, &["action"]).unwrap_or(default)
}

/// The rule's protocol match, `all` when unrestricted.
pub fn protocol(rule: &Value) -> &str {
    search_str(rule, &["protocol"]).unwrap_or("all")
}

fn geoip(side: &Value) -> Option<String> {
    let codes = search(side, &["geoip", "country_code"])?;
    let display = leaf_display(codes);
    if search(side, &["geoip", "inverse_match"]).is_some() {
        Some(format!("NOT {display}"))
    } else {
        Some(display)
    }
}

/// Resolves the source or destination column for one rule.
///
/// `side` is `source` or `destination`. Strategies are tried in priority
/// order: plain address, then the group kinds, then fqdn, then geoip.
pub fn address_display(rule: &Value, side: &str) -> String {
    let extractors: [Extractor; 6] = [
        |s| search(s, &["address"]).map(leaf_display),
        |s| search(s, &["group", "address_group"]).map(leaf_display),
        |s| search(s, &["group", "network_group"]).map(leaf_display),
        |s| search(s, &["group", "domain_group"]).map(leaf_display),
        |s| search(s, &["fqdn"]).map(leaf_display),
        geoip,
    ];

    search(rule, &[side])
        .and_then(|node| extractors.iter().find_map(|extract| extract(node)))
        .unwrap_or_else(|| "any".to_string())
}

/// Resolves the inbound or outbound interface column for one rule.
///
/// `direction` is `inbound_interface` or `outbound_interface`.
pub fn interface_display(rule: &Value, direction: &str) -> String {
    let extractors: [Extractor; 2] = [
        |node| search(node, &["interface_name"]).map(leaf_display),
        |node| search(node, &["interface_group"]).map(leaf_display),
    ];

    search(rule, &[direction])
        .and_then(|node| extractors.iter().find_map(|extract| extract(node)))
        .unwrap_or_else(|| "any".to_string())
}
