//! Policy-route operational-mode views
//!
//! Same join as the firewall views, against the `VYOS_PBR` chains in the
//! mangle table: the ruleset name doubles as the marker priority token. In
//! addition, each policy shows which interfaces it is bound to, found by
//! walking the interfaces tree (including vif sub-interfaces).

use crate::config::{self, ConfigTree};
use crate::core::chain::policy_route_chain;
use crate::core::reconcile::DEFAULT_ACTION_ID;
use crate::core::ruleset;
use crate::nft;
use crate::table::Table;
use serde_json::Value;
use std::collections::HashMap;

const RULESET_HEADER: [&str; 6] = ["Rule", "Action", "Protocol", "Packets", "Bytes", "Conditions"];

fn route_kind(ipv6: bool) -> &'static str {
    if ipv6 { "route6" } else { "route" }
}

fn collect_interface(
    bindings: &mut HashMap<String, Vec<String>>,
    kind: &str,
    ifname: &str,
    if_conf: &Value,
) {
    if let Some(route_name) = config::search_str(if_conf, &["policy", kind]) {
        bindings
            .entry(route_name.to_string())
            .or_default()
            .push(format!("({ifname},{kind})"));
    }

    for vif_kind in ["vif", "vif_s", "vif_c"] {
        if let Some(vifs) = config::search(if_conf, &[vif_kind]) {
            for (vifname, vif_conf) in config::entries(vifs) {
                collect_interface(bindings, kind, &format!("{ifname}.{vifname}"), vif_conf);
            }
        }
    }
}

/// Maps each policy name to the `(interface,route-kind)` bindings using it.
fn interface_bindings(config: &ConfigTree, ipv6: bool) -> HashMap<String, Vec<String>> {
    let mut bindings = HashMap::new();
    let kind = route_kind(ipv6);

    let Some(interfaces) = config.get(&["interfaces"]) else {
        return bindings;
    };
    for (_, iftype_conf) in config::entries(interfaces) {
        for (ifname, if_conf) in config::entries(iftype_conf) {
            collect_interface(&mut bindings, kind, ifname, if_conf);
        }
    }
    bindings
}

async fn render_policy(
    name: &str,
    route_conf: &Value,
    bindings: &[String],
    ipv6: bool,
    single_rule_id: Option<&str>,
) -> String {
    let ip_str = if ipv6 { "IPv6" } else { "IPv4" };
    let mut out = format!("\n---------------------------------\n{ip_str} Policy Route \"{name}\"\n\n");

    if !bindings.is_empty() {
        out.push_str(&format!("Active on: {}\n\n", bindings.join(" ")));
    }

    let chain = policy_route_chain(name, ipv6);
    let observations = nft::chain_observations(&chain, name).await;

    let mut table = Table::new(RULESET_HEADER);
    for (rule_id, rule_conf) in config::rule_entries(route_conf) {
        if single_rule_id.is_some_and(|single| single != rule_id.as_str()) {
            continue;
        }
        if ruleset::is_disabled(rule_conf) {
            continue;
        }

        let mut row = vec![
            rule_id.clone(),
            ruleset::action_or(rule_conf, "set").to_string(),
            ruleset::protocol(rule_conf).to_string(),
        ];
        if let Some(obs) = observations.get(rule_id.as_str()) {
            let counters = obs.counters;
            row.push(counters.map_or_else(|| "0".to_string(), |c| c.packets.to_string()));
            row.push(counters.map_or_else(|| "0".to_string(), |c| c.bytes.to_string()));
            row.push(obs.conditions.clone());
        }
        table.push_row(row);
    }

    if single_rule_id.is_none()
        && let Some(default_action) = config::search_str(route_conf, &["default_action"])
    {
        let mut row = vec![
            "default".to_string(),
            default_action.to_string(),
            "all".to_string(),
        ];
        if let Some(obs) = observations.get(DEFAULT_ACTION_ID) {
            let counters = obs.counters;
            row.push(counters.map_or_else(|| "0".to_string(), |c| c.packets.to_string()));
            row.push(counters.map_or_else(|| "0".to_string(), |c| c.bytes.to_string()));
        }
        table.push_row(row);
    }

    if !table.is_empty() {
        out.push_str(&table.render());
        out.push('\n');
    }
    out
}

/// `show policy-route <name> [rule]`
pub async fn show(config: &ConfigTree, name: &str, ipv6: bool, rule_id: Option<&str>) -> String {
    let mut out = if rule_id.is_some() {
        "Rule Information\n".to_string()
    } else {
        "Ruleset Information\n".to_string()
    };

    if let Some(route_conf) = config.get(&["policy", route_kind(ipv6), name]) {
        let bindings = interface_bindings(config, ipv6);
        let empty = Vec::new();
        let bound = bindings.get(name).unwrap_or(&empty);
        out.push_str(&render_policy(name, route_conf, bound, ipv6, rule_id).await);
    }
    out
}

/// `show policy-route` — all policies of one family.
pub async fn show_all(config: &ConfigTree, ipv6: bool) -> String {
    let mut out = "Ruleset Information\n".to_string();
    let Some(routes) = config.get(&["policy", route_kind(ipv6)]) else {
        return out;
    };

    let bindings = interface_bindings(config, ipv6);
    let empty = Vec::new();
    for (name, route_conf) in config::entries(routes) {
        let bound = bindings.get(name.as_str()).unwrap_or(&empty);
        out.push_str(&render_policy(name, route_conf, bound, ipv6, None).await);
    }
    out
}
