//! Firewall operational-mode views
//!
//! Joins the declarative firewall configuration against live chain counters
//! and renders the `show firewall` family of tables. Declarative order is
//! preserved by iterating the configured rules and looking observations up
//! by identifier; the observation mapping itself carries no order.

use crate::config::{self, ConfigTree};
use crate::core::chain::{Family, firewall_chain};
use crate::core::reconcile::{DEFAULT_ACTION_ID, ObservationMap};
use crate::core::ruleset;
use crate::nft;
use crate::table::Table;
use ipnetwork::IpNetwork;
use serde_json::Value;
use std::fmt::Write;

const FAMILIES: [Family; 3] = [Family::Ipv4, Family::Ipv6, Family::Bridge];

const RULESET_HEADER: [&str; 6] = ["Rule", "Action", "Protocol", "Packets", "Bytes", "Conditions"];
const STATISTICS_HEADER: [&str; 8] = [
    "Rule",
    "Packets",
    "Bytes",
    "Action",
    "Source",
    "Destination",
    "Inbound-Interface",
    "Outbound-interface",
];

fn section_title(family: Family, hook: &str, priority: &str) -> String {
    format!("\n---------------------------------\n{family} Firewall \"{hook} {priority}\"\n\n")
}

fn counter_cells(observations: &ObservationMap, rule_id: &str) -> (String, String) {
    match observations.get(rule_id).and_then(|obs| obs.counters) {
        Some(counters) => (counters.packets.to_string(), counters.bytes.to_string()),
        None => ("0".to_string(), "0".to_string()),
    }
}

/// Renders one ruleset's Rule/Action/Protocol/Packets/Bytes/Conditions table.
async fn render_ruleset(
    family: Family,
    hook: &str,
    priority: &str,
    ruleset_conf: &Value,
    single_rule_id: Option<&str>,
) -> String {
    let mut out = section_title(family, hook, priority);

    let chain = firewall_chain(family, hook, priority);
    let observations = nft::chain_observations(&chain, priority).await;

    let mut table = Table::new(RULESET_HEADER);
    for (rule_id, rule_conf) in config::rule_entries(ruleset_conf) {
        if single_rule_id.is_some_and(|single| single != rule_id.as_str()) {
            continue;
        }
        if ruleset::is_disabled(rule_conf) {
            continue;
        }

        let mut row = vec![
            rule_id.clone(),
            ruleset::action_or(rule_conf, "accept").to_string(),
            ruleset::protocol(rule_conf).to_string(),
        ];
        if let Some(obs) = observations.get(rule_id.as_str()) {
            let (packets, bytes) = counter_cells(&observations, rule_id);
            row.push(packets);
            row.push(bytes);
            row.push(obs.conditions.clone());
        }
        table.push_row(row);
    }

    if single_rule_id.is_none()
        && let Some(default_action) = config::search_str(ruleset_conf, &["default_action"])
    {
        let mut row = vec![
            "default".to_string(),
            default_action.to_string(),
            "all".to_string(),
        ];
        if observations.contains_key(DEFAULT_ACTION_ID) {
            let (packets, bytes) = counter_cells(&observations, DEFAULT_ACTION_ID);
            row.push(packets);
            row.push(bytes);
        }
        table.push_row(row);
    }

    if !table.is_empty() {
        out.push_str(&table.render());
        out.push('\n');
    }
    out
}

/// Renders one ruleset's per-rule statistics table, resolving the address
/// and interface columns through the extractor-strategy lists.
async fn render_ruleset_statistics(
    family: Family,
    hook: &str,
    priority: &str,
    ruleset_conf: &Value,
) -> String {
    let mut out = section_title(family, hook, priority);

    let chain = firewall_chain(family, hook, priority);
    let observations = nft::chain_observations(&chain, priority).await;

    let mut table = Table::new(STATISTICS_HEADER);
    for (rule_id, rule_conf) in config::rule_entries(ruleset_conf) {
        if ruleset::is_disabled(rule_conf) {
            continue;
        }

        let (packets, bytes) = counter_cells(&observations, rule_id);
        table.push_row(vec![
            rule_id.clone(),
            packets,
            bytes,
            ruleset::action_or(rule_conf, "accept").to_string(),
            ruleset::address_display(rule_conf, "source"),
            ruleset::address_display(rule_conf, "destination"),
            ruleset::interface_display(rule_conf, "inbound_interface"),
            ruleset::interface_display(rule_conf, "outbound_interface"),
        ]);
    }

    let default_action = config::search_str(ruleset_conf, &["default_action"]);
    if matches!(hook, "input" | "forward" | "output") {
        // Base hooks always carry an implicit fallback; its counters are not
        // tracked separately.
        table.push_row(vec![
            "default".to_string(),
            "N/A".to_string(),
            "N/A".to_string(),
            default_action.unwrap_or("accept").to_string(),
            "any".to_string(),
            "any".to_string(),
            "any".to_string(),
            "any".to_string(),
        ]);
    } else if let Some(default_action) = default_action {
        let (packets, bytes) = counter_cells(&observations, DEFAULT_ACTION_ID);
        table.push_row(vec![
            "default".to_string(),
            packets,
            bytes,
            default_action.to_string(),
            "any".to_string(),
            "any".to_string(),
            "any".to_string(),
            "any".to_string(),
        ]);
    }

    if !table.is_empty() {
        out.push_str(&table.render());
        out.push('\n');
    }
    out
}

fn family_rulesets(firewall: &Value, family: Family) -> Vec<(&String, &String, &Value)> {
    let mut rulesets = Vec::new();
    let Some(hooks) = config::search(firewall, &[&family.to_string()]) else {
        return rulesets;
    };
    for (hook, hook_conf) in config::entries(hooks) {
        for (priority, priority_conf) in config::entries(hook_conf) {
            rulesets.push((hook, priority, priority_conf));
        }
    }
    rulesets
}

/// `show firewall <family> <hook> <priority> [rule]`
pub async fn show(
    config: &ConfigTree,
    family: Family,
    hook: &str,
    priority: &str,
    rule_id: Option<&str>,
) -> String {
    let mut out = if rule_id.is_some() {
        "Rule Information\n".to_string()
    } else {
        "Ruleset Information\n".to_string()
    };

    if let Some(ruleset_conf) = config.get(&["firewall", &family.to_string(), hook, priority]) {
        let rendered = render_ruleset(family, hook, priority, ruleset_conf, rule_id).await;
        out.push_str(&rendered);
    }
    out
}

/// `show firewall` — every configured ruleset across all families.
pub async fn show_all(config: &ConfigTree) -> String {
    let mut out = "Rulesets Information\n".to_string();
    let Some(firewall) = config.get(&["firewall"]) else {
        return out;
    };

    for family in FAMILIES {
        for (hook, priority, priority_conf) in family_rulesets(firewall, family) {
            let rendered = render_ruleset(family, hook, priority, priority_conf, None).await;
            out.push_str(&rendered);
        }
    }
    out
}

/// `show firewall <family>` — one family's rulesets.
pub async fn show_family(config: &ConfigTree, family: Family) -> String {
    let mut out = format!("Rulesets {family} Information\n");
    let Some(firewall) = config.get(&["firewall"]) else {
        return out;
    };

    for (hook, priority, priority_conf) in family_rulesets(firewall, family) {
        let rendered = render_ruleset(family, hook, priority, priority_conf, None).await;
        out.push_str(&rendered);
    }
    out
}

/// `show firewall statistics`
pub async fn show_statistics(config: &ConfigTree) -> String {
    let mut out = "Rulesets Statistics\n".to_string();
    let Some(firewall) = config.get(&["firewall"]) else {
        return out;
    };

    for family in FAMILIES {
        for (hook, priority, priority_conf) in family_rulesets(firewall, family) {
            let rendered = render_ruleset_statistics(family, hook, priority, priority_conf).await;
            out.push_str(&rendered);
        }
    }
    out
}

/// Hook-name sets scanned for group references, per family.
fn reference_hooks(family: Family) -> [&'static str; 4] {
    match family {
        Family::Ipv6 => ["ipv6_name", "forward", "input", "output"],
        Family::Ipv4 | Family::Bridge => ["name", "forward", "input", "output"],
    }
}

/// Families whose rules can reference a given group type. The ipv6-specific
/// group types are stored under their own key but referenced in rules under
/// the base type name.
fn reference_families(group_type: &str) -> (Vec<Family>, &str) {
    match group_type {
        "address_group" | "network_group" => (vec![Family::Ipv4], group_type),
        "ipv6_address_group" => (vec![Family::Ipv6], "address_group"),
        "ipv6_network_group" => (vec![Family::Ipv6], "network_group"),
        _ => (vec![Family::Ipv4, Family::Ipv6], group_type),
    }
}

fn matches_group(reference: Option<&Value>, group_name: &str) -> bool {
    let Some(reference) = reference.and_then(Value::as_str) else {
        return false;
    };
    // A leading "!" negates the match in rule semantics but still references
    // the group.
    reference.strip_prefix('!').unwrap_or(reference) == group_name
}

fn find_references(firewall: &Value, group_type: &str, group_name: &str) -> Vec<String> {
    let mut references = Vec::new();
    let (families, rule_group_type) = reference_families(group_type);

    for family in families {
        let family_key = family.to_string();
        for hook in reference_hooks(family) {
            let Some(priorities) = config::search(firewall, &[&family_key, hook]) else {
                continue;
            };
            for (priority, priority_conf) in config::entries(priorities) {
                for (rule_id, rule_conf) in config::rule_entries(priority_conf) {
                    let referenced = [
                        config::search(rule_conf, &["source", "group", rule_group_type]),
                        config::search(rule_conf, &["destination", "group", rule_group_type]),
                        config::search(rule_conf, &["inbound_interface", "interface_group"]),
                        config::search(rule_conf, &["outbound_interface", "interface_group"]),
                    ];
                    if referenced
                        .iter()
                        .any(|reference| matches_group(*reference, group_name))
                    {
                        references.push(format!("{family_key}-{hook}-{priority}-{rule_id}"));
                    }
                }
            }
        }
    }
    references
}

/// Sorts network-group members numerically rather than lexically, so
/// 10.0.0.0/8 precedes 192.0.2.0/24. Unparsable entries sort last.
fn sort_networks(members: &mut [String]) {
    members.sort_by_key(|member| match member.parse::<IpNetwork>() {
        Ok(network) => (0u8, Some(network), String::new()),
        Err(_) => (1u8, None, member.clone()),
    });
}

fn group_members(group_conf: &Value) -> String {
    for key in ["address", "network", "mac_address", "port", "interface"] {
        if let Some(values) = config::search(group_conf, &[key]) {
            let mut members = config::leaf_values(values);
            if key == "network" {
                sort_networks(&mut members);
            } else {
                members.sort();
            }
            return members.join("\n");
        }
    }
    "N/D".to_string()
}

/// `show firewall group [name]`
pub fn show_group(config: &ConfigTree, name: Option<&str>) -> String {
    let mut out = String::new();
    let Some(firewall) = config.get(&["firewall"]) else {
        return out;
    };
    let Some(groups) = config::search(firewall, &["group"]) else {
        return out;
    };

    let mut table = Table::new(["Name", "Type", "References", "Members"]);
    for (group_type, group_type_conf) in config::entries(groups) {
        for (group_name, group_conf) in config::entries(group_type_conf) {
            if name.is_some_and(|filter| filter != group_name.as_str()) {
                continue;
            }

            let references = find_references(firewall, group_type, group_name);
            let references_cell = if references.is_empty() {
                "N/D".to_string()
            } else {
                references.join("\n")
            };
            table.push_row(vec![
                group_name.clone(),
                group_type.clone(),
                references_cell,
                group_members(group_conf),
            ]);
        }
    }

    if !table.is_empty() {
        out.push_str("Firewall Groups\n\n");
        out.push_str(&table.render());
    }
    out
}

/// `show firewall summary`
pub fn show_summary(config: &ConfigTree) -> String {
    let mut out = "Ruleset Summary\n".to_string();
    let Some(firewall) = config.get(&["firewall"]) else {
        return out;
    };

    let mut sections: Vec<(&str, Table)> = Vec::new();
    for (family, label) in [
        (Family::Ipv6, "IPv6 Ruleset"),
        (Family::Ipv4, "IPv4 Ruleset"),
        (Family::Bridge, "Bridge Ruleset"),
    ] {
        let mut table = Table::new(["Ruleset Hook", "Ruleset Priority", "Description", "References"]);
        for (hook, priority, priority_conf) in family_rulesets(firewall, family) {
            let description = config::search_str(priority_conf, &["description"]).unwrap_or("");
            table.push_row(vec![
                hook.clone(),
                priority.clone(),
                description.to_string(),
            ]);
        }
        sections.push((label, table));
    }

    for (label, table) in sections {
        if !table.is_empty() {
            let _ = write!(out, "\n{label}:\n\n{}\n", table.render());
        }
    }

    let groups = show_group(config, None);
    if !groups.is_empty() {
        out.push('\n');
        out.push_str(&groups);
    }
    out
}
