//! Rule-counter reconciliation
//!
//! Matches the live text dump of one packet-filter chain against the rule
//! identifiers declared in configuration. Each rule applied by the
//! configuration backend carries a comment marker of the form
//! `<priority>-<number>` (or `<priority> default-action` for the implicit
//! fallback rule), which is the join key between kernel state and
//! configuration.
//!
//! The scraper is a pure function over the dump text: it holds no state
//! between calls and performs no I/O. Fetching the dump itself, and the
//! degrade-to-empty behavior when the privileged command fails, live in
//! [`crate::nft`].

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

/// Identifier of the chain's implicit fallback rule.
pub const DEFAULT_ACTION_ID: &str = "default-action";

/// Counter clause as printed by `nft list chain`.
static COUNTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"counter packets (\d+) bytes (\d+)").expect("Invalid regex pattern")
});

/// Clauses removed from a rule line when normalizing its condition text:
/// the counter clause, bare action verbs, and the quoted comment annotation.
/// `accept` is deliberately not in the verb set; it is part of the visible
/// condition summary.
static STRIP_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(\b(counter packets \d+ bytes \d+|drop|reject|return|log)\b|comment "[\w\-]+")"#)
        .expect("Invalid regex pattern")
});

/// Packet/byte counters captured from one rule line at scrape time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSnapshot {
    pub packets: u64,
    pub bytes: u64,
}

/// What the live chain revealed about one declared rule.
///
/// `counters` is `None` when the rule carried no counter clause (policy-only
/// rule, or counters disabled); rendering that as `0` is the display layer's
/// choice, not recorded here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleObservation {
    pub counters: Option<CounterSnapshot>,
    /// The rule's match expression with counters, action verbs, the comment
    /// annotation and the rule marker stripped out, whitespace-normalized.
    pub conditions: String,
}

/// Mapping from rule identifier to its live observation.
///
/// Carries no iteration-order contract; callers join it against the
/// declaratively ordered rule list by identifier lookup.
pub type ObservationMap = HashMap<String, RuleObservation>;

/// Scrapes a chain dump into per-rule observations.
///
/// `priority` is the ruleset's priority token; only lines whose marker
/// carries that token are considered, so a dump concatenating several chains
/// only yields the requested ruleset's rules. Lines without a marker (chain
/// boilerplate, rules of other priorities) are skipped. If one identifier
/// appears on several lines the last line wins.
pub fn scrape_chain_dump(dump: &str, priority: &str) -> ObservationMap {
    let marker_re = match Regex::new(&format!(
        r"{}[\- ](\d+|default-action)",
        regex::escape(priority)
    )) {
        Ok(re) => re,
        Err(_) => return ObservationMap::new(),
    };

    let mut out = ObservationMap::new();
    for line in dump.lines() {
        let Some(marker) = marker_re.captures(line) else {
            continue;
        };
        let rule_id = marker[1].to_string();

        let counters = COUNTER_RE.captures(line).and_then(|caps| {
            Some(CounterSnapshot {
                packets: caps[1].parse().ok()?,
                bytes: caps[2].parse().ok()?,
            })
        });

        // The marker text itself is noise in the condition summary. It is
        // usually embedded in the comment annotation (already stripped); a
        // bare occurrence is dropped explicitly.
        let stripped = STRIP_RE.replace_all(line, "");
        let without_marker = stripped.replacen(&marker[0], "", 1);
        let conditions = normalize_whitespace(&without_marker);

        out.insert(rule_id, RuleObservation { counters, conditions });
    }
    out
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_and_verb_stripping() {
        let dump = r#"ip saddr 192.0.2.1 counter packets 42 bytes 1000 drop comment "FILTER-100-5""#;
        let out = scrape_chain_dump(dump, "100");

        let obs = &out["5"];
        assert_eq!(
            obs.counters,
            Some(CounterSnapshot {
                packets: 42,
                bytes: 1000
            })
        );
        assert!(!obs.conditions.contains("drop"));
        assert!(!obs.conditions.contains("counter"));
        assert_eq!(obs.conditions, "ip saddr 192.0.2.1");
    }

    #[test]
    fn test_default_action_without_counters() {
        let dump = r#"100 default-action continue"#;
        let out = scrape_chain_dump(dump, "100");

        let obs = &out[DEFAULT_ACTION_ID];
        assert_eq!(obs.counters, None);
        assert_eq!(obs.conditions, "continue");
    }

    #[test]
    fn test_lines_without_marker_are_skipped() {
        let dump = "table ip vyos_filter {\n\tchain NAME_WAN {\n\t}\n}";
        assert!(scrape_chain_dump(dump, "WAN").is_empty());
    }

    #[test]
    fn test_foreign_priority_markers_ignored() {
        let dump = r#"ip saddr 10.0.0.1 counter packets 1 bytes 60 accept comment "200-1""#;
        assert!(scrape_chain_dump(dump, "100").is_empty());
    }

    #[test]
    fn test_empty_dump_yields_empty_mapping() {
        assert!(scrape_chain_dump("", "100").is_empty());
    }

    #[test]
    fn test_scraping_is_idempotent() {
        let dump = "100-1 counter packets 3 bytes 180 drop\n100-2 accept\nnoise line\n";
        let first = scrape_chain_dump(dump, "100");
        let second = scrape_chain_dump(dump, "100");
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_accept_survives_in_conditions() {
        let dump = r#"100-1 ip saddr 10.0.0.1 counter packets 3 bytes 180 accept comment "RULE1""#;
        let out = scrape_chain_dump(dump, "100");

        let obs = &out["1"];
        assert_eq!(
            obs.counters,
            Some(CounterSnapshot {
                packets: 3,
                bytes: 180
            })
        );
        assert_eq!(obs.conditions, "ip saddr 10.0.0.1 accept");
    }

    #[test]
    fn test_counter_only_rule_has_empty_conditions() {
        let dump = r#"100-9 counter packets 7 bytes 420 drop comment "x""#;
        let out = scrape_chain_dump(dump, "100");
        assert_eq!(out["9"].conditions, "");
    }

    #[test]
    fn test_duplicate_identifier_last_line_wins() {
        let dump = "100-1 counter packets 1 bytes 10 drop\n100-1 counter packets 2 bytes 20 drop\n";
        let out = scrape_chain_dump(dump, "100");
        assert_eq!(
            out["1"].counters,
            Some(CounterSnapshot {
                packets: 2,
                bytes: 20
            })
        );
    }

    #[test]
    fn test_space_separated_marker() {
        let dump = "100 default-action counter packets 11 bytes 880 drop";
        let out = scrape_chain_dump(dump, "100");
        let obs = &out[DEFAULT_ACTION_ID];
        assert_eq!(
            obs.counters,
            Some(CounterSnapshot {
                packets: 11,
                bytes: 880
            })
        );
        assert_eq!(obs.conditions, "");
    }

    #[test]
    fn test_marker_embedded_in_comment_is_stripped_with_comment() {
        let dump = r#"tcp dport 22 counter packets 5 bytes 300 accept comment "WAN-LOCAL-100-10""#;
        let out = scrape_chain_dump(dump, "100");
        assert_eq!(out["10"].conditions, "tcp dport 22 accept");
    }

    #[test]
    fn test_priority_with_regex_metacharacters() {
        // Priority tokens are ruleset names for policy routes; a name with a
        // dot must not be treated as a regex wildcard.
        let dump = r#"counter packets 1 bytes 60 accept comment "PBRX1-1""#;
        assert!(scrape_chain_dump(dump, "PBR.1").is_empty());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_synthesized_line_round_trip(
            id in 1u32..100_000,
            packets in any::<u64>(),
            bytes in any::<u64>()
        ) {
            let line = format!(
                "100-{id} counter packets {packets} bytes {bytes} drop comment \"x\""
            );
            let out = scrape_chain_dump(&line, "100");
            let obs = &out[&id.to_string()];
            prop_assert_eq!(obs.counters, Some(CounterSnapshot { packets, bytes }));
            prop_assert_eq!(obs.conditions.as_str(), "");
        }

        #[test]
        fn test_unmarked_lines_never_produce_entries(text in "[a-z ]{0,40}") {
            // The charset excludes digits and hyphens, so no marker can match.
            let out = scrape_chain_dump(&text, "100");
            prop_assert!(out.is_empty());
        }
    }
}
