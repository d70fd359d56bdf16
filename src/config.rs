//! Configuration store accessor
//!
//! Operational- and configuration-mode commands read the router's running
//! configuration as a nested JSON mapping, the shape produced by the
//! configuration backend: node names are key-mangled (`-` becomes `_`) while
//! tag-node values (rule numbers, ruleset names, group names, addresses)
//! keep their configured spelling. The tree is loaded from a dump file whose
//! location comes from `--config`, the `VYCFG_CONFIG` environment variable,
//! or the fixed default path.

use crate::core::error::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Default location of the running-configuration dump.
pub const DEFAULT_CONFIG_PATH: &str = "/run/vycfg/config.json";

/// Nested mapping view of the running configuration.
#[derive(Debug, Clone, Default)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    /// Loads the configuration dump from `path`.
    pub async fn load(path: &Path) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        let root: Value = serde_json::from_str(&text)?;
        Ok(Self { root })
    }

    /// Resolves the dump location from an explicit flag, the environment,
    /// or the default path, in that order.
    pub fn resolve_path(flag: Option<&Path>) -> PathBuf {
        if let Some(path) = flag {
            return path.to_path_buf();
        }
        if let Ok(env_path) = std::env::var("VYCFG_CONFIG") {
            return PathBuf::from(env_path);
        }
        PathBuf::from(DEFAULT_CONFIG_PATH)
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// Walks `path` through the tree; `None` at the first missing component.
    pub fn get(&self, path: &[&str]) -> Option<&Value> {
        search(&self.root, path)
    }

    pub fn exists(&self, path: &[&str]) -> bool {
        self.get(path).is_some()
    }
}

/// Walks a key path through a nested mapping node.
///
/// Equivalent of the configuration backend's `dict_search_args`: returns
/// `None` as soon as a component is missing or a non-mapping is traversed.
pub fn search<'a>(node: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = node;
    for key in path {
        current = current.as_object()?.get(*key)?;
    }
    Some(current)
}

/// String-typed variant of [`search`].
pub fn search_str<'a>(node: &'a Value, path: &[&str]) -> Option<&'a str> {
    search(node, path).and_then(Value::as_str)
}

/// Child entries of a mapping node, in key order.
pub fn entries(node: &Value) -> Vec<(&String, &Value)> {
    node.as_object()
        .map(|map| map.iter().collect())
        .unwrap_or_default()
}

/// Rule entries of a ruleset node, in declarative (numeric) order.
///
/// Rule keys are decimal strings; a lexicographic walk would put "10" before
/// "2", so ordering is by parsed value. Non-numeric keys (not expected in
/// well-formed configs) sort after the numeric ones.
pub fn rule_entries(ruleset: &Value) -> Vec<(&String, &Value)> {
    let Some(rules_node) = search(ruleset, &["rule"]) else {
        return Vec::new();
    };
    let mut rules = entries(rules_node);
    rules.sort_by(|(a, _), (b, _)| match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => std::cmp::Ordering::Less,
        (Err(_), Ok(_)) => std::cmp::Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    });
    rules
}

/// Renders a leaf value for display: strings verbatim, lists joined with
/// a comma, everything else through its JSON form.
pub fn leaf_display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Leaf values that the backend may emit as a scalar or a list.
pub fn leaf_values(value: &Value) -> Vec<String> {
    match value {
        Value::String(s) => vec![s.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
