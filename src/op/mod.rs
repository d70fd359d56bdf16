//! Operational-mode views
//!
//! Read-only `show` commands that join the running configuration against
//! live kernel state:
//!
//! - [`firewall`]: firewall rulesets, statistics, groups and summaries
//! - [`policy_route`]: policy-route rulesets and interface bindings

pub mod firewall;
pub mod policy_route;
