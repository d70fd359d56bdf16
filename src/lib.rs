//! vycfg - VyOS-style router configuration and operational tooling
//!
//! Thin translators between a hierarchical router configuration tree and the
//! system: operational-mode views that join declared firewall / policy-route
//! rules against live nftables counters, and configuration-mode commits that
//! render third-party daemon configs and restart services.
//!
//! # Architecture
//!
//! - [`core`] - Counter reconciliation, chain naming, rule display helpers
//! - [`config`] - Configuration store accessor (nested mapping + path lookup)
//! - [`nft`] - Privileged chain-dump invoker with graceful degradation
//! - [`op`] - Operational-mode table views (`show firewall`, `show policy-route`)
//! - [`services`] - Configuration-mode translators (nginx, munin-node, smokeping)
//! - [`elevation`] - Privilege escalation for nft/systemctl
//! - [`files`] - Atomic installation of generated files
//! - [`table`] - Plain-text table rendering

// Allow pedantic clippy warnings that are not worth fixing for this codebase
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod core;
pub mod elevation;
pub mod files;
pub mod nft;
pub mod op;
pub mod services;
pub mod table;

// Re-export commonly used types
pub use crate::core::error::{Error, Result};
pub use crate::core::reconcile::{CounterSnapshot, ObservationMap, RuleObservation, scrape_chain_dump};
