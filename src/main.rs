//! vycfg - VyOS-style router configuration and operational tooling
//!
//! # Usage
//!
//! ```bash
//! # Operational mode
//! vycfg firewall show ipv4 name WAN-IN
//! vycfg firewall show ipv4 name WAN-IN --rule 10
//! vycfg firewall show-all
//! vycfg firewall show-statistics
//! vycfg firewall show-group
//! vycfg policy-route show PBR-LAN
//! vycfg policy-route show-all --ipv6
//!
//! # Configuration mode (after a commit changed the subtree)
//! vycfg service https
//! vycfg service munin-node
//! vycfg service smokeping
//! ```
//!
//! The running-configuration dump is read from `--config`, `VYCFG_CONFIG`,
//! or `/run/vycfg/config.json`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use vycfg::config::ConfigTree;
use vycfg::core::chain::Family;
use vycfg::{op, services};

#[derive(Parser)]
#[command(name = "vycfg")]
#[command(about = "Router firewall views and service config translators", long_about = None)]
struct Cli {
    /// Path to the running-configuration dump
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Firewall ruleset views
    #[command(subcommand)]
    Firewall(FirewallCommand),
    /// Policy-route ruleset views
    #[command(subcommand)]
    PolicyRoute(PolicyRouteCommand),
    /// Commit a service configuration (verify, generate, apply)
    #[command(subcommand)]
    Service(ServiceCommand),
}

#[derive(Subcommand)]
enum FirewallCommand {
    /// Show one ruleset, optionally narrowed to a single rule
    Show {
        /// Address family (ipv4, ipv6, bridge)
        family: Family,
        /// Hook (input, forward, output, name, ipv6-name)
        hook: String,
        /// Ruleset priority token
        priority: String,
        /// Show only this rule number
        #[arg(long)]
        rule: Option<String>,
    },
    /// Show every configured ruleset
    ShowAll,
    /// Show one family's rulesets
    ShowFamily {
        /// Address family (ipv4, ipv6, bridge)
        family: Family,
    },
    /// Show firewall groups, their members and references
    ShowGroup {
        /// Show only this group
        name: Option<String>,
    },
    /// Show per-rule counters with resolved source/destination columns
    ShowStatistics,
    /// Show hook/priority summary and groups
    ShowSummary,
}

#[derive(Subcommand)]
enum PolicyRouteCommand {
    /// Show one policy, optionally narrowed to a single rule
    Show {
        /// Policy name
        name: String,
        /// Show only this rule number
        #[arg(long)]
        rule: Option<String>,
        /// IPv6 policy routes
        #[arg(long)]
        ipv6: bool,
    },
    /// Show every policy of one family
    ShowAll {
        /// IPv6 policy routes
        #[arg(long)]
        ipv6: bool,
    },
}

#[derive(Subcommand)]
enum ServiceCommand {
    /// HTTPS frontend (nginx)
    Https,
    /// munin-node monitoring agent
    MuninNode,
    /// smokeping latency probes
    Smokeping,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let runtime = tokio::runtime::Runtime::new().expect("Failed to create Tokio runtime");
    match runtime.block_on(handle_cli(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn handle_cli(cli: Cli) -> vycfg::Result<()> {
    let config_path = ConfigTree::resolve_path(cli.config.as_deref());
    let config = ConfigTree::load(&config_path).await?;

    match cli.command {
        Commands::Firewall(command) => {
            let out = match command {
                FirewallCommand::Show {
                    family,
                    hook,
                    priority,
                    rule,
                } => op::firewall::show(&config, family, &hook, &priority, rule.as_deref()).await,
                FirewallCommand::ShowAll => op::firewall::show_all(&config).await,
                FirewallCommand::ShowFamily { family } => {
                    op::firewall::show_family(&config, family).await
                }
                FirewallCommand::ShowGroup { name } => {
                    op::firewall::show_group(&config, name.as_deref())
                }
                FirewallCommand::ShowStatistics => op::firewall::show_statistics(&config).await,
                FirewallCommand::ShowSummary => op::firewall::show_summary(&config),
            };
            print!("{out}");
        }
        Commands::PolicyRoute(command) => {
            let out = match command {
                PolicyRouteCommand::Show { name, rule, ipv6 } => {
                    op::policy_route::show(&config, &name, ipv6, rule.as_deref()).await
                }
                PolicyRouteCommand::ShowAll { ipv6 } => {
                    op::policy_route::show_all(&config, ipv6).await
                }
            };
            print!("{out}");
        }
        Commands::Service(command) => match command {
            ServiceCommand::Https => services::https::commit(&config).await?,
            ServiceCommand::MuninNode => services::munin::commit(&config).await?,
            ServiceCommand::Smokeping => services::smokeping::commit(&config).await?,
        },
    }
    Ok(())
}
