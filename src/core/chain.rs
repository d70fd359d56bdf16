//! Chain descriptors and kernel chain naming
//!
//! Maps a configuration-side ruleset location (family, hook, priority) to the
//! nftables chain that holds its live counterpart. Firewall rulesets live in
//! the `vyos_filter` table; policy-route rulesets live in `mangle`.

use serde::{Deserialize, Serialize};

/// Address family of a ruleset
#[derive(
    Debug,
    Clone,
    Copy,
    Serialize,
    Deserialize,
    PartialEq,
    Eq,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::AsRefStr,
)]
pub enum Family {
    #[strum(serialize = "ipv4")]
    Ipv4,
    #[strum(serialize = "ipv6")]
    Ipv6,
    #[strum(serialize = "bridge")]
    Bridge,
}

impl Family {
    /// nftables address-family token used on the `nft list chain` command line
    pub const fn nft_family(self) -> &'static str {
        match self {
            Family::Ipv4 => "ip",
            Family::Ipv6 => "ip6",
            Family::Bridge => "bridge",
        }
    }

    /// Chain-name prefix for named (non-base-hook) rulesets
    const fn name_prefix(self) -> &'static str {
        match self {
            Family::Ipv6 => "NAME6_",
            Family::Ipv4 | Family::Bridge => "NAME_",
        }
    }

    /// Extra token spliced into base-hook chain names
    const fn hook_infix(self) -> &'static str {
        match self {
            Family::Ipv6 => "IPV6_",
            Family::Ipv4 | Family::Bridge => "",
        }
    }
}

/// Fully qualified reference to one live kernel chain.
///
/// Constructed per display request and discarded after rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainRef {
    /// nftables address-family token (`ip`, `ip6`, `bridge`)
    pub family: &'static str,
    /// Table holding the chain
    pub table: &'static str,
    /// Chain name inside the table
    pub chain: String,
}

impl ChainRef {
    /// Arguments for `nft list chain`
    pub fn nft_args(&self) -> [&str; 5] {
        ["list", "chain", self.family, self.table, &self.chain]
    }
}

/// Returns true for the hook tokens that denote a named (custom) ruleset
/// rather than a base hook. Both mangled and unmangled spellings are
/// accepted since hook names arrive as configuration keys.
fn is_named_hook(hook: &str) -> bool {
    matches!(hook, "name" | "ipv6-name" | "ipv6_name")
}

/// Builds the kernel chain reference for a firewall ruleset.
///
/// Named rulesets map to `NAME_<priority>` / `NAME6_<priority>`; base hooks
/// map to `VYOS_<HOOK>_<priority>` with an `IPV6_` infix for the ipv6 family.
pub fn firewall_chain(family: Family, hook: &str, priority: &str) -> ChainRef {
    let chain = if is_named_hook(hook) {
        format!("{}{priority}", family.name_prefix())
    } else {
        format!(
            "VYOS_{}{}_{priority}",
            family.hook_infix(),
            hook.to_uppercase()
        )
    };

    ChainRef {
        family: family.nft_family(),
        table: "vyos_filter",
        chain,
    }
}

/// Builds the kernel chain reference for a policy-route ruleset.
pub fn policy_route_chain(name: &str, ipv6: bool) -> ChainRef {
    let suffix = if ipv6 { "6" } else { "" };
    ChainRef {
        family: if ipv6 { "ip6" } else { "ip" },
        table: "mangle",
        chain: format!("VYOS_PBR{suffix}_{name}"),
    }
}
