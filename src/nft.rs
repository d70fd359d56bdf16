//! Live chain-state access
//!
//! Thin wrapper around `nft list chain` for the operational-mode views. A
//! chain may be momentarily unreadable (not yet created, permission denied,
//! nftables not running); operational display must not abort for that, so
//! [`chain_observations`] degrades any failure to an empty mapping and the
//! affected rows simply render without counter columns.

use crate::core::chain::ChainRef;
use crate::core::error::{Error, Result};
use crate::core::reconcile::{ObservationMap, scrape_chain_dump};
use tracing::debug;

/// Runs `nft list chain` for `chain` and returns the raw dump text.
///
/// # Errors
///
/// Returns `Err` if elevation is unavailable, the process cannot be spawned,
/// or nft exits non-zero (typically: chain does not exist).
pub async fn list_chain(chain: &ChainRef) -> Result<String> {
    let output = crate::elevation::nft_command(&chain.nft_args())
        .map_err(|e| Error::Elevation(e.to_string()))?
        .output()
        .await?;

    if output.status.success() {
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        Err(Error::Nftables {
            message: format!("nft list chain {} failed", chain.chain),
            stderr: Some(stderr),
            exit_code: output.status.code(),
        })
    }
}

/// Scrapes the live observations for one ruleset.
///
/// `priority` is the marker token joining dump lines to configured rule
/// identifiers. Any failure to read the chain yields an empty mapping; the
/// error is logged, never propagated.
pub async fn chain_observations(chain: &ChainRef, priority: &str) -> ObservationMap {
    match list_chain(chain).await {
        Ok(dump) => scrape_chain_dump(&dump, priority),
        Err(e) => {
            debug!(chain = %chain.chain, error = %e, "Chain unreadable, showing no counters");
            ObservationMap::new()
        }
    }
}
