//! Tier enrichment for candidates already in the network.

use futures::future::join_all;
use refnet_core::ReferralTier;

use crate::dedup::NetworkIndex;
use crate::ports::TierReader;
use crate::ranker::RankedOffice;

/// Tier used when a lookup fails.
pub const PLACEHOLDER_TIER: ReferralTier = ReferralTier::Cold;

/// Looks up the tier of every in-network candidate concurrently.
///
/// A failed lookup leaves that office at [`PLACEHOLDER_TIER`] and logs a
/// warning; the rest of the batch is unaffected. Returns the number of
/// lookups that failed.
pub async fn enrich_tiers(
    tiers: &dyn TierReader,
    index: &NetworkIndex,
    offices: &mut [RankedOffice],
) -> usize {
    let targets: Vec<(usize, uuid::Uuid)> = offices
        .iter()
        .enumerate()
        .filter(|(_, o)| o.office.already_in_network)
        .filter_map(|(i, o)| index.office_for(&o.office.place_id).map(|id| (i, id)))
        .collect();

    let results = join_all(targets.iter().map(|(_, office_id)| tiers.tier_for(*office_id))).await;

    let mut failures = 0;
    for ((i, office_id), result) in targets.into_iter().zip(results) {
        let tier = match result {
            Ok(tier) => tier,
            Err(e) => {
                failures += 1;
                tracing::warn!(%office_id, error = %e, "tier lookup failed; using placeholder");
                PLACEHOLDER_TIER
            }
        };
        offices[i].tier = Some(tier);
    }
    failures
}
