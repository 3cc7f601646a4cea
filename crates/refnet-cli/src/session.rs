//! `session` and `import` commands. Both read the snapshot the last search
//! persisted for the user.

use refnet_discovery::{DiscoveryService, SearchPhase, SortKey};
use uuid::Uuid;

use crate::discover::{print_session, truncate};

pub(crate) async fn run_session_show(
    service: &DiscoveryService,
    user_id: Uuid,
    sort: SortKey,
    show_added: bool,
) {
    let current = service.current(user_id).await;
    match (current.phase, current.presented) {
        (SearchPhase::Presented, Some(presented)) => print_session(&presented, sort, show_added),
        (SearchPhase::Failed, _) => println!("the last search failed; run `discover` to try again"),
        _ => println!("no discovery session for {user_id}; run `discover` first"),
    }

    if let Some(usage) = service.usage(user_id).await {
        println!();
        println!(
            "external calls in the last 24h: {}/{}",
            usage.calls_last_24h, usage.daily_limit
        );
    }
}

pub(crate) async fn run_session_clear(service: &DiscoveryService, user_id: Uuid) {
    service.clear(user_id).await;
    println!("discovery session cleared for {user_id}");
}

/// Imports the given offices from the user's current session.
///
/// # Errors
///
/// Returns an error if the network write fails.
pub(crate) async fn run_import(
    service: &DiscoveryService,
    user_id: Uuid,
    office_ids: &[Uuid],
) -> anyhow::Result<()> {
    let outcome = service
        .import(user_id, office_ids)
        .await
        .map_err(|e| {
            tracing::error!(%user_id, error = %e, "import failed");
            anyhow::anyhow!("{}", e.notification().message)
        })?;

    for member in &outcome.imported {
        println!("added {}  {}", member.office_id, truncate(&member.name, 40));
    }
    println!(
        "imported {} offices, skipped {}",
        outcome.imported.len(),
        outcome.skipped
    );
    if let Some(summary) = outcome.summary {
        println!("{} new opportunities remain", summary.new_opportunities);
    }
    Ok(())
}
