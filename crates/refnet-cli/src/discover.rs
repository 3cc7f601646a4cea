//! `discover` command: run one search and print the presented session.

use std::sync::Arc;

use refnet_core::{DiscoveryParameters, OriginSource};
use refnet_discovery::{
    Collaborators, DiscoveryService, JsonFileSnapshotStore, PresentedSession, RankedOffice,
    SearchResult, SortKey, WorkflowSettings,
};
use uuid::Uuid;

/// Wires the Postgres store, HTTP clients and snapshot directory into a
/// [`DiscoveryService`].
///
/// # Errors
///
/// Returns an error if an HTTP client cannot be built from the config.
pub(crate) fn build_service(
    config: &refnet_core::AppConfig,
    pool: &sqlx::PgPool,
) -> anyhow::Result<DiscoveryService> {
    let store = Arc::new(refnet_db::PgStore::new(pool.clone()));
    let places = Arc::new(refnet_places::PlacesClient::from_config(config)?);
    let geocoder = Arc::new(refnet_places::GeocodeClient::from_config(config)?);
    let snapshots = Arc::new(JsonFileSnapshotStore::new(config.snapshot_dir.clone()));

    Ok(DiscoveryService::new(
        Collaborators {
            clinics: store.clone(),
            geocoder,
            cache: store.clone(),
            places,
            network_reader: store.clone(),
            network_writer: store.clone(),
            tiers: store.clone(),
            usage: store,
            snapshots,
        },
        WorkflowSettings::from_app_config(config),
    ))
}

/// Runs a search and prints the result.
///
/// # Errors
///
/// Returns an error carrying the user-facing notification when the search
/// fails.
pub(crate) async fn run_discover(
    service: &DiscoveryService,
    user_id: Uuid,
    params: DiscoveryParameters,
    sort: SortKey,
    show_added: bool,
) -> anyhow::Result<()> {
    match service.search(user_id, params).await {
        SearchResult::Presented(presented) => {
            print_session(&presented, sort, show_added);
            Ok(())
        }
        SearchResult::Failed(notification) => {
            if let Some(usage) = notification.usage {
                eprintln!(
                    "external calls in the last 24h: {}/{}",
                    usage.calls_last_24h, usage.daily_limit
                );
            }
            anyhow::bail!("{}: {}", notification.title, notification.message)
        }
        SearchResult::Superseded => {
            println!("search was replaced by a newer one; run `session show` to see it");
            Ok(())
        }
    }
}

pub(crate) fn print_session(presented: &PresentedSession, sort: SortKey, show_added: bool) {
    let session = &presented.session;
    let origin = match &session.search_origin.source {
        OriginSource::Clinic => "clinic".to_string(),
        OriginSource::ZipOverride(zip) => format!("ZIP {zip}"),
    };
    println!(
        "Search: {} mi around {origin} ({}) at {}",
        session.search_distance,
        if session.external_call_made {
            "fresh lookup"
        } else {
            "cached"
        },
        session.created_at.format("%Y-%m-%d %H:%M UTC"),
    );

    let s = &presented.summary;
    println!(
        "Found {} offices: {} new, {} already in network, {} high rated, {} with website",
        s.total, s.new_opportunities, s.already_in_network, s.high_rated, s.with_website
    );
    println!();

    let offices = presented.visible(show_added, sort);
    if offices.is_empty() {
        println!("no new offices to show; pass --show-added to include network members");
    } else {
        print_offices(&offices);
    }

    if let Some(rec) = &presented.recommendation {
        println!();
        println!("{}", rec.message);
    }
}

fn print_offices(offices: &[RankedOffice]) {
    println!(
        "{:<38}{:<32}{:<22}{:>7}{:>8}  STATUS",
        "ID", "NAME", "TYPE", "MILES", "RATING"
    );
    for ranked in offices {
        println!(
            "{:<38}{:<32}{:<22}{:>7}{:>8}  {}",
            ranked.office.id,
            truncate(&ranked.office.name, 30),
            truncate(&ranked.office.office_type_label, 20),
            fmt_miles(ranked.distance_miles),
            fmt_rating(ranked.office.rating),
            status_label(ranked),
        );
    }
}

pub(crate) fn fmt_miles(miles: Option<f64>) -> String {
    miles.map_or_else(|| "\u{2014}".to_string(), |m| format!("{m:.1}"))
}

pub(crate) fn fmt_rating(rating: Option<f64>) -> String {
    rating.map_or_else(|| "\u{2014}".to_string(), |r| format!("{r:.1}"))
}

pub(crate) fn status_label(ranked: &RankedOffice) -> String {
    if ranked.office.imported {
        "imported".to_string()
    } else if ranked.office.already_in_network {
        match ranked.tier {
            Some(tier) => format!("in network ({tier})"),
            None => "in network".to_string(),
        }
    } else {
        "new".to_string()
    }
}

pub(crate) fn truncate(value: &str, max: usize) -> String {
    if value.chars().count() > max {
        format!("{}...", value.chars().take(max.saturating_sub(3)).collect::<String>())
    } else {
        value.to_string()
    }
}
