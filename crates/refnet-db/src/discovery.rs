//! Database operations for the discovery cache (`discovered_offices`) and
//! search history (`discovery_sessions`).

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Input record for one cached candidate.
#[derive(Debug, Clone)]
pub struct NewDiscoveredOffice {
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub office_type_label: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoveredOfficeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Uuid,
    pub search_distance: i32,
    pub place_id: String,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub rating: Option<Decimal>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub office_type_label: String,
    /// Position within the provider batch that produced the row.
    pub batch_position: i32,
    pub imported: bool,
    pub discovered_at: DateTime<Utc>,
}

impl DiscoveredOfficeRow {
    #[must_use]
    pub fn rating_f64(&self) -> Option<f64> {
        self.rating.as_ref().and_then(ToPrimitive::to_f64)
    }

    #[must_use]
    pub fn coordinates_f64(&self) -> (Option<f64>, Option<f64>) {
        (
            self.latitude.as_ref().and_then(ToPrimitive::to_f64),
            self.longitude.as_ref().and_then(ToPrimitive::to_f64),
        )
    }
}

/// A row from `discovery_sessions`; also the insert input.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DiscoverySessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub clinic_id: Uuid,
    pub search_distance: i32,
    pub search_lat: f64,
    pub search_lng: f64,
    /// `clinic` or `zip_override`.
    pub origin_source: String,
    pub zip_code_override: Option<String>,
    pub office_type_filter: Option<String>,
    pub results_count: i32,
    pub api_call_made: bool,
    pub created_at: DateTime<Utc>,
}

/// Cached candidates recorded for exactly `search_distance`.
///
/// Ordered by batch position so a repeated search returns rows in the order
/// the provider produced them.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_cached_offices(
    pool: &PgPool,
    user_id: Uuid,
    clinic_id: Uuid,
    search_distance: i32,
) -> Result<Vec<DiscoveredOfficeRow>, sqlx::Error> {
    sqlx::query_as::<_, DiscoveredOfficeRow>(
        "SELECT id, user_id, clinic_id, search_distance, place_id, name, address, phone, \
                website, rating, latitude, longitude, office_type_label, batch_position, imported, \
                discovered_at \
         FROM discovered_offices \
         WHERE user_id = $1 AND clinic_id = $2 AND search_distance = $3 \
         ORDER BY batch_position, discovered_at",
    )
    .bind(user_id)
    .bind(clinic_id)
    .bind(search_distance)
    .fetch_all(pool)
    .await
}

/// Upsert a provider batch into the cache in one round-trip.
///
/// Returns the number of rows written. Rating and coordinates are bound as
/// `float8[]` and cast to `NUMERIC` inside the statement.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn upsert_discovered_offices(
    pool: &PgPool,
    user_id: Uuid,
    clinic_id: Uuid,
    search_distance: i32,
    offices: &[NewDiscoveredOffice],
) -> Result<u64, sqlx::Error> {
    if offices.is_empty() {
        return Ok(0);
    }

    let mut place_ids: Vec<String> = Vec::with_capacity(offices.len());
    let mut names: Vec<String> = Vec::with_capacity(offices.len());
    let mut addresses: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut phones: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut websites: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut ratings: Vec<Option<f64>> = Vec::with_capacity(offices.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(offices.len());
    let mut longitudes: Vec<Option<f64>> = Vec::with_capacity(offices.len());
    let mut labels: Vec<String> = Vec::with_capacity(offices.len());

    for office in offices {
        place_ids.push(office.place_id.clone());
        names.push(office.name.clone());
        addresses.push(office.address.clone());
        phones.push(office.phone.clone());
        websites.push(office.website.clone());
        ratings.push(office.rating);
        latitudes.push(office.latitude);
        longitudes.push(office.longitude);
        labels.push(office.office_type_label.clone());
    }

    let result = sqlx::query(
        "INSERT INTO discovered_offices \
             (user_id, clinic_id, search_distance, place_id, name, address, phone, website, \
              rating, latitude, longitude, office_type_label, batch_position) \
         SELECT $1, $2, $3, u.place_id, u.name, u.address, u.phone, u.website, \
                u.rating::numeric(3,2), u.latitude::numeric(9,6), u.longitude::numeric(9,6), \
                u.label, u.ord::int4 \
         FROM UNNEST(\
              $4::text[], $5::text[], $6::text[], $7::text[], $8::text[], \
              $9::float8[], $10::float8[], $11::float8[], $12::text[]) WITH ORDINALITY \
              AS u(place_id, name, address, phone, website, rating, latitude, longitude, label, ord) \
         ON CONFLICT (user_id, clinic_id, search_distance, place_id) DO UPDATE SET \
             name              = EXCLUDED.name, \
             address           = EXCLUDED.address, \
             phone             = EXCLUDED.phone, \
             website           = EXCLUDED.website, \
             rating            = EXCLUDED.rating, \
             latitude          = EXCLUDED.latitude, \
             longitude         = EXCLUDED.longitude, \
             office_type_label = EXCLUDED.office_type_label, \
             batch_position    = EXCLUDED.batch_position, \
             discovered_at     = NOW()",
    )
    .bind(user_id)
    .bind(clinic_id)
    .bind(search_distance)
    .bind(&place_ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&phones)
    .bind(&websites)
    .bind(&ratings)
    .bind(&latitudes)
    .bind(&longitudes)
    .bind(&labels)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// Flag cached rows as imported for every radius the user searched.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn mark_discovered_imported(
    pool: &PgPool,
    user_id: Uuid,
    place_ids: &[String],
) -> Result<u64, sqlx::Error> {
    if place_ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query(
        "UPDATE discovered_offices SET imported = TRUE \
         WHERE user_id = $1 AND place_id = ANY($2::text[]) AND imported = FALSE",
    )
    .bind(user_id)
    .bind(place_ids)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Record one search execution.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_discovery_session(
    pool: &PgPool,
    session: &DiscoverySessionRow,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO discovery_sessions \
             (id, user_id, clinic_id, search_distance, search_lat, search_lng, origin_source, \
              zip_code_override, office_type_filter, results_count, api_call_made, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(session.id)
    .bind(session.user_id)
    .bind(session.clinic_id)
    .bind(session.search_distance)
    .bind(session.search_lat)
    .bind(session.search_lng)
    .bind(&session.origin_source)
    .bind(&session.zip_code_override)
    .bind(&session.office_type_filter)
    .bind(session.results_count)
    .bind(session.api_call_made)
    .bind(session.created_at)
    .execute(pool)
    .await?;
    Ok(())
}

/// Number of searches since `since` that reached the external provider.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn count_external_calls_since(
    pool: &PgPool,
    user_id: Uuid,
    since: DateTime<Utc>,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM discovery_sessions \
         WHERE user_id = $1 AND api_call_made AND created_at >= $2",
    )
    .bind(user_id)
    .bind(since)
    .fetch_one(pool)
    .await
}

/// Delete every cached batch holding a row discovered before `older_than`.
///
/// A batch is the set of rows for one `(user_id, clinic_id, search_distance)`
/// and is removed whole, imported rows included, so a partial batch can never
/// be served as a cache hit. Imported offices stay in `referral_offices` and
/// are matched again by place id on the next search. Returns the number of
/// rows deleted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn prune_discovered_offices(
    pool: &PgPool,
    older_than: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "DELETE FROM discovered_offices d \
         USING ( \
             SELECT user_id, clinic_id, search_distance \
             FROM discovered_offices \
             GROUP BY user_id, clinic_id, search_distance \
             HAVING MIN(discovered_at) < $1 \
         ) stale \
         WHERE d.user_id = stale.user_id \
           AND d.clinic_id = stale.clinic_id \
           AND d.search_distance = stale.search_distance",
    )
    .bind(older_than)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}
