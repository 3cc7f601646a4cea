//! Database operations for the `referral_offices` table (the user's network).

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

/// Input record for adding an office to the network.
#[derive(Debug, Clone)]
pub struct NewNetworkOffice {
    pub place_id: Option<String>,
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub office_type: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

/// A network row as used by discovery matching. Address and contact columns
/// are write-only here.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NetworkOfficeRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub place_id: Option<String>,
    pub name: String,
    pub source: String,
    pub created_at: DateTime<Utc>,
}

/// Every office the user tracks, including those without a place id.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn list_network_offices(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Vec<NetworkOfficeRow>, sqlx::Error> {
    sqlx::query_as::<_, NetworkOfficeRow>(
        "SELECT id, user_id, place_id, name, source, created_at \
         FROM referral_offices \
         WHERE user_id = $1 \
         ORDER BY created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// Insert offices with `source = source`, returning the resulting rows.
///
/// An office whose place id is already tracked is not duplicated; its
/// existing row is returned instead.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn insert_network_offices(
    pool: &PgPool,
    user_id: Uuid,
    source: &str,
    offices: &[NewNetworkOffice],
) -> Result<Vec<NetworkOfficeRow>, sqlx::Error> {
    if offices.is_empty() {
        return Ok(Vec::new());
    }

    let mut place_ids: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut names: Vec<String> = Vec::with_capacity(offices.len());
    let mut addresses: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut phones: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut websites: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut office_types: Vec<Option<String>> = Vec::with_capacity(offices.len());
    let mut latitudes: Vec<Option<f64>> = Vec::with_capacity(offices.len());
    let mut longitudes: Vec<Option<f64>> = Vec::with_capacity(offices.len());

    for office in offices {
        place_ids.push(office.place_id.clone());
        names.push(office.name.clone());
        addresses.push(office.address.clone());
        phones.push(office.phone.clone());
        websites.push(office.website.clone());
        office_types.push(office.office_type.clone());
        latitudes.push(office.latitude);
        longitudes.push(office.longitude);
    }

    sqlx::query_as::<_, NetworkOfficeRow>(
        "INSERT INTO referral_offices \
             (user_id, source, place_id, name, address, phone, website, office_type, \
              latitude, longitude) \
         SELECT $1, $2, u.place_id, u.name, u.address, u.phone, u.website, u.office_type, \
                u.latitude::numeric(9,6), u.longitude::numeric(9,6) \
         FROM UNNEST(\
              $3::text[], $4::text[], $5::text[], $6::text[], $7::text[], $8::text[], \
              $9::float8[], $10::float8[]) \
              AS u(place_id, name, address, phone, website, office_type, latitude, longitude) \
         ON CONFLICT (user_id, place_id) WHERE place_id IS NOT NULL DO UPDATE SET \
             updated_at = NOW() \
         RETURNING id, user_id, place_id, name, source, created_at",
    )
    .bind(user_id)
    .bind(source)
    .bind(&place_ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&phones)
    .bind(&websites)
    .bind(&office_types)
    .bind(&latitudes)
    .bind(&longitudes)
    .fetch_all(pool)
    .await
}
