//! Database operations for the `clinics` table.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

/// Input record for creating or updating a user's clinic.
#[derive(Debug, Clone)]
pub struct NewClinic {
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ClinicRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<Decimal>,
    pub longitude: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClinicRow {
    #[must_use]
    pub fn latitude_f64(&self) -> Option<f64> {
        self.latitude.as_ref().and_then(ToPrimitive::to_f64)
    }

    #[must_use]
    pub fn longitude_f64(&self) -> Option<f64> {
        self.longitude.as_ref().and_then(ToPrimitive::to_f64)
    }
}

/// Fetch the clinic a user owns, if any.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn get_clinic_for_user(
    pool: &PgPool,
    user_id: Uuid,
) -> Result<Option<ClinicRow>, sqlx::Error> {
    sqlx::query_as::<_, ClinicRow>(
        "SELECT id, user_id, name, address, latitude, longitude, created_at, updated_at \
         FROM clinics \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
}

/// Create the user's clinic or replace its details.
///
/// Coordinates are bound as `float8` and cast to `NUMERIC(9,6)` in SQL.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the query fails.
pub async fn upsert_clinic(
    pool: &PgPool,
    user_id: Uuid,
    clinic: &NewClinic,
) -> Result<ClinicRow, sqlx::Error> {
    sqlx::query_as::<_, ClinicRow>(
        "INSERT INTO clinics (user_id, name, address, latitude, longitude) \
         VALUES ($1, $2, $3, $4::float8::numeric(9,6), $5::float8::numeric(9,6)) \
         ON CONFLICT (user_id) DO UPDATE SET \
             name       = EXCLUDED.name, \
             address    = EXCLUDED.address, \
             latitude   = EXCLUDED.latitude, \
             longitude  = EXCLUDED.longitude, \
             updated_at = NOW() \
         RETURNING id, user_id, name, address, latitude, longitude, created_at, updated_at",
    )
    .bind(user_id)
    .bind(&clinic.name)
    .bind(&clinic.address)
    .bind(clinic.latitude)
    .bind(clinic.longitude)
    .fetch_one(pool)
    .await
}
