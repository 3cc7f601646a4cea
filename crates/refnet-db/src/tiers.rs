//! Referral tier lookups backed by the `office_referral_tier` SQL function.

use refnet_core::ReferralTier;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// Tier of one network office over the last 90 days of referrals.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails, or [`DbError::UnknownTier`]
/// if the function returns a label outside the known tiers.
pub async fn get_office_tier(pool: &PgPool, office_id: Uuid) -> Result<ReferralTier, DbError> {
    let label: String = sqlx::query_scalar::<_, String>("SELECT office_referral_tier($1)")
        .bind(office_id)
        .fetch_one(pool)
        .await?;
    label.parse().map_err(|_| DbError::UnknownTier(label))
}
