//! Clinic locator: picks the origin a search is measured from.

use refnet_core::{Coordinates, DiscoveryParameters, OriginSource, SearchOrigin};
use uuid::Uuid;

use crate::error::DiscoveryError;
use crate::ports::{ClinicProfileReader, ZipGeocoder};

/// The clinic a search runs for, plus the origin it is measured from.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedOrigin {
    pub clinic_id: Uuid,
    pub origin: SearchOrigin,
}

/// Extracts the first run of five digits, so `"10001-2345"` and
/// `" 10001 "` both normalize to `"10001"`.
#[must_use]
pub fn normalize_zip5(s: &str) -> Option<String> {
    let mut digits = String::with_capacity(5);
    for ch in s.chars() {
        if ch.is_ascii_digit() {
            digits.push(ch);
            if digits.len() == 5 {
                break;
            }
        } else if !digits.is_empty() {
            break;
        }
    }
    if digits.len() == 5 {
        Some(digits)
    } else {
        None
    }
}

/// Resolves the search origin for `user_id`.
///
/// A ZIP override wins for this search only and is never written back to the
/// profile. Without one the stored clinic coordinates are used.
///
/// # Errors
///
/// - [`DiscoveryError::MissingClinicLocation`] if the user has no clinic, or
///   no override and no stored coordinates.
/// - [`DiscoveryError::ZipNotFound`] if the override is malformed or does not geocode.
/// - [`DiscoveryError::RateLimited`] / [`DiscoveryError::Provider`] if geocoding fails.
/// - [`DiscoveryError::Storage`] if the profile read fails.
pub async fn resolve_origin(
    user_id: Uuid,
    params: &DiscoveryParameters,
    clinics: &dyn ClinicProfileReader,
    geocoder: &dyn ZipGeocoder,
) -> Result<ResolvedOrigin, DiscoveryError> {
    let Some(profile) = clinics.clinic_profile(user_id).await? else {
        tracing::info!(%user_id, "no clinic profile on file");
        return Err(DiscoveryError::MissingClinicLocation);
    };

    if let Some(raw_zip) = params.zip_code_override() {
        let zip = normalize_zip5(raw_zip)
            .ok_or_else(|| DiscoveryError::ZipNotFound(raw_zip.to_string()))?;
        let coordinates = geocoder
            .geocode_zip(&zip)
            .await?
            .ok_or_else(|| DiscoveryError::ZipNotFound(zip.clone()))?;
        tracing::debug!(%user_id, zip, "using ZIP override as search origin");
        return Ok(ResolvedOrigin {
            clinic_id: profile.clinic_id,
            origin: SearchOrigin {
                coordinates,
                source: OriginSource::ZipOverride(zip),
            },
        });
    }

    let coordinates = Coordinates::from_parts(profile.latitude, profile.longitude)
        .ok_or(DiscoveryError::MissingClinicLocation)?;

    Ok(ResolvedOrigin {
        clinic_id: profile.clinic_id,
        origin: SearchOrigin {
            coordinates,
            source: OriginSource::Clinic,
        },
    })
}
