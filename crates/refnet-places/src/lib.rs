//! HTTP implementations of the places provider and ZIP geocoder.

pub mod client;
pub mod error;
pub mod geocode;
pub mod types;

pub use client::{ClientSettings, PlacesClient};
pub use error::PlacesApiError;
pub use geocode::GeocodeClient;
