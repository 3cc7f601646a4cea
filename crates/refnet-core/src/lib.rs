pub mod app_config;
pub mod config;
pub mod office;
pub mod session;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use office::{CandidateOffice, Coordinates, RawPlace, ReferralTier};
pub use session::{DiscoveryParameters, DiscoverySession, OriginSource, SearchOrigin};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("search distance must be a positive number of miles")]
    InvalidDistance,

    #[error("unknown referral tier: {0}")]
    InvalidTier(String),
}
