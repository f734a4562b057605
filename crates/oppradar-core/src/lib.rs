mod app_config;
mod config;
pub mod niches;
mod types;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use niches::{boost, default_niches, match_niches, Niche, NicheMatch};
pub use types::{
    Classification, NichePriority, OpportunityStatus, ResearchType, SourcePlatform,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for environment variable {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
