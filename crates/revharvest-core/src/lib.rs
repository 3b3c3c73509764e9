//! Shared domain types and configuration for the review harvester.

pub mod app_config;
pub mod config;
pub mod job;
pub mod review;

use thiserror::Error;

pub use app_config::AppConfig;
pub use config::{load_app_config, load_app_config_from_env};
pub use job::{load_job, AppStoreSort, EntityConfig, HarvestJob, SourceTarget};
pub use review::{
    ProductMeta, Review, ReviewTimestamp, Source, SourceResult, SourceStatus,
};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read job file {path}: {source}")]
    JobFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse job file: {0}")]
    JobFileParse(#[from] serde_yaml::Error),

    #[error("job validation failed: {0}")]
    Validation(String),
}
