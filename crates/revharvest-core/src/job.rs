use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::review::Source;
use crate::ConfigError;

/// Review ordering requested from the app store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppStoreSort {
    #[default]
    Newest,
    Relevance,
    Rating,
}

impl AppStoreSort {
    /// Numeric sort code understood by the Play Store review RPC.
    #[must_use]
    pub fn code(self) -> u8 {
        match self {
            AppStoreSort::Relevance => 1,
            AppStoreSort::Newest => 2,
            AppStoreSort::Rating => 3,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_country() -> String {
    "us".to_string()
}

fn default_max_products() -> usize {
    20
}

/// One configured source for an entity, with its per-source target count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceTarget {
    AppStore {
        app_id: String,
        target: usize,
        #[serde(default = "default_language")]
        language: String,
        #[serde(default = "default_country")]
        country: String,
        #[serde(default)]
        sort: AppStoreSort,
    },
    ReviewAggregator {
        url: String,
        target: usize,
    },
    Ecommerce {
        url: String,
        target: usize,
        #[serde(default)]
        search_terms: Vec<String>,
        #[serde(default = "default_max_products")]
        max_products: usize,
    },
}

impl SourceTarget {
    #[must_use]
    pub fn source(&self) -> Source {
        match self {
            SourceTarget::AppStore { .. } => Source::AppStore,
            SourceTarget::ReviewAggregator { .. } => Source::ReviewAggregator,
            SourceTarget::Ecommerce { .. } => Source::Ecommerce,
        }
    }

    #[must_use]
    pub fn target(&self) -> usize {
        match self {
            SourceTarget::AppStore { target, .. }
            | SourceTarget::ReviewAggregator { target, .. }
            | SourceTarget::Ecommerce { target, .. } => *target,
        }
    }
}

/// A company or product to harvest, with the sources configured for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityConfig {
    pub name: String,
    #[serde(default)]
    pub sources: Vec<SourceTarget>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestJob {
    pub entities: Vec<EntityConfig>,
}

/// Load and validate a harvest job from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_job(path: &Path) -> Result<HarvestJob, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::JobFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let job: HarvestJob = serde_yaml::from_str(&content).map_err(ConfigError::JobFileParse)?;

    validate_job(&job)?;

    Ok(job)
}

fn validate_job(job: &HarvestJob) -> Result<(), ConfigError> {
    if job.entities.is_empty() {
        return Err(ConfigError::Validation(
            "job must list at least one entity".to_string(),
        ));
    }

    let mut seen_names = HashSet::new();
    for entity in &job.entities {
        if entity.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "entity name must be non-empty".to_string(),
            ));
        }
        if !seen_names.insert(entity.name.to_lowercase()) {
            return Err(ConfigError::Validation(format!(
                "duplicate entity name: '{}'",
                entity.name
            )));
        }
        if entity.sources.is_empty() {
            return Err(ConfigError::Validation(format!(
                "entity '{}' has no sources configured",
                entity.name
            )));
        }
        for target in &entity.sources {
            validate_target(&entity.name, target)?;
        }
    }

    Ok(())
}

fn validate_target(entity: &str, target: &SourceTarget) -> Result<(), ConfigError> {
    if target.target() == 0 {
        return Err(ConfigError::Validation(format!(
            "entity '{entity}': {} target must be greater than zero",
            target.source()
        )));
    }

    match target {
        SourceTarget::AppStore { app_id, .. } => {
            if app_id.trim().is_empty() {
                return Err(ConfigError::Validation(format!(
                    "entity '{entity}': app_store app_id must be non-empty"
                )));
            }
        }
        SourceTarget::ReviewAggregator { url, .. } => {
            validate_url(entity, "review_aggregator", url)?;
        }
        SourceTarget::Ecommerce {
            url, max_products, ..
        } => {
            validate_url(entity, "ecommerce", url)?;
            if *max_products == 0 {
                return Err(ConfigError::Validation(format!(
                    "entity '{entity}': ecommerce max_products must be greater than zero"
                )));
            }
        }
    }

    Ok(())
}

fn validate_url(entity: &str, kind: &str, url: &str) -> Result<(), ConfigError> {
    let trimmed = url.trim();
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(ConfigError::Validation(format!(
            "entity '{entity}': {kind} url '{url}' must be an absolute http(s) URL"
        ))),
    }
}

#[cfg(test)]
#[path = "job_test.rs"]
mod tests;
