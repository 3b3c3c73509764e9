use crate::app_config::AppConfig;
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let log_level = or_default("REVHARVEST_LOG_LEVEL", "info");
    let job_path = PathBuf::from(or_default("REVHARVEST_JOB_PATH", "./config/job.yaml"));

    let request_timeout_secs = parse_u64("REVHARVEST_REQUEST_TIMEOUT_SECS", "30")?;
    let min_delay_ms = parse_u64("REVHARVEST_MIN_DELAY_MS", "2000")?;
    let max_delay_ms = parse_u64("REVHARVEST_MAX_DELAY_MS", "5000")?;
    if min_delay_ms > max_delay_ms {
        return Err(ConfigError::InvalidEnvVar {
            var: "REVHARVEST_MIN_DELAY_MS".to_string(),
            reason: format!(
                "minimum delay {min_delay_ms}ms exceeds maximum delay {max_delay_ms}ms"
            ),
        });
    }

    let max_attempts = parse_u32("REVHARVEST_MAX_ATTEMPTS", "3")?;
    if max_attempts == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "REVHARVEST_MAX_ATTEMPTS".to_string(),
            reason: "must be at least 1".to_string(),
        });
    }
    let retry_backoff_base_ms = parse_u64("REVHARVEST_RETRY_BACKOFF_BASE_MS", "5000")?;
    let rotate_user_agents = parse_bool(
        "REVHARVEST_ROTATE_USER_AGENTS",
        &or_default("REVHARVEST_ROTATE_USER_AGENTS", "true"),
    )?;

    let non_blank = |var: &str| lookup(var).ok().filter(|key| !key.trim().is_empty());
    let llm_api_key = non_blank("REVHARVEST_LLM_API_KEY").or_else(|| non_blank("OPENAI_API_KEY"));
    let llm_base_url = or_default("REVHARVEST_LLM_BASE_URL", "https://api.openai.com/v1");
    let llm_model = or_default("REVHARVEST_LLM_MODEL", "gpt-4o");

    Ok(AppConfig {
        log_level,
        job_path,
        request_timeout_secs,
        min_delay_ms,
        max_delay_ms,
        max_attempts,
        retry_backoff_base_ms,
        rotate_user_agents,
        llm_api_key,
        llm_base_url,
        llm_model,
    })
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("expected a boolean, got \"{other}\""),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
