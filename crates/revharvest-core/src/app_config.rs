use std::path::PathBuf;

#[derive(Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub job_path: PathBuf,
    pub request_timeout_secs: u64,
    /// Lower bound of the politeness delay before each outbound request.
    pub min_delay_ms: u64,
    /// Upper bound of the politeness delay before each outbound request.
    pub max_delay_ms: u64,
    /// Total attempts per network call, including the first.
    pub max_attempts: u32,
    pub retry_backoff_base_ms: u64,
    /// When `false`, only the static browser user-agent pool is used.
    pub rotate_user_agents: bool,
    pub llm_api_key: Option<String>,
    pub llm_base_url: String,
    pub llm_model: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("log_level", &self.log_level)
            .field("job_path", &self.job_path)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("min_delay_ms", &self.min_delay_ms)
            .field("max_delay_ms", &self.max_delay_ms)
            .field("max_attempts", &self.max_attempts)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("rotate_user_agents", &self.rotate_user_agents)
            .field(
                "llm_api_key",
                &self.llm_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("llm_base_url", &self.llm_base_url)
            .field("llm_model", &self.llm_model)
            .finish()
    }
}
