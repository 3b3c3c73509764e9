use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unexpected response shape from {context}: {reason}")]
    Envelope { context: String, reason: String },

    #[error("rate limited by {domain} (retry after {retry_after_secs}s)")]
    RateLimited {
        domain: String,
        retry_after_secs: u64,
    },

    #[error("endpoint not found: {url}")]
    NotFound { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid CSS selector \"{selector}\": {reason}")]
    Selector { selector: String, reason: String },

    #[error("batch limit reached for {company}: exceeded {max_batches} batches")]
    PaginationLimit { company: String, max_batches: usize },

    #[error("harvest cancelled")]
    Cancelled,
}

impl ScraperError {
    /// Returns `true` if the error is transient and the request is worth repeating.
    ///
    /// Network failures, HTTP 429 and HTTP 5xx are retriable. Everything else
    /// would produce the same result on a second attempt.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            ScraperError::Http(_) | ScraperError::RateLimited { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Job-level failures: the only errors that abort a whole batch run.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("no entities to harvest")]
    NoEntities,

    #[error("no source targets configured for any entity")]
    NoTargets,
}
