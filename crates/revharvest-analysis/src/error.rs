use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("LLM endpoint returned status {status} for {context}")]
    UnexpectedStatus { status: u16, context: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty reply for {context}")]
    EmptyResponse { context: String },

    #[error("no JSON object found in classification reply")]
    NoJsonObject,

    #[error("no LLM API key configured (set REVHARVEST_LLM_API_KEY or OPENAI_API_KEY)")]
    MissingApiKey,

    #[error("invalid LLM base URL \"{url}\": {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("failed to open spreadsheet {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error(
        "missing required columns: {0}. Rename your columns or supply a file with these fields"
    )]
    MissingColumns(String),
}
