use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analyzer returned status {0}")]
    Status(u16),

    #[error("analyzer response invalid: {0}")]
    InvalidResponse(String),

    #[error("analyzer given an empty batch")]
    EmptyBatch,
}
