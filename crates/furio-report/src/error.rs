use thiserror::Error;

/// Errors building or delivering a report.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("delivery rejected with HTTP {status}: {body}")]
    Delivery { status: u16, body: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("price lookup failed: {0}")]
    Price(String),
}
