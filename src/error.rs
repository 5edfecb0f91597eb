//! Error types for the acceptance harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("{0} environment variable is not set")]
    Configuration(&'static str),

    #[error("server not ready after {0} probe attempts")]
    ServerNotReady(usize),

    #[error("Playwright not found. Install with: npx playwright install")]
    PlaywrightNotFound,

    #[error("driver error: {0}")]
    Driver(String),

    #[error("condition \"{condition}\" still false after {attempts} reload cycles")]
    PollTimeout { condition: String, attempts: u32 },

    #[error("assertion failed: {0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
