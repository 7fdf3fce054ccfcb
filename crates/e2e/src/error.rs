//! Error types for the end-to-end harness

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("node not found on PATH; install Node.js to run browser flows")]
    NodeNotFound,

    #[error("playwright is not installed; run: npm install && npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("fixture site failed to start: {0}")]
    FixtureStartup(String),

    #[error("fixture site health check failed after {0} attempts")]
    FixtureHealthCheck(usize),

    #[error("target unreachable: {url}: {reason}")]
    TargetUnreachable { url: String, reason: String },

    #[error("flow spec error: {0}")]
    SpecParse(String),

    #[error("flow not found: {0}")]
    FlowNotFound(String),

    #[error("browser script error: {0}")]
    Script(String),

    #[error("timed out after {timeout_ms} ms waiting for: {what}")]
    Timeout { what: String, timeout_ms: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type HarnessResult<T> = Result<T, HarnessError>;
