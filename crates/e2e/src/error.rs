//! Error types for E2E testing

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error("Frontend at {url} not reachable after {attempts} attempts")]
    FrontendUnreachable { url: String, attempts: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Catalog error: {0}")]
    Catalog(#[from] dcfs_common::CatalogError),

    #[error("Element not found: {selector} [{index}]")]
    ElementNotFound { selector: String, index: isize },

    #[error("No element matching '{selector}' has text '{text}'")]
    TextNotFound { selector: String, text: String },

    #[error("Step failed: {step} - {reason}")]
    StepFailed { step: String, reason: String },

    #[error("Assertion failed: {0}")]
    AssertionFailed(String),

    #[error("Payload mismatch: {name} (expected sha256 {expected}, got {actual})")]
    PayloadMismatch {
        name: String,
        expected: String,
        actual: String,
    },

    #[error("Scenario not found: #{0}")]
    ScenarioNotFound(usize),

    #[error("Timeout waiting for: {0}")]
    Timeout(String),

    #[error("WebDriver error: {0}")]
    WebDriver(#[from] thirtyfour::error::WebDriverError),

    #[error("Database error: {0}")]
    Database(#[from] mysql_async::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
