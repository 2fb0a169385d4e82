use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Collection fetch failed: {0}")]
    Fetch(String),

    #[error("Test execution failed: {0}")]
    Execution(String),

    #[error("Redaction failed: {0}")]
    Redaction(String),

    #[error("History store error: {0}")]
    History(String),

    #[error("Report generation failed: {0}")]
    Report(String),

    #[error("Deployment failed: {0}")]
    Deploy(String),

    #[error("Notification failed: {0}")]
    Notify(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
