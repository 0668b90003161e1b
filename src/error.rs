use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Source Unavailable: {0}")]
    SourceUnavailable(String),

    #[error("Detector Error: {0}")]
    Detector(String),

    #[error("Invalid Config: {0}")]
    InvalidConfig(String),

    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Json Error: {0}")]
    Json(#[from] serde_json::Error),
}
