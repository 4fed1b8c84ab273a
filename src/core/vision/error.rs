use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Frame source not ready")]
    FrameNotReady,
    #[error("Invalid frame: expected {expected} bytes, got {actual}")]
    InvalidFrame { expected: usize, actual: usize },
    #[error("Invalid analysis: {0}")]
    InvalidAnalysis(String),
    #[error("Extraction failed: {0}")]
    Extraction(String),
    #[error("Session task failed: {0}")]
    Session(String),
    #[error("Invalid config: {0}")]
    Config(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
}
