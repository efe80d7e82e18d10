use thiserror::Error;

#[derive(Error, Debug)]
pub enum GifFitError {
    #[error("Invalid constraints: {0}")]
    InvalidConstraints(String),

    #[error("Failed to read input: {0}")]
    InputReadError(String),

    #[error("FFmpeg failed: {0}")]
    FFmpegError(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error("Probe failed: {0}")]
    ProbeError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    // Allow converting other errors to string for general failures
    #[error("General error: {0}")]
    GeneralError(String),
}

pub type Result<T> = std::result::Result<T, GifFitError>;
