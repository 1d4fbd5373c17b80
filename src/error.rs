use thiserror::Error;

/// Application-wide result type alias.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// I/O errors from config, log, or terminal handles.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal initialization or rendering errors.
    #[error("Terminal error: {0}")]
    Terminal(String),

    /// Missing or inconsistent configuration.
    #[error("Config error: {0}")]
    Config(String),

    /// Network or HTTP failure, surfaced after the retry policy gave up.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response body that could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),

    /// A base URL or CDN target that does not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Preview bytes that are not a supported image.
    #[error("Image decode error: {0}")]
    ImageDecode(#[from] image::ImageError),

    /// The backend kept answering without letting the collection grow.
    #[error("Stalled after {0} fetches without progress")]
    Stalled(u32),

    /// The owning view went away before the operation finished.
    #[error("Operation cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Transport(err.to_string())
    }
}
