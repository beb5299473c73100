use thiserror::Error;

/// Error taxonomy for session creation and the screenshot pipeline.
///
/// Only `UnsupportedBrowser` and `SessionCreation` ever escape the worker;
/// every per-request failure is caught by `generate()` and converted into a
/// `false` return after cleanup.
#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    #[error("Unknown browser family: {0}")]
    UnsupportedBrowser(String),

    #[error("Failed to create browser session: {0}")]
    SessionCreation(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Screenshot capture failed: {0}")]
    Capture(String),

    #[error("Image processing failed: {0}")]
    ImageProcessing(String),

    #[error("Thumbnail id not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(String),
}

impl ThumbnailError {
    /// Stable short name used in warn logs and metrics labels.
    pub fn classification(&self) -> &'static str {
        match self {
            ThumbnailError::UnsupportedBrowser(_) => "unsupported_browser",
            ThumbnailError::SessionCreation(_) => "session_creation",
            ThumbnailError::Navigation(_) => "navigation",
            ThumbnailError::Capture(_) => "capture",
            ThumbnailError::ImageProcessing(_) => "image_processing",
            ThumbnailError::NotFound(_) => "not_found",
            ThumbnailError::Io(_) => "io",
        }
    }

    /// True for errors that leave the worker unavailable rather than
    /// failing a single request.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            ThumbnailError::UnsupportedBrowser(_) | ThumbnailError::SessionCreation(_)
        )
    }
}

impl From<std::io::Error> for ThumbnailError {
    fn from(err: std::io::Error) -> Self {
        ThumbnailError::Io(err.to_string())
    }
}

impl From<image::ImageError> for ThumbnailError {
    fn from(err: image::ImageError) -> Self {
        ThumbnailError::ImageProcessing(err.to_string())
    }
}
