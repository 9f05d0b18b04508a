//! Error types shared across Zoomcast crates.

/// Top-level error type for Zoomcast operations.
#[derive(Debug, thiserror::Error)]
pub enum ZoomcastError {
    #[error("Writer creation failed: {message}")]
    WriterCreation { message: String },

    #[error("Image buffer unavailable: {message}")]
    ImageBuffer { message: String },

    #[error("Frame buffer pool exhausted: {message}")]
    BufferPool { message: String },

    #[error("Finalize failed: {message}")]
    Finalize { message: String },

    #[error("Sink error: {message}")]
    Sink { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using ZoomcastError.
pub type ZoomcastResult<T> = Result<T, ZoomcastError>;

impl ZoomcastError {
    pub fn writer_creation(msg: impl Into<String>) -> Self {
        Self::WriterCreation {
            message: msg.into(),
        }
    }

    pub fn image_buffer(msg: impl Into<String>) -> Self {
        Self::ImageBuffer {
            message: msg.into(),
        }
    }

    pub fn buffer_pool(msg: impl Into<String>) -> Self {
        Self::BufferPool {
            message: msg.into(),
        }
    }

    pub fn finalize(msg: impl Into<String>) -> Self {
        Self::Finalize {
            message: msg.into(),
        }
    }

    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }
}
