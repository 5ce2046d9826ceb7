use thiserror::Error;

/// Main error type for the server binary
#[derive(Error, Debug)]
pub enum ServerError {
    /// An error from the translation library
    #[error("translation error: {0}")]
    Translate(#[from] hls_translate_lib::TranslateError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ServerError>;
