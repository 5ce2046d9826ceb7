use thiserror::Error;

/// Main error type for the translation pipeline
#[derive(Error, Debug)]
pub enum TranslateError {
    /// An external media tool invocation failed
    #[error("media tool error: {0}")]
    MediaTool(#[from] MediaToolError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A malformed or unexpected message from the remote translation service
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The per-session deadline elapsed before a terminal event arrived
    #[error("translation session timed out")]
    Timeout,

    /// The shared connection to the remote service dropped or could not be established
    #[error("connection error: {0}")]
    Connection(String),

    /// The remote service declared the session stale
    #[error("remote session expired")]
    SessionExpired,

    /// The remote service refused to complete the response
    #[error("response incomplete: {0}")]
    ResponseIncomplete(String),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket transport error
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// The playlist packager could not make progress
    #[error("packaging error: {0}")]
    Packaging(String),
}

/// Errors from invoking the external media tool (ffmpeg/ffprobe)
#[derive(Error, Debug)]
pub enum MediaToolError {
    /// The input file for an operation does not exist
    #[error("input file not found: {0}")]
    InputMissing(String),

    /// The tool process could not be spawned
    #[error("failed to spawn {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool exited with a non-zero status
    #[error("{tool} exited with {code:?}: {stderr}")]
    Failed {
        tool: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The tool produced output that could not be interpreted
    #[error("unparseable {tool} output: {detail}")]
    BadOutput { tool: String, detail: String },
}

impl MediaToolError {
    /// Exit code ffmpeg reports when the audio stream cannot be merged;
    /// callers treat it as "copy the video unchanged" rather than a failure.
    pub const MUX_UNMERGEABLE: i32 = 187;

    /// True if this is the known mux failure that permits the copy fallback.
    pub fn is_mux_unmergeable(&self) -> bool {
        matches!(
            self,
            MediaToolError::Failed {
                code: Some(c),
                ..
            } if *c == Self::MUX_UNMERGEABLE
        )
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TranslateError>;
