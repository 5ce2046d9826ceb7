//! Tunable configuration for the translation pipeline.
//!
//! Every timing and threshold value the pipeline depends on lives here,
//! with serde defaults, so a deployment can tune deadlines, keep-alive
//! cadence, and fallback thresholds without rebuilding.

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration for the translation pipeline.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TranslateConfig {
    /// Realtime translation service endpoint and credentials.
    pub service: ServiceConfig,
    /// Per-session behavior (deadlines, fallback thresholds).
    pub session: SessionConfig,
    /// Shared-connection behavior (reconnect, keep-alive).
    pub connection: ConnectionConfig,
    /// External media tool invocation.
    pub media: MediaConfig,
    /// Chunk pipeline behavior.
    pub pipeline: PipelineConfig,
    /// Live playlist packaging.
    pub packaging: PackagingConfig,
}

/// Remote realtime translation service settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// WebSocket URL of the realtime API.
    pub url: String,
    /// Bearer token. Falls back to the OPENAI_API_KEY environment variable.
    pub api_key: Option<String>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            url: "wss://api.openai.com/v1/realtime?model=gpt-4o-realtime-preview".into(),
            api_key: None,
        }
    }
}

impl ServiceConfig {
    /// Resolve the API key from config or environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

/// Per-session tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds a session may run before the fallback mux is forced.
    pub deadline_secs: u64,
    /// Translated audio shorter than this is treated as empty and falls back.
    pub min_audio_secs: f64,
    /// Transcripts shorter than this are treated as empty.
    pub min_transcript_len: usize,
    /// Marker the service is instructed to emit for untranslatable audio.
    pub untranslatable_marker: String,
    /// Persist transcripts as timed caption fragments.
    pub captions: bool,
    /// Burn persisted captions into the final video.
    pub burn_captions: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            deadline_secs: 60,
            min_audio_secs: 4.0,
            min_transcript_len: 2,
            untranslatable_marker: "intranslatable".into(),
            captions: false,
            burn_captions: false,
        }
    }
}

impl SessionConfig {
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs)
    }
}

/// Shared-connection tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Seconds between reconnect attempts after a drop.
    pub reconnect_delay_secs: u64,
    /// Give up after this many consecutive failed reconnects.
    pub max_reconnect_attempts: u32,
    /// Seconds between keep-alive continuation messages.
    pub keep_alive_secs: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_secs: 5,
            max_reconnect_attempts: 30,
            keep_alive_secs: 25 * 60,
        }
    }
}

impl ConnectionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_secs)
    }
}

/// External media tool settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to the ffmpeg executable.
    pub ffmpeg: PathBuf,
    /// Path to the ffprobe executable.
    pub ffprobe: PathBuf,
    /// Sample rate the remote service expects.
    pub sample_rate: u32,
    /// Bitrate for re-encoded translated audio.
    pub audio_bitrate: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            ffmpeg: "ffmpeg".into(),
            ffprobe: "ffprobe".into(),
            sample_rate: 24_000,
            audio_bitrate: "128k".into(),
        }
    }
}

/// How a worker handles a chunk whose session ended in `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode")]
pub enum RetryPolicy {
    /// Skip the chunk; it is simply absent from the output list.
    Drop,
    /// Re-run the session up to `max_attempts` times, then drop.
    Retry { max_attempts: u32 },
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::Drop
    }
}

/// Chunk pipeline tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Seconds between chunk directory scans.
    pub poll_secs: u64,
    /// Target duration of segmenter chunks, used for caption timing.
    pub chunk_secs: u64,
    /// What to do with chunks whose session failed outright.
    pub retry: RetryPolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_secs: 1,
            chunk_secs: 10,
            retry: RetryPolicy::Drop,
        }
    }
}

impl PipelineConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_secs)
    }
}

/// Live playlist packaging tunables.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PackagingConfig {
    /// HLS segment duration in seconds.
    pub segment_secs: u32,
    /// Rolling playlist window size in segments.
    pub window_size: u32,
    /// How many list entries to pre-populate so the running packager
    /// never needs its input file rewritten.
    pub prepopulate: u32,
    /// Seconds between checks while waiting for a referenced file.
    pub wait_poll_secs: u64,
}

impl Default for PackagingConfig {
    fn default() -> Self {
        Self {
            segment_secs: 5,
            window_size: 20,
            prepopulate: 2000,
            wait_poll_secs: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = TranslateConfig::default();
        assert_eq!(cfg.session.deadline_secs, 60);
        assert_eq!(cfg.connection.keep_alive_secs, 1500);
        assert_eq!(cfg.media.sample_rate, 24_000);
        assert!((cfg.session.min_audio_secs - 4.0).abs() < f64::EPSILON);
        assert_eq!(cfg.pipeline.retry, RetryPolicy::Drop);
        assert_eq!(cfg.packaging.prepopulate, 2000);
    }

    #[test]
    fn toml_overrides_apply() {
        let cfg: TranslateConfig = toml::from_str(
            r#"
            [session]
            deadline_secs = 30
            captions = true

            [pipeline]
            retry = { mode = "retry", max_attempts = 2 }

            [service]
            url = "wss://example.test/realtime"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.session.deadline_secs, 30);
        assert!(cfg.session.captions);
        assert_eq!(cfg.pipeline.retry, RetryPolicy::Retry { max_attempts: 2 });
        assert_eq!(cfg.service.url, "wss://example.test/realtime");
        // untouched sections keep defaults
        assert_eq!(cfg.packaging.window_size, 20);
    }
}
