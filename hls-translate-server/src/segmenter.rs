//! Upstream segmenter: one ffmpeg process splitting the source stream
//! into fixed-duration chunk files. A fixed-flag external invocation with
//! no further logic; the chunk watcher picks up what it writes.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::error::{Result, ServerError};

/// Handle to the running segmenter process.
pub struct Segmenter {
    child: Child,
}

impl Segmenter {
    /// Spawn the segmenter against a source stream URL.
    pub fn spawn(
        ffmpeg: &Path,
        url: &str,
        chunks_dir: &Path,
        chunk_secs: u64,
    ) -> Result<Self> {
        std::fs::create_dir_all(chunks_dir)?;
        let pattern: PathBuf = chunks_dir.join("chunk_%03d.mp4");

        let mut child = Command::new(ffmpeg)
            .args(["-hide_banner", "-loglevel", "warning"])
            .arg("-i")
            .arg(url)
            .args(["-c", "copy"])
            .args(["-flags", "+global_header"])
            .args(["-f", "segment"])
            .arg("-segment_time")
            .arg(chunk_secs.to_string())
            .args(["-segment_format_options", "movflags=+faststart"])
            .args(["-reset_timestamps", "1"])
            .arg(&pattern)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ServerError::Internal(format!("spawn segmenter: {e}")))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_stderr(stderr));
        }

        info!(url, chunks = %chunks_dir.display(), "segmenter started");
        Ok(Self { child })
    }

    /// Kill the segmenter and reap it.
    pub async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            warn!(error = %e, "could not kill segmenter");
        }
        let _ = self.child.wait().await;
        info!("segmenter stopped");
    }
}

async fn drain_stderr(stderr: tokio::process::ChildStderr) {
    use tokio::io::AsyncBufReadExt;
    let reader = tokio::io::BufReader::new(stderr);
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.is_empty() {
            debug!("segmenter: {}", line);
        }
    }
}
