//! Live playlist packager supervision.
//!
//! One ffmpeg concat→HLS process per language republishes finished chunks
//! as a rolling, append-only playlist. The process is started once the
//! first referenced artifact exists and is restarted only on missing-file
//! recovery: a restart re-initializes segment numbering, so per-arrival
//! restarts would visibly disrupt viewers.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::PackagingConfig;
use crate::error::{Result, TranslateError};
use crate::playlist::input_list::InputList;
use crate::types::StreamLayout;

/// Handle to a running playlist maintainer.
pub struct MaintainerHandle {
    stop_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl MaintainerHandle {
    /// Stop the packager and wait for the supervisor to exit.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        let _ = self.join.await;
    }
}

/// Supervises the input list and the packaging process for one language.
pub struct PlaylistMaintainer {
    language: String,
    ffmpeg: PathBuf,
    layout: StreamLayout,
    config: PackagingConfig,
}

impl PlaylistMaintainer {
    /// Create the input list and spawn the supervisor task.
    pub fn spawn(
        language: &str,
        ffmpeg: PathBuf,
        layout: StreamLayout,
        config: PackagingConfig,
    ) -> Result<MaintainerHandle> {
        let list = InputList::create(
            layout.input_list(language),
            layout.language_dir(language),
            config.prepopulate,
        )?;
        std::fs::create_dir_all(layout.stream_dir(language))?;

        let maintainer = PlaylistMaintainer {
            language: language.to_string(),
            ffmpeg,
            layout,
            config,
        };
        let (stop_tx, stop_rx) = watch::channel(false);
        let join = tokio::spawn(maintainer.run(list, stop_rx));
        Ok(MaintainerHandle { stop_tx, join })
    }

    async fn run(self, mut list: InputList, mut stop_rx: watch::Receiver<bool>) {
        info!(language = %self.language, "playlist maintainer started");
        loop {
            // Never hand the packager a list whose first entry is absent;
            // it would fail immediately.
            if !self.wait_for_artifact(&list, &mut stop_rx).await {
                break;
            }

            let mut child = match self.spawn_packager(&list) {
                Ok(child) => child,
                Err(e) => {
                    warn!(language = %self.language, error = %e, "could not start packager");
                    if !self.pause(&mut stop_rx).await {
                        break;
                    }
                    continue;
                }
            };
            info!(
                language = %self.language,
                start = list.start(),
                "packager running"
            );

            tokio::select! {
                _ = stop_rx.changed() => {
                    let _ = child.kill().await;
                    let _ = child.wait().await;
                    break;
                }
                status = child.wait() => {
                    match status {
                        Ok(status) => warn!(
                            language = %self.language,
                            code = ?status.code(),
                            "packager exited"
                        ),
                        Err(e) => warn!(language = %self.language, error = %e, "packager wait failed"),
                    }
                    self.recover(&mut list);
                    if !self.pause(&mut stop_rx).await {
                        break;
                    }
                }
            }
        }
        info!(language = %self.language, "playlist maintainer stopped");
    }

    /// Skip forward past the entry the packager could not open. The stream
    /// gets a gap; it never stalls.
    fn recover(&self, list: &mut InputList) {
        match list.first_missing() {
            Some(missing) => {
                warn!(
                    language = %self.language,
                    missing,
                    "skipping missing artifact, stream will gap"
                );
                if let Err(e) = list.truncate_through(missing) {
                    warn!(language = %self.language, error = %e, "list truncation failed");
                }
            }
            None => {
                // Every referenced file exists; the exit was something
                // else (tool crash, exhausted window). Restart in place.
                debug!(language = %self.language, "no missing artifact, restarting as-is");
            }
        }
    }

    /// Wait until the artifact at the window start exists. Returns false
    /// on shutdown.
    async fn wait_for_artifact(&self, list: &InputList, stop_rx: &mut watch::Receiver<bool>) -> bool {
        while !list.chunk_path(list.start()).exists() {
            if !self.pause(stop_rx).await {
                return false;
            }
        }
        true
    }

    /// Sleep one poll interval; returns false on shutdown.
    async fn pause(&self, stop_rx: &mut watch::Receiver<bool>) -> bool {
        tokio::select! {
            _ = stop_rx.changed() => false,
            _ = tokio::time::sleep(std::time::Duration::from_secs(self.config.wait_poll_secs)) => true,
        }
    }

    fn spawn_packager(&self, list: &InputList) -> Result<Child> {
        let playlist = self.layout.playlist(&self.language);
        let mut child = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "warning"])
            .arg("-re")
            .args(["-err_detect", "ignore_err"])
            .args(["-f", "concat"])
            .args(["-safe", "0"])
            .arg("-i")
            .arg(list.path())
            .args(["-c:v", "copy"])
            .args(["-c:a", "copy"])
            .args(["-f", "hls"])
            .arg("-hls_time")
            .arg(self.config.segment_secs.to_string())
            .arg("-hls_list_size")
            .arg(self.config.window_size.to_string())
            .args(["-hls_flags", "append_list"])
            .arg(&playlist)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| TranslateError::Packaging(format!("spawn ffmpeg: {e}")))?;

        if let Some(stderr) = child.stderr.take() {
            let language = self.language.clone();
            tokio::spawn(drain_stderr(language, stderr));
        }
        Ok(child)
    }
}

/// Log the packager's stderr so demuxer complaints are visible.
async fn drain_stderr(language: String, stderr: tokio::process::ChildStderr) {
    use tokio::io::AsyncBufReadExt;
    let reader = tokio::io::BufReader::new(stderr);
    let mut lines = reader.lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if !line.is_empty() {
            debug!(language = %language, "packager: {}", line);
        }
    }
}
