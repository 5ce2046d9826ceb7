//! Per-language pipeline worker.
//!
//! One task per active language owns that language's connection handle and
//! chunk queue. Chunks are processed strictly in arrival order with at
//! most one in flight, which is what keeps the shared connection's
//! one-subscriber invariant and the output list's ordering. Failures are
//! logged and skipped; nothing here may stall the queue.

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::{PipelineConfig, RetryPolicy, SessionConfig};
use crate::error::Result;
use crate::media::MediaShell;
use crate::session::{ConnectionHandle, TranslationSession};
use crate::types::{is_translated_artifact, Chunk, SessionOutcome, StreamLayout};

/// Handle to a running language worker.
pub struct WorkerHandle {
    chunk_tx: mpsc::Sender<Chunk>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Queue a chunk for this language. Returns false when the worker has
    /// stopped.
    pub async fn dispatch(&self, chunk: Chunk) -> bool {
        self.chunk_tx.send(chunk).await.is_ok()
    }

    /// A detached sender into this worker's queue, for fan-out loops that
    /// must not hold registry guards across await points.
    pub fn sender(&self) -> mpsc::Sender<Chunk> {
        self.chunk_tx.clone()
    }

    /// Stop the worker after it drains its queue.
    pub fn shutdown(self) -> JoinHandle<()> {
        drop(self.chunk_tx);
        self.join
    }
}

/// A language's chunk-processing loop.
pub struct LanguageWorker {
    language: String,
    layout: StreamLayout,
    media: MediaShell,
    conn: ConnectionHandle,
    session_config: SessionConfig,
    pipeline_config: PipelineConfig,
}

impl LanguageWorker {
    /// Spawn the worker task and return its handle.
    pub fn spawn(
        language: &str,
        layout: StreamLayout,
        media: MediaShell,
        conn: ConnectionHandle,
        session_config: SessionConfig,
        pipeline_config: PipelineConfig,
    ) -> WorkerHandle {
        let (chunk_tx, chunk_rx) = mpsc::channel(64);
        let worker = LanguageWorker {
            language: language.to_string(),
            layout,
            media,
            conn,
            session_config,
            pipeline_config,
        };
        let join = tokio::spawn(worker.run(chunk_rx));
        WorkerHandle { chunk_tx, join }
    }

    async fn run(self, mut chunk_rx: mpsc::Receiver<Chunk>) {
        info!(language = %self.language, "language worker started");
        while let Some(chunk) = chunk_rx.recv().await {
            if let Err(e) = self.process(&chunk).await {
                // A failed chunk is simply absent from the output list;
                // the next one must still be processed.
                error!(
                    language = %self.language,
                    chunk = chunk.index,
                    error = %e,
                    "chunk processing failed"
                );
            }
        }
        info!(language = %self.language, "language worker stopped");
    }

    async fn process(&self, chunk: &Chunk) -> Result<()> {
        let name = chunk
            .path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        if is_translated_artifact(name) {
            return Ok(());
        }

        self.layout.ensure_language_dirs(&self.language)?;
        let paths = self.layout.work_paths(&self.language, chunk);

        // Restart safety: an artifact that already exists was fully
        // produced by an earlier run.
        if paths.output.exists() {
            info!(
                language = %self.language,
                chunk = chunk.index,
                "artifact already exists, skipping"
            );
            return Ok(());
        }

        self.media
            .extract_audio(&paths.video, &paths.original_audio)
            .await?;

        let max_attempts = match self.pipeline_config.retry {
            RetryPolicy::Drop => 1,
            RetryPolicy::Retry { max_attempts } => max_attempts.max(1),
        };

        let mut outcome = SessionOutcome::Failed;
        for attempt in 1..=max_attempts {
            let session = TranslationSession {
                language: &self.language,
                chunk_index: chunk.index,
                conn: &self.conn,
                media: &self.media,
                config: &self.session_config,
                chunk_secs: self.pipeline_config.chunk_secs,
                paths: &paths,
            };
            match session.run().await {
                Ok(result) => {
                    outcome = result;
                    break;
                }
                Err(e) => {
                    warn!(
                        language = %self.language,
                        chunk = chunk.index,
                        attempt,
                        max_attempts,
                        error = %e,
                        "translation session failed"
                    );
                }
            }
        }

        if outcome.produced_artifact() && self.session_config.burn_captions {
            self.burn_captions(&paths).await;
        }

        info!(
            language = %self.language,
            chunk = chunk.index,
            ?outcome,
            "chunk finished"
        );
        Ok(())
    }

    /// Overlay the chunk's caption fragment onto the finished artifact.
    /// Best effort: the un-captioned artifact is already valid output.
    async fn burn_captions(&self, paths: &crate::types::ChunkWorkPaths) {
        if !paths.caption.exists() {
            return;
        }
        let burned = paths.output.with_extension("subbed.mp4");
        match self
            .media
            .burn_subtitles(&paths.output, &paths.caption, &burned)
            .await
        {
            Ok(_) => {
                if let Err(e) = tokio::fs::rename(&burned, &paths.output).await {
                    warn!(
                        language = %self.language,
                        error = %e,
                        "could not replace artifact with subtitled version"
                    );
                }
            }
            Err(e) => {
                warn!(language = %self.language, error = %e, "subtitle burn failed");
            }
        }
    }
}
