//! High-level assembly: one [`LanguageStream`] wires together everything a
//! language needs — the shared service connection, the chunk worker, and
//! the playlist maintainer — and owns their lifetimes.

use crate::config::TranslateConfig;
use crate::error::{Result, TranslateError};
use crate::media::MediaShell;
use crate::pipeline::{LanguageWorker, WorkerHandle};
use crate::playlist::{MaintainerHandle, PlaylistMaintainer};
use crate::session::{ConnectSettings, ConnectionHandle};
use crate::types::{Chunk, StreamLayout};

/// Durable per-language state: connection, worker, and packager, created
/// when a language is activated and held until it is stopped.
pub struct LanguageStream {
    language: String,
    worker: WorkerHandle,
    maintainer: MaintainerHandle,
}

impl LanguageStream {
    /// Activate a language: create its directories, connect to the
    /// translation service, and start the worker and packager.
    pub fn start(
        language: &str,
        layout: &StreamLayout,
        config: &TranslateConfig,
        media: &MediaShell,
    ) -> Result<Self> {
        let api_key = config.service.resolve_api_key().ok_or_else(|| {
            TranslateError::Config("no API key configured (service.api_key or OPENAI_API_KEY)".into())
        })?;

        layout.ensure_language_dirs(language)?;

        let conn = ConnectionHandle::spawn(
            language,
            ConnectSettings {
                url: config.service.url.clone(),
                api_key,
            },
            config.connection.clone(),
        );

        let worker = LanguageWorker::spawn(
            language,
            layout.clone(),
            media.clone(),
            conn,
            config.session.clone(),
            config.pipeline.clone(),
        );

        let maintainer = PlaylistMaintainer::spawn(
            language,
            config.media.ffmpeg.clone(),
            layout.clone(),
            config.packaging.clone(),
        )?;

        Ok(Self {
            language: language.to_string(),
            worker,
            maintainer,
        })
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Queue a chunk for translation into this language.
    pub async fn dispatch(&self, chunk: Chunk) -> bool {
        self.worker.dispatch(chunk).await
    }

    /// A detached sender into this language's chunk queue.
    pub fn chunk_sender(&self) -> tokio::sync::mpsc::Sender<Chunk> {
        self.worker.sender()
    }

    /// Stop the language: drain the worker queue, then stop the packager.
    pub async fn stop(self) {
        let _ = self.worker.shutdown().await;
        self.maintainer.stop().await;
    }
}
