//! Application state: the active language registry, the segmenter handle,
//! and the chunk dispatch loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{mpsc, Mutex};
use tracing::{info, warn};

use hls_translate_lib::pipeline::ChunkWatcher;
use hls_translate_lib::types::Chunk;
use hls_translate_lib::{LanguageStream, MediaShell, StreamLayout, TranslateConfig};

use crate::error::Result;
use crate::segmenter::Segmenter;

/// State shared across all handlers and background tasks.
pub struct AppState {
    /// Languages currently being translated.
    pub languages: DashMap<String, LanguageStream>,
    /// Running upstream segmenter, if any.
    pub segmenter: Mutex<Option<Segmenter>>,
    /// Whether the chunk watcher/dispatcher has been started.
    watcher_started: AtomicBool,
    pub layout: StreamLayout,
    pub media: MediaShell,
    pub config: TranslateConfig,
}

impl AppState {
    pub fn new(layout: StreamLayout, config: TranslateConfig) -> Self {
        let media = MediaShell::new(config.media.clone());
        Self {
            languages: DashMap::new(),
            segmenter: Mutex::new(None),
            watcher_started: AtomicBool::new(false),
            layout,
            media,
            config,
        }
    }

    /// Activate a language. Returns false when it was already active.
    pub fn activate_language(&self, language: &str) -> Result<bool> {
        if self.languages.contains_key(language) {
            return Ok(false);
        }
        let stream = LanguageStream::start(language, &self.layout, &self.config, &self.media)?;
        self.languages.insert(language.to_string(), stream);
        info!(language, "language activated");
        Ok(true)
    }

    /// Deactivate a language and tear down its worker and packager.
    /// Returns false when it was not active.
    pub async fn deactivate_language(&self, language: &str) -> bool {
        match self.languages.remove(language) {
            Some((_, stream)) => {
                stream.stop().await;
                info!(language, "language deactivated");
                true
            }
            None => false,
        }
    }

    /// Start the chunk watcher and dispatch loop once per process.
    pub fn ensure_watcher(self: &Arc<Self>) {
        if self.watcher_started.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = mpsc::channel::<Chunk>(64);
        let watcher = ChunkWatcher::new(
            self.layout.chunks_dir(),
            self.config.pipeline.poll_interval(),
        );
        tokio::spawn(watcher.run(tx));

        let state = Arc::clone(self);
        tokio::spawn(state.dispatch_loop(rx));
        info!("chunk watcher started");
    }

    /// Fan each confirmed chunk out to every active language.
    async fn dispatch_loop(self: Arc<Self>, mut rx: mpsc::Receiver<Chunk>) {
        while let Some(chunk) = rx.recv().await {
            // Snapshot the senders so no registry guard is held across
            // the awaits below.
            let targets: Vec<_> = self
                .languages
                .iter()
                .map(|entry| (entry.key().clone(), entry.value().chunk_sender()))
                .collect();

            for (language, sender) in targets {
                if sender.send(chunk.clone()).await.is_err() {
                    warn!(language = %language, chunk = chunk.index, "worker queue closed");
                }
            }
        }
    }
}
