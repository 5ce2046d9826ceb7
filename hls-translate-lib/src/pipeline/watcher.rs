//! Chunk arrival detection.
//!
//! Polls the segmenter's output directory and hands each new chunk to the
//! dispatcher exactly once, in index order. The highest-numbered file is
//! always held back: the segmenter may still be writing it, and it only
//! becomes safe once a later chunk exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::types::Chunk;

/// Watches a chunk directory and emits confirmed chunks.
pub struct ChunkWatcher {
    dir: PathBuf,
    poll: Duration,
    next_index: u32,
}

impl ChunkWatcher {
    pub fn new(dir: impl Into<PathBuf>, poll: Duration) -> Self {
        Self {
            dir: dir.into(),
            poll,
            next_index: 0,
        }
    }

    /// Poll until the receiver side goes away.
    pub async fn run(mut self, tx: mpsc::Sender<Chunk>) {
        let mut interval = tokio::time::interval(self.poll);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            for chunk in self.poll_once() {
                debug!(index = chunk.index, "chunk confirmed");
                if tx.send(chunk).await.is_err() {
                    return;
                }
            }
        }
    }

    /// One scan of the directory; returns newly confirmed chunks in order.
    fn poll_once(&mut self) -> Vec<Chunk> {
        let found = match scan_dir(&self.dir) {
            Ok(found) => found,
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "chunk scan failed");
                return Vec::new();
            }
        };
        let (ready, next_index) = ready_chunks(found, self.next_index);
        self.next_index = next_index;
        ready
    }
}

fn scan_dir(dir: &Path) -> std::io::Result<Vec<Chunk>> {
    let mut chunks = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(chunk) = Chunk::from_path(&entry.path()) {
            chunks.push(chunk);
        }
    }
    Ok(chunks)
}

/// Select dispatchable chunks: everything at or past `next_index`, except
/// the newest file, which stays held back until a later one appears.
fn ready_chunks(mut found: Vec<Chunk>, next_index: u32) -> (Vec<Chunk>, u32) {
    found.sort_by_key(|c| c.index);
    let Some(newest) = found.last().map(|c| c.index) else {
        return (Vec::new(), next_index);
    };
    let ready: Vec<Chunk> = found
        .into_iter()
        .filter(|c| c.index >= next_index && c.index < newest)
        .collect();
    let next = ready.last().map(|c| c.index + 1).unwrap_or(next_index);
    (ready, next)
}
