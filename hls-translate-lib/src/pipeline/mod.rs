//! Chunk pipeline: arrival watcher and per-language workers.

pub mod watcher;
pub mod worker;

pub use watcher::ChunkWatcher;
pub use worker::{LanguageWorker, WorkerHandle};
