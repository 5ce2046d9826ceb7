//! Core library for live HLS stream translation.
//!
//! A source stream is segmented into fixed-duration chunks; each chunk's
//! audio is translated by a remote realtime service over a persistent
//! per-language connection, re-muxed with the original video, and
//! republished as a growing per-language HLS stream.

pub mod api;
pub mod captions;
pub mod config;
pub mod error;
pub mod media;
pub mod pipeline;
pub mod playlist;
pub mod session;
pub mod types;

#[cfg(test)]
pub(crate) mod tests;

pub use api::LanguageStream;
pub use config::TranslateConfig;
pub use error::{MediaToolError, Result, TranslateError};
pub use media::MediaShell;
pub use types::{Chunk, SessionOutcome, StreamLayout};
