//! Core types shared across the pipeline: chunk identity, session
//! outcomes, and the on-disk layout of a translation root.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Prefix marking a finished per-language artifact. Files carrying it are
/// never picked up as pipeline input.
pub const TRANSLATED_PREFIX: &str = "translated_";

fn chunk_name_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^chunk_(\d{3,})\.mp4$").unwrap())
}

/// One fixed-duration segment of the source stream, numbered by the
/// segmenter. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Monotonically increasing segmenter index.
    pub index: u32,
    /// Absolute path of the source chunk file.
    pub path: PathBuf,
}

impl Chunk {
    /// Parse a chunk from its path. Returns `None` for files that are not
    /// segmenter output, including already-translated artifacts.
    pub fn from_path(path: &Path) -> Option<Chunk> {
        let name = path.file_name()?.to_str()?;
        if is_translated_artifact(name) {
            return None;
        }
        let caps = chunk_name_re().captures(name)?;
        let index = caps[1].parse().ok()?;
        Some(Chunk {
            index,
            path: path.to_path_buf(),
        })
    }

    /// Source file name, e.g. `chunk_005.mp4`.
    pub fn file_name(&self) -> String {
        format!("chunk_{:03}.mp4", self.index)
    }

    /// Name of the per-language artifact derived from this chunk.
    pub fn translated_name(&self) -> String {
        format!("{}chunk_{:03}.mp4", TRANSLATED_PREFIX, self.index)
    }
}

/// True for filenames produced by the pipeline itself.
pub fn is_translated_artifact(name: &str) -> bool {
    name.starts_with(TRANSLATED_PREFIX)
}

/// Name of a translated artifact for a given index.
pub fn translated_chunk_name(index: u32) -> String {
    format!("{}chunk_{:03}.mp4", TRANSLATED_PREFIX, index)
}

/// Why a session fell back to the original audio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FallbackReason {
    /// No terminal event arrived within the session deadline.
    Timeout,
    /// Translated audio probed shorter than the configured minimum.
    ShortAudio { secs: f64 },
    /// The transcript was empty or below the minimum length.
    EmptyTranscript,
    /// The transcript carried the untranslatable marker.
    Untranslatable,
}

/// Terminal state of a translation session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionOutcome {
    /// Translated audio was muxed over the video.
    Completed,
    /// Original audio was muxed back; the artifact still exists.
    Fallback(FallbackReason),
    /// No artifact was produced; the caller decides retry-vs-drop.
    Failed,
}

impl SessionOutcome {
    /// True when an artifact file exists at the chunk's output path.
    pub fn produced_artifact(&self) -> bool {
        !matches!(self, SessionOutcome::Failed)
    }
}

/// On-disk layout of a translation root directory. All components derive
/// their working paths from here so the directory schema lives in one place.
#[derive(Debug, Clone)]
pub struct StreamLayout {
    root: PathBuf,
}

impl StreamLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory the segmenter writes source chunks into.
    pub fn chunks_dir(&self) -> PathBuf {
        self.root.join("chunks")
    }

    /// Directory holding a language's finished artifacts.
    pub fn language_dir(&self, language: &str) -> PathBuf {
        self.chunks_dir().join(language)
    }

    /// Final artifact path for a chunk in a language.
    pub fn translated_chunk(&self, language: &str, index: u32) -> PathBuf {
        self.language_dir(language).join(translated_chunk_name(index))
    }

    pub fn original_audio_dir(&self, language: &str) -> PathBuf {
        self.root.join("audios").join("original").join(language)
    }

    pub fn raw_audio_dir(&self, language: &str) -> PathBuf {
        self.root.join("audios").join("raw").join(language)
    }

    pub fn translated_audio_dir(&self, language: &str) -> PathBuf {
        self.root.join("audios").join("translations").join(language)
    }

    /// Packager input list for a language.
    pub fn input_list(&self, language: &str) -> PathBuf {
        self.root
            .join("file_lists")
            .join(format!("{language}_input_list.txt"))
    }

    /// Viewer-facing HLS directory for a language.
    pub fn stream_dir(&self, language: &str) -> PathBuf {
        self.root.join("stream").join(language)
    }

    /// Playlist the packager writes and viewers fetch.
    pub fn playlist(&self, language: &str) -> PathBuf {
        self.stream_dir(language).join("stream.m3u8")
    }

    pub fn captions_dir(&self, language: &str) -> PathBuf {
        self.stream_dir(language).join("captions")
    }

    /// All working paths for one (chunk, language) pair.
    pub fn work_paths(&self, language: &str, chunk: &Chunk) -> ChunkWorkPaths {
        let stem = format!("chunk_{:03}", chunk.index);
        ChunkWorkPaths {
            video: chunk.path.clone(),
            original_audio: self.original_audio_dir(language).join(format!("{stem}.aac")),
            pcm_wav: self.original_audio_dir(language).join(format!("{stem}.wav")),
            raw_audio: self.raw_audio_dir(language).join(format!("{stem}.raw")),
            translated_audio: self
                .translated_audio_dir(language)
                .join(format!("{stem}.aac")),
            caption: self.captions_dir(language).join(format!("{stem}.vtt")),
            output: self.translated_chunk(language, chunk.index),
        }
    }

    /// Create the per-language working directories. Idempotent.
    pub fn ensure_language_dirs(&self, language: &str) -> std::io::Result<()> {
        for dir in [
            self.language_dir(language),
            self.original_audio_dir(language),
            self.raw_audio_dir(language),
            self.translated_audio_dir(language),
            self.stream_dir(language),
            self.captions_dir(language),
            self.root.join("file_lists"),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }
}

/// Intermediate and output files for one chunk in one language.
#[derive(Debug, Clone)]
pub struct ChunkWorkPaths {
    /// Source chunk video.
    pub video: PathBuf,
    /// Audio extracted from the source chunk.
    pub original_audio: PathBuf,
    /// PCM conversion uploaded to the translation service.
    pub pcm_wav: PathBuf,
    /// Decoded response audio; deleted after a successful mux.
    pub raw_audio: PathBuf,
    /// Translated audio re-encoded for delivery.
    pub translated_audio: PathBuf,
    /// Timed caption fragment (written only when captioning is enabled).
    pub caption: PathBuf,
    /// Final artifact consumed by the playlist maintainer.
    pub output: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_chunk_names() {
        let c = Chunk::from_path(Path::new("/tmp/chunks/chunk_007.mp4")).unwrap();
        assert_eq!(c.index, 7);
        assert_eq!(c.file_name(), "chunk_007.mp4");
        assert_eq!(c.translated_name(), "translated_chunk_007.mp4");
    }

    #[test]
    fn parses_wide_indices() {
        let c = Chunk::from_path(Path::new("chunk_1234.mp4")).unwrap();
        assert_eq!(c.index, 1234);
    }

    #[test]
    fn rejects_translated_artifacts() {
        assert!(Chunk::from_path(Path::new("translated_chunk_001.mp4")).is_none());
    }

    #[test]
    fn rejects_non_chunk_files() {
        assert!(Chunk::from_path(Path::new("stream.m3u8")).is_none());
        assert!(Chunk::from_path(Path::new("chunk_01.mp4")).is_none());
        assert!(Chunk::from_path(Path::new("chunk_001.ts")).is_none());
        assert!(Chunk::from_path(Path::new(".chunk_001.mp4")).is_none());
    }

    #[test]
    fn layout_derives_expected_paths() {
        let layout = StreamLayout::new("/data");
        let chunk = Chunk::from_path(Path::new("/data/chunks/chunk_005.mp4")).unwrap();
        let paths = layout.work_paths("french", &chunk);

        assert_eq!(
            paths.output,
            Path::new("/data/chunks/french/translated_chunk_005.mp4")
        );
        assert_eq!(
            paths.original_audio,
            Path::new("/data/audios/original/french/chunk_005.aac")
        );
        assert_eq!(
            paths.raw_audio,
            Path::new("/data/audios/raw/french/chunk_005.raw")
        );
        assert_eq!(
            layout.input_list("french"),
            Path::new("/data/file_lists/french_input_list.txt")
        );
        assert_eq!(
            layout.playlist("french"),
            Path::new("/data/stream/french/stream.m3u8")
        );
    }
}
