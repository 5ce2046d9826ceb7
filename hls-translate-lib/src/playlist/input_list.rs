//! Packager input list maintenance.
//!
//! The packaging tool reads its concat list exactly once, when it opens
//! the file; rewriting the list while the process holds it open is
//! silently ignored. The list is therefore pre-populated with references
//! up to a large bound so a running packager never needs it rewritten,
//! and is only ever rewritten between packager runs, by advancing the
//! window start past a missing entry.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::types::translated_chunk_name;

/// The reference window `[start, bound)` a packager run consumes.
#[derive(Debug)]
pub struct InputList {
    path: PathBuf,
    chunks_dir: PathBuf,
    start: u32,
    bound: u32,
}

impl InputList {
    /// Create the list on disk, pre-populated from index 0 to `bound`.
    pub fn create(
        path: impl Into<PathBuf>,
        chunks_dir: impl Into<PathBuf>,
        bound: u32,
    ) -> std::io::Result<Self> {
        let list = Self {
            path: path.into(),
            chunks_dir: chunks_dir.into(),
            start: 0,
            bound,
        };
        list.write_window()?;
        Ok(list)
    }

    /// First referenced chunk index.
    pub fn start(&self) -> u32 {
        self.start
    }

    /// Exclusive end of the reference window.
    pub fn bound(&self) -> u32 {
        self.bound
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Artifact path a given index resolves to.
    pub fn chunk_path(&self, index: u32) -> PathBuf {
        self.chunks_dir.join(translated_chunk_name(index))
    }

    /// Index of the first referenced artifact that does not exist yet,
    /// scanning from the window start.
    pub fn first_missing(&self) -> Option<u32> {
        (self.start..self.bound).find(|&index| !self.chunk_path(index).exists())
    }

    /// Drop the strict prefix ending at `missing` and rewrite the list so
    /// the next packager run starts at the following entry.
    ///
    /// Must only be called between packager runs.
    pub fn truncate_through(&mut self, missing: u32) -> std::io::Result<()> {
        debug_assert!(missing >= self.start && missing < self.bound);
        self.start = missing.saturating_add(1).min(self.bound);
        self.write_window()
    }

    fn write_window(&self) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut buf = String::new();
        for index in self.start..self.bound {
            buf.push_str(&format!("file '{}'\n", self.chunk_path(index).display()));
        }
        // Write-then-rename so a packager never opens a half-written list.
        let tmp = self.path.with_extension("txt.tmp");
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(buf.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_entries(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn prepopulates_full_window() {
        let dir = tempfile::tempdir().unwrap();
        let list = InputList::create(dir.path().join("french_input_list.txt"), "/data/chunks/french", 5)
            .unwrap();

        let entries = read_entries(list.path());
        assert_eq!(entries.len(), 5);
        assert_eq!(
            entries[0],
            "file '/data/chunks/french/translated_chunk_000.mp4'"
        );
        assert_eq!(
            entries[4],
            "file '/data/chunks/french/translated_chunk_004.mp4'"
        );
    }

    #[test]
    fn truncation_removes_strict_prefix_through_missing() {
        let dir = tempfile::tempdir().unwrap();
        let mut list =
            InputList::create(dir.path().join("list.txt"), "/data/chunks/french", 10).unwrap();

        list.truncate_through(3).unwrap();
        assert_eq!(list.start(), 4);

        let entries = read_entries(list.path());
        assert_eq!(entries.len(), 6);
        assert_eq!(
            entries[0],
            "file '/data/chunks/french/translated_chunk_004.mp4'"
        );
    }

    #[test]
    fn window_never_grows_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut list =
            InputList::create(dir.path().join("list.txt"), "/chunks", 10).unwrap();
        list.truncate_through(2).unwrap();
        list.truncate_through(7).unwrap();
        assert_eq!(list.start(), 8);
        assert_eq!(read_entries(list.path()).len(), 2);
    }

    #[test]
    fn first_missing_finds_the_gap() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = dir.path().join("chunks");
        std::fs::create_dir_all(&chunks).unwrap();
        for index in [0u32, 1, 3] {
            std::fs::write(chunks.join(translated_chunk_name(index)), b"x").unwrap();
        }

        let list = InputList::create(dir.path().join("list.txt"), &chunks, 10).unwrap();
        assert_eq!(list.first_missing(), Some(2));
    }

    #[test]
    fn first_missing_after_truncation_skips_resolved_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let chunks = dir.path().join("chunks");
        std::fs::create_dir_all(&chunks).unwrap();
        for index in [3u32, 4] {
            std::fs::write(chunks.join(translated_chunk_name(index)), b"x").unwrap();
        }

        let mut list = InputList::create(dir.path().join("list.txt"), &chunks, 10).unwrap();
        list.truncate_through(2).unwrap();
        assert_eq!(list.first_missing(), Some(5));
    }
}
