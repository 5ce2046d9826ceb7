//! Playlist maintenance scenarios over a temp directory.

use std::path::Path;
use std::time::Duration;

use crate::config::PackagingConfig;
use crate::playlist::{InputList, PlaylistMaintainer};
use crate::types::{translated_chunk_name, StreamLayout};

fn produce(dir: &Path, indices: &[u32]) {
    for &index in indices {
        std::fs::write(dir.join(translated_chunk_name(index)), b"mp4").unwrap();
    }
}

fn referenced_existing(list: &InputList) -> Vec<u32> {
    (list.start()..list.bound())
        .filter(|&i| list.chunk_path(i).exists())
        .collect()
}

#[test]
fn recovery_skips_the_gap_and_preserves_order() {
    let dir = tempfile::tempdir().unwrap();
    let chunks = dir.path().join("chunks");
    std::fs::create_dir_all(&chunks).unwrap();
    produce(&chunks, &[0, 1, 3, 4]);

    let mut list = InputList::create(dir.path().join("list.txt"), &chunks, 10).unwrap();

    // Chunk 2 never arrived; the packager trips over it.
    assert_eq!(list.first_missing(), Some(2));
    list.truncate_through(2).unwrap();

    assert_eq!(list.start(), 3);
    // The surviving references are still the produced order, minus a
    // prefix: a gap, never a reordering.
    assert_eq!(referenced_existing(&list), vec![3, 4]);
}

#[test]
fn repeated_recovery_walks_forward_monotonically() {
    let dir = tempfile::tempdir().unwrap();
    let chunks = dir.path().join("chunks");
    std::fs::create_dir_all(&chunks).unwrap();
    produce(&chunks, &[0, 1, 4, 5, 8]);

    let mut list = InputList::create(dir.path().join("list.txt"), &chunks, 9).unwrap();

    let mut starts = vec![list.start()];
    while let Some(missing) = list.first_missing() {
        list.truncate_through(missing).unwrap();
        starts.push(list.start());
        if list.start() >= list.bound() {
            break;
        }
    }

    // Every recovery strictly advances the window; it never rewinds.
    assert!(starts.windows(2).all(|w| w[0] < w[1]));
    // 2 missing -> start 3; 3 missing -> start 4; 6 missing -> start 7;
    // 7 missing -> start 8, where a produced artifact exists again.
    assert_eq!(starts, vec![0, 3, 4, 7, 8]);
}

#[tokio::test]
async fn maintainer_stops_cleanly_while_waiting_for_the_first_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let layout = StreamLayout::new(dir.path());
    layout.ensure_language_dirs("french").unwrap();

    let config = PackagingConfig {
        wait_poll_secs: 1,
        ..PackagingConfig::default()
    };
    let handle = PlaylistMaintainer::spawn(
        "french",
        "/nonexistent/ffmpeg".into(),
        layout,
        config,
    )
    .unwrap();

    // No artifact ever appears; stop must still return promptly.
    tokio::time::timeout(Duration::from_secs(5), handle.stop())
        .await
        .expect("maintainer shut down");
}
