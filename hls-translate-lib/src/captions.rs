//! Timed caption fragments.
//!
//! Each chunk's transcript becomes one WebVTT file with a single cue
//! spanning the chunk's slot in the stream timeline. Fragments double as
//! burn-in input for the optional subtitle overlay.

/// Render one chunk's transcript as a WebVTT fragment.
pub fn fragment(chunk_index: u32, chunk_secs: u64, transcript: &str) -> String {
    let start = chunk_index as u64 * chunk_secs;
    let end = start + chunk_secs;
    format!(
        "WEBVTT\n\n{} --> {}\n{}\n",
        timestamp(start),
        timestamp(end),
        transcript.trim()
    )
}

fn timestamp(total_secs: u64) -> String {
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let secs = total_secs % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}.000")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_covers_chunk_slot() {
        let vtt = fragment(5, 10, "bonjour tout le monde");
        assert!(vtt.starts_with("WEBVTT\n\n"));
        assert!(vtt.contains("00:00:50.000 --> 00:01:00.000"));
        assert!(vtt.ends_with("bonjour tout le monde\n"));
    }

    #[test]
    fn timestamps_roll_over_hours() {
        assert_eq!(timestamp(3661), "01:01:01.000");
        assert_eq!(timestamp(0), "00:00:00.000");
    }

    #[test]
    fn transcript_is_trimmed() {
        let vtt = fragment(0, 10, "  salut  \n");
        assert!(vtt.ends_with("salut\n"));
    }
}
