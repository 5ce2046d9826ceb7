//! The per-chunk translation session state machine.
//!
//! One value per (chunk, language), never reused. Drives: PCM conversion →
//! audio upload → response event loop → assembly and re-mux, with the
//! timeout and fallback semantics that keep the live pipeline from ever
//! stalling on a single chunk.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::{debug, info, warn};

use crate::captions;
use crate::config::SessionConfig;
use crate::error::{Result, TranslateError};
use crate::media::{MediaShell, MuxResult};
use crate::session::connection::ConnectionHandle;
use crate::session::protocol::{self, ServerEvent};
use crate::types::{ChunkWorkPaths, FallbackReason, SessionOutcome};

/// One remote-translation exchange for a single chunk/language pair.
pub struct TranslationSession<'a> {
    pub language: &'a str,
    pub chunk_index: u32,
    pub conn: &'a ConnectionHandle,
    pub media: &'a MediaShell,
    pub config: &'a SessionConfig,
    /// Target chunk duration, used for caption cue timing.
    pub chunk_secs: u64,
    pub paths: &'a ChunkWorkPaths,
}

impl TranslationSession<'_> {
    /// Run the session to a terminal state.
    ///
    /// `Completed` and `Fallback` both leave an artifact at
    /// `paths.output`; failures are returned as errors and the caller
    /// decides retry-vs-drop.
    pub async fn run(self) -> Result<SessionOutcome> {
        self.media
            .convert_to_pcm_wav(&self.paths.original_audio, &self.paths.pcm_wav)
            .await?;
        let pcm = tokio::fs::read(&self.paths.pcm_wav).await?;
        let encoded = BASE64.encode(&pcm);

        // Subscribe before sending so no early event is missed. The guard
        // detaches on every exit path out of this function.
        let mut events = self.conn.subscribe().await?;
        self.conn.send(protocol::append_audio(&encoded)).await?;
        self.conn
            .send(protocol::request_translation(self.language))
            .await?;

        let deadline = tokio::time::Instant::now() + self.config.deadline();
        let mut fragments: Vec<String> = Vec::new();

        loop {
            let event = match tokio::time::timeout_at(deadline, events.next_event()).await {
                Ok(Some(event)) => event,
                Ok(None) => {
                    return Err(TranslateError::Connection(
                        "connection dropped mid-session".into(),
                    ));
                }
                Err(_) => {
                    warn!(
                        language = self.language,
                        chunk = self.chunk_index,
                        "no terminal event before deadline, muxing original audio"
                    );
                    self.mux_original().await?;
                    return Ok(SessionOutcome::Fallback(FallbackReason::Timeout));
                }
            };

            match event {
                ServerEvent::AudioDelta { delta } => fragments.push(delta),

                ServerEvent::TranscriptDone { transcript } => {
                    if let Some(reason) = self.judge_transcript(&transcript) {
                        info!(
                            language = self.language,
                            chunk = self.chunk_index,
                            ?reason,
                            "transcript unusable, muxing original audio"
                        );
                        self.mux_original().await?;
                        return Ok(SessionOutcome::Fallback(reason));
                    }
                    if self.config.captions {
                        self.persist_caption(&transcript).await;
                    }
                }

                ServerEvent::OutputItemDone => {
                    return self.assemble(&fragments).await;
                }

                ServerEvent::ResponseDone { status, reason } => {
                    match (status.as_deref(), reason.as_deref()) {
                        (Some("incomplete"), Some("max_output_tokens")) => {
                            return Err(TranslateError::ResponseIncomplete(
                                "max_output_tokens".into(),
                            ));
                        }
                        (Some("incomplete"), Some("content_filter")) => {
                            // Only logged; the deadline produces the fallback.
                            warn!(
                                language = self.language,
                                chunk = self.chunk_index,
                                "response withheld by content filter"
                            );
                        }
                        (status, _) => {
                            debug!(
                                language = self.language,
                                chunk = self.chunk_index,
                                ?status,
                                "response done"
                            );
                        }
                    }
                }

                ServerEvent::Error { code, message } => {
                    if code.as_deref() == Some("session_expired") {
                        // Nudge the connection back to life for the next
                        // session; this one is lost.
                        let _ = self.conn.send(protocol::session_continue()).await;
                        return Err(TranslateError::SessionExpired);
                    }
                    warn!(
                        language = self.language,
                        chunk = self.chunk_index,
                        ?code,
                        ?message,
                        "server error event"
                    );
                }

                ServerEvent::Other { .. } => {}
            }
        }
    }

    /// Returns the fallback reason if the transcript disqualifies the
    /// translation.
    fn judge_transcript(&self, transcript: &str) -> Option<FallbackReason> {
        judge_transcript(self.config, transcript)
    }

    /// Decode the accumulated fragments, re-encode, gate on duration, and
    /// mux the translated audio over the video.
    async fn assemble(&self, fragments: &[String]) -> Result<SessionOutcome> {
        let pcm = decode_fragments(fragments)?;
        tokio::fs::write(&self.paths.raw_audio, &pcm).await?;

        self.media
            .encode_raw_pcm(&self.paths.raw_audio, &self.paths.translated_audio)
            .await?;

        let secs = self
            .media
            .probe_duration(&self.paths.translated_audio)
            .await?;
        if secs < self.config.min_audio_secs {
            info!(
                language = self.language,
                chunk = self.chunk_index,
                secs,
                "translated audio too short, muxing original audio"
            );
            self.mux_original().await?;
            return Ok(SessionOutcome::Fallback(FallbackReason::ShortAudio { secs }));
        }

        let result = self
            .media
            .mux_audio_video(
                &self.paths.video,
                &self.paths.translated_audio,
                &self.paths.output,
            )
            .await?;
        if result == MuxResult::CopiedOriginal {
            warn!(
                language = self.language,
                chunk = self.chunk_index,
                "translated mux degraded to a video copy"
            );
        }

        if let Err(e) = tokio::fs::remove_file(&self.paths.raw_audio).await {
            debug!(error = %e, "could not remove raw intermediate");
        }

        info!(
            language = self.language,
            chunk = self.chunk_index,
            output = %self.paths.output.display(),
            "translation complete"
        );
        Ok(SessionOutcome::Completed)
    }

    /// Fallback path: put the original extracted audio back over the video.
    async fn mux_original(&self) -> Result<()> {
        self.media
            .mux_audio_video(
                &self.paths.video,
                &self.paths.original_audio,
                &self.paths.output,
            )
            .await?;
        Ok(())
    }

    /// Best-effort caption persistence; never fails the session.
    async fn persist_caption(&self, transcript: &str) {
        let cue = captions::fragment(self.chunk_index, self.chunk_secs, transcript);
        if let Err(e) = tokio::fs::write(&self.paths.caption, cue).await {
            warn!(
                language = self.language,
                chunk = self.chunk_index,
                error = %e,
                "could not persist caption fragment"
            );
        }
    }
}

/// Decode base64 audio fragments into one raw PCM byte stream, preserving
/// arrival order. Fragments are decoded individually: each one is a
/// complete base64 encoding of its own bytes.
pub(crate) fn decode_fragments(fragments: &[String]) -> Result<Vec<u8>> {
    let mut pcm: Vec<u8> = Vec::new();
    for fragment in fragments {
        let bytes = BASE64
            .decode(fragment)
            .map_err(|e| TranslateError::Protocol(format!("bad audio fragment: {e}")))?;
        pcm.extend_from_slice(&bytes);
    }
    Ok(pcm)
}

/// Decide whether a transcript disqualifies the translation.
pub(crate) fn judge_transcript(
    config: &SessionConfig,
    transcript: &str,
) -> Option<FallbackReason> {
    let trimmed = transcript.trim();
    if trimmed.is_empty() || trimmed.len() < config.min_transcript_len {
        return Some(FallbackReason::EmptyTranscript);
    }
    if trimmed.to_lowercase().contains(&config.untranslatable_marker) {
        return Some(FallbackReason::Untranslatable);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SessionConfig {
        SessionConfig::default()
    }

    #[test]
    fn empty_transcript_falls_back() {
        assert_eq!(
            judge_transcript(&config(), ""),
            Some(FallbackReason::EmptyTranscript)
        );
        assert_eq!(
            judge_transcript(&config(), "   \n"),
            Some(FallbackReason::EmptyTranscript)
        );
    }

    #[test]
    fn short_transcript_falls_back() {
        assert_eq!(
            judge_transcript(&config(), "a"),
            Some(FallbackReason::EmptyTranscript)
        );
    }

    #[test]
    fn untranslatable_marker_falls_back_regardless_of_case() {
        assert_eq!(
            judge_transcript(&config(), "Intranslatable audio"),
            Some(FallbackReason::Untranslatable)
        );
        assert_eq!(
            judge_transcript(&config(), "this segment is INTRANSLATABLE"),
            Some(FallbackReason::Untranslatable)
        );
    }

    #[test]
    fn normal_transcript_is_accepted() {
        assert_eq!(judge_transcript(&config(), "bonjour tout le monde"), None);
    }

    #[test]
    fn fragments_reassemble_in_arrival_order() {
        use base64::engine::general_purpose::STANDARD;
        use base64::Engine as _;

        let fragments = vec![
            STANDARD.encode(b"first"),
            STANDARD.encode(b"second"),
            STANDARD.encode(b"third"),
        ];
        let pcm = decode_fragments(&fragments).unwrap();
        assert_eq!(pcm, b"firstsecondthird");
    }

    #[test]
    fn empty_fragment_list_yields_empty_stream() {
        assert!(decode_fragments(&[]).unwrap().is_empty());
    }

    #[test]
    fn corrupt_fragment_is_a_protocol_error() {
        let err = decode_fragments(&["not base64!!".into()]).unwrap_err();
        assert!(matches!(err, TranslateError::Protocol(_)));
    }
}
