//! Media Shell: thin async wrappers over the external ffmpeg/ffprobe
//! executables. Pure invocation, no state beyond tool paths; every
//! operation awaits the tool's exit and maps failure to [`MediaToolError`].

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::{MediaToolError, Result, TranslateError};

/// How a mux call ended when it did not hard-fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MuxResult {
    /// Audio and video were merged into the output file.
    Muxed,
    /// The known unmergeable-audio failure; the video was copied unchanged.
    CopiedOriginal,
}

/// How a subtitle burn call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BurnResult {
    /// Subtitles were rendered into the output file.
    Burned,
    /// The re-encode failed; the input video was copied unchanged.
    CopiedOriginal,
}

/// Handle to the external media tooling.
#[derive(Debug, Clone)]
pub struct MediaShell {
    config: MediaConfig,
}

impl MediaShell {
    pub fn new(config: MediaConfig) -> Self {
        Self { config }
    }

    /// Demux the audio-only track of `video` into an AAC file.
    pub async fn extract_audio(&self, video: &Path, out: &Path) -> Result<()> {
        self.require_input(video)?;
        let output = self
            .ffmpeg()
            .arg("-i")
            .arg(video)
            .arg("-vn")
            .args(["-acodec", "aac"])
            .arg(out)
            .arg("-y")
            .output()
            .await
            .map_err(|e| self.spawn_err("ffmpeg", e))?;
        self.check("ffmpeg", &output)?;
        Ok(())
    }

    /// Resample `input` to the mono s16 PCM WAV the translation service
    /// expects.
    pub async fn convert_to_pcm_wav(&self, input: &Path, out: &Path) -> Result<()> {
        self.require_input(input)?;
        let output = self
            .ffmpeg()
            .arg("-i")
            .arg(input)
            .args(["-ac", "1"])
            .arg("-ar")
            .arg(self.config.sample_rate.to_string())
            .args(["-sample_fmt", "s16"])
            .arg(out)
            .arg("-y")
            .output()
            .await
            .map_err(|e| self.spawn_err("ffmpeg", e))?;
        self.check("ffmpeg", &output)?;
        Ok(())
    }

    /// Encode a raw s16le PCM byte stream into delivery AAC.
    pub async fn encode_raw_pcm(&self, raw: &Path, out: &Path) -> Result<()> {
        self.require_input(raw)?;
        let output = self
            .ffmpeg()
            .args(["-f", "s16le"])
            .arg("-ar")
            .arg(self.config.sample_rate.to_string())
            .args(["-ac", "1"])
            .arg("-i")
            .arg(raw)
            .args(["-c:a", "aac"])
            .arg("-b:a")
            .arg(&self.config.audio_bitrate)
            .arg(out)
            .arg("-y")
            .output()
            .await
            .map_err(|e| self.spawn_err("ffmpeg", e))?;
        self.check("ffmpeg", &output)?;
        Ok(())
    }

    /// Combine the video stream of `video` with the audio stream of `audio`,
    /// truncating to the shorter stream. On the known unmergeable-audio exit
    /// code the video is copied unchanged to `out`.
    pub async fn mux_audio_video(&self, video: &Path, audio: &Path, out: &Path) -> Result<MuxResult> {
        self.require_input(video)?;
        self.require_input(audio)?;
        let output = self
            .ffmpeg()
            .arg("-i")
            .arg(video)
            .arg("-i")
            .arg(audio)
            .args(["-map", "0:v:0"])
            .args(["-map", "1:a:0"])
            .args(["-c:v", "copy"])
            .args(["-c:a", "aac"])
            .arg("-shortest")
            .args(["-err_detect", "ignore_err"])
            .arg(out)
            .arg("-y")
            .output()
            .await
            .map_err(|e| self.spawn_err("ffmpeg", e))?;

        match self.check("ffmpeg", &output) {
            Ok(()) => Ok(MuxResult::Muxed),
            Err(TranslateError::MediaTool(ref e)) if e.is_mux_unmergeable() => {
                warn!(video = %video.display(), "mux failed with unmergeable audio, copying video unchanged");
                tokio::fs::copy(video, out).await?;
                Ok(MuxResult::CopiedOriginal)
            }
            Err(e) => Err(e),
        }
    }

    /// Duration of a media file in seconds.
    pub async fn probe_duration(&self, media: &Path) -> Result<f64> {
        self.require_input(media)?;
        let output = Command::new(&self.config.ffprobe)
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(media)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| self.spawn_err("ffprobe", e))?;
        self.check("ffprobe", &output)?;

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|_| {
                TranslateError::MediaTool(MediaToolError::BadOutput {
                    tool: "ffprobe".into(),
                    detail: format!("duration {:?}", text.trim()),
                })
            })
    }

    /// Re-encode `video` with a subtitle overlay. Falls back to copying the
    /// input unchanged when the overlay cannot be rendered.
    pub async fn burn_subtitles(&self, video: &Path, subtitles: &Path, out: &Path) -> Result<BurnResult> {
        self.require_input(video)?;
        self.require_input(subtitles)?;
        let output = self
            .ffmpeg()
            .arg("-i")
            .arg(video)
            .arg("-vf")
            .arg(format!("subtitles={}", subtitles.display()))
            .args(["-c:a", "copy"])
            .arg(out)
            .arg("-y")
            .output()
            .await
            .map_err(|e| self.spawn_err("ffmpeg", e))?;

        match self.check("ffmpeg", &output) {
            Ok(()) => Ok(BurnResult::Burned),
            Err(e) => {
                warn!(error = %e, "subtitle burn failed, copying video unchanged");
                tokio::fs::copy(video, out).await?;
                Ok(BurnResult::CopiedOriginal)
            }
        }
    }

    fn ffmpeg(&self) -> Command {
        let mut cmd = Command::new(&self.config.ffmpeg);
        cmd.args(["-hide_banner", "-loglevel", "error"])
            .stdin(Stdio::null())
            .kill_on_drop(true);
        cmd
    }

    fn require_input(&self, path: &Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(MediaToolError::InputMissing(path.display().to_string()).into())
        }
    }

    fn spawn_err(&self, tool: &str, source: std::io::Error) -> TranslateError {
        MediaToolError::Spawn {
            tool: tool.into(),
            source,
        }
        .into()
    }

    fn check(&self, tool: &str, output: &std::process::Output) -> Result<()> {
        if output.status.success() {
            debug!(tool, "media tool finished");
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        // Keep the tail; ffmpeg front-loads banner noise even with -loglevel error.
        let tail: String = stderr
            .lines()
            .rev()
            .take(5)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect::<Vec<_>>()
            .join("\n");
        Err(MediaToolError::Failed {
            tool: tool.into(),
            code: output.status.code(),
            stderr: tail,
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_input_is_rejected_before_spawning() {
        let shell = MediaShell::new(MediaConfig::default());
        let err = shell
            .require_input(Path::new("/nonexistent/chunk_000.mp4"))
            .unwrap_err();
        assert!(matches!(
            err,
            TranslateError::MediaTool(MediaToolError::InputMissing(_))
        ));
    }

    #[test]
    fn unmergeable_exit_code_is_recognized() {
        let err = MediaToolError::Failed {
            tool: "ffmpeg".into(),
            code: Some(187),
            stderr: String::new(),
        };
        assert!(err.is_mux_unmergeable());

        let other = MediaToolError::Failed {
            tool: "ffmpeg".into(),
            code: Some(1),
            stderr: String::new(),
        };
        assert!(!other.is_mux_unmergeable());
    }
}
