use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Result, SubburnError};

/// What a media command is for; decides which error a failure turns into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaOperation {
    /// Demux the audio track into a waveform
    AudioExtraction,
    /// Re-encode the video with subtitles composited into the frames
    SubtitleBurn,
    /// `-version` availability check
    VersionCheck,
}

impl MediaOperation {
    pub fn description(&self) -> &'static str {
        match self {
            MediaOperation::AudioExtraction => "Audio extraction",
            MediaOperation::SubtitleBurn => "Subtitle burn-in",
            MediaOperation::VersionCheck => "Version check",
        }
    }

    fn error(&self, message: String) -> SubburnError {
        match self {
            MediaOperation::AudioExtraction => SubburnError::MediaDecode(message),
            MediaOperation::SubtitleBurn | MediaOperation::VersionCheck => SubburnError::Encode(message),
        }
    }
}

/// Media processing command representation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub operation: MediaOperation,
}

impl MediaCommand {
    pub fn new<S: Into<String>>(binary_path: S, operation: MediaOperation) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            operation,
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg("-i").arg(path.as_ref().to_string_lossy().to_string())
    }

    pub fn output<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Force overwrite output
    pub fn overwrite(self) -> Self {
        self.arg("-y")
    }

    pub fn video_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:v").arg(codec)
    }

    pub fn audio_codec<S: Into<String>>(self, codec: S) -> Self {
        self.arg("-c:a").arg(codec)
    }

    pub fn copy_audio(self) -> Self {
        self.audio_codec("copy")
    }

    pub fn no_video(self) -> Self {
        self.arg("-vn")
    }

    pub fn audio_sample_rate(self, rate: u32) -> Self {
        self.arg("-ar").arg(rate.to_string())
    }

    pub fn audio_channels(self, channels: u32) -> Self {
        self.arg("-ac").arg(channels.to_string())
    }

    pub fn video_filter<S: Into<String>>(self, filter: S) -> Self {
        self.arg("-vf").arg(filter)
    }

    /// Execute the command and return its captured output.
    ///
    /// Failure to start and non-zero exit both map to the operation's error.
    pub async fn execute(&self) -> Result<Output> {
        debug!("Executing media command: {} {:?}", self.binary_path, self.args);

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .output()
            .await
            .map_err(|e| {
                self.operation.error(format!(
                    "Failed to execute media processor '{}': {}",
                    self.binary_path, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(self.operation.error(format!(
                "{} failed ({}): {}",
                self.operation.description(),
                output.status,
                last_lines(&stderr, 20)
            )));
        }

        Ok(output)
    }
}

/// ffmpeg prints its banner first; the cause is at the end
fn last_lines(text: &str, count: usize) -> String {
    let lines: Vec<&str> = text.trim_end().lines().collect();
    lines[lines.len().saturating_sub(count)..].join("\n")
}

/// Escape a value for one option of an ffmpeg filter (`key=value:key=value`)
fn escape_filter_option(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | ':') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a filter description for the filtergraph parser
fn escape_filtergraph(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Build the `subtitles=` filter for a file path.
///
/// With `escape` the path goes through both ffmpeg escaping levels, so colons,
/// quotes, brackets and commas in it are taken literally. Without it the path is
/// embedded verbatim.
pub fn subtitles_filter(subtitle_path: &Path, escape: bool) -> String {
    let path = subtitle_path.to_string_lossy();
    if escape {
        format!("subtitles={}", escape_filtergraph(&escape_filter_option(&path)))
    } else {
        format!("subtitles={}", path)
    }
}

/// Builder for the media operations the pipeline needs
pub struct MediaCommandBuilder {
    binary_path: String,
    escape_filter_paths: bool,
}

impl MediaCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S, escape_filter_paths: bool) -> Self {
        Self {
            binary_path: binary_path.into(),
            escape_filter_paths,
        }
    }

    /// Build subtitle burn-in command
    pub fn burn_subtitles<P: AsRef<Path>>(
        &self,
        video_path: P,
        subtitle_path: P,
        output_path: P,
        additional_options: &[String],
    ) -> MediaCommand {
        MediaCommand::new(&self.binary_path, MediaOperation::SubtitleBurn)
            .overwrite()
            .input(&video_path)
            .video_filter(subtitles_filter(subtitle_path.as_ref(), self.escape_filter_paths))
            .video_codec("libx264")
            .copy_audio()
            .args(additional_options.iter().cloned())
            .output(output_path)
    }

    /// Build audio extraction command (16 kHz mono 16-bit PCM)
    pub fn extract_audio<P: AsRef<Path>>(&self, video_path: P, audio_path: P) -> MediaCommand {
        MediaCommand::new(&self.binary_path, MediaOperation::AudioExtraction)
            .input(video_path)
            .no_video()
            .audio_codec("pcm_s16le")
            .audio_sample_rate(16000)
            .audio_channels(1)
            .overwrite()
            .output(audio_path)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, MediaOperation::VersionCheck).arg("-version")
    }
}
