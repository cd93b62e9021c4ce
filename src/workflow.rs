use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::config::Config;
use crate::error::{Result, SubburnError};
use crate::media::{MediaProcessorFactory, MediaProcessorTrait};
use crate::subtitle::{format_timestamp, read_srt, write_srt};
use crate::transcribe::{Transcription, TranscriberFactory, TranscriberTrait, TranscriptionTask};

/// Video containers accepted as input
pub const SUPPORTED_EXTENSIONS: [&str; 4] = ["mp4", "mov", "avi", "mkv"];

/// Suffix of burned videos; batch runs skip files that already carry it
const SUBTITLED_SUFFIX: &str = "_subtitled";

/// Caption language chosen before a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum CaptionMode {
    /// Captions in the spoken language
    Original,
    /// Captions translated to English
    English,
}

impl CaptionMode {
    pub fn task(&self) -> TranscriptionTask {
        match self {
            CaptionMode::Original => TranscriptionTask::Transcribe,
            CaptionMode::English => TranscriptionTask::Translate,
        }
    }

    /// Artifact name suffix
    pub fn suffix(&self) -> &'static str {
        match self {
            CaptionMode::Original => "original",
            CaptionMode::English => "english",
        }
    }
}

/// Pipeline stage, reported as each one starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AcquireInput,
    ExtractAudio,
    Transcribe,
    WriteSubtitles,
    BurnSubtitles,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::AcquireInput => "Storing input video",
            Stage::ExtractAudio => "Extracting audio from video",
            Stage::Transcribe => "Transcribing audio",
            Stage::WriteSubtitles => "Writing captions",
            Stage::BurnSubtitles => "Burning captions into video",
        };
        f.write_str(label)
    }
}

/// Output locations derived from the input video and mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub subtitle_path: PathBuf,
    pub video_path: PathBuf,
}

impl ArtifactPaths {
    /// `<stem>_<suffix>.srt` and `<stem>_<suffix>_subtitled.mp4` next to the video
    pub fn for_video(video_path: &Path, mode: CaptionMode) -> Result<Self> {
        let stem = video_path
            .file_stem()
            .ok_or_else(|| SubburnError::InvalidInput(format!(
                "Invalid video filename: {}",
                video_path.display()
            )))?
            .to_string_lossy();
        let dir = video_path.parent().unwrap_or_else(|| Path::new(""));

        Ok(Self {
            subtitle_path: dir.join(format!("{}_{}.srt", stem, mode.suffix())),
            video_path: dir.join(format!("{}_{}{}.mp4", stem, mode.suffix(), SUBTITLED_SUFFIX)),
        })
    }
}

/// Result of a fully successful run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub subtitle_path: PathBuf,
    pub video_path: PathBuf,
    pub transcription: Transcription,
}

impl PipelineOutput {
    /// First `limit` segments as `start → end  text` lines
    pub fn preview(&self, limit: usize) -> Result<Vec<String>> {
        self.transcription
            .segments
            .iter()
            .take(limit)
            .map(|seg| -> Result<String> {
                Ok(format!(
                    "{} → {}  {}",
                    format_timestamp(seg.start)?,
                    format_timestamp(seg.end)?,
                    seg.text.trim()
                ))
            })
            .collect()
    }
}

/// Outcome of a directory run
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<PipelineOutput>,
    pub failed: Vec<(PathBuf, SubburnError)>,
}

/// Reject paths that are not an existing file of a supported container type
pub fn validate_video_input(path: &Path) -> Result<()> {
    if !is_supported_video(path) {
        return Err(SubburnError::InvalidInput(format!(
            "Unsupported video type: {} (expected one of: {})",
            path.display(),
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    if !path.is_file() {
        return Err(SubburnError::InvalidInput(format!(
            "Video file not found: {}",
            path.display()
        )));
    }

    Ok(())
}

fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn is_burned_output(path: &Path) -> bool {
    path.file_stem()
        .is_some_and(|stem| stem.to_string_lossy().ends_with(SUBTITLED_SUFFIX))
}

/// Remove an artifact of a failed run
async fn discard_artifact(path: &Path) {
    if let Err(e) = fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Could not remove {}: {}", path.display(), e);
        }
    }
}

pub struct Workflow {
    config: Config,
    transcriber: Box<dyn TranscriberTrait>,
    media: Box<dyn MediaProcessorTrait>,
}

impl Workflow {
    pub fn new(config: Config) -> Self {
        let transcriber = TranscriberFactory::create_transcriber(config.transcriber.clone());
        let media = MediaProcessorFactory::create_processor(config.media.clone());

        Self::with_components(config, transcriber, media)
    }

    pub fn with_components(
        config: Config,
        transcriber: Box<dyn TranscriberTrait>,
        media: Box<dyn MediaProcessorTrait>,
    ) -> Self {
        Self {
            config,
            transcriber,
            media,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fail early with `Encode` when the configured encoder cannot run
    pub async fn ensure_encoder(&self) -> Result<()> {
        self.media.check_availability().await
    }

    /// Persist the input video under its original file name.
    ///
    /// Without a destination directory the video is used where it is.
    pub async fn acquire_input(&self, source: &Path, dest_dir: Option<&Path>) -> Result<PathBuf> {
        validate_video_input(source)?;

        let Some(dest_dir) = dest_dir else {
            return Ok(source.to_path_buf());
        };

        let file_name = source.file_name().ok_or_else(|| {
            SubburnError::InvalidInput(format!("Invalid video filename: {}", source.display()))
        })?;
        fs::create_dir_all(dest_dir).await?;
        let dest = dest_dir.join(file_name);

        let same_file = match (fs::canonicalize(source).await, fs::canonicalize(&dest).await) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if !same_file {
            info!("Copying {} to {}", source.display(), dest.display());
            fs::copy(source, &dest).await?;
        }

        Ok(dest)
    }

    /// Process a single video file from acquisition to burned output
    pub async fn process_single_file(
        &self,
        input_path: &Path,
        mode: CaptionMode,
        output_dir: Option<&Path>,
        on_stage: &(dyn Fn(Stage) + Sync),
    ) -> Result<PipelineOutput> {
        info!("Processing single file: {} ({} captions)", input_path.display(), mode.suffix());

        on_stage(Stage::AcquireInput);
        let video_path = self.acquire_input(input_path, output_dir).await?;

        self.run_pipeline(&video_path, mode, on_stage).await
    }

    /// Extraction, transcription, subtitle writing and burn-in for an acquired video.
    ///
    /// Either both artifacts exist afterwards or neither does.
    pub async fn run_pipeline(
        &self,
        video_path: &Path,
        mode: CaptionMode,
        on_stage: &(dyn Fn(Stage) + Sync),
    ) -> Result<PipelineOutput> {
        let artifacts = ArtifactPaths::for_video(video_path, mode)?;

        let transcription = self.transcribe_video(video_path, mode.task(), on_stage).await?;

        on_stage(Stage::WriteSubtitles);
        if let Err(e) = write_srt(&transcription.segments, &artifacts.subtitle_path).await {
            discard_artifact(&artifacts.subtitle_path).await;
            return Err(e);
        }

        on_stage(Stage::BurnSubtitles);
        if let Err(e) = self
            .media
            .burn_subtitles(video_path, &artifacts.subtitle_path, &artifacts.video_path)
            .await
        {
            discard_artifact(&artifacts.subtitle_path).await;
            discard_artifact(&artifacts.video_path).await;
            return Err(e);
        }

        info!(
            "Completed {}: {} and {}",
            video_path.display(),
            artifacts.subtitle_path.display(),
            artifacts.video_path.display()
        );

        Ok(PipelineOutput {
            subtitle_path: artifacts.subtitle_path,
            video_path: artifacts.video_path,
            transcription,
        })
    }

    /// Extract the audio to a temporary waveform and transcribe it.
    ///
    /// The waveform is deleted before returning, whatever the outcome.
    pub async fn transcribe_video(
        &self,
        video_path: &Path,
        task: TranscriptionTask,
        on_stage: &(dyn Fn(Stage) + Sync),
    ) -> Result<Transcription> {
        let audio = tempfile::Builder::new()
            .prefix("subburn-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();

        let result = async {
            on_stage(Stage::ExtractAudio);
            self.media.extract_audio(video_path, &audio).await?;

            on_stage(Stage::Transcribe);
            info!("Transcribing with {} ({})", self.transcriber.name(), task);
            self.transcriber.transcribe(&audio, task).await
        }
        .await;

        if let Err(e) = audio.close() {
            warn!("Could not remove temporary audio file: {}", e);
        }

        result
    }

    /// Process every supported video in a directory, one independent run each
    pub async fn process_directory(
        &self,
        input_dir: &Path,
        mode: CaptionMode,
        on_stage: &(dyn Fn(Stage) + Sync),
    ) -> Result<BatchSummary> {
        info!("Processing directory: {}", input_dir.display());

        if !input_dir.is_dir() {
            return Err(SubburnError::InvalidInput(format!(
                "Input path is not a directory: {}",
                input_dir.display()
            )));
        }

        let mut video_files: Vec<PathBuf> = WalkDir::new(input_dir)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| is_supported_video(p) && !is_burned_output(p))
            .collect();
        video_files.sort();

        info!("Found {} video files to process", video_files.len());

        let mut summary = BatchSummary::default();
        for video_path in video_files {
            match self.process_single_file(&video_path, mode, None, on_stage).await {
                Ok(output) => {
                    info!("Successfully processed: {}", video_path.display());
                    summary.succeeded.push(output);
                }
                Err(e) => {
                    warn!("Failed to process {}: {}", video_path.display(), e);
                    summary.failed.push((video_path, e));
                }
            }
        }

        Ok(summary)
    }

    /// Extract audio from video file
    pub async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        validate_video_input(video_path)?;
        self.media.extract_audio(video_path, audio_path).await
    }

    /// Transcribe an audio file and write the result as SRT
    pub async fn transcribe_audio(
        &self,
        audio_path: &Path,
        output_path: &Path,
        task: TranscriptionTask,
    ) -> Result<Transcription> {
        if !audio_path.is_file() {
            return Err(SubburnError::InvalidInput(format!(
                "Audio file not found: {}",
                audio_path.display()
            )));
        }

        let transcription = self.transcriber.transcribe(audio_path, task).await?;
        write_srt(&transcription.segments, output_path).await?;

        Ok(transcription)
    }

    /// Burn an existing SRT file into a video
    pub async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitles_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        validate_video_input(video_path)?;
        let entries = read_srt(subtitles_path).await?;
        info!("Burning {} subtitle entries", entries.len());

        self.media.burn_subtitles(video_path, subtitles_path, output_path).await
    }
}
