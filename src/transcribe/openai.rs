// OpenAI Whisper Python implementation
// Drives the `whisper` command-line tool installed with the openai-whisper package

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::TranscriberConfig;
use crate::error::{Result, SubburnError};
use super::{TranscriberTrait, TranscriptionTask};
use super::common::{
    read_transcriber_json, report_ordering, run_transcriber_command, Segment, Transcription,
    TranscriptionMapper,
};

/// Model names the `whisper` tool can load (and download) by name
const KNOWN_MODELS: &[&str] = &[
    "tiny", "tiny.en", "base", "base.en", "small", "small.en", "medium", "medium.en",
    "large", "large-v1", "large-v2", "large-v3", "large-v3-turbo", "turbo",
];

/// OpenAI Whisper specific JSON output format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperOutput {
    pub text: String,
    pub segments: Vec<OpenAIWhisperSegment>,
    pub language: Option<String>,
}

/// OpenAI Whisper specific segment format
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIWhisperSegment {
    pub id: u64,
    pub seek: Option<u64>,
    pub start: f64,
    pub end: f64,
    pub text: String,
    pub tokens: Option<Vec<i32>>,
    pub temperature: Option<f64>,
    pub avg_logprob: Option<f64>,
    pub compression_ratio: Option<f64>,
    pub no_speech_prob: Option<f64>,
}

/// Mapper for OpenAI Whisper format
pub struct OpenAIWhisperMapper;

impl TranscriptionMapper<OpenAIWhisperOutput> for OpenAIWhisperMapper {
    fn to_transcription(whisper_output: OpenAIWhisperOutput) -> Result<Transcription> {
        let segments = whisper_output
            .segments
            .into_iter()
            .map(|seg| Segment {
                start: seg.start,
                end: seg.end,
                text: seg.text,
            })
            .collect();

        Ok(Transcription {
            text: whisper_output.text.trim().to_string(),
            segments,
            language: whisper_output.language.unwrap_or_else(|| "unknown".to_string()),
        })
    }
}

/// OpenAI Whisper implementation
pub struct OpenAITranscriber {
    config: TranscriberConfig,
}

impl OpenAITranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    /// The model must be a known name or a checkpoint file on disk
    fn check_model(&self, task: TranscriptionTask) -> Result<()> {
        let model = self.config.model.as_str();
        if !KNOWN_MODELS.contains(&model) && !Path::new(model).is_file() {
            return Err(SubburnError::ModelLoad(format!(
                "Unknown whisper model '{}'. Valid names: {}",
                model,
                KNOWN_MODELS.join(", ")
            )));
        }

        if task == TranscriptionTask::Translate && model.ends_with(".en") {
            return Err(SubburnError::ModelLoad(format!(
                "English-only model '{}' cannot translate; use a multilingual model",
                model
            )));
        }

        Ok(())
    }

    /// Build the whisper command for one run
    fn build_command(&self, audio_path: &Path, output_dir: &Path, task: TranscriptionTask) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg(audio_path)
            .arg("--model").arg(&self.config.model)
            .arg("--task").arg(task.as_str())
            .arg("--output_dir").arg(output_dir)
            .arg("--output_format").arg("json")
            .arg("--temperature").arg(self.config.temperature.to_string())
            .arg("--verbose").arg("False");

        if let Some(lang) = &self.config.language {
            cmd.arg("--language").arg(lang);
        }

        cmd
    }

    /// Path of the JSON file whisper writes for an input
    fn output_file(audio_path: &Path, output_dir: &Path) -> Result<PathBuf> {
        let audio_filename = audio_path
            .file_stem()
            .ok_or_else(|| SubburnError::Transcription("Invalid audio filename".to_string()))?;
        Ok(output_dir.join(format!("{}.json", audio_filename.to_string_lossy())))
    }
}

#[async_trait]
impl TranscriberTrait for OpenAITranscriber {
    async fn transcribe(&self, audio_path: &Path, task: TranscriptionTask) -> Result<Transcription> {
        info!(
            "Starting OpenAI Whisper {} of {} with model {}",
            task, audio_path.display(), self.config.model
        );
        self.check_model(task)?;

        // Dropped at the end of this call, output included
        let temp_dir = tempfile::tempdir().map_err(|e| {
            SubburnError::Transcription(format!("Failed to create temp directory: {}", e))
        })?;

        let cmd = self.build_command(audio_path, temp_dir.path(), task);
        run_transcriber_command(cmd, &self.config.binary_path).await?;

        let json_file = Self::output_file(audio_path, temp_dir.path())?;
        debug!("Reading whisper output from {}", json_file.display());
        let output: OpenAIWhisperOutput = read_transcriber_json(&json_file).await?;

        let transcription = OpenAIWhisperMapper::to_transcription(output)?;
        report_ordering(&transcription);

        info!(
            "OpenAI Whisper produced {} segments (language: {})",
            transcription.segments.len(),
            transcription.language
        );
        Ok(transcription)
    }

    fn name(&self) -> &'static str {
        "openai-whisper"
    }
}
