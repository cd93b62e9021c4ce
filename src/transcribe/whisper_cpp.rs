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

/// Whisper.cpp JSON output (`-oj`)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    pub result: WhisperCppResult,
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub offsets: WhisperCppOffsets,
    pub text: String,
}

/// Milliseconds from the start of the audio
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOffsets {
    pub from: i64,
    pub to: i64,
}

/// Mapper for Whisper.cpp format
pub struct WhisperCppMapper;

impl TranscriptionMapper<WhisperCppOutput> for WhisperCppMapper {
    fn to_transcription(whisper_output: WhisperCppOutput) -> Result<Transcription> {
        let text = whisper_output
            .transcription
            .iter()
            .map(|seg| seg.text.trim())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        let segments = whisper_output
            .transcription
            .into_iter()
            .map(|seg| Segment {
                start: seg.offsets.from as f64 / 1000.0,
                end: seg.offsets.to as f64 / 1000.0,
                text: seg.text,
            })
            .collect();

        Ok(Transcription {
            text,
            segments,
            language: whisper_output.result.language,
        })
    }
}

/// Whisper.cpp implementation
pub struct WhisperCppTranscriber {
    config: TranscriberConfig,
}

impl WhisperCppTranscriber {
    pub fn new(config: TranscriberConfig) -> Self {
        Self { config }
    }

    /// `model` is either a path to a ggml file or a name resolved inside `model_dir`
    pub fn model_path(&self) -> PathBuf {
        let model = Path::new(&self.config.model);
        if model.extension().is_some_and(|ext| ext == "bin") {
            model.to_path_buf()
        } else {
            self.config.model_dir.join(format!("ggml-{}.bin", self.config.model))
        }
    }

    fn build_command(
        &self,
        model_path: &Path,
        audio_path: &Path,
        output_prefix: &Path,
        task: TranscriptionTask,
    ) -> Command {
        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-m").arg(model_path)
            .arg("-f").arg(audio_path)
            .arg("-oj")
            .arg("-of").arg(output_prefix)
            .arg("-tp").arg(self.config.temperature.to_string())
            // whisper-cli assumes English unless told otherwise
            .arg("-l").arg(self.config.language.as_deref().unwrap_or("auto"));

        if task == TranscriptionTask::Translate {
            cmd.arg("-tr");
        }

        cmd
    }
}

#[async_trait]
impl TranscriberTrait for WhisperCppTranscriber {
    async fn transcribe(&self, audio_path: &Path, task: TranscriptionTask) -> Result<Transcription> {
        let model_path = self.model_path();
        info!(
            "Starting whisper.cpp {} of {} with model {}",
            task, audio_path.display(), model_path.display()
        );

        if !model_path.is_file() {
            return Err(SubburnError::ModelLoad(format!(
                "Model file not found: {}",
                model_path.display()
            )));
        }

        let temp_dir = tempfile::tempdir().map_err(|e| {
            SubburnError::Transcription(format!("Failed to create temp directory: {}", e))
        })?;
        let output_prefix = temp_dir.path().join("transcript");

        let cmd = self.build_command(&model_path, audio_path, &output_prefix, task);
        run_transcriber_command(cmd, &self.config.binary_path).await?;

        let json_file = output_prefix.with_extension("json");
        debug!("Reading whisper.cpp output from {}", json_file.display());
        let output: WhisperCppOutput = read_transcriber_json(&json_file).await?;

        let transcription = WhisperCppMapper::to_transcription(output)?;
        report_ordering(&transcription);

        info!(
            "whisper.cpp produced {} segments (language: {})",
            transcription.segments.len(),
            transcription.language
        );
        Ok(transcription)
    }

    fn name(&self) -> &'static str {
        "whisper.cpp"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TranscriberImplementation;

    const SAMPLE: &str = r#"{
        "systeminfo": "AVX = 1",
        "model": {"type": "small"},
        "result": {"language": "ja"},
        "transcription": [
            {"timestamps": {"from": "00:00:00,000", "to": "00:00:01,500"},
             "offsets": {"from": 0, "to": 1500}, "text": " こんにちは"},
            {"timestamps": {"from": "00:00:01,500", "to": "00:00:03,040"},
             "offsets": {"from": 1500, "to": 3040}, "text": " 元気?"}
        ]
    }"#;

    fn config() -> TranscriberConfig {
        TranscriberConfig {
            implementation: TranscriberImplementation::WhisperCpp,
            binary_path: "whisper-cli".to_string(),
            ..TranscriberConfig::default()
        }
    }

    #[test]
    fn test_mapper_converts_offsets_to_seconds() {
        let output: WhisperCppOutput = serde_json::from_str(SAMPLE).unwrap();
        let transcription = WhisperCppMapper::to_transcription(output).unwrap();

        assert_eq!(transcription.language, "ja");
        assert_eq!(transcription.text, "こんにちは 元気?");
        assert_eq!(transcription.segments[0].end, 1.5);
        assert_eq!(transcription.segments[1].start, 1.5);
        assert_eq!(transcription.segments[1].end, 3.04);
    }

    #[test]
    fn test_model_path_resolution() {
        let mut config = config();
        config.model_dir = PathBuf::from("/models");
        assert_eq!(
            WhisperCppTranscriber::new(config.clone()).model_path(),
            Path::new("/models/ggml-small.bin")
        );

        config.model = "/srv/ggml-large-v3.bin".to_string();
        assert_eq!(
            WhisperCppTranscriber::new(config).model_path(),
            Path::new("/srv/ggml-large-v3.bin")
        );
    }

    #[test]
    fn test_translate_flag() {
        let transcriber = WhisperCppTranscriber::new(config());
        let args = |task| -> Vec<String> {
            transcriber
                .build_command(Path::new("m.bin"), Path::new("a.wav"), Path::new("out/t"), task)
                .as_std()
                .get_args()
                .map(|a| a.to_string_lossy().into_owned())
                .collect()
        };

        let translate = args(TranscriptionTask::Translate);
        assert!(translate.contains(&"-tr".to_string()));
        assert!(translate.windows(2).any(|w| w == ["-l", "auto"]));
        assert!(translate.windows(2).any(|w| w == ["-of", "out/t"]));

        assert!(!args(TranscriptionTask::Transcribe).contains(&"-tr".to_string()));
    }

    #[tokio::test]
    async fn test_missing_model_file_is_model_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.model_dir = dir.path().to_path_buf();

        let err = WhisperCppTranscriber::new(config)
            .transcribe(Path::new("a.wav"), TranscriptionTask::Transcribe)
            .await
            .unwrap_err();
        assert!(matches!(err, SubburnError::ModelLoad(_)));
    }
}
