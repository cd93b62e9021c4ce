// Modular transcription architecture
//
// Each backend drives an external speech-to-text tool and maps its JSON output
// into the shared Transcription type:
// - OpenAI: the `whisper` Python command-line tool
// - WhisperCpp: the `whisper-cli` binary from whisper.cpp
//
// To add a backend, implement TranscriptionMapper for its output format,
// implement TranscriberTrait, and register it in TranscriberFactory.

pub mod common;
pub mod openai;
pub mod whisper_cpp;

use async_trait::async_trait;
use std::fmt;
use std::path::Path;

pub use common::*;
use crate::config::{TranscriberConfig, TranscriberImplementation};
use crate::error::Result;

/// What the model is asked to do with the speech
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptionTask {
    /// Captions in the spoken language
    Transcribe,
    /// Captions translated to English
    Translate,
}

impl TranscriptionTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionTask::Transcribe => "transcribe",
            TranscriptionTask::Translate => "translate",
        }
    }
}

impl fmt::Display for TranscriptionTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main trait for transcription operations
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriberTrait: Send + Sync {
    /// Transcribe (or translate) a waveform file into ordered segments.
    /// Called once per run; no retry.
    async fn transcribe(&self, audio_path: &Path, task: TranscriptionTask) -> Result<Transcription>;

    /// Backend name used in log lines
    fn name(&self) -> &'static str;
}

/// Factory for creating transcriber instances
pub struct TranscriberFactory;

impl TranscriberFactory {
    /// Create the transcriber selected by configuration
    pub fn create_transcriber(config: TranscriberConfig) -> Box<dyn TranscriberTrait> {
        match config.implementation {
            TranscriberImplementation::Openai => {
                Box::new(openai::OpenAITranscriber::new(config))
            }
            TranscriberImplementation::WhisperCpp => {
                Box::new(whisper_cpp::WhisperCppTranscriber::new(config))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_strings() {
        assert_eq!(TranscriptionTask::Transcribe.as_str(), "transcribe");
        assert_eq!(TranscriptionTask::Translate.to_string(), "translate");
    }

    #[test]
    fn test_factory_follows_config() {
        let mut config = TranscriberConfig::default();
        assert_eq!(TranscriberFactory::create_transcriber(config.clone()).name(), "openai-whisper");

        config.implementation = TranscriberImplementation::WhisperCpp;
        assert_eq!(TranscriberFactory::create_transcriber(config).name(), "whisper.cpp");
    }
}
