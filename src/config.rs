use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::error::{Result, SubburnError};

/// Config file picked up from the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transcriber: TranscriberConfig,
    pub media: MediaConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriberConfig {
    /// Which speech-to-text backend runs the model
    pub implementation: TranscriberImplementation,
    /// Path to the transcriber binary (`whisper` or `whisper-cli`)
    pub binary_path: String,
    /// Model name, e.g. "small"
    pub model: String,
    /// Directory holding ggml model files (whisper-cpp only)
    pub model_dir: PathBuf,
    /// Source language hint; detected by the model when unset
    pub language: Option<String>,
    /// Sampling temperature
    pub temperature: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriberImplementation {
    /// OpenAI Whisper Python command-line tool
    Openai,
    /// whisper.cpp command-line tool
    WhisperCpp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Additional encoding options for subtitle burn-in
    /// Common options: ["-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p"]
    pub subtitle_options: Vec<String>,
    /// Escape the subtitle path for ffmpeg's filter syntax.
    /// When false the path is embedded verbatim, which breaks on `:` `'` `,` and friends.
    pub escape_filter_paths: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Number of segments printed after a successful run
    pub preview_lines: usize,
}

impl Default for TranscriberConfig {
    fn default() -> Self {
        Self {
            implementation: TranscriberImplementation::Openai,
            binary_path: "whisper".to_string(),
            model: "small".to_string(),
            model_dir: PathBuf::from("models"),
            language: None,
            temperature: 0.0,
        }
    }
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            binary_path: "ffmpeg".to_string(),
            subtitle_options: vec![
                // "-preset".to_string(), "medium".to_string(),
                // "-crf".to_string(), "23".to_string(),
            ],
            escape_filter_paths: true,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { preview_lines: 5 }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| SubburnError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| SubburnError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| SubburnError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| SubburnError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Explicit path first, then `config.toml` in the working directory, then defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                info!("Found {} in current directory, loading...", DEFAULT_CONFIG_FILE);
                Self::from_file(DEFAULT_CONFIG_FILE)
            }
            None => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_partial_config_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [media]
            binary_path = "/opt/ffmpeg/bin/ffmpeg"
            "#,
        )
        .unwrap();

        assert_eq!(config.media.binary_path, "/opt/ffmpeg/bin/ffmpeg");
        assert!(config.media.escape_filter_paths);
        assert_eq!(config.transcriber.model, "small");
        assert_eq!(config.transcriber.implementation, TranscriberImplementation::Openai);
        assert_eq!(config.output.preview_lines, 5);
    }

    #[test]
    fn test_implementation_names() {
        let config: Config = toml::from_str(
            r#"
            [transcriber]
            implementation = "whisper-cpp"
            binary_path = "whisper-cli"
            language = "ja"
            "#,
        )
        .unwrap();

        assert_eq!(config.transcriber.implementation, TranscriberImplementation::WhisperCpp);
        assert_eq!(config.transcriber.language.as_deref(), Some("ja"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("config.toml");

        let mut config = Config::default();
        config.media.subtitle_options = vec!["-crf".to_string(), "20".to_string()];
        config.output.preview_lines = 2;
        config.save_to_file(file.path()).unwrap();

        let loaded = Config::load(Some(file.path())).unwrap();
        assert_eq!(loaded.media.subtitle_options, vec!["-crf", "20"]);
        assert_eq!(loaded.output.preview_lines, 2);
    }

    #[test]
    fn test_malformed_file_is_config_error() {
        let dir = assert_fs::TempDir::new().unwrap();
        let file = dir.child("broken.toml");
        file.write_str("[media\nbinary_path = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, SubburnError::Config(_)));
    }
}
