use std::io::ErrorKind;
use std::path::Path;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{Result, SubburnError};

/// A timed span of transcribed or translated text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start offset in seconds
    pub start: f64,
    /// End offset in seconds
    pub end: f64,
    pub text: String,
}

/// Backend-agnostic transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub text: String,
    pub segments: Vec<Segment>,
    pub language: String,
}

impl Transcription {
    /// Describe every place where segment order or bounds look wrong.
    ///
    /// Ordering is the model's guarantee; the pipeline only reports violations.
    pub fn ordering_issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (i, segment) in self.segments.iter().enumerate() {
            if segment.start > segment.end {
                issues.push(format!(
                    "segment {} ends before it starts ({:.3} > {:.3})",
                    i + 1, segment.start, segment.end
                ));
            }
            if segment.start < 0.0 {
                issues.push(format!("segment {} starts before zero ({:.3})", i + 1, segment.start));
            }
        }

        for (i, pair) in self.segments.windows(2).enumerate() {
            if pair[1].start < pair[0].start {
                issues.push(format!(
                    "segment {} starts before segment {} ({:.3} < {:.3})",
                    i + 2, i + 1, pair[1].start, pair[0].start
                ));
            }
        }

        issues
    }
}

/// Trait for converting service-specific transcription formats to the shared one
pub trait TranscriptionMapper<T> {
    fn to_transcription(service_result: T) -> Result<Transcription>;
}

/// Log ordering problems reported by the model without touching the segments
pub fn report_ordering(transcription: &Transcription) {
    for issue in transcription.ordering_issues() {
        warn!("Transcriber returned out-of-order output: {}", issue);
    }
}

/// Run a transcriber command to completion.
///
/// A binary that cannot be started means the model is unavailable; a non-zero
/// exit is an inference failure.
pub async fn run_transcriber_command(mut cmd: Command, binary_path: &str) -> Result<()> {
    debug!("Executing transcriber command: {:?}", cmd);

    let output = cmd.output().await.map_err(|e| match e.kind() {
        ErrorKind::NotFound | ErrorKind::PermissionDenied => SubburnError::ModelLoad(format!(
            "Transcriber binary '{}' could not be started: {}",
            binary_path, e
        )),
        _ => SubburnError::Transcription(format!("Failed to execute '{}': {}", binary_path, e)),
    })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SubburnError::Transcription(format!(
            "'{}' exited with {}: {}",
            binary_path,
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

/// Read a JSON file written by a transcriber into its backend-specific type
pub async fn read_transcriber_json<T: serde::de::DeserializeOwned>(json_file: &Path) -> Result<T> {
    let json_content = tokio::fs::read_to_string(json_file).await.map_err(|e| {
        SubburnError::Transcription(format!(
            "Failed to read transcriber output {}: {}",
            json_file.display(),
            e
        ))
    })?;

    serde_json::from_str(&json_content)
        .map_err(|e| SubburnError::Transcription(format!("Failed to parse transcriber JSON: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transcription(spans: &[(f64, f64)]) -> Transcription {
        Transcription {
            text: String::new(),
            segments: spans
                .iter()
                .map(|&(start, end)| Segment { start, end, text: "x".to_string() })
                .collect(),
            language: "en".to_string(),
        }
    }

    #[test]
    fn test_well_ordered_has_no_issues() {
        let t = transcription(&[(0.0, 1.0), (1.0, 1.0), (2.5, 4.0)]);
        assert!(t.ordering_issues().is_empty());
    }

    #[test]
    fn test_reports_inverted_and_backwards_segments() {
        let t = transcription(&[(0.0, 1.0), (3.0, 2.0), (1.5, 2.0)]);
        let issues = t.ordering_issues();

        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("segment 2 ends before it starts"));
        assert!(issues[1].contains("segment 3 starts before segment 2"));
    }

    #[test]
    fn test_empty_transcription() {
        let t = transcription(&[]);
        assert!(t.ordering_issues().is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_is_model_load() {
        let binary = "subburn-test-no-such-transcriber";
        let err = run_transcriber_command(Command::new(binary), binary).await.unwrap_err();
        assert!(matches!(err, SubburnError::ModelLoad(_)));
    }

    #[tokio::test]
    async fn test_unreadable_output_is_transcription_error() {
        let dir = tempfile::tempdir().unwrap();
        let json_file = dir.path().join("out.json");

        let err = read_transcriber_json::<Transcription>(&json_file).await.unwrap_err();
        assert!(matches!(err, SubburnError::Transcription(_)));

        std::fs::write(&json_file, "{not json").unwrap();
        let err = read_transcriber_json::<Transcription>(&json_file).await.unwrap_err();
        assert!(matches!(err, SubburnError::Transcription(_)));
    }
}
