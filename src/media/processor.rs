use async_trait::async_trait;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::config::MediaConfig;
use crate::error::{Result, SubburnError};
use super::{MediaCommandBuilder, MediaProcessorTrait};

/// Size of a canonical WAV header; anything not larger holds no samples
const WAV_HEADER_LEN: u64 = 44;

/// Concrete implementation of media processor (FFmpeg-based)
pub struct MediaProcessorImpl {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl MediaProcessorImpl {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder =
            MediaCommandBuilder::new(&config.binary_path, config.escape_filter_paths);

        Self {
            config,
            command_builder,
        }
    }
}

/// Remove a file the failed command may have left behind
async fn discard_partial(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Removed partial output {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Could not remove partial output {}: {}", path.display(), e),
    }
}

#[async_trait]
impl MediaProcessorTrait for MediaProcessorImpl {
    async fn burn_subtitles(
        &self,
        video_path: &Path,
        subtitle_path: &Path,
        output_path: &Path,
    ) -> Result<()> {
        info!(
            "Burning subtitles from {} into {} -> {}",
            subtitle_path.display(), video_path.display(), output_path.display()
        );

        let command = self.command_builder.burn_subtitles(
            video_path,
            subtitle_path,
            output_path,
            &self.config.subtitle_options,
        );

        if let Err(e) = command.execute().await {
            discard_partial(output_path).await;
            return Err(e);
        }

        if !output_path.is_file() {
            return Err(SubburnError::Encode(format!(
                "Encoder reported success but wrote no file at {}",
                output_path.display()
            )));
        }

        info!("Subtitle burn-in completed successfully");
        Ok(())
    }

    async fn extract_audio(&self, video_path: &Path, audio_path: &Path) -> Result<()> {
        info!("Extracting audio from {} to {}", video_path.display(), audio_path.display());

        self.command_builder.extract_audio(video_path, audio_path).execute().await?;

        let size = tokio::fs::metadata(audio_path).await.map(|m| m.len()).unwrap_or(0);
        if size <= WAV_HEADER_LEN {
            return Err(SubburnError::MediaDecode(format!(
                "No audio samples extracted from {}",
                video_path.display()
            )));
        }

        info!("Audio extraction completed ({} bytes)", size);
        Ok(())
    }

    async fn check_availability(&self) -> Result<()> {
        let output = self.command_builder.version_check().execute().await?;
        let banner = String::from_utf8_lossy(&output.stdout);
        info!(
            "Media processor is available: {} ({})",
            self.config.binary_path,
            banner.lines().next().unwrap_or("unknown version")
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processor(binary: &str) -> MediaProcessorImpl {
        MediaProcessorImpl::new(MediaConfig {
            binary_path: binary.to_string(),
            ..MediaConfig::default()
        })
    }

    #[tokio::test]
    async fn test_unavailable_binary() {
        let processor = processor("subburn-test-no-such-ffmpeg");
        assert!(matches!(processor.check_availability().await, Err(SubburnError::Encode(_))));
    }

    #[tokio::test]
    async fn test_failed_burn_leaves_no_output() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out_subtitled.mp4");
        std::fs::write(&output, b"partial").unwrap();

        let err = processor("subburn-test-no-such-ffmpeg")
            .burn_subtitles(Path::new("in.mp4"), Path::new("in.srt"), &output)
            .await
            .unwrap_err();

        assert!(matches!(err, SubburnError::Encode(_)));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_failed_extraction_is_media_decode() {
        let dir = tempfile::tempdir().unwrap();
        let err = processor("subburn-test-no-such-ffmpeg")
            .extract_audio(Path::new("in.mp4"), &dir.path().join("a.wav"))
            .await
            .unwrap_err();

        assert!(matches!(err, SubburnError::MediaDecode(_)));
    }
}
