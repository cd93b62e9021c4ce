use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::workflow::CaptionMode;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Caption a video and burn the captions into it
    Process {
        /// Input video file (mp4, mov, avi, mkv)
        #[arg(short, long)]
        input: PathBuf,

        /// Caption language
        #[arg(short, long, value_enum, default_value_t = CaptionMode::Original)]
        mode: CaptionMode,

        /// Store the video here first; outputs are written next to it
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },

    /// Caption every video in a directory, one file at a time
    Batch {
        /// Input directory containing video files
        #[arg(short, long)]
        input_dir: PathBuf,

        /// Caption language
        #[arg(short, long, value_enum, default_value_t = CaptionMode::Original)]
        mode: CaptionMode,
    },

    /// Extract audio from video file
    Extract {
        /// Input video file
        #[arg(short, long)]
        input: PathBuf,

        /// Output WAV file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Transcribe an audio file to SRT
    Transcribe {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Output SRT file
        #[arg(short, long)]
        output: PathBuf,

        /// Caption language
        #[arg(short, long, value_enum, default_value_t = CaptionMode::Original)]
        mode: CaptionMode,
    },

    /// Burn an SRT file into a video
    Burn {
        /// Input video file
        #[arg(short, long)]
        video: PathBuf,

        /// Subtitle file
        #[arg(short, long)]
        subtitles: PathBuf,

        /// Output video file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the default configuration as TOML
    ConfigInit {
        /// Destination file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

impl Commands {
    /// Whether the command runs the ffmpeg encoder at some point
    pub fn needs_encoder(&self) -> bool {
        match self {
            Commands::Process { .. }
            | Commands::Batch { .. }
            | Commands::Extract { .. }
            | Commands::Burn { .. } => true,
            Commands::Transcribe { .. } | Commands::ConfigInit { .. } => false,
        }
    }
}
