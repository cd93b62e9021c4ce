//! Subburn - video captioning with burned-in subtitles
//!
//! Extracts the audio track of a video with ffmpeg, transcribes or translates it
//! with whisper, writes the segments as SRT, and re-encodes the video with the
//! subtitles composited into the frames.

pub mod cli;
pub mod config;
pub mod workflow;
pub mod transcribe;
pub mod subtitle;
pub mod media;
pub mod progress;
pub mod error;
