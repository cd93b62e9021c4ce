use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Result, SubburnError};
use crate::transcribe::Segment;

/// Format time in seconds to SRT time format (HH:MM:SS,mmm).
///
/// The value is rounded to the nearest millisecond. Hours are not wrapped at 24.
pub fn format_timestamp(seconds: f64) -> Result<String> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(SubburnError::InvalidInput(format!(
            "Timestamp must be a finite non-negative number of seconds, got {}",
            seconds
        )));
    }

    let total_milliseconds = (seconds * 1000.0).round() as u64;
    let hours = total_milliseconds / 3_600_000;
    let minutes = (total_milliseconds % 3_600_000) / 60_000;
    let secs = (total_milliseconds % 60_000) / 1_000;
    let millis = total_milliseconds % 1_000;

    Ok(format!("{:02}:{:02}:{:02},{:03}", hours, minutes, secs, millis))
}

/// Parse an SRT timestamp (HH:MM:SS,mmm) back to seconds
pub fn parse_timestamp(timestamp: &str) -> Result<f64> {
    let invalid = || SubburnError::InvalidInput(format!("Invalid SRT timestamp: {:?}", timestamp));

    let (clock, millis) = timestamp.trim().split_once(',').ok_or_else(invalid)?;
    let mut fields = clock.split(':');
    let (Some(hours), Some(minutes), Some(secs), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(invalid());
    };

    let digits = |field: &str, width: Option<usize>| -> Result<u64> {
        let width_ok = width.map_or(field.len() >= 2, |w| field.len() == w);
        if !width_ok || !field.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        field.parse::<u64>().map_err(|_| invalid())
    };

    let hours = digits(hours, None)?;
    let minutes = digits(minutes, Some(2))?;
    let secs = digits(secs, Some(2))?;
    let millis = digits(millis, Some(3))?;
    if minutes >= 60 || secs >= 60 {
        return Err(invalid());
    }

    let total_milliseconds = hours
        .checked_mul(3_600_000)
        .and_then(|ms| ms.checked_add((minutes * 60 + secs) * 1000 + millis))
        .ok_or_else(invalid)?;
    Ok(total_milliseconds as f64 / 1000.0)
}

/// Render segments as SRT text. An empty slice renders as an empty string.
pub fn render_srt(segments: &[Segment]) -> Result<String> {
    let mut srt_content = String::new();

    for (index, segment) in segments.iter().enumerate() {
        let start_time = format_timestamp(segment.start)?;
        let end_time = format_timestamp(segment.end)?;

        srt_content.push_str(&format!(
            "{}\n{} --> {}\n{}\n\n",
            index + 1,
            start_time,
            end_time,
            segment.text.trim()
        ));
    }

    Ok(srt_content)
}

/// Generate SRT subtitle file from segments
pub async fn write_srt<P: AsRef<Path>>(segments: &[Segment], output_path: P) -> Result<()> {
    let output_path = output_path.as_ref();
    info!("Generating SRT file: {}", output_path.display());

    let srt_content = render_srt(segments)?;
    fs::write(output_path, srt_content).await?;

    info!("SRT file generated with {} entries", segments.len());
    Ok(())
}

/// Parse SRT text into segments. Indices are checked for shape but not renumbered.
pub fn parse_srt(content: &str) -> Result<Vec<Segment>> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut segments = Vec::new();
    let mut lines = content.lines().map(str::trim_end).peekable();

    while let Some(line) = lines.next() {
        if line.trim().is_empty() {
            continue;
        }

        line.trim().parse::<u64>().map_err(|_| {
            SubburnError::InvalidInput(format!("Expected subtitle index, found {:?}", line))
        })?;

        let timing = lines.next().ok_or_else(|| {
            SubburnError::InvalidInput("Unexpected end of file (expected timestamp)".to_string())
        })?;
        let (start, end) = timing.split_once("-->").ok_or_else(|| {
            SubburnError::InvalidInput(format!("Invalid timestamp line: {:?}", timing))
        })?;

        let mut text_lines = Vec::new();
        while let Some(text) = lines.next_if(|l| !l.trim().is_empty()) {
            text_lines.push(text);
        }

        segments.push(Segment {
            start: parse_timestamp(start)?,
            end: parse_timestamp(end)?,
            text: text_lines.join("\n"),
        });
    }

    debug!("Parsed {} subtitle entries", segments.len());
    Ok(segments)
}

/// Read and validate an SRT file from disk
pub async fn read_srt<P: AsRef<Path>>(path: P) -> Result<Vec<Segment>> {
    let content = fs::read_to_string(path.as_ref()).await?;
    parse_srt(&content)
}
