//! Subburn - video captioning with burned-in subtitles
//!
//! Command-line entry point: loads configuration, sets up logging, and runs
//! the requested pipeline command.

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::{non_blocking, rolling};

use subburn::cli::{Args, Commands};
use subburn::config::Config;
use subburn::error::SubburnError;
use subburn::progress::ConsoleWriter;
use subburn::workflow::{PipelineOutput, Stage, Workflow};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let console = setup_logging(args.verbose)?;
    info!("Starting Subburn");

    let config = Config::load(args.config.as_deref())?;

    // Needs neither the encoder nor a model
    let command = match args.command {
        Commands::ConfigInit { output } => {
            config.save_to_file(&output)?;
            println!("Wrote configuration to {}", output.display());
            return Ok(());
        }
        command => command,
    };

    let workflow = Workflow::new(config);
    if command.needs_encoder() {
        workflow.ensure_encoder().await?;
    }

    match command {
        Commands::Process { input, mode, output_dir } => {
            let spinner = console.start_spinner();
            let report = |stage: Stage| spinner.set_message(stage.to_string());

            let result = workflow
                .process_single_file(&input, mode, output_dir.as_deref(), &report)
                .await;
            console.finish_spinner();

            print_output(&result?, workflow.config().output.preview_lines)?;
        }
        Commands::Batch { input_dir, mode } => {
            let spinner = console.start_spinner();
            let report = |stage: Stage| spinner.set_message(stage.to_string());

            let result = workflow.process_directory(&input_dir, mode, &report).await;
            console.finish_spinner();
            let summary = result?;

            for output in &summary.succeeded {
                println!("✔ {}", output.video_path.display());
            }
            for (path, error) in &summary.failed {
                println!("✘ {}: {}", path.display(), error);
            }
            println!(
                "{} succeeded, {} failed",
                summary.succeeded.len(),
                summary.failed.len()
            );

            if !summary.failed.is_empty() {
                anyhow::bail!("{} of the videos could not be processed", summary.failed.len());
            }
        }
        Commands::Extract { input, output } => {
            info!("Extracting audio from: {}", input.display());
            workflow.extract_audio(&input, &output).await?;
        }
        Commands::Transcribe { input, output, mode } => {
            info!("Transcribing audio: {}", input.display());
            let transcription = workflow.transcribe_audio(&input, &output, mode.task()).await?;
            println!(
                "Wrote {} captions ({}) to {}",
                transcription.segments.len(),
                transcription.language,
                output.display()
            );
        }
        Commands::Burn { video, subtitles, output } => {
            info!("Burning subtitles into video: {}", video.display());
            workflow.burn_subtitles(&video, &subtitles, &output).await?;
        }
        Commands::ConfigInit { .. } => {}
    }

    info!("Subburn completed successfully");
    Ok(())
}

/// Print artifact locations and the first few captions
fn print_output(output: &PipelineOutput, preview_lines: usize) -> Result<(), SubburnError> {
    println!("Captions: {}", output.subtitle_path.display());
    println!("Video:    {}", output.video_path.display());

    let preview = output.preview(preview_lines)?;
    if !preview.is_empty() {
        println!("\nPreview of captions:");
        for line in preview {
            println!("  {}", line);
        }
    }
    Ok(())
}

/// Setup logging to both console and file.
///
/// The returned writer owns the console; spinners must be started through it.
fn setup_logging(verbose: bool) -> Result<ConsoleWriter> {
    let log_dir = std::env::current_dir()?.join(".subburn").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation
    let file_appender = rolling::daily(&log_dir, "subburn.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the guard alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console = ConsoleWriter::new();
    let console_layer = fmt::layer()
        .with_writer(console.clone())
        .with_target(false)
        .with_file(verbose)
        .with_line_number(verbose);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}",
          log_level, log_dir.join("subburn.log").display());

    Ok(console)
}
