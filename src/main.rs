use anyhow::{Context, Result};
use clap::Parser;
use redub::config::Config;
use redub::pipeline::{Pipeline, PipelineOptions, Step};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "redub")]
#[command(version, about = "Re-dub videos into another language")]
#[command(
    long_about = "Transcribe a video with Whisper, translate the subtitles, synthesize dubbed \
                  speech with Azure TTS and compose the final video with FFmpeg."
)]
struct Cli {
    /// Input video file
    input: PathBuf,

    /// Final video path (defaults to <input>_final.mp4)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Steps to run: extract-audio, generate-srt, translate, tts, remove-subs, compose, all
    #[arg(short, long, default_value = "all", value_delimiter = ',')]
    steps: Vec<String>,

    /// Strip hard-coded subtitles before burning the translated ones
    #[arg(long)]
    remove_subs: bool,

    /// Keep intermediate files for inspection
    #[arg(long)]
    keep_temp: bool,

    /// Source language code hint for transcription (e.g. en, ja)
    #[arg(short, long)]
    language: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let steps = cli
        .steps
        .iter()
        .map(|s| s.parse::<Step>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!(e))?;

    let config = Config::load().context("Failed to load configuration")?;
    config.validate().context("Configuration validation failed")?;

    info!("Input:    {}", cli.input.display());
    info!("Target:   {}", config.target_language);
    info!(
        "Steps:    {}",
        steps
            .iter()
            .map(Step::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );

    let options = PipelineOptions {
        steps,
        remove_subs: cli.remove_subs,
        keep_temp: cli.keep_temp,
        source_language: cli.language,
        show_progress: true,
    };

    let pipeline = Pipeline::new(config, options, cli.input, cli.output)?;
    pipeline.run().await?;

    Ok(())
}
