use anyhow::Result;
use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;
use tracing::{error, info, warn};

use audio_transcriber::config::Config;
use audio_transcriber::pipeline::BatchPipeline;

#[tokio::main]
async fn main() -> Result<()> {
    let mut cmd = Command::new("audio-transcriber")
        .version("0.1.0")
        .about("Convert audio recordings to text transcriptions")
        .arg(
            Arg::new("input")
                .short('i')
                .long("input")
                .value_name("DIR")
                .help("Input directory containing audio files")
                .required(true),
        )
        .arg(
            Arg::new("temp")
                .short('t')
                .long("temp")
                .value_name("DIR")
                .help("Working directory for intermediate files")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory for transcriptions")
                .required(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose output")
                .action(ArgAction::SetTrue),
        );

    let matches = cmd.clone().get_matches();

    let input_dir = PathBuf::from(matches.get_one::<String>("input").unwrap());
    let working_dir = PathBuf::from(matches.get_one::<String>("temp").unwrap());
    let output_dir = PathBuf::from(matches.get_one::<String>("output").unwrap());
    let verbose = matches.get_flag("verbose");

    tracing_subscriber::fmt()
        .with_env_filter(if verbose {
            "audio_transcriber=debug,info"
        } else {
            "warn"
        })
        .init();

    if !input_dir.exists() {
        error!("Input directory does not exist: {}", input_dir.display());
        cmd.print_help()?;
        std::process::exit(1);
    }

    let config = Config::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {}", e);
        Config::default()
    });
    config.validate()?;

    tokio::fs::create_dir_all(&working_dir).await?;
    tokio::fs::create_dir_all(&output_dir).await?;

    info!("Input directory: {}", input_dir.display());
    info!("Working directory: {}", working_dir.display());
    info!("Output directory: {}", output_dir.display());

    let pipeline = BatchPipeline::new(config);
    let report = pipeline.run(&input_dir, &working_dir, &output_dir).await?;

    info!(
        "Processing completed in {:.2}s",
        report.total_time.as_secs_f64()
    );
    info!(
        "Copied: {} | Split: {} ({} segments) | Transcribed: {}",
        report.conditioning.copied,
        report.conditioning.split,
        report.conditioning.segments_written,
        report.transcription.transcribed
    );

    if !report.is_clean() {
        warn!("{} file(s) failed:", report.failure_count());
        for failure in report.failures() {
            warn!("  {}: {}", failure.path.display(), failure.reason);
        }
    }

    Ok(())
}
