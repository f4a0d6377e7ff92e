//! ffqueue - directory-backed transcoding queue
//!
//! Entry point for the queue daemon.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::sync::Arc;

use clap::Parser;
use ffqueue::config::split_flags;
use ffqueue::observability::init_tracing;
use ffqueue::shutdown::cancel_on_signal;
use ffqueue::worker::Transcoder;
use ffqueue::{Config, Pipeline, Result};
use tokio_util::sync::CancellationToken;

/// ffqueue - transcode every file dropped into a watched queue directory
#[derive(Parser, Debug)]
#[command(name = "ffqueue")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base directory holding queue/, working/, finished/ and upload/
    #[arg(short, long, env = "BASE_DIR")]
    base_dir: std::path::PathBuf,

    /// Transcoder flags placed before `-i <input>`
    #[arg(long, env = "FFMPEG_INPUT_FLAGS", default_value = "", allow_hyphen_values = true)]
    input_flags: String,

    /// Transcoder flags placed after `-i <input>`, before the output path
    #[arg(long, env = "FFMPEG_OUTPUT_FLAGS", default_value = "", allow_hyphen_values = true)]
    output_flags: String,

    /// Transcoder program, looked up on PATH
    #[arg(long, env = "FFQUEUE_TRANSCODER", default_value = "ffmpeg")]
    transcoder: String,

    /// Container extension for output files
    #[arg(long, env = "FFQUEUE_OUTPUT_EXTENSION", default_value = "mp4")]
    output_extension: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "FFQUEUE_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "FFQUEUE_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.log_json);

    tracing::info!("ffqueue v{} starting...", env!("CARGO_PKG_VERSION"));

    let config = Config {
        base_dir: cli.base_dir,
        input_flags: split_flags(&cli.input_flags),
        output_flags: split_flags(&cli.output_flags),
        transcoder: cli.transcoder,
        output_extension: cli.output_extension,
        log_level: cli.log_level,
    };

    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;
    let transcoder = Transcoder::locate(&config)?;

    let cancel = CancellationToken::new();
    let _signals = cancel_on_signal(cancel.clone());

    let result = Pipeline::new(Arc::new(config), transcoder)
        .run(cancel)
        .await;

    if let Err(e) = &result {
        tracing::error!(error = %e, "Fatal error");
    }
    result
}
