//! Zoomcast CLI — Record a live pan/zoom session to a container file.
//!
//! Usage:
//!   zoomcast record [OPTIONS]   Record a synthetic live source
//!   zoomcast check              Check encoder/muxer availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "zoomcast",
    about = "Screen recording with a smoothly animated pan/zoom crop window",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a synthetic live source through the full pipeline
    Record {
        /// Output file path (overwritten if it exists)
        #[arg(short, long, default_value = "recording.mp4")]
        output: PathBuf,

        /// Output frame width
        #[arg(long, default_value = "1280")]
        width: u32,

        /// Output frame height
        #[arg(long, default_value = "720")]
        height: u32,

        /// Capture rate
        #[arg(long, default_value = "30")]
        fps: u32,

        /// Recording length in seconds
        #[arg(long, default_value = "5.0")]
        duration: f64,

        /// Video bitrate in kbit/s
        #[arg(long, default_value = "10000")]
        bitrate: u32,

        /// Keep the full frame instead of following the moving marker
        #[arg(long)]
        no_follow: bool,
    },

    /// Check that the required GStreamer elements are installed
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    zoomcast_common::logging::init_logging(&zoomcast_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
        file: None,
    });

    match cli.command {
        Commands::Record {
            output,
            width,
            height,
            fps,
            duration,
            bitrate,
            no_follow,
        } => commands::record::run(output, width, height, fps, duration, bitrate, !no_follow).await,
        Commands::Check => commands::check::run(),
    }
}
