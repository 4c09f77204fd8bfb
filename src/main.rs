// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use edgecam::Config;
use edgecam::backends::camera::BuiltinSourceFactory;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "edgecam")]
#[command(about = "Live edge-detection camera preview")]
#[command(version = env!("GIT_VERSION"))]
#[command(subcommand_required = false)]
struct Cli {
    /// Configuration file (default: <config_dir>/edgecam/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Live preview rendered in the terminal
    Terminal,

    /// Run the pipeline headless and save one processed frame
    Capture {
        /// Frames to let through before taking the snapshot
        #[arg(short, long, default_value = "5")]
        frames: u64,

        /// Use the front camera (mirrored preview)
        #[arg(long)]
        front: bool,

        /// Stream a still image instead of the test pattern
        #[arg(short, long)]
        image: Option<PathBuf>,

        /// Output file or directory (default: ~/Pictures/edgecam)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print the effective configuration
    Config,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control log level
    // Examples: RUST_LOG=debug, RUST_LOG=edgecam=debug, RUST_LOG=info
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();

    let config_path = cli.config.clone().or_else(Config::default_path);
    let config = match &config_path {
        Some(path) => Config::load_from(path)?,
        None => Config::default(),
    };

    match cli.command {
        Some(Commands::Terminal) | None => {
            let factory = BuiltinSourceFactory::from_config(&config);
            edgecam::terminal::run(&config, Box::new(factory))
        }
        Some(Commands::Capture {
            frames,
            front,
            image,
            output,
        }) => cli::capture(
            config,
            cli::CaptureOptions {
                frames,
                front,
                image,
                output,
            },
        ),
        Some(Commands::Config) => cli::show_config(&config, config_path.as_deref()),
    }
}
