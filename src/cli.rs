use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffbatch")]
#[command(author, version, about = "Batch transcoding queue for ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe the encoder and list its codecs and muxers
    Probe {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Describe a media file
    Info {
        /// File to inspect
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the encoder arguments for job files without running them
    Args {
        /// Job files (TOML, or JSON with a .json extension)
        #[arg(required = true)]
        jobs: Vec<PathBuf>,
    },

    /// Queue job files and encode them one after another
    Run {
        /// Job files (TOML, or JSON with a .json extension)
        #[arg(required = true)]
        jobs: Vec<PathBuf>,
    },

    /// Check that the encoder binary is available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
