use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "brandmark")]
#[command(about = "Logo screening, background removal and card background selection")]
#[command(version)]
pub struct Cli {
    /// Pipeline settings as JSON (missing fields use defaults)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Score files as logos and print the verdicts as JSON
    Validate {
        /// Image files (PNG or JPEG)
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Palette, brightness and background choice for a logo, offline
    Analyze {
        /// Original upload
        #[arg(short, long)]
        original: PathBuf,

        /// Background-removed version (defaults to the original)
        #[arg(short, long)]
        processed: Option<PathBuf>,
    },

    /// Remove backgrounds with remove.bg and record the batch
    Process {
        /// Image files, at most 8
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// History file
        #[arg(short, long, default_value = "brandmark-history.json")]
        store: PathBuf,

        /// Name recorded on the batch
        #[arg(long)]
        operator: Option<String>,

        /// remove.bg API key
        #[arg(long, env = "REMOVE_BG_API_KEY", hide_env_values = true)]
        api_key: Option<String>,

        /// Process images one at a time
        #[arg(long)]
        sequential: bool,
    },

    /// List stored batches, newest first
    History {
        #[arg(short, long, default_value = "brandmark-history.json")]
        store: PathBuf,

        /// Print full records as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change the default background of a stored image
    Override {
        #[arg(short, long, default_value = "brandmark-history.json")]
        store: PathBuf,

        /// Batch index, 0 is newest
        #[arg(short, long)]
        batch: usize,

        /// Image index within the batch
        #[arg(short, long)]
        image: usize,

        /// New default, #RRGGBB
        #[arg(short, long)]
        color: String,
    },

    /// Outline color and opacity for a card background
    Outline {
        /// Background color, #RRGGBB or rgb(r, g, b)
        color: String,
    },
}
