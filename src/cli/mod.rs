use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::source::SourceTag;

#[derive(Parser)]
#[command(
    name = "vidbrief",
    about = "vidbrief - Transcribe short videos from YouTube, Instagram, TikTok and more, then summarise them",
    version,
    long_about = "Downloads the media behind a video link, transcribes it with AWS Transcribe and ranks the transcript's sentences by centrality to produce a brief summary and key points."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: ./config.yaml or the user config directory)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub json_logs: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download, transcribe and summarise a video
    Process {
        /// Video URL
        #[arg(value_name = "URL")]
        url: String,

        /// Output file path (prints to console if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Ignore a stored result and process again
        #[arg(long)]
        refresh: bool,
    },

    /// Summarise an existing transcript (reads stdin when no file is given)
    Summarize {
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show which platform a URL belongs to
    Classify {
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Search stored results
    Search {
        /// Match transcripts or summaries containing this text
        #[arg(short, long)]
        keyword: Option<String>,

        /// Only results from this source type
        #[arg(short, long, value_name = "TAG")]
        source: Option<SourceTag>,

        /// Processed on or after (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_name = "DATE")]
        since: Option<String>,

        /// Processed on or before (YYYY-MM-DD or RFC 3339)
        #[arg(long, value_name = "DATE")]
        until: Option<String>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Print the stored result for a URL
    Show {
        #[arg(value_name = "URL")]
        url: String,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Inspect or reset the Instagram session
    Session {
        /// Delete the saved session so the next run logs in again
        #[arg(long)]
        reset: bool,
    },

    /// Write or show the configuration file
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// List supported platforms
    Platforms,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain text
    Text,
    /// JSON
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
