use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "captions",
    about = "Caption Harvester - Download the captions of every video you uploaded to YouTube",
    version,
    long_about = "Authorizes against the YouTube Data API with OAuth2, walks your channel's \
                  uploads playlist and saves the first caption track of every video to a \
                  local directory."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to a config file (defaults to ./config.yaml, then the user config directory)
    #[arg(short, long, global = true, value_name = "FILE", env = "CAPTIONS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Authorize if needed, then download captions for every uploaded video
    Fetch {
        /// Directory the caption files are written to
        #[arg(short, long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// Subtitle encoding requested from YouTube
        #[arg(short, long, value_enum)]
        format: Option<CaptionFormat>,
    },

    /// Only run the OAuth authorization and store the token
    Auth,

    /// Show or initialize the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,

        /// Write the default configuration to the config file
        #[arg(long, conflicts_with = "show")]
        init: bool,
    },
}

/// Subtitle encodings accepted by the captions.download endpoint
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionFormat {
    /// SubRip
    #[default]
    Srt,
    /// WebVTT
    Vtt,
    /// SubViewer
    Sbv,
}

impl CaptionFormat {
    /// Value of the `tfmt` query parameter
    pub fn as_tfmt(&self) -> &'static str {
        match self {
            CaptionFormat::Srt => "srt",
            CaptionFormat::Vtt => "vtt",
            CaptionFormat::Sbv => "sbv",
        }
    }

    pub fn extension(&self) -> &'static str {
        self.as_tfmt()
    }
}

impl std::fmt::Display for CaptionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_tfmt())
    }
}
