//! Caption Harvester - A Rust CLI tool for archiving the captions of your own YouTube uploads
//!
//! This library authenticates against the YouTube Data API with an installed-app OAuth2
//! client, walks the authenticated channel's uploads playlist and saves the first caption
//! track of every video to disk.

pub mod auth;
pub mod cli;
pub mod config;
pub mod harvest;
pub mod output;
pub mod platform;
pub mod utils;

pub use auth::{Authenticator, Credential, TokenSet};
pub use cli::{CaptionFormat, Cli, Commands};
pub use config::Config;
pub use harvest::{FetchOutcome, HarvestSummary, Harvester, VideoRef};
pub use platform::{VideoPlatform, YoutubeClient};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to the harvester
#[derive(thiserror::Error, Debug)]
pub enum HarvesterError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token refresh failed: {0}")]
    TokenRefreshFailed(String),

    #[error("YouTube API request failed with status {status}: {body}")]
    ApiError { status: u16, body: String },

    #[error("The authenticated account has no YouTube channel")]
    NoChannel,

    #[error("File operation failed: {0}")]
    FileError(String),
}
