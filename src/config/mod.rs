use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use url::Url;

use crate::cli::CaptionFormat;
use crate::HarvesterError;

/// Largest page the playlistItems endpoint will return
pub const MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// OAuth client and local redirect listener
    pub oauth: OAuthSettings,

    /// YouTube Data API settings
    pub api: ApiSettings,

    /// Where and how captions are written
    pub output: OutputSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OAuthSettings {
    /// Installed-app registration downloaded from the Google console
    pub credentials_path: PathBuf,

    /// Token store, rewritten on every grant or refresh
    pub token_path: PathBuf,

    /// Interface the redirect listener binds to
    pub listen_host: String,

    /// Port the redirect listener binds to
    pub listen_port: u16,

    /// Requested OAuth scopes
    pub scopes: Vec<String>,

    /// Consent screen endpoint, unless the registration names one
    pub auth_url: String,

    /// Token endpoint, unless the registration names one
    pub token_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ApiSettings {
    /// Base URL of the YouTube Data API v3
    pub base_url: String,

    /// Playlist items requested per page
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory caption files are written to
    pub directory: PathBuf,

    /// Subtitle encoding requested from the download endpoint
    pub format: CaptionFormat,
}

impl Default for OAuthSettings {
    fn default() -> Self {
        Self {
            credentials_path: PathBuf::from("credentials.json"),
            token_path: PathBuf::from("token.json"),
            listen_host: "127.0.0.1".to_string(),
            listen_port: 3000,
            scopes: vec!["https://www.googleapis.com/auth/youtube.force-ssl".to_string()],
            auth_url: "https://accounts.google.com/o/oauth2/v2/auth".to_string(),
            token_url: "https://oauth2.googleapis.com/token".to_string(),
        }
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "https://www.googleapis.com/youtube/v3".to_string(),
            page_size: MAX_PAGE_SIZE,
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("captions"),
            format: CaptionFormat::Srt,
        }
    }
}

impl Config {
    /// Load configuration from file or fall back to the defaults
    pub async fn load(explicit: Option<&Path>) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(HarvesterError::ConfigError(format!(
                        "config file not found: {}",
                        path.display()
                    ))
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => Self::config_path().ok().filter(|path| path.exists()),
        };

        let config = match config_path {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                let content = tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("Failed to read config file {}", path.display()))?;
                Self::from_yaml(&content)?
            }
            None => Self::default(),
        };

        config.validate()?;
        Ok(config)
    }

    fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| {
            HarvesterError::ConfigError(format!("failed to parse config file: {}", e)).into()
        })
    }

    /// Save configuration to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join("caption-harvester").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if !(1..=MAX_PAGE_SIZE).contains(&self.api.page_size) {
            return Err(HarvesterError::ConfigError(format!(
                "api.page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.api.page_size
            ))
            .into());
        }

        if self.oauth.scopes.is_empty() {
            return Err(
                HarvesterError::ConfigError("oauth.scopes must not be empty".to_string()).into(),
            );
        }

        for (name, value) in [
            ("oauth.auth_url", &self.oauth.auth_url),
            ("oauth.token_url", &self.oauth.token_url),
            ("api.base_url", &self.api.base_url),
        ] {
            Url::parse(value).map_err(|e| {
                HarvesterError::ConfigError(format!("{} is not a valid URL: {}", name, e))
            })?;
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Credentials File: {}", self.oauth.credentials_path.display());
        println!("  Token File: {}", self.oauth.token_path.display());
        println!("  Redirect Listener: {}:{}", self.oauth.listen_host, self.oauth.listen_port);
        println!("  Scopes: {}", self.oauth.scopes.join(" "));
        println!("  API Base URL: {}", self.api.base_url);
        println!("  Page Size: {}", self.api.page_size);
        println!("  Output Directory: {}", self.output.directory.display());
        println!("  Caption Format: {}", self.output.format);
    }
}
