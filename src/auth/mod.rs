use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;

use crate::config::OAuthSettings;
use crate::utils;
use crate::HarvesterError;

pub mod oauth;
pub mod server;

pub use oauth::OAuthClient;
pub use server::CompletionSignal;

/// Tokens expiring within this window are refreshed before use
const EXPIRY_SKEW_MS: i64 = 60_000;

/// Installed-app fields of the application-registration file
#[derive(Debug, Clone, PartialEq)]
pub struct ClientRegistration {
    pub client_id: String,
    pub client_secret: String,
    /// First entry of `redirect_uris`
    pub redirect_uri: String,
    pub auth_uri: Option<String>,
    pub token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistrationFile {
    installed: Option<InstalledApp>,
}

#[derive(Debug, Deserialize)]
struct InstalledApp {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ClientRegistration {
    /// Read the registration file. Any failure here is fatal.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).map_err(|e| {
            HarvesterError::ConfigError(format!("cannot read credentials file: {}", e))
        })?;
        Self::parse(&content).map_err(|reason| {
            HarvesterError::ConfigError(format!("{}: {}", path.display(), reason)).into()
        })
    }

    fn parse(content: &str) -> std::result::Result<Self, String> {
        let file: RegistrationFile =
            serde_json::from_str(content).map_err(|e| format!("invalid credentials JSON: {}", e))?;
        let installed = file.installed.ok_or_else(|| {
            "no \"installed\" client found, download a Desktop app client".to_string()
        })?;

        let redirect_uri = installed
            .redirect_uris
            .into_iter()
            .next()
            .ok_or_else(|| "\"installed.redirect_uris\" is empty".to_string())?;
        utils::validate_url(&redirect_uri).map_err(|e| e.to_string())?;

        Ok(Self {
            client_id: installed.client_id,
            client_secret: installed.client_secret,
            redirect_uri,
            auth_uri: installed.auth_uri,
            token_uri: installed.token_uri,
        })
    }
}

/// Token payload as stored in the token file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,

    /// Absolute expiry in milliseconds since the Unix epoch
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,

    /// Fields this program does not interpret, kept for round-tripping
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl TokenSet {
    pub fn has_access_token(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Whether the access token is missing or expires within the skew window.
    /// A token without a recorded expiry is trusted as-is.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        if !self.has_access_token() {
            return true;
        }
        match self.expiry_date {
            Some(expiry) => expiry - EXPIRY_SKEW_MS <= now.timestamp_millis(),
            None => false,
        }
    }

    /// Combine a refresh response with the token it replaces
    fn refreshed_with(&self, mut fresh: TokenSet) -> TokenSet {
        if fresh.refresh_token.is_none() {
            fresh.refresh_token = self.refresh_token.clone();
        }
        if fresh.scope.is_none() {
            fresh.scope = self.scope.clone();
        }
        fresh
    }
}

/// Token file on disk
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read a previously stored token. Absence or a broken file both mean "no token yet".
    pub fn load(&self) -> Option<TokenSet> {
        let content = match fs_err::read_to_string(&self.path) {
            Ok(content) => content,
            Err(_) => {
                tracing::info!("No token found.");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(token) => {
                tracing::debug!("Loaded token from {}", self.path.display());
                Some(token)
            }
            Err(e) => {
                tracing::warn!("Ignoring unreadable token file {}: {}", self.path.display(), e);
                None
            }
        }
    }

    /// Overwrite the token file atomically
    pub fn save(&self, token: &TokenSet) -> Result<()> {
        let json = serde_json::to_string(token).context("Failed to serialize token")?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs_err::create_dir_all(&dir)?;

        let mut file = tempfile::NamedTempFile::new_in(&dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
        file.write_all(json.as_bytes())
            .context("Failed to write token")?;
        file.persist(&self.path).map_err(|e| {
            HarvesterError::FileError(format!(
                "failed to store token at {}: {}",
                self.path.display(),
                e.error
            ))
        })?;

        tracing::debug!("Stored token at {}", self.path.display());
        Ok(())
    }
}

/// OAuth client, token store and the currently installed token
#[derive(Debug, Clone)]
pub struct Credential {
    client: OAuthClient,
    store: TokenStore,
    token: Option<TokenSet>,
}

impl Credential {
    pub fn new(client: OAuthClient, store: TokenStore, token: Option<TokenSet>) -> Self {
        Self { client, store, token }
    }

    pub fn client(&self) -> &OAuthClient {
        &self.client
    }

    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    pub fn token(&self) -> Option<&TokenSet> {
        self.token.as_ref()
    }

    pub fn has_access_token(&self) -> bool {
        self.token.as_ref().is_some_and(TokenSet::has_access_token)
    }

    /// Persist a newly granted or refreshed token and start using it
    pub fn install(&mut self, token: TokenSet) -> Result<()> {
        self.store.save(&token)?;
        self.token = Some(token);
        Ok(())
    }

    /// Access token for the next API call, refreshed first when it is about to expire
    pub async fn fresh_access_token(&mut self) -> Result<String> {
        self.fresh_access_token_at(Utc::now()).await
    }

    async fn fresh_access_token_at(&mut self, now: DateTime<Utc>) -> Result<String> {
        let current = self.token.as_ref().ok_or_else(|| {
            HarvesterError::TokenRefreshFailed("no token has been granted yet".to_string())
        })?;

        if !current.is_expired(now) {
            if let Some(access_token) = &current.access_token {
                return Ok(access_token.clone());
            }
        }

        let refresh_token = current.refresh_token.clone().ok_or_else(|| {
            HarvesterError::TokenRefreshFailed(
                "access token expired and no refresh token is stored".to_string(),
            )
        })?;

        tracing::info!("Access token expired, refreshing");
        let fresh = self.client.refresh(&refresh_token).await?;
        let merged = current.refreshed_with(fresh);
        let access_token = merged.access_token.clone().unwrap_or_default();
        self.install(merged)?;

        Ok(access_token)
    }
}

/// Obtains a usable credential, running the browser consent flow when no token is stored
pub struct Authenticator {
    settings: OAuthSettings,
    credential: Credential,
}

impl Authenticator {
    /// Read the registration and any stored token. No network activity happens here.
    pub fn new(settings: OAuthSettings) -> Result<Self> {
        let registration = ClientRegistration::load(&settings.credentials_path)?;
        let client = OAuthClient::new(&registration, &settings);

        let store = TokenStore::new(&settings.token_path);
        let token = store.load();

        Ok(Self {
            credential: Credential::new(client, store, token),
            settings,
        })
    }

    /// Run the whole flow and wait for a credential
    pub async fn authenticate(self) -> Result<Credential> {
        self.start().await?.wait().await
    }

    /// Bind the redirect listener. Resolves right away when a stored token was loaded.
    pub async fn start(self) -> Result<PendingAuthorization> {
        let addr = format!("{}:{}", self.settings.listen_host, self.settings.listen_port);
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind authorization listener on {}", addr))?;
        let local_addr = listener.local_addr()?;

        self.warn_on_redirect_mismatch(local_addr);

        let already_authorized = self.credential.has_access_token();
        let (signal, receiver) = CompletionSignal::new();
        let state = server::ListenerState::new(self.credential, self.settings.scopes, signal);

        if already_authorized {
            tracing::info!(
                "App is already authorized. Listening at: http://localhost:{}",
                local_addr.port()
            );
            state.fulfil_with_current().await;
        } else {
            tracing::info!("Authorize app at: http://localhost:{}", local_addr.port());
        }

        server::spawn(listener, state);

        Ok(PendingAuthorization { local_addr, receiver })
    }

    fn warn_on_redirect_mismatch(&self, local_addr: SocketAddr) {
        let redirect = self.credential.client().redirect_uri();
        let redirect_port = url::Url::parse(redirect)
            .ok()
            .and_then(|url| url.port_or_known_default());

        if redirect_port != Some(local_addr.port()) {
            tracing::warn!(
                "Redirect URI {} does not point at the listener port {}, \
                 the consent screen may not return here",
                redirect,
                local_addr.port()
            );
        }
    }
}

/// Authorization in progress, completed by the redirect listener
pub struct PendingAuthorization {
    local_addr: SocketAddr,
    receiver: oneshot::Receiver<Result<Credential>>,
}

impl PendingAuthorization {
    /// Address the redirect listener is bound to
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the listener to produce a credential
    pub async fn wait(self) -> Result<Credential> {
        self.receiver
            .await
            .context("Authorization listener stopped before authorization completed")?
    }
}
