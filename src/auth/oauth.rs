use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use url::Url;

use super::{ClientRegistration, TokenSet};
use crate::config::OAuthSettings;
use crate::HarvesterError;

/// Installed-app OAuth2 client bound to one registration
#[derive(Debug, Clone)]
pub struct OAuthClient {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    auth_url: String,
    token_url: String,
    http: reqwest::Client,
}

/// Successful token endpoint response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
    #[serde(flatten)]
    extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_token_set(self, now: DateTime<Utc>) -> TokenSet {
        TokenSet {
            access_token: Some(self.access_token),
            refresh_token: self.refresh_token,
            scope: self.scope,
            token_type: self.token_type,
            id_token: self.id_token,
            expiry_date: self
                .expires_in
                .map(|secs| now.timestamp_millis() + secs * 1000),
            extra: self.extra,
        }
    }
}

impl OAuthClient {
    /// Build a client from the registration, letting its endpoints override the configured ones
    pub fn new(registration: &ClientRegistration, settings: &OAuthSettings) -> Self {
        Self {
            client_id: registration.client_id.clone(),
            client_secret: registration.client_secret.clone(),
            redirect_uri: registration.redirect_uri.clone(),
            auth_url: registration
                .auth_uri
                .clone()
                .unwrap_or_else(|| settings.auth_url.clone()),
            token_url: registration
                .token_uri
                .clone()
                .unwrap_or_else(|| settings.token_url.clone()),
            http: reqwest::Client::new(),
        }
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }

    /// Consent screen URL requesting offline access so a refresh token is issued
    pub fn authorize_url(&self, scopes: &[String]) -> Result<Url> {
        let mut url = Url::parse(&self.auth_url)
            .with_context(|| format!("Invalid authorization endpoint: {}", self.auth_url))?;

        url.query_pairs_mut()
            .append_pair("access_type", "offline")
            .append_pair("scope", &scopes.join(" "))
            .append_pair("response_type", "code")
            .append_pair("client_id", self.client_id.as_str())
            .append_pair("redirect_uri", self.redirect_uri.as_str());

        Ok(url)
    }

    /// Exchange an authorization code for a token pair
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        tracing::debug!("Exchanging authorization code at {}", self.token_url);

        let response = self
            .request_token(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(HarvesterError::TokenExchangeFailed)?;

        Ok(response.into_token_set(Utc::now()))
    }

    /// Obtain a new access token from a refresh token
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenSet> {
        tracing::debug!("Refreshing access token at {}", self.token_url);

        let response = self
            .request_token(&[
                ("refresh_token", refresh_token),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .await
            .map_err(HarvesterError::TokenRefreshFailed)?;

        Ok(response.into_token_set(Utc::now()))
    }

    async fn request_token(
        &self,
        form: &[(&str, &str)],
    ) -> std::result::Result<TokenResponse, String> {
        let response = self
            .http
            .post(&self.token_url)
            .form(form)
            .send()
            .await
            .map_err(|e| format!("request to {} failed: {}", self.token_url, e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("failed to read token response: {}", e))?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<TokenErrorResponse>(&body) {
                Ok(err) => match err.error_description {
                    Some(description) => format!("{} ({}): {}", err.error, status, description),
                    None => format!("{} ({})", err.error, status),
                },
                Err(_) => format!("HTTP {}: {}", status, body),
            });
        }

        serde_json::from_str(&body).map_err(|e| format!("unexpected token response: {}", e))
    }
}
