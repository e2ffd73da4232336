use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use super::{CaptionTrack, Channel, PlaylistItem, PlaylistItemPage, VideoPlatform};
use crate::auth::Credential;
use crate::cli::CaptionFormat;
use crate::config::ApiSettings;
use crate::HarvesterError;

/// Envelope shared by the list endpoints
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
    #[serde(default)]
    next_page_token: Option<String>,
}

/// YouTube Data API v3 client.
///
/// Every request goes through [`YoutubeClient::authorized_get`], which asks the credential for
/// a fresh access token first. An access token close to expiry is refreshed with the stored
/// refresh token and the refreshed token is written back to the token store.
pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
    credential: Mutex<Credential>,
}

impl YoutubeClient {
    pub fn new(settings: &ApiSettings, credential: Credential) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            credential: Mutex::new(credential),
        }
    }

    /// Resource URL below the API base, with each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.base_url)
            .with_context(|| format!("Invalid API base URL {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| {
                HarvesterError::ConfigError(format!("{} cannot be a base URL", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn authorized_get(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<reqwest::Response> {
        let url = self.endpoint(segments)?;
        let access_token = self.credential.lock().await.fresh_access_token().await?;

        let response = self
            .http
            .get(url.clone())
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(HarvesterError::ApiError {
                status: status.as_u16(),
                body,
            }
            .into());
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        self.authorized_get(&[path], query)
            .await?
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", path))
    }
}

#[async_trait]
impl VideoPlatform for YoutubeClient {
    async fn list_my_channels(&self) -> Result<Vec<Channel>> {
        let response: ListResponse<Channel> = self
            .get_json("channels", &[("part", "contentDetails"), ("mine", "true")])
            .await?;

        tracing::debug!("Found {} channel(s)", response.items.len());
        Ok(response.items)
    }

    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<PlaylistItemPage> {
        let max_results = max_results.to_string();
        let mut query = vec![
            ("part", "snippet"),
            ("playlistId", playlist_id),
            ("maxResults", max_results.as_str()),
        ];
        if let Some(token) = page_token.as_deref() {
            query.push(("pageToken", token));
        }

        let response: ListResponse<PlaylistItem> = self.get_json("playlistItems", &query).await?;

        tracing::debug!(
            playlist_id,
            returned_items = response.items.len(),
            has_next = response.next_page_token.is_some(),
            "Fetched playlist page"
        );

        Ok(PlaylistItemPage {
            items: response.items,
            next_page_token: response.next_page_token,
        })
    }

    async fn list_captions(&self, video_id: &str) -> Result<Vec<CaptionTrack>> {
        let response: ListResponse<CaptionTrack> = self
            .get_json("captions", &[("part", "snippet"), ("videoId", video_id)])
            .await?;

        Ok(response.items)
    }

    async fn download_caption(&self, caption_id: &str, format: CaptionFormat) -> Result<Vec<u8>> {
        let response = self
            .authorized_get(&["captions", caption_id], &[("tfmt", format.as_tfmt())])
            .await?;

        let content = response
            .bytes()
            .await
            .with_context(|| format!("Failed to read caption {}", caption_id))?;

        Ok(content.to_vec())
    }
}
