use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub mod youtube;

pub use youtube::YoutubeClient;

use crate::cli::CaptionFormat;
use crate::Result;

/// A channel owned by the authenticated user
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: String,

    #[serde(default)]
    pub content_details: Option<ChannelContentDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelContentDetails {
    pub related_playlists: RelatedPlaylists,
}

/// Platform-managed playlists of a channel
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedPlaylists {
    #[serde(default)]
    pub uploads: Option<String>,
}

impl Channel {
    pub fn uploads_playlist(&self) -> Option<&str> {
        self.content_details
            .as_ref()
            .and_then(|details| details.related_playlists.uploads.as_deref())
    }
}

/// One entry of a playlist
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItem {
    pub snippet: PlaylistItemSnippet,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaylistItemSnippet {
    #[serde(default)]
    pub title: String,
    pub resource_id: ResourceId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceId {
    #[serde(default)]
    pub video_id: String,
}

impl PlaylistItem {
    pub fn new(video_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            snippet: PlaylistItemSnippet {
                title: title.into(),
                resource_id: ResourceId {
                    video_id: video_id.into(),
                },
            },
        }
    }
}

/// A single page of `playlistItems.list`
#[derive(Debug, Clone, Default)]
pub struct PlaylistItemPage {
    pub items: Vec<PlaylistItem>,
    /// Cursor for the following page, absent on the last one
    pub next_page_token: Option<String>,
}

/// A caption track attached to a video
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub id: String,

    #[serde(default)]
    pub snippet: Option<CaptionSnippet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionSnippet {
    #[serde(default)]
    pub language: String,
    /// `standard`, `asr` or `forced`
    #[serde(default)]
    pub track_kind: String,
    #[serde(default)]
    pub name: String,
}

impl CaptionTrack {
    pub fn language(&self) -> &str {
        self.snippet.as_ref().map_or("", |s| s.language.as_str())
    }

    pub fn kind(&self) -> &str {
        self.snippet.as_ref().map_or("", |s| s.track_kind.as_str())
    }
}

/// The video platform calls the harvester depends on
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoPlatform: Send + Sync {
    /// Channels of the authenticated user, with content details
    async fn list_my_channels(&self) -> Result<Vec<Channel>>;

    /// One page of a playlist, continuing from `page_token` when given
    async fn list_playlist_items(
        &self,
        playlist_id: &str,
        max_results: u32,
        page_token: Option<String>,
    ) -> Result<PlaylistItemPage>;

    /// Caption tracks of a video in platform order
    async fn list_captions(&self, video_id: &str) -> Result<Vec<CaptionTrack>>;

    /// Raw content of a caption track in the requested encoding
    async fn download_caption(&self, caption_id: &str, format: CaptionFormat) -> Result<Vec<u8>>;
}
