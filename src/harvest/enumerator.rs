use anyhow::Result;

use super::VideoRef;
use crate::platform::VideoPlatform;
use crate::HarvesterError;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Resolve the uploads playlist of the authenticated user's channel
pub async fn uploads_playlist_id<P: VideoPlatform + ?Sized>(platform: &P) -> Result<String> {
    let channels = platform.list_my_channels().await?;
    let channel = channels.first().ok_or(HarvesterError::NoChannel)?;

    let uploads = channel.uploads_playlist().ok_or_else(|| {
        HarvesterError::ConfigError(format!("channel {} has no uploads playlist", channel.id))
    })?;

    tracing::debug!("Uploads playlist of channel {} is {}", channel.id, uploads);
    Ok(uploads.to_string())
}

/// Pages through the uploads playlist one request at a time
pub struct UploadEnumerator<'a, P: ?Sized> {
    platform: &'a P,
    playlist_id: String,
    page_size: u32,
    cursor: Cursor,
    pages_fetched: usize,
}

impl<'a, P: VideoPlatform + ?Sized> UploadEnumerator<'a, P> {
    pub fn new(platform: &'a P, playlist_id: impl Into<String>, page_size: u32) -> Self {
        Self {
            platform,
            playlist_id: playlist_id.into(),
            page_size,
            cursor: Cursor::Start,
            pages_fetched: 0,
        }
    }

    /// Enumerator over the authenticated user's uploads
    pub async fn for_authenticated_user(platform: &'a P, page_size: u32) -> Result<Self> {
        let playlist_id = uploads_playlist_id(platform).await?;
        Ok(Self::new(platform, playlist_id, page_size))
    }

    pub fn playlist_id(&self) -> &str {
        &self.playlist_id
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Next page of videos in playlist order, or `None` once the last page was returned
    pub async fn next_page(&mut self) -> Result<Option<Vec<VideoRef>>> {
        let page_token = match std::mem::replace(&mut self.cursor, Cursor::Done) {
            Cursor::Done => return Ok(None),
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
        };

        let page = self
            .platform
            .list_playlist_items(&self.playlist_id, self.page_size, page_token)
            .await?;
        self.pages_fetched += 1;

        self.cursor = match page.next_page_token {
            Some(token) if !token.is_empty() => Cursor::Next(token),
            _ => Cursor::Done,
        };

        let videos = page
            .items
            .into_iter()
            .map(|item| VideoRef {
                id: item.snippet.resource_id.video_id,
                title: item.snippet.title,
            })
            .collect();

        Ok(Some(videos))
    }
}
