use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Duration;

use crate::platform::VideoPlatform;

pub mod captions;
pub mod enumerator;

pub use captions::CaptionFetcher;
pub use enumerator::{uploads_playlist_id, UploadEnumerator};

/// A video from the uploads playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoRef {
    pub id: String,
    pub title: String,
}

/// What happened to a single video
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// Caption written to this path
    Saved(PathBuf),
    /// The video has no caption tracks
    NoCaptions,
}

/// Totals of a harvest run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HarvestSummary {
    pub videos: usize,
    pub saved: usize,
    pub without_captions: usize,
    pub pages: usize,
}

/// Walks the uploads playlist and fetches captions for every video, strictly one at a time
pub struct Harvester<P> {
    platform: P,
    fetcher: CaptionFetcher,
    page_size: u32,
    show_progress: bool,
}

impl<P: VideoPlatform> Harvester<P> {
    pub fn new(platform: P, fetcher: CaptionFetcher, page_size: u32) -> Self {
        Self {
            platform,
            fetcher,
            page_size,
            show_progress: false,
        }
    }

    /// Show a spinner with the video currently being processed
    pub fn with_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub async fn run(&self) -> Result<HarvestSummary> {
        let mut uploads =
            UploadEnumerator::for_authenticated_user(&self.platform, self.page_size).await?;
        tracing::info!("Fetching captions for uploads playlist {}", uploads.playlist_id());

        let progress = self.progress_bar()?;
        let mut summary = HarvestSummary::default();

        while let Some(videos) = uploads.next_page().await? {
            for video in videos {
                progress.set_message(format!("Fetching captions for {}", video.title));

                let outcome = self
                    .fetcher
                    .fetch_with_progress(&self.platform, &video, &progress)
                    .await?;
                match outcome {
                    FetchOutcome::Saved(_) => summary.saved += 1,
                    FetchOutcome::NoCaptions => summary.without_captions += 1,
                }
                summary.videos += 1;
            }
        }
        summary.pages = uploads.pages_fetched();

        progress.finish_and_clear();
        tracing::info!(
            videos = summary.videos,
            saved = summary.saved,
            without_captions = summary.without_captions,
            pages = summary.pages,
            "Harvest complete"
        );

        Ok(summary)
    }

    fn progress_bar(&self) -> Result<ProgressBar> {
        if !self.show_progress {
            return Ok(ProgressBar::hidden());
        }

        let progress = ProgressBar::new_spinner();
        progress.set_style(ProgressStyle::with_template(
            "{spinner:.green} [{elapsed_precise}] {msg}",
        )?);
        progress.enable_steady_tick(Duration::from_millis(120));
        Ok(progress)
    }
}
