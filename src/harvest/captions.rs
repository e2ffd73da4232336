use anyhow::Result;
use indicatif::ProgressBar;
use std::path::PathBuf;

use super::{FetchOutcome, VideoRef};
use crate::cli::CaptionFormat;
use crate::output;
use crate::platform::VideoPlatform;
use crate::utils::format_file_size;

/// Downloads the first caption track of a video into the output directory
#[derive(Debug, Clone)]
pub struct CaptionFetcher {
    output_dir: PathBuf,
    format: CaptionFormat,
}

impl CaptionFetcher {
    pub fn new(output_dir: impl Into<PathBuf>, format: CaptionFormat) -> Self {
        Self {
            output_dir: output_dir.into(),
            format,
        }
    }

    /// Fetch captions for one video. A video without captions is not an error.
    pub async fn fetch<P: VideoPlatform + ?Sized>(
        &self,
        platform: &P,
        video: &VideoRef,
    ) -> Result<FetchOutcome> {
        self.fetch_with_progress(platform, video, &ProgressBar::hidden())
            .await
    }

    /// Same as [`CaptionFetcher::fetch`], hiding `progress` while a result is logged
    pub async fn fetch_with_progress<P: VideoPlatform + ?Sized>(
        &self,
        platform: &P,
        video: &VideoRef,
        progress: &ProgressBar,
    ) -> Result<FetchOutcome> {
        let tracks = platform.list_captions(&video.id).await?;

        // Always the first track, in the order the platform returned them.
        let Some(track) = tracks.into_iter().next() else {
            progress.suspend(|| tracing::info!("No captions available {}", video.id));
            return Ok(FetchOutcome::NoCaptions);
        };

        tracing::debug!(
            video_id = %video.id,
            caption_id = %track.id,
            language = track.language(),
            kind = track.kind(),
            "Downloading caption track"
        );

        let content = platform.download_caption(&track.id, self.format).await?;
        let path = output::save_caption(
            &self.output_dir,
            &video.title,
            &video.id,
            self.format,
            &content,
        )
        .await?;

        progress.suspend(|| {
            tracing::info!(
                "Captions saved to {} ({})",
                path.display(),
                format_file_size(content.len() as u64)
            )
        });
        Ok(FetchOutcome::Saved(path))
    }
}
