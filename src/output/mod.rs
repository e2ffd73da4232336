use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::cli::CaptionFormat;

/// Lowercase the title and collapse every run of characters outside `[a-z0-9]` into one `_`
pub fn caption_file_stem(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut in_separator = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            stem.push(c.to_ascii_lowercase());
            in_separator = false;
        } else if !in_separator {
            stem.push('_');
            in_separator = true;
        }
    }

    stem
}

/// `<dir>/<stem>_<video id>.<ext>`
pub fn caption_path(dir: &Path, title: &str, video_id: &str, format: CaptionFormat) -> PathBuf {
    dir.join(format!(
        "{}_{}.{}",
        caption_file_stem(title),
        video_id,
        format.extension()
    ))
}

/// Save caption content, creating the directory and overwriting an existing file
pub async fn save_caption(
    dir: &Path,
    title: &str,
    video_id: &str,
    format: CaptionFormat,
    content: &[u8],
) -> Result<PathBuf> {
    fs_err::create_dir_all(dir)
        .with_context(|| format!("Failed to create output directory {}", dir.display()))?;

    let path = caption_path(dir, title, video_id, format);
    fs_err::write(&path, content)?;
    Ok(path)
}
