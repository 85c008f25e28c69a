//! Artwork downloads: series poster/backdrop and episode stills.
//!
//! Every download checks for an existing file first and skips on hit, so
//! re-scraping a series never re-fetches its images. One failed image never
//! aborts the rest of a batch.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use crate::constants::tmdb::IMAGE_BASE_URL;
use crate::models::tmdb::{Season, Series};

pub struct ImageService {
    client: reqwest::Client,
    base_url: String,
}

impl Default for ImageService {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageService {
    #[must_use]
    pub fn new() -> Self {
        Self::with_base_url(IMAGE_BASE_URL.to_string())
    }

    /// Point the fetcher at a different CDN root (tests).
    #[must_use]
    pub fn with_base_url(base_url: String) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent("seriarr/0.1")
                .timeout(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            base_url,
        }
    }

    /// Full CDN URL for a TMDB image path. `size` is one of the CDN sizes
    /// (`w500`, `original`, ...).
    #[must_use]
    pub fn image_url(&self, path: &str, size: &str) -> String {
        format!("{}/{size}{path}", self.base_url)
    }

    pub async fn download(&self, url: &str, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("Image request failed: {url}"))?;
        let response = response
            .error_for_status()
            .with_context(|| format!("Image request rejected: {url}"))?;
        let bytes = response.bytes().await?;

        tokio::fs::write(target, &bytes)
            .await
            .with_context(|| format!("Failed to write image to {}", target.display()))?;

        info!("Image saved: {}", target.display());
        Ok(())
    }

    /// Downloads poster and/or backdrop into the series metadata folder.
    /// Existing files are left alone. Returns (succeeded, failed) counts.
    pub async fn download_series_images(
        &self,
        series: &Series,
        series_folder: &Path,
        poster: bool,
        fanart: bool,
    ) -> (usize, usize) {
        let mut jobs: Vec<(&str, &Path)> = Vec::new();

        let poster_target = series_folder.join("poster.jpg");
        let backdrop_target = series_folder.join("backdrop.jpg");

        let mut poster_url = None;
        if poster && !poster_target.exists() {
            poster_url = series.poster_path.as_deref();
        }
        let mut backdrop_url = None;
        if fanart && !backdrop_target.exists() {
            backdrop_url = series.backdrop_path.as_deref();
        }

        if let Some(path) = poster_url {
            jobs.push((path, poster_target.as_path()));
        }
        if let Some(path) = backdrop_url {
            jobs.push((path, backdrop_target.as_path()));
        }

        if jobs.is_empty() {
            info!("Series images already present or disabled, skipping");
            return (0, 0);
        }

        let mut succeeded = 0;
        let mut failed = 0;
        for (image_path, target) in jobs {
            let url = self.image_url(image_path, "original");
            match self.download(&url, target).await {
                Ok(()) => succeeded += 1,
                Err(e) => {
                    warn!("Image download failed: {e:#}");
                    failed += 1;
                }
            }
        }

        (succeeded, failed)
    }

    /// Downloads the still of one episode as `<video stem>.jpg` into the
    /// season metadata folder. Skips when there is no still or the file
    /// already exists.
    pub async fn download_episode_still(
        &self,
        season_detail: Option<&Season>,
        season_number: i32,
        episode_number: i32,
        season_folder: &Path,
        video_stem: &str,
    ) -> Result<bool> {
        let Some(still_path) = season_detail
            .and_then(|s| s.episodes.as_ref())
            .and_then(|eps| eps.iter().find(|e| e.episode_number == episode_number))
            .and_then(|e| e.still_path.as_deref())
        else {
            info!("S{season_number:02}E{episode_number:02} has no still image");
            return Ok(false);
        };

        let target = season_folder.join(format!("{video_stem}.jpg"));
        if target.exists() {
            info!("Episode still already present: {}", target.display());
            return Ok(false);
        }

        let url = self.image_url(still_path, "original");
        self.download(&url, &target).await?;
        Ok(true)
    }
}
