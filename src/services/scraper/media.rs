//! Media-side helpers for the scrape pipeline: candidate enrichment,
//! sidecar writes, artwork and conflict lookups.

use anyhow::Result;
use std::path::Path;
use tracing::warn;

use super::{ScraperService, StepLog};
use crate::clients::emby::ConflictCheckRequest;
use crate::config::{DownloadConfig, MetadataConfig};
use crate::models::scrape::{ConflictCheckResult, ScrapeLogEntry, ScrapeResult};
use crate::models::tmdb::{SearchResult, Season, Series};
use crate::services::nfo;

impl ScraperService {
    /// Fetches series details for every candidate so a selection prompt can
    /// show season/episode counts. Detail failures leave the candidate as
    /// returned by the search.
    pub(super) async fn enrich_search_results(
        &self,
        results: Vec<SearchResult>,
    ) -> Vec<SearchResult> {
        let mut enriched = Vec::with_capacity(results.len());

        for mut result in results {
            match self.tmdb.get_series(result.id, None).await {
                Ok(Some(series)) => {
                    result.number_of_seasons = series.number_of_seasons;
                    result.number_of_episodes = series.number_of_episodes;
                }
                Ok(None) => {}
                Err(e) => warn!("Candidate enrichment failed for {}: {e}", result.id),
            }
            enriched.push(result);
        }

        enriched
    }

    pub(super) async fn check_conflict(
        &self,
        series_name: &str,
        tmdb_id: i64,
        season: i32,
        episode: i32,
    ) -> ConflictCheckResult {
        self.emby
            .check_conflict(&ConflictCheckRequest {
                series_name: series_name.to_string(),
                tmdb_id: Some(tmdb_id),
                season,
                episode,
            })
            .await
    }

    /// Writes the episode NFO (always) and `tvshow.nfo`/`season.nfo` (only
    /// when absent) into the metadata folders.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn write_sidecars(
        &self,
        result: &mut ScrapeResult,
        log: &mut StepLog,
        step: usize,
        series: &Series,
        season: i32,
        nfo_content: &str,
        dest_file: &Path,
        metadata_series_folder: &Path,
        metadata_season_folder: &Path,
        meta: &MetadataConfig,
    ) -> Result<()> {
        tokio::fs::create_dir_all(metadata_season_folder).await?;

        let stem = dest_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let nfo_path = metadata_season_folder.join(format!("{stem}.nfo"));
        tokio::fs::write(&nfo_path, nfo_content).await?;
        result.nfo_path = Some(nfo_path.to_string_lossy().to_string());
        log.push(step, ScrapeLogEntry::info(format!("NFO written: {}", nfo_path.display())));

        let tvshow_path = metadata_series_folder.join("tvshow.nfo");
        if !tvshow_path.exists() {
            tokio::fs::create_dir_all(metadata_series_folder).await?;
            let content = nfo::tvshow_nfo(series, meta)?;
            tokio::fs::write(&tvshow_path, content).await?;
            log.push(step, ScrapeLogEntry::info("tvshow.nfo generated"));
        }

        let season_path = metadata_season_folder.join("season.nfo");
        if !season_path.exists() {
            let content = nfo::season_nfo(series, season)?;
            tokio::fs::write(&season_path, content).await?;
            log.push(step, ScrapeLogEntry::info("season.nfo generated"));
        }

        Ok(())
    }

    /// Runs the artwork downloads that the effective download config asks
    /// for. Never fatal; the returned entries describe what happened.
    #[allow(clippy::too_many_arguments)]
    pub(super) async fn artwork_entries(
        &self,
        series: &Series,
        season_detail: Option<&Season>,
        season: i32,
        episode: i32,
        metadata_series_folder: &Path,
        metadata_season_folder: &Path,
        video_stem: &str,
        download: &DownloadConfig,
    ) -> Vec<ScrapeLogEntry> {
        let mut entries = Vec::new();

        if download.download_poster || download.download_fanart {
            let (_, failed) = self
                .images
                .download_series_images(
                    series,
                    metadata_series_folder,
                    download.download_poster,
                    download.download_fanart,
                )
                .await;
            if failed > 0 {
                entries.push(ScrapeLogEntry::warning(format!(
                    "Series artwork finished with {failed} failed download(s)"
                )));
            } else {
                entries.push(ScrapeLogEntry::info("Series artwork processed"));
            }
        } else {
            entries.push(ScrapeLogEntry::info("Series artwork skipped (disabled)"));
        }

        if download.download_thumb {
            match self
                .images
                .download_episode_still(
                    season_detail,
                    season,
                    episode,
                    metadata_season_folder,
                    video_stem,
                )
                .await
            {
                Ok(_) => entries.push(ScrapeLogEntry::info("Episode still processed")),
                Err(e) => entries.push(ScrapeLogEntry::warning(format!(
                    "Episode still download failed: {e:#}"
                ))),
            }
        } else {
            entries.push(ScrapeLogEntry::info("Episode still skipped (disabled)"));
        }

        entries
    }
}
