//! Conflict oracle against an Emby media library.
//!
//! Before placing a file, the orchestrator can ask whether the target
//! episode already exists in the library. The adapter is gated on the
//! `enabled` + `check_before_scrape` flags and degrades to "no conflict"
//! on any transport problem, so an unreachable Emby never blocks a scrape.

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::Config;
use crate::models::scrape::{ConflictCheckResult, ConflictType};

#[derive(Debug, Clone)]
pub struct ConflictCheckRequest {
    pub series_name: String,
    pub tmdb_id: Option<i64>,
    pub season: i32,
    pub episode: i32,
}

#[derive(Deserialize)]
struct ItemsResponse {
    #[serde(rename = "Items", default)]
    items: Vec<EmbyItem>,
}

#[derive(Deserialize)]
struct EmbyItem {
    #[serde(rename = "Id")]
    id: String,
    #[serde(rename = "Name", default)]
    name: String,
}

#[derive(Clone)]
pub struct EmbyClient {
    config: Arc<RwLock<Config>>,
}

impl EmbyClient {
    #[must_use]
    pub const fn new(config: Arc<RwLock<Config>>) -> Self {
        Self { config }
    }

    /// Checks the library for the requested episode. Returns
    /// `EpisodeExists` (blocking), `SeriesExists` (informational) or
    /// `NoConflict`.
    pub async fn check_conflict(&self, request: &ConflictCheckRequest) -> ConflictCheckResult {
        let emby = {
            let config = self.config.read().await;
            config.emby.clone()
        };

        if !emby.enabled || !emby.check_before_scrape {
            return ConflictCheckResult::default();
        }

        match self.lookup(&emby.base_url, &emby.api_key, request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Emby conflict check failed, assuming no conflict: {e}");
                ConflictCheckResult::default()
            }
        }
    }

    async fn lookup(
        &self,
        base_url: &str,
        api_key: &str,
        request: &ConflictCheckRequest,
    ) -> Result<ConflictCheckResult, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()?;

        let base = base_url.trim_end_matches('/');
        let url = format!("{base}/emby/Items");

        let mut query: Vec<(String, String)> = vec![
            ("api_key".to_string(), api_key.to_string()),
            ("IncludeItemTypes".to_string(), "Series".to_string()),
            ("Recursive".to_string(), "true".to_string()),
        ];
        if let Some(tmdb_id) = request.tmdb_id {
            query.push(("AnyProviderIdEquals".to_string(), format!("tmdb.{tmdb_id}")));
        } else {
            query.push(("SearchTerm".to_string(), request.series_name.clone()));
        }

        let series: ItemsResponse = client.get(&url).query(&query).send().await?.json().await?;
        let Some(found) = series.items.first() else {
            return Ok(ConflictCheckResult::default());
        };

        let season = request.season.to_string();
        let episode = request.episode.to_string();
        let episodes: ItemsResponse = client
            .get(&url)
            .query(&[
                ("api_key", api_key),
                ("ParentId", found.id.as_str()),
                ("IncludeItemTypes", "Episode"),
                ("Recursive", "true"),
                ("ParentIndexNumber", season.as_str()),
                ("IndexNumber", episode.as_str()),
            ])
            .send()
            .await?
            .json()
            .await?;

        if episodes.items.is_empty() {
            Ok(ConflictCheckResult {
                conflict_type: ConflictType::SeriesExists,
                message: Some(format!("Series already in library: {}", found.name)),
            })
        } else {
            Ok(ConflictCheckResult {
                conflict_type: ConflictType::EpisodeExists,
                message: Some(format!(
                    "Episode S{:02}E{:02} already in library: {}",
                    request.season, request.episode, found.name
                )),
            })
        }
    }
}
