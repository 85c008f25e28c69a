//! NFO sidecar generation.
//!
//! Pure functions from TMDB records to Kodi/Emby-style XML documents.
//! Writing (and the only-if-absent policy for `tvshow.nfo`/`season.nfo`)
//! is the orchestrator's responsibility.

use serde::Serialize;
use thiserror::Error;

use crate::config::MetadataConfig;
use crate::constants::tmdb::IMAGE_BASE_URL;
use crate::models::tmdb::{Season, Series};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\" standalone=\"yes\"?>\n";

#[derive(Debug, Error)]
pub enum NfoError {
    #[error("NFO serialization failed: {0}")]
    Serialize(#[from] quick_xml::SeError),
}

#[derive(Debug, Serialize)]
#[serde(rename = "tvshow")]
struct TvShowDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    originaltitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiered: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    tmdbid: i64,
    genre: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "season")]
struct SeasonDoc {
    title: String,
    seasonnumber: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    premiered: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename = "episodedetails")]
struct EpisodeDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    showtitle: String,
    season: i32,
    episode: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    plot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    aired: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<f64>,
    tmdbid: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    thumb: Option<String>,
}

fn render<T: Serialize>(doc: &T) -> Result<String, NfoError> {
    let body = quick_xml::se::to_string(doc)?;
    Ok(format!("{XML_DECLARATION}{body}"))
}

pub fn tvshow_nfo(series: &Series, meta: &MetadataConfig) -> Result<String, NfoError> {
    let doc = TvShowDoc {
        title: meta.scrape_title.then(|| series.name.clone()),
        originaltitle: series.original_name.clone(),
        plot: if meta.scrape_plot {
            series.overview.clone()
        } else {
            None
        },
        premiered: series.first_air_date.map(|d| d.to_string()),
        year: series.year(),
        rating: series.vote_average,
        tmdbid: series.id,
        genre: series.genres.clone(),
        status: series.status.clone(),
    };

    render(&doc)
}

pub fn season_nfo(series: &Series, season_number: i32) -> Result<String, NfoError> {
    let season = series.season(season_number);

    let title = season
        .map(|s| s.name.clone())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| format!("Season {season_number}"));

    let doc = SeasonDoc {
        title,
        seasonnumber: season_number,
        plot: season.and_then(|s| s.overview.clone()),
        premiered: season.and_then(|s| s.air_date).map(|d| d.to_string()),
    };

    render(&doc)
}

pub fn episode_nfo(
    series: &Series,
    season_number: i32,
    episode_number: i32,
    season_detail: Option<&Season>,
    meta: &MetadataConfig,
) -> Result<String, NfoError> {
    let episode = season_detail
        .and_then(|s| s.episodes.as_ref())
        .and_then(|eps| eps.iter().find(|e| e.episode_number == episode_number));

    let title = if meta.scrape_title {
        Some(
            episode
                .map(|e| e.name.clone())
                .filter(|name| !name.is_empty())
                .unwrap_or_else(|| format!("Episode {episode_number}")),
        )
    } else {
        None
    };

    let doc = EpisodeDoc {
        title,
        showtitle: series.name.clone(),
        season: season_number,
        episode: episode_number,
        plot: if meta.scrape_plot {
            episode.and_then(|e| e.overview.clone())
        } else {
            None
        },
        aired: episode.and_then(|e| e.air_date).map(|d| d.to_string()),
        rating: episode.and_then(|e| e.vote_average),
        tmdbid: series.id,
        thumb: episode
            .and_then(|e| e.still_path.as_deref())
            .map(|path| format!("{IMAGE_BASE_URL}/original{path}")),
    };

    render(&doc)
}
