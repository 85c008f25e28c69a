//! The per-file scrape orchestrator.
//!
//! Composes parser, TMDB client, conflict oracle, sidecar writer,
//! placement engine, artwork fetcher and subtitle matcher into one state
//! machine. Every step appends to a structured log that can be streamed to
//! the caller while the scrape runs; the first fatal step marks itself
//! `completed = false` and terminates the pipeline with its status.

pub mod media;
pub mod settings;

use futures::future::BoxFuture;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tokio::sync::RwLock;
use tracing::warn;

use crate::clients::emby::EmbyClient;
use crate::clients::tmdb::{TmdbClient, TmdbError};
use crate::config::Config;
use crate::models::rename::RenameRequest;
use crate::models::scrape::{
    ConflictType, LinkMode, ScrapeByIdRequest, ScrapeLogEntry, ScrapeLogStep, ScrapePreview,
    ScrapeRequest, ScrapeResult, ScrapeStatus,
};
use crate::models::tmdb::{SearchResult, Season, Series};
use crate::parser::Parser;
use crate::services::image::ImageService;
use crate::services::nfo;
use crate::services::rename::{RenameError, RenameService};
use crate::services::subtitle::SubtitleService;

pub use settings::ResolvedSettings;

/// Streaming callback: invoked with the accumulated steps after every log
/// append, so callers can render live progress.
pub type LogUpdateCallback =
    Arc<dyn Fn(Vec<ScrapeLogStep>) -> BoxFuture<'static, ()> + Send + Sync>;

static SEASON_FOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn season_folder_re() -> &'static Regex {
    SEASON_FOLDER_RE
        .get_or_init(|| Regex::new(r"^[Ss]eason\s*\d+$|^[Ss]\d{1,2}$").expect("valid regex"))
}

/// In-place organizing reuses the move path with a computed output root:
/// two levels above the file when its parent is a Season folder, else one.
/// The renamed series tree then appears as a sibling of the original.
fn resolve_inplace_output_dir(file_path: &str) -> String {
    let path = Path::new(file_path);
    let parent = path.parent().unwrap_or_else(|| Path::new("."));

    let is_season_folder = parent
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|name| season_folder_re().is_match(name));

    let root = if is_season_folder {
        parent.parent().and_then(Path::parent)
    } else {
        parent.parent()
    };

    root.unwrap_or_else(|| Path::new("."))
        .to_string_lossy()
        .to_string()
}

/// Accumulated step logs plus the optional streaming callback.
pub(crate) struct StepLog {
    steps: Vec<ScrapeLogStep>,
    callback: Option<LogUpdateCallback>,
}

impl StepLog {
    fn new(callback: Option<LogUpdateCallback>) -> Self {
        Self {
            steps: Vec::new(),
            callback,
        }
    }

    fn begin(&mut self, name: impl Into<String>) -> usize {
        self.steps.push(ScrapeLogStep::new(name));
        self.steps.len() - 1
    }

    fn push(&mut self, step: usize, entry: ScrapeLogEntry) {
        self.steps[step].logs.push(entry);
    }

    fn fail(&mut self, step: usize) {
        self.steps[step].completed = false;
    }

    async fn notify(&self) {
        if let Some(callback) = &self.callback {
            callback(self.steps.clone()).await;
        }
    }

    fn take(&mut self) -> Vec<ScrapeLogStep> {
        std::mem::take(&mut self.steps)
    }
}

struct PlacementContext<'a> {
    file_path: &'a str,
    output_dir: Option<String>,
    metadata_dir: Option<String>,
    link_mode: LinkMode,
    settings: &'a ResolvedSettings,
}

pub struct ScraperService {
    config: Arc<RwLock<Config>>,
    parser: Parser,
    tmdb: TmdbClient,
    emby: EmbyClient,
    images: ImageService,
    subtitles: SubtitleService,
}

impl ScraperService {
    #[must_use]
    pub fn new(config: Arc<RwLock<Config>>, tmdb: TmdbClient, emby: EmbyClient) -> Self {
        Self {
            config,
            parser: Parser::new(),
            tmdb,
            emby,
            images: ImageService::new(),
            subtitles: SubtitleService::new(),
        }
    }

    /// Redirect artwork downloads to a different CDN root (tests).
    #[must_use]
    pub fn with_image_base_url(mut self, base_url: String) -> Self {
        self.images = ImageService::with_base_url(base_url);
        self
    }

    /// Parse + search without side effects.
    pub async fn preview(&self, file_path: &str) -> ScrapePreview {
        let filename = Path::new(file_path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_path);
        let parsed = self.parser.parse(filename, Some(file_path));

        let mut preview = ScrapePreview {
            file_path: file_path.to_string(),
            parsed_title: parsed.series_name.clone(),
            parsed_season: parsed.season,
            parsed_episode: parsed.episode,
            search_results: Vec::new(),
        };

        if let Some(tmdb_id) = parsed.tmdb_id {
            if let Ok(Some(series)) = self.tmdb.get_series(tmdb_id, None).await {
                preview.search_results = vec![SearchResult {
                    id: series.id,
                    name: series.name,
                    original_name: series.original_name,
                    first_air_date: series.first_air_date,
                    poster_path: series.poster_path,
                    overview: series.overview,
                    vote_average: series.vote_average,
                    // A path-pinned id is trusted without a search round-trip.
                    adult: true,
                    number_of_seasons: series.number_of_seasons,
                    number_of_episodes: series.number_of_episodes,
                }];
            }
        } else if let Some(series_name) = &parsed.series_name
            && let Ok(response) = self.tmdb.search_with_fallback(series_name, None).await
        {
            preview.search_results = response.results;
        }

        preview
    }

    /// Full scrape workflow for a single file.
    #[allow(clippy::too_many_lines)]
    pub async fn scrape_file(
        &self,
        request: &ScrapeRequest,
        on_log_update: Option<LogUpdateCallback>,
    ) -> ScrapeResult {
        let file_path = request.file_path.as_str();
        let path = Path::new(file_path);

        if !path.exists() {
            let mut result = ScrapeResult::new(file_path);
            result.status = ScrapeStatus::MoveFailed;
            result.message = format!("File not found: {file_path}");
            return result;
        }

        let settings = {
            let config = self.config.read().await;
            ResolvedSettings::resolve(&config, request.advanced_settings.as_ref())
        };

        let mut log = StepLog::new(on_log_update);

        // Step 1: parse the filename (and its folders).
        let parse_step = log.begin("Parse filename");
        log.push(parse_step, ScrapeLogEntry::info(format!("Video file: {file_path}")));

        let filename = path.file_name().and_then(|n| n.to_str()).unwrap_or(file_path);
        let parsed = self.parser.parse(filename, Some(file_path));
        let mut result = ScrapeResult::from_parsed(file_path, &parsed);

        if parsed.series_name.is_none() && parsed.tmdb_id.is_none() {
            let message = "Could not extract a series from the filename or parent folders";
            log.push(parse_step, ScrapeLogEntry::error(message));
            log.fail(parse_step);
            log.notify().await;
            result.status = ScrapeStatus::NoMatch;
            result.message = message.to_string();
            result.scrape_logs = log.take();
            return result;
        }

        let season_text = parsed.season.map_or("?".to_string(), |s| s.to_string());
        let episode_text = parsed.episode.map_or("?".to_string(), |e| e.to_string());
        if let Some(tmdb_id) = parsed.tmdb_id {
            log.push(
                parse_step,
                ScrapeLogEntry::info(format!(
                    "TMDB id {tmdb_id} from path, series: {}, S{season_text}E{episode_text}",
                    parsed.series_name.as_deref().unwrap_or("unknown")
                )),
            );
        } else {
            log.push(
                parse_step,
                ScrapeLogEntry::info(format!(
                    "Parsed: {} S{season_text}E{episode_text}",
                    parsed.series_name.as_deref().unwrap_or_default()
                )),
            );
        }
        log.notify().await;

        // Step 2: resolve the TMDB candidate (direct id or search).
        if let Some(tmdb_id) = parsed.tmdb_id {
            let search_step = log.begin("Search TMDB");
            log.push(
                search_step,
                ScrapeLogEntry::info(format!("Using TMDB id {tmdb_id} from path, search skipped")),
            );
            log.notify().await;
            result.selected_id = Some(tmdb_id);
        } else {
            let series_name = parsed
                .series_name
                .clone()
                .unwrap_or_default();
            let search_step = log.begin("Search TMDB");
            log.push(search_step, ScrapeLogEntry::info(format!("Query: {series_name}")));
            log.notify().await;

            let response = match self.tmdb.search_with_fallback(&series_name, None).await {
                Ok(response) => response,
                Err(e) => {
                    let message = match &e {
                        TmdbError::Timeout(_) => {
                            "TMDB search timed out - check network or proxy".to_string()
                        }
                        _ => format!("TMDB search failed: {e}"),
                    };
                    log.push(search_step, ScrapeLogEntry::error(message.clone()));
                    log.fail(search_step);
                    log.notify().await;
                    result.status = ScrapeStatus::SearchFailed;
                    result.message = message;
                    result.scrape_logs = log.take();
                    return result;
                }
            };

            if let Some(effective) = &response.effective_query {
                log.push(
                    search_step,
                    ScrapeLogEntry::info(format!("Fallback query matched: {effective}")),
                );
            }
            result.effective_query = response.effective_query.clone();

            let adult_results: Vec<SearchResult> =
                response.results.into_iter().filter(|r| r.adult).collect();
            log.push(
                search_step,
                ScrapeLogEntry::info(format!("Found {} matching result(s)", adult_results.len())),
            );
            log.notify().await;

            if adult_results.is_empty() {
                log.push(
                    search_step,
                    ScrapeLogEntry::warning("No matching adult series found"),
                );
                log.fail(search_step);
                log.notify().await;
                result.status = ScrapeStatus::NoMatch;
                result.message = format!("No matching adult series found: {series_name}");
                result.scrape_logs = log.take();
                return result;
            }

            // Step 3: candidate selection.
            result.search_results = adult_results.clone();

            if request.auto_select && adult_results.len() == 1 {
                let selected = &adult_results[0];
                log.push(
                    search_step,
                    ScrapeLogEntry::info(format!(
                        "Auto-selected: {} ({})",
                        selected.name, selected.id
                    )),
                );
                log.notify().await;
                result.selected_id = Some(selected.id);
            } else {
                log.push(
                    search_step,
                    ScrapeLogEntry::info("Fetching details for each candidate..."),
                );
                log.notify().await;

                result.search_results = self.enrich_search_results(adult_results).await;
                result.status = ScrapeStatus::NeedSelection;
                result.message = if request.auto_select {
                    format!(
                        "Found {} matching results, manual selection required",
                        result.search_results.len()
                    )
                } else {
                    "Manual selection required".to_string()
                };
                result.scrape_logs = log.take();
                return result;
            }
        }

        let selected_id = result.selected_id.expect("candidate resolved above");

        // Step 4: fetch series details.
        let detail_step = log.begin("Fetch details");
        log.push(
            detail_step,
            ScrapeLogEntry::info(format!("Fetching series details: TMDB id {selected_id}")),
        );
        log.notify().await;

        let series = match self.tmdb.get_series(selected_id, None).await {
            Ok(Some(series)) => series,
            Ok(None) => {
                let message = format!("Could not fetch series details: id {selected_id}");
                log.push(detail_step, ScrapeLogEntry::error(message.clone()));
                log.fail(detail_step);
                log.notify().await;
                result.status = ScrapeStatus::ApiFailed;
                result.message = message;
                result.scrape_logs = log.take();
                return result;
            }
            Err(e) => {
                let message = match &e {
                    TmdbError::Timeout(_) => "TMDB API request timed out".to_string(),
                    _ => format!("TMDB API request failed: {e}"),
                };
                log.push(detail_step, ScrapeLogEntry::error(message.clone()));
                log.fail(detail_step);
                log.notify().await;
                result.status = ScrapeStatus::ApiFailed;
                result.message = message;
                result.scrape_logs = log.take();
                return result;
            }
        };
        result.series_info = Some(series.clone());
        log.push(detail_step, ScrapeLogEntry::info(format!("Series: {}", series.name)));
        log.notify().await;

        // Step 5: determine season and episode.
        let season_num = parsed.season.unwrap_or(1);
        let select_step = log.begin("Determine season/episode");

        let episode_num = if let Some(episode) = parsed.episode {
            if parsed.season.is_some() {
                log.push(
                    select_step,
                    ScrapeLogEntry::info(format!("From filename: S{season_num:02}E{episode:02}")),
                );
            } else {
                log.push(
                    select_step,
                    ScrapeLogEntry::info(format!(
                        "Auto-selected: S{season_num:02}E{episode:02} (season defaulted to 1)"
                    )),
                );
            }
            log.notify().await;
            episode
        } else {
            let total_episodes = series.number_of_episodes.unwrap_or(0);
            if total_episodes <= 1 {
                log.push(
                    select_step,
                    ScrapeLogEntry::info(
                        "Series has a single episode, auto-selected E01".to_string(),
                    ),
                );
                log.notify().await;
                1
            } else {
                // Populate the season's episode list so the caller can offer
                // a picker.
                match self.tmdb.get_season(selected_id, season_num, None).await {
                    Ok(Some(detail)) => {
                        if let Some(series_info) = result.series_info.as_mut()
                            && let Some(slot) = series_info
                                .seasons
                                .iter_mut()
                                .find(|s| s.season_number == season_num)
                        {
                            *slot = detail;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => warn!("Season detail fetch failed: {e}"),
                }

                let message =
                    format!("Series has {total_episodes} episodes, manual selection required");
                log.push(select_step, ScrapeLogEntry::warning(message.clone()));
                log.fail(select_step);
                log.notify().await;
                result.status = ScrapeStatus::NeedSeasonEpisode;
                result.message = message;
                result.scrape_logs = log.take();
                return result;
            }
        };

        // Step 6: season detail for episode titles and stills. Non-fatal.
        let season_detail = match self.tmdb.get_season(selected_id, season_num, None).await {
            Ok(detail) => detail,
            Err(e) => {
                warn!("Season detail fetch failed: {e}");
                None
            }
        };

        // Step 7: library conflict check.
        let conflict_step = log.begin("Library conflict check");
        let conflict = self
            .check_conflict(&series.name, selected_id, season_num, episode_num)
            .await;
        match conflict.conflict_type {
            ConflictType::EpisodeExists => {
                let message = conflict
                    .message
                    .clone()
                    .unwrap_or_else(|| "Episode already in library".to_string());
                log.push(conflict_step, ScrapeLogEntry::warning(message.clone()));
                log.fail(conflict_step);
                log.notify().await;
                result.status = ScrapeStatus::MdbConflict;
                result.message = message;
                result.emby_conflict = Some(conflict);
                result.scrape_logs = log.take();
                return result;
            }
            ConflictType::SeriesExists => {
                log.push(
                    conflict_step,
                    ScrapeLogEntry::success(
                        conflict
                            .message
                            .clone()
                            .unwrap_or_else(|| "Series already in library".to_string()),
                    ),
                );
            }
            ConflictType::NoConflict => {
                log.push(conflict_step, ScrapeLogEntry::info("No conflict"));
            }
        }
        log.notify().await;

        // Steps 8..: NFO, placement, sidecars, artwork, subtitles.
        let ctx = PlacementContext {
            file_path,
            output_dir: request.output_dir.clone(),
            metadata_dir: request.metadata_dir.clone(),
            link_mode: request.link_mode,
            settings: &settings,
        };
        let finished = self
            .finish_scrape(
                &mut result,
                &mut log,
                &series,
                season_num,
                episode_num,
                season_detail.as_ref(),
                &ctx,
            )
            .await;
        if !finished {
            result.scrape_logs = log.take();
            return result;
        }

        result.parsed_season = Some(season_num);
        result.parsed_episode = Some(episode_num);
        result.status = ScrapeStatus::Success;
        result.message = "Scrape complete".to_string();
        log.notify().await;
        result.scrape_logs = log.take();
        result
    }

    /// Scrape with a caller-supplied TMDB id and explicit season/episode.
    /// Used after `need_selection`/`need_season_episode` or when search has
    /// nothing to work with.
    pub async fn scrape_by_id(
        &self,
        request: &ScrapeByIdRequest,
        on_log_update: Option<LogUpdateCallback>,
    ) -> ScrapeResult {
        let file_path = request.file_path.as_str();

        if !Path::new(file_path).exists() {
            let mut result = ScrapeResult::new(file_path);
            result.status = ScrapeStatus::MoveFailed;
            result.message = format!("File not found: {file_path}");
            return result;
        }

        let settings = {
            let config = self.config.read().await;
            ResolvedSettings::resolve(&config, request.advanced_settings.as_ref())
        };

        let mut log = StepLog::new(on_log_update);
        let mut result = ScrapeResult::new(file_path);
        result.selected_id = Some(request.tmdb_id);
        result.parsed_season = Some(request.season);
        result.parsed_episode = Some(request.episode);

        let detail_step = log.begin("Fetch details");
        log.push(
            detail_step,
            ScrapeLogEntry::info(format!(
                "TMDB id: {}, S{:02}E{:02}",
                request.tmdb_id, request.season, request.episode
            )),
        );
        log.notify().await;

        let series = match self.tmdb.get_series(request.tmdb_id, None).await {
            Ok(Some(series)) => series,
            Ok(None) => {
                let message = format!("Could not fetch series details: id {}", request.tmdb_id);
                log.push(detail_step, ScrapeLogEntry::error(message.clone()));
                log.fail(detail_step);
                log.notify().await;
                result.status = ScrapeStatus::ApiFailed;
                result.message = message;
                result.scrape_logs = log.take();
                return result;
            }
            Err(e) => {
                let message = format!("TMDB API request failed: {e}");
                log.push(detail_step, ScrapeLogEntry::error(message.clone()));
                log.fail(detail_step);
                log.notify().await;
                result.status = ScrapeStatus::ApiFailed;
                result.message = message;
                result.scrape_logs = log.take();
                return result;
            }
        };
        result.series_info = Some(series.clone());
        log.push(detail_step, ScrapeLogEntry::info(format!("Series: {}", series.name)));

        let season_detail = match self
            .tmdb
            .get_season(request.tmdb_id, request.season, None)
            .await
        {
            Ok(detail) => {
                let episode_count = detail
                    .as_ref()
                    .and_then(|d| d.episodes.as_ref())
                    .map_or(0, Vec::len);
                log.push(
                    detail_step,
                    ScrapeLogEntry::info(format!("Season detail: {episode_count} episode(s)")),
                );
                detail
            }
            Err(e) => {
                warn!("Season detail fetch failed: {e}");
                None
            }
        };
        log.notify().await;

        let ctx = PlacementContext {
            file_path,
            output_dir: request.output_dir.clone(),
            metadata_dir: request.metadata_dir.clone(),
            link_mode: request.link_mode,
            settings: &settings,
        };
        let finished = self
            .finish_scrape(
                &mut result,
                &mut log,
                &series,
                request.season,
                request.episode,
                season_detail.as_ref(),
                &ctx,
            )
            .await;
        if !finished {
            result.scrape_logs = log.take();
            return result;
        }

        result.status = ScrapeStatus::Success;
        result.message = "Scrape complete".to_string();
        log.notify().await;
        result.scrape_logs = log.take();
        result
    }

    /// Shared pipeline tail: NFO generation, placement, sidecar writes,
    /// artwork and subtitles. Returns false when a terminal failure has
    /// been recorded on `result`.
    #[allow(clippy::too_many_lines)]
    async fn finish_scrape(
        &self,
        result: &mut ScrapeResult,
        log: &mut StepLog,
        series: &Series,
        season: i32,
        episode: i32,
        season_detail: Option<&Season>,
        ctx: &PlacementContext<'_>,
    ) -> bool {
        // Generate the episode NFO body first so placement never happens
        // for a file we cannot describe.
        let nfo_step = log.begin("Generate NFO");
        let nfo_content = match nfo::episode_nfo(
            series,
            season,
            episode,
            season_detail,
            &ctx.settings.metadata,
        ) {
            Ok(content) => {
                log.push(nfo_step, ScrapeLogEntry::info("NFO content generated"));
                log.notify().await;
                content
            }
            Err(e) => {
                let message = format!("NFO generation failed: {e}");
                log.push(nfo_step, ScrapeLogEntry::error(message.clone()));
                log.fail(nfo_step);
                log.notify().await;
                result.status = ScrapeStatus::NfoFailed;
                result.message = message;
                return false;
            }
        };

        // Placement.
        let mode_name = ctx.link_mode.display_name();
        let move_step = log.begin(format!("{mode_name} file"));

        let (effective_output, effective_mode) = if ctx.link_mode == LinkMode::Inplace {
            let output = resolve_inplace_output_dir(ctx.file_path);
            log.push(
                move_step,
                ScrapeLogEntry::info(format!("原地整理 (in-place): renaming within {output}")),
            );
            (Some(output), LinkMode::Move)
        } else {
            (ctx.output_dir.clone(), ctx.link_mode)
        };

        let episode_entry = season_detail
            .and_then(|s| s.episodes.as_ref())
            .and_then(|eps| eps.iter().find(|e| e.episode_number == episode))
            .cloned();
        let episode_title = episode_entry
            .as_ref()
            .map(|e| e.name.clone())
            .filter(|name| !name.is_empty());

        let rename_request = RenameRequest {
            source_path: ctx.file_path.to_string(),
            title: series.name.clone(),
            season,
            episode,
            episode_title,
            year: series.year(),
            tmdb_id: Some(series.id),
            original_title: series.original_name.clone(),
            air_date: episode_entry
                .as_ref()
                .and_then(|e| e.air_date)
                .map(|d| d.to_string()),
            output_dir: effective_output.clone(),
            link_mode: effective_mode,
        };

        log.push(move_step, ScrapeLogEntry::info(format!("Source: {}", ctx.file_path)));
        log.push(
            move_step,
            ScrapeLogEntry::info(format!(
                "Target directory: {}",
                effective_output.as_deref().unwrap_or("alongside source")
            )),
        );
        log.push(move_step, ScrapeLogEntry::info(format!("Mode: {mode_name}")));
        log.notify().await;

        let renamer = RenameService::new(ctx.settings.naming.clone());
        let outcome = match renamer.execute(&rename_request).await {
            Ok(outcome) => outcome,
            Err(RenameError::DestinationExists(dest)) => {
                let message = format!("Destination file already exists: {dest}");
                log.push(move_step, ScrapeLogEntry::warning(message.clone()));
                log.fail(move_step);
                log.notify().await;
                result.status = ScrapeStatus::FileConflict;
                result.message = message;
                result.dest_path = Some(dest);
                return false;
            }
            Err(e) => {
                let message = format!("{mode_name} failed: {e}");
                log.push(move_step, ScrapeLogEntry::error(message.clone()));
                log.fail(move_step);
                log.notify().await;
                result.status = ScrapeStatus::MoveFailed;
                result.message = message;
                return false;
            }
        };

        result.dest_path = Some(outcome.dest_path.clone());
        log.push(
            move_step,
            ScrapeLogEntry::success(format!("File placement complete: {}", outcome.dest_path)),
        );
        log.notify().await;

        // Metadata folders mirror the video layout, optionally under a
        // separate metadata root.
        let dest_file = PathBuf::from(&outcome.dest_path);
        let season_folder = dest_file
            .parent()
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let series_folder = season_folder
            .parent()
            .map_or_else(|| season_folder.clone(), Path::to_path_buf);

        let (metadata_series_folder, metadata_season_folder) = match ctx
            .metadata_dir
            .as_deref()
            .filter(|dir| !dir.is_empty())
        {
            Some(metadata_dir) => {
                let series_component = series_folder.file_name().unwrap_or_default().to_os_string();
                let season_component = season_folder.file_name().unwrap_or_default().to_os_string();
                let metadata_series = Path::new(metadata_dir).join(series_component);
                let metadata_season = metadata_series.join(season_component);
                (metadata_series, metadata_season)
            }
            None => (series_folder, season_folder),
        };

        if ctx.settings.metadata.nfo_enabled {
            if let Err(e) = self
                .write_sidecars(
                    result,
                    log,
                    move_step,
                    series,
                    season,
                    &nfo_content,
                    &dest_file,
                    &metadata_series_folder,
                    &metadata_season_folder,
                    &ctx.settings.metadata,
                )
                .await
            {
                let message = format!("Sidecar write failed: {e:#}");
                log.push(move_step, ScrapeLogEntry::error(message.clone()));
                log.fail(move_step);
                log.notify().await;
                result.status = ScrapeStatus::MoveFailed;
                result.message = message;
                return false;
            }
        } else {
            log.push(move_step, ScrapeLogEntry::info("NFO writing skipped (disabled)"));
        }
        log.notify().await;

        // Artwork: toggled, never fatal.
        let image_step = log.begin("Download artwork");
        let video_stem = dest_file
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        let entries = self
            .artwork_entries(
                series,
                season_detail,
                season,
                episode,
                &metadata_series_folder,
                &metadata_season_folder,
                &video_stem,
                &ctx.settings.download,
            )
            .await;
        for entry in entries {
            log.push(image_step, entry);
        }
        log.notify().await;

        // Subtitles: never fatal.
        let subtitle_step = log.begin("Relocate subtitles");
        let moved = self
            .subtitles
            .relocate_matching(
                Path::new(ctx.file_path),
                &dest_file,
                Some(season),
                Some(episode),
            )
            .await;
        log.push(
            subtitle_step,
            ScrapeLogEntry::info(format!("{} subtitle file(s) relocated", moved.len())),
        );
        log.notify().await;

        result.episode_info = episode_entry;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scrape::AdvancedSettings;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.tmdb.api_token = "testkey".to_string();
        config.tmdb.task_timeout = 5;
        config.download.download_poster = false;
        config.download.download_thumb = false;
        config.download.download_fanart = false;
        config.emby.base_url = server.uri();
        config
    }

    fn scraper_for(server: &MockServer, config: Config) -> ScraperService {
        let shared = Arc::new(RwLock::new(config));
        let tmdb = TmdbClient::with_base_url(Arc::clone(&shared), server.uri());
        let emby = EmbyClient::new(Arc::clone(&shared));
        ScraperService::new(shared, tmdb, emby).with_image_base_url(server.uri())
    }

    fn search_body(results: serde_json::Value) -> serde_json::Value {
        json!({
            "page": 1,
            "total_results": results.as_array().map_or(0, Vec::len),
            "results": results
        })
    }

    async fn mount_show_ten(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("query", "Show"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 10, "name": "Show", "adult": true, "first_air_date": "2020-03-01"}
            ]))))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 10,
                "name": "Show",
                "first_air_date": "2020-03-01",
                "poster_path": "/p10.jpg",
                "number_of_seasons": 1,
                "number_of_episodes": 10,
                "genres": [],
                "seasons": [{"season_number": 1, "name": "Season 1", "episode_count": 10}]
            })))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/10/season/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "season_number": 1,
                "name": "Season 1",
                "episodes": [
                    {"episode_number": 1, "name": "First", "air_date": "2020-03-01"},
                    {"episode_number": 2, "name": "Name", "air_date": "2020-03-08"}
                ]
            })))
            .mount(server)
            .await;
    }

    /// Creates the source file under a folder named after the series, the
    /// way scan folders are laid out in practice. The folder name is what
    /// the folder-context plugin will pick up as the series name.
    async fn place_source(input: &TempDir, folder: &str, filename: &str) -> PathBuf {
        let dir = input.path().join(folder);
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let source = dir.join(filename);
        tokio::fs::write(&source, b"video").await.unwrap();
        source
    }

    fn request_for(source: &std::path::Path, output: &std::path::Path) -> ScrapeRequest {
        ScrapeRequest {
            file_path: source.to_string_lossy().to_string(),
            output_dir: Some(output.to_string_lossy().to_string()),
            metadata_dir: None,
            link_mode: LinkMode::Move,
            auto_select: true,
            advanced_settings: None,
        }
    }

    #[test]
    fn test_resolve_inplace_output_dir() {
        assert_eq!(
            resolve_inplace_output_dir("/lib/My Show/Season 1/e1.mkv"),
            "/lib"
        );
        assert_eq!(resolve_inplace_output_dir("/lib/My Show/e1.mkv"), "/lib");
        assert_eq!(
            resolve_inplace_output_dir("/lib/My Show/S02/e1.mkv"),
            "/lib"
        );
    }

    #[tokio::test]
    async fn test_happy_path_scrape() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;
        Mock::given(method("GET"))
            .and(path("/original/p10.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"poster".to_vec()))
            .mount(&server)
            .await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Show", "Show - S01E02 - Name.mkv").await;

        let mut config = test_config(&server);
        config.download.download_poster = true;
        let scraper = scraper_for(&server, config);

        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::Success, "{}", result.message);
        let dest = result.dest_path.unwrap();
        assert!(
            dest.ends_with("Show (2020) [tmdbid-10]/Season 1/Show - S01E02 - Name.mkv"),
            "unexpected dest: {dest}"
        );
        assert!(!source.exists());

        let series_folder = output.path().join("Show (2020) [tmdbid-10]");
        let season_folder = series_folder.join("Season 1");
        assert!(series_folder.join("tvshow.nfo").exists());
        assert!(season_folder.join("season.nfo").exists());
        assert!(season_folder.join("Show - S01E02 - Name.nfo").exists());
        // Poster fetch was attempted and stored.
        assert!(series_folder.join("poster.jpg").exists());

        // Every recorded step completed.
        assert!(result.scrape_logs.iter().all(|s| s.completed));
    }

    #[tokio::test]
    async fn test_fuzzy_fallback_scrape() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .and(query_param("query", "七人の孕女"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 77, "name": "七人の孕女", "adult": true, "first_air_date": "2018-06-01"}
            ]))))
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([]))))
            .with_priority(10)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/77"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 77,
                "name": "七人の孕女",
                "first_air_date": "2018-06-01",
                "number_of_seasons": 1,
                "number_of_episodes": 2,
                "genres": [],
                "seasons": [{"season_number": 1, "name": "Season 1", "episode_count": 2}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/77/season/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "season_number": 1,
                "name": "Season 1",
                "episodes": [{"episode_number": 1, "name": "前編"}]
            })))
            .mount(&server)
            .await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(
            &input,
            "〇〇〇する七人の孕女",
            "〇〇〇する七人の孕女 第1話.mp4",
        )
        .await;

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::Success, "{}", result.message);
        assert_eq!(result.selected_id, Some(77));
        assert_eq!(result.effective_query.as_deref(), Some("七人の孕女"));
    }

    #[tokio::test]
    async fn test_need_selection_with_enriched_candidates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 1, "name": "Catgirls", "adult": true},
                {"id": 2, "name": "Catgirls Returns", "adult": true}
            ]))))
            .mount(&server)
            .await;
        for (id, episodes) in [(1, 12), (2, 24)] {
            Mock::given(method("GET"))
                .and(path(format!("/tv/{id}")))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "id": id,
                    "name": "Catgirls",
                    "number_of_seasons": 1,
                    "number_of_episodes": episodes,
                    "genres": [],
                    "seasons": []
                })))
                .mount(&server)
                .await;
        }

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Catgirls", "Catgirls.S01E01.mkv").await;

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::NeedSelection);
        assert_eq!(result.search_results.len(), 2);
        assert_eq!(result.search_results[0].number_of_episodes, Some(12));
        assert_eq!(result.search_results[1].number_of_episodes, Some(24));
        // Nothing was placed.
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_need_season_episode_populates_episodes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search/tv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(search_body(json!([
                {"id": 42, "name": "Some Show", "adult": true}
            ]))))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 42,
                "name": "Some Show",
                "number_of_seasons": 1,
                "number_of_episodes": 12,
                "genres": [],
                "seasons": [{"season_number": 1, "name": "Season 1", "episode_count": 12}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/tv/42/season/1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "season_number": 1,
                "name": "Season 1",
                "episodes": (1..=12).map(|n| json!({
                    "episode_number": n,
                    "name": format!("Episode {n}")
                })).collect::<Vec<_>>()
            })))
            .mount(&server)
            .await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Some Show (2019)", "Some Show (2019).mkv").await;

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::NeedSeasonEpisode);
        let series_info = result.series_info.unwrap();
        let episodes = series_info.seasons[0].episodes.as_ref().unwrap();
        assert_eq!(episodes.len(), 12);
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_destination_conflict_leaves_source() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Show", "Show - S01E02 - Name.mkv").await;

        let occupied = output
            .path()
            .join("Show (2020) [tmdbid-10]")
            .join("Season 1");
        tokio::fs::create_dir_all(&occupied).await.unwrap();
        tokio::fs::write(occupied.join("Show - S01E02 - Name.mkv"), b"old")
            .await
            .unwrap();

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::FileConflict);
        assert!(source.exists());
        let failed_step = result.scrape_logs.iter().find(|s| !s.completed).unwrap();
        assert_eq!(failed_step.name, "Move file");
    }

    #[tokio::test]
    async fn test_mdb_conflict_blocks_placement() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;
        Mock::given(method("GET"))
            .and(path("/emby/Items"))
            .and(query_param("IncludeItemTypes", "Series"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [{"Id": "s1", "Name": "Show"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/emby/Items"))
            .and(query_param("IncludeItemTypes", "Episode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Items": [{"Id": "e2", "Name": "Name"}]
            })))
            .mount(&server)
            .await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Show", "Show - S01E02 - Name.mkv").await;

        let mut config = test_config(&server);
        config.emby.enabled = true;
        config.emby.check_before_scrape = true;

        let scraper = scraper_for(&server, config);
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::MdbConflict);
        assert!(source.exists());
        assert!(result.dest_path.is_none());
        let conflict = result.emby_conflict.unwrap();
        assert_eq!(conflict.conflict_type, ConflictType::EpisodeExists);
    }

    #[tokio::test]
    async fn test_unparseable_file_is_no_match() {
        let server = MockServer::start().await;
        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        // A one-letter folder is too short to act as a series name, so
        // nothing can identify this file.
        let source = place_source(&input, "x", "x.mkv").await;

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), None)
            .await;

        assert_eq!(result.status, ScrapeStatus::NoMatch);
        assert!(!result.scrape_logs.is_empty());
        assert!(!result.scrape_logs[0].completed);
    }

    #[tokio::test]
    async fn test_log_streaming_callback() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Show", "Show - S01E02 - Name.mkv").await;

        let seen = Arc::new(std::sync::Mutex::new(Vec::<usize>::new()));
        let seen_in_callback = Arc::clone(&seen);
        let callback: LogUpdateCallback = Arc::new(move |steps| {
            let seen = Arc::clone(&seen_in_callback);
            Box::pin(async move {
                seen.lock().unwrap().push(steps.len());
            })
        });

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper
            .scrape_file(&request_for(&source, output.path()), Some(callback))
            .await;

        assert_eq!(result.status, ScrapeStatus::Success);
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        // The step count only ever grows while the scrape runs.
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    }

    #[tokio::test]
    async fn test_scrape_by_id_uses_explicit_selection() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        // Deliberately unhelpful name: the id request needs no parsing.
        let source = place_source(&input, "dl", "af7c31b2.mkv").await;

        let request = ScrapeByIdRequest {
            file_path: source.to_string_lossy().to_string(),
            tmdb_id: 10,
            season: 1,
            episode: 2,
            output_dir: Some(output.path().to_string_lossy().to_string()),
            metadata_dir: None,
            link_mode: LinkMode::Copy,
            advanced_settings: None,
        };

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper.scrape_by_id(&request, None).await;

        assert_eq!(result.status, ScrapeStatus::Success, "{}", result.message);
        let dest = result.dest_path.unwrap();
        assert!(dest.ends_with("Show (2020) [tmdbid-10]/Season 1/Show - S01E02 - Name.mkv"));
        // Copy mode keeps the source.
        assert!(source.exists());
        assert_eq!(result.episode_info.unwrap().name, "Name");
    }

    #[tokio::test]
    async fn test_preview_reports_candidates_without_side_effects() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;

        let input = TempDir::new().unwrap();
        let source = place_source(&input, "Show", "Show - S01E02 - Name.mkv").await;

        let scraper = scraper_for(&server, test_config(&server));
        let preview = scraper.preview(&source.to_string_lossy()).await;

        assert_eq!(preview.parsed_title.as_deref(), Some("Show"));
        assert_eq!(preview.parsed_season, Some(1));
        assert_eq!(preview.parsed_episode, Some(2));
        assert_eq!(preview.search_results.len(), 1);
        assert_eq!(preview.search_results[0].id, 10);
        assert!(source.exists());
    }

    #[tokio::test]
    async fn test_nfo_disabled_by_advanced_settings() {
        let server = MockServer::start().await;
        mount_show_ten(&server).await;

        let input = TempDir::new().unwrap();
        let output = TempDir::new().unwrap();
        let source = place_source(&input, "Show", "Show - S01E02 - Name.mkv").await;

        let mut request = request_for(&source, output.path());
        request.advanced_settings = Some(AdvancedSettings {
            use_global_metadata: false,
            nfo_enabled: false,
            ..AdvancedSettings::default()
        });

        let scraper = scraper_for(&server, test_config(&server));
        let result = scraper.scrape_file(&request, None).await;

        assert_eq!(result.status, ScrapeStatus::Success);
        assert!(result.nfo_path.is_none());
        let season_folder = output
            .path()
            .join("Show (2020) [tmdbid-10]")
            .join("Season 1");
        assert!(!season_folder.join("Show - S01E02 - Name.nfo").exists());
    }
}
