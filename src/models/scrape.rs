use serde::{Deserialize, Serialize};

use crate::models::parsed::ParsedInfo;
use crate::models::tmdb::{Episode, SearchResult, Series};

/// File placement mode. The discriminants are the values persisted in the
/// job tables, so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    Hardlink = 1,
    #[default]
    Move = 2,
    Copy = 3,
    Symlink = 4,
    /// Rename the series tree in place instead of moving it elsewhere.
    Inplace = 5,
}

impl LinkMode {
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self as i32
    }

    #[must_use]
    pub const fn from_i32(value: i32) -> Self {
        match value {
            1 => Self::Hardlink,
            3 => Self::Copy,
            4 => Self::Symlink,
            5 => Self::Inplace,
            _ => Self::Move,
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Hardlink => "Hardlink",
            Self::Move => "Move",
            Self::Copy => "Copy",
            Self::Symlink => "Symlink",
            Self::Inplace => "In-place",
        }
    }
}

/// Terminal outcome of a single scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapeStatus {
    Success,
    NoMatch,
    SearchFailed,
    ApiFailed,
    NeedSelection,
    NeedSeasonEpisode,
    NfoFailed,
    MoveFailed,
    FileConflict,
    MdbConflict,
}

impl ScrapeStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::NoMatch => "no_match",
            Self::SearchFailed => "search_failed",
            Self::ApiFailed => "api_failed",
            Self::NeedSelection => "need_selection",
            Self::NeedSeasonEpisode => "need_season_episode",
            Self::NfoFailed => "nfo_failed",
            Self::MoveFailed => "move_failed",
            Self::FileConflict => "file_conflict",
            Self::MdbConflict => "mdb_conflict",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeLogEntry {
    pub message: String,
    pub level: LogLevel,
}

impl ScrapeLogEntry {
    #[must_use]
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Info,
        }
    }

    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Success,
        }
    }

    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Warning,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: LogLevel::Error,
        }
    }
}

/// One pipeline step with its accumulated log lines. `completed = false`
/// marks the step where the pipeline terminated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapeLogStep {
    pub name: String,
    pub completed: bool,
    pub logs: Vec<ScrapeLogEntry>,
}

impl ScrapeLogStep {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            completed: true,
            logs: Vec::new(),
        }
    }
}

/// Conflict verdict from the external media library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    #[default]
    NoConflict,
    /// The series is already present. Informational only.
    SeriesExists,
    /// The exact episode is already present. Blocks the scrape.
    EpisodeExists,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConflictCheckResult {
    pub conflict_type: ConflictType,
    pub message: Option<String>,
}

/// Per-job overrides. Each category falls back to the global config while
/// its `use_global_*` flag is set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdvancedSettings {
    pub use_global_organize: bool,
    pub use_global_download: bool,
    pub use_global_naming: bool,
    pub use_global_metadata: bool,

    // Organize overrides
    pub min_file_size_mb: u64,
    pub file_ext_whitelist: Vec<String>,
    pub file_name_blacklist: Vec<String>,

    // Download overrides
    pub download_poster: bool,
    pub download_thumb: bool,
    pub download_fanart: bool,

    // Naming overrides
    pub series_folder_template: String,
    pub season_folder_template: String,
    pub episode_file_template: String,

    // Metadata overrides
    pub scrape_title: bool,
    pub scrape_plot: bool,
    pub nfo_enabled: bool,
}

impl Default for AdvancedSettings {
    fn default() -> Self {
        Self {
            use_global_organize: true,
            use_global_download: true,
            use_global_naming: true,
            use_global_metadata: true,
            min_file_size_mb: 100,
            file_ext_whitelist: Vec::new(),
            file_name_blacklist: Vec::new(),
            download_poster: true,
            download_thumb: true,
            download_fanart: false,
            series_folder_template: String::new(),
            season_folder_template: String::new(),
            episode_file_template: String::new(),
            scrape_title: true,
            scrape_plot: true,
            nfo_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ScrapeRequest {
    pub file_path: String,
    pub output_dir: Option<String>,
    pub metadata_dir: Option<String>,
    pub link_mode: LinkMode,
    pub auto_select: bool,
    pub advanced_settings: Option<AdvancedSettings>,
}

/// Scrape with a caller-chosen TMDB id, for when automatic search failed or
/// the user picked from a `need_selection` candidate list.
#[derive(Debug, Clone)]
pub struct ScrapeByIdRequest {
    pub file_path: String,
    pub tmdb_id: i64,
    pub season: i32,
    pub episode: i32,
    pub output_dir: Option<String>,
    pub metadata_dir: Option<String>,
    pub link_mode: LinkMode,
    pub advanced_settings: Option<AdvancedSettings>,
}

/// Parse + search outcome without side effects.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScrapePreview {
    pub file_path: String,
    pub parsed_title: Option<String>,
    pub parsed_season: Option<i32>,
    pub parsed_episode: Option<i32>,
    pub search_results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult {
    pub file_path: String,
    pub status: ScrapeStatus,
    pub parsed_title: Option<String>,
    pub parsed_season: Option<i32>,
    pub parsed_episode: Option<i32>,
    pub selected_id: Option<i64>,
    pub search_results: Vec<SearchResult>,
    pub effective_query: Option<String>,
    pub series_info: Option<Series>,
    pub episode_info: Option<Episode>,
    pub dest_path: Option<String>,
    pub nfo_path: Option<String>,
    pub message: String,
    pub scrape_logs: Vec<ScrapeLogStep>,
    pub emby_conflict: Option<ConflictCheckResult>,
}

impl ScrapeResult {
    #[must_use]
    pub fn new(file_path: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            status: ScrapeStatus::Success,
            parsed_title: None,
            parsed_season: None,
            parsed_episode: None,
            selected_id: None,
            search_results: Vec::new(),
            effective_query: None,
            series_info: None,
            episode_info: None,
            dest_path: None,
            nfo_path: None,
            message: String::new(),
            scrape_logs: Vec::new(),
            emby_conflict: None,
        }
    }

    #[must_use]
    pub fn from_parsed(file_path: impl Into<String>, parsed: &ParsedInfo) -> Self {
        let mut result = Self::new(file_path);
        result.parsed_title = parsed.series_name.clone();
        result.parsed_season = parsed.season;
        result.parsed_episode = parsed.episode;
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn link_mode_roundtrip() {
        for mode in [
            LinkMode::Hardlink,
            LinkMode::Move,
            LinkMode::Copy,
            LinkMode::Symlink,
            LinkMode::Inplace,
        ] {
            assert_eq!(LinkMode::from_i32(mode.as_i32()), mode);
        }
        // Unknown values fall back to move.
        assert_eq!(LinkMode::from_i32(0), LinkMode::Move);
        assert_eq!(LinkMode::from_i32(99), LinkMode::Move);
    }

    #[test]
    fn advanced_settings_json_defaults() {
        let settings: AdvancedSettings = serde_json::from_str("{}").unwrap();
        assert!(settings.use_global_naming);
        assert!(settings.nfo_enabled);
        assert!(!settings.download_fanart);
    }

    #[test]
    fn scrape_status_serializes_snake_case() {
        let json = serde_json::to_string(&ScrapeStatus::NeedSeasonEpisode).unwrap();
        assert_eq!(json, "\"need_season_episode\"");
        assert_eq!(ScrapeStatus::MdbConflict.as_str(), "mdb_conflict");
    }
}
