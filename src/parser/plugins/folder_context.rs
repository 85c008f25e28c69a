//! Extracts metadata from the folders above a video file.
//!
//! Understands layouts like:
//!   `[2025] My Show [tmdbid-12345]/Season 1/S01E01.mkv`
//!   `My Show (2025) [tmdb-12345]/S01E01.mkv`
//!
//! Folder walking works on a separator-normalized component list so that
//! Windows-style paths behave identically on POSIX hosts.

use super::{ParserPlugin, get_regex};
use crate::parser::ParseContext;
use regex::Regex;
use std::sync::OnceLock;

static TMDB_ID_RE: OnceLock<Regex> = OnceLock::new();
static FOLDER_YEAR_RE: OnceLock<Regex> = OnceLock::new();
static SEASON_FOLDER_RE: OnceLock<Regex> = OnceLock::new();
static SEASON_NUMBER_RE: OnceLock<Regex> = OnceLock::new();
static BRACKET_RE: OnceLock<Regex> = OnceLock::new();
static PAREN_RE: OnceLock<Regex> = OnceLock::new();
static VOLUME_SPLIT_RE: OnceLock<Regex> = OnceLock::new();
static VOLUME_NUM_RE: OnceLock<Regex> = OnceLock::new();
static DAI_NUM_RE: OnceLock<Regex> = OnceLock::new();
static TRAILING_EP_RE: OnceLock<Regex> = OnceLock::new();
static WHITESPACE_RE: OnceLock<Regex> = OnceLock::new();

fn tmdb_id_re() -> &'static Regex {
    get_regex(&TMDB_ID_RE, r"(?i)\[tmdb(?:id)?[-:](\d+)\]")
}

fn season_folder_re() -> &'static Regex {
    get_regex(&SEASON_FOLDER_RE, r"^[Ss]eason\s*\d+$|^[Ss]\d{1,2}$")
}

fn season_number_re() -> &'static Regex {
    get_regex(&SEASON_NUMBER_RE, r"[Ss]eason\s*(\d+)|^[Ss](\d{1,2})$")
}

/// Volume / subtitle markers that split a folder name: everything after the
/// marker is treated as a subtitle, and the marker itself may carry an
/// implicit episode number.
fn volume_split_re() -> &'static Regex {
    get_regex(
        &VOLUME_SPLIT_RE,
        r"\s+(下[巻卷]|上[巻卷]|前[編篇]|後[編篇]|完結[編篇]|第[一二三四五六七八九十百千\d]+[巻話編章]|[Vv]ol\.?\s*\d+)",
    )
}

/// `上`/`前` imply episode 1, `下`/`後` episode 2, `Vol.N`/`第N` episode N.
fn episode_from_volume_marker(marker: &str) -> Option<i32> {
    if let Some(caps) = get_regex(&VOLUME_NUM_RE, r"[Vv]ol\.?\s*(\d+)").captures(marker) {
        return caps[1].parse().ok();
    }
    if let Some(caps) = get_regex(&DAI_NUM_RE, r"第(\d+)[巻話編章]").captures(marker) {
        return caps[1].parse().ok();
    }
    if marker.starts_with('上') || marker.starts_with('前') {
        return Some(1);
    }
    if marker.starts_with('下') || marker.starts_with('後') {
        return Some(2);
    }
    None
}

/// Splits a path on both `/` and `\`, dropping the anchor (`/` prefix or a
/// drive letter). Returns the components and whether the path was absolute.
fn split_components(filepath: &str) -> (Vec<&str>, bool) {
    let anchored = filepath.starts_with('/')
        || filepath.starts_with('\\')
        || (filepath.len() >= 2 && filepath.as_bytes()[1] == b':');

    let components: Vec<&str> = filepath
        .split(['/', '\\'])
        .filter(|part| !part.is_empty() && !(part.len() == 2 && part.ends_with(':')))
        .collect();

    (components, anchored)
}

/// Walks upward from the file to find the series folder and an optional
/// season number taken from a `Season N` / `SNN` folder.
///
/// A candidate that sits directly under the filesystem root (a mount point
/// like `/media`) is rejected so mount names are never mistaken for series
/// names.
fn detect_series_folder(filepath: &str) -> (Option<String>, Option<i32>) {
    let (components, anchored) = split_components(filepath);
    if components.len() < 2 {
        return (None, None);
    }

    let parent_index = components.len() - 2;
    let parent = components[parent_index];

    if season_folder_re().is_match(parent) {
        let season = season_number_re().captures(parent).and_then(|caps| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .and_then(|m| m.as_str().parse().ok())
        });

        if parent_index == 0 {
            return (None, None);
        }
        let candidate_index = parent_index - 1;
        if anchored && candidate_index == 0 {
            return (None, None);
        }
        (Some(components[candidate_index].to_string()), season)
    } else {
        if anchored && parent_index == 0 {
            return (None, None);
        }
        (Some(parent.to_string()), None)
    }
}

pub struct FolderContextPlugin;

impl ParserPlugin for FolderContextPlugin {
    fn priority(&self) -> u8 {
        5
    }

    fn name(&self) -> &'static str {
        "folder_context"
    }

    fn should_skip(&self, ctx: &ParseContext) -> bool {
        ctx.filepath.is_none()
    }

    fn parse(&self, ctx: &mut ParseContext) {
        let Some(filepath) = ctx.filepath.clone() else {
            return;
        };

        let (series_folder, season_from_path) = detect_series_folder(&filepath);
        let Some(folder_name) = series_folder else {
            return;
        };

        if ctx.season.is_none()
            && let Some(season) = season_from_path
        {
            ctx.season = Some(season);
            ctx.record_match(self.name(), "season");
        }

        if ctx.tmdb_id.is_none()
            && let Some(caps) = tmdb_id_re().captures(&folder_name)
            && let Ok(id) = caps[1].parse::<i64>()
        {
            ctx.tmdb_id = Some(id);
            ctx.record_match(self.name(), "tmdb_id");
        }

        if ctx.year.is_none()
            && let Some(caps) =
                get_regex(&FOLDER_YEAR_RE, r"[\[(]((?:19|20)\d{2})[\])]").captures(&folder_name)
            && let Ok(year) = caps[1].parse::<i32>()
            && (1950..=2030).contains(&year)
        {
            ctx.year = Some(year);
            ctx.record_match(self.name(), "year");
        }

        if ctx.series_name.is_none() {
            let mut name = folder_name;
            name = tmdb_id_re().replace_all(&name, "").into_owned();
            name = get_regex(&BRACKET_RE, r"\[[^\]]*\]")
                .replace_all(&name, "")
                .into_owned();
            name = get_regex(&PAREN_RE, r"\([^)]*\)")
                .replace_all(&name, "")
                .into_owned();

            let volume = volume_split_re()
                .captures(&name)
                .map(|caps| (caps.get(0).map_or(0, |m| m.start()), caps[1].to_string()));
            if let Some((cut, marker)) = volume {
                if ctx.episode.is_none()
                    && let Some(episode) = episode_from_volume_marker(&marker)
                {
                    ctx.episode = Some(episode);
                    ctx.record_match(self.name(), "episode");
                }
                name.truncate(cut);
            }

            name = get_regex(&WHITESPACE_RE, r"\s+")
                .replace_all(&name, " ")
                .into_owned();
            name = name.trim_matches([' ', '-', '_', '.']).to_string();

            // A bare trailing number (optionally prefixed with ＃/#/♯) on the
            // folder name is an episode marker, not part of the series name.
            let trailing = get_regex(&TRAILING_EP_RE, r"(?:\s+[＃#♯]\s*|\s+)(\d{1,3})\s*$")
                .captures(&name)
                .map(|caps| {
                    (
                        caps.get(0).map_or(0, |m| m.start()),
                        caps[1].parse::<i32>().ok(),
                    )
                });
            if let Some((cut, episode)) = trailing {
                name.truncate(cut);
                name = name.trim_matches([' ', '-', '_', '.']).to_string();
                if ctx.episode.is_none()
                    && let Some(episode) = episode
                {
                    ctx.episode = Some(episode);
                    ctx.record_match(self.name(), "episode");
                }
            }

            if name.chars().count() >= 2 {
                ctx.series_name = Some(name);
                ctx.record_match(self.name(), "series_name");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_path(filename: &str, filepath: &str) -> ParseContext {
        let mut ctx = ParseContext::new(filename, Some(filepath));
        FolderContextPlugin.parse(&mut ctx);
        ctx
    }

    #[test]
    fn test_season_folder_detection() {
        let (folder, season) = detect_series_folder("/lib/My Show/Season 2/ep.mkv");
        assert_eq!(folder.as_deref(), Some("My Show"));
        assert_eq!(season, Some(2));

        let (folder, season) = detect_series_folder("/lib/My Show/S03/ep.mkv");
        assert_eq!(folder.as_deref(), Some("My Show"));
        assert_eq!(season, Some(3));
    }

    #[test]
    fn test_windows_separators() {
        let (folder, season) = detect_series_folder("C:\\lib\\My Show\\Season 1\\ep.mkv");
        assert_eq!(folder.as_deref(), Some("My Show"));
        assert_eq!(season, Some(1));
    }

    #[test]
    fn test_root_mount_rejected() {
        // File directly inside a mount point: the mount name is not a series.
        assert_eq!(detect_series_folder("/media/ep.mkv"), (None, None));
        // Season folder directly under the root behaves the same.
        assert_eq!(detect_series_folder("/media/Season 1/ep.mkv").0, None);
        assert_eq!(detect_series_folder("C:\\downloads\\ep.mkv"), (None, None));
    }

    #[test]
    fn test_tmdb_id_variants() {
        for folder in ["[tmdbid-99]", "[tmdb-99]", "[tmdbid:99]", "[TMDBID-99]"] {
            let ctx = parse_path("e1.mkv", &format!("/lib/Show {folder}/e1.mkv"));
            assert_eq!(ctx.tmdb_id, Some(99), "failed for {folder}");
        }
    }

    #[test]
    fn test_year_extraction_bounds() {
        let ctx = parse_path("e1.mkv", "/lib/Show (2020)/e1.mkv");
        assert_eq!(ctx.year, Some(2020));

        let ctx = parse_path("e1.mkv", "/lib/Show [1949]/e1.mkv");
        assert_eq!(ctx.year, None);

        let ctx = parse_path("e1.mkv", "/lib/Show (2031)/e1.mkv");
        assert_eq!(ctx.year, None);
    }

    #[test]
    fn test_volume_marker_implicit_episode() {
        let ctx = parse_path("v.mkv", "/lib/Rune's Pharmacy Vol.2 何か/v.mkv");
        assert_eq!(ctx.series_name.as_deref(), Some("Rune's Pharmacy"));
        assert_eq!(ctx.episode, Some(2));

        let ctx = parse_path("v.mkv", "/lib/ある剧集 上巻/v.mkv");
        assert_eq!(ctx.episode, Some(1));

        let ctx = parse_path("v.mkv", "/lib/ある剧集 後編/v.mkv");
        assert_eq!(ctx.episode, Some(2));

        let ctx = parse_path("v.mkv", "/lib/ある剧集 第3話/v.mkv");
        assert_eq!(ctx.episode, Some(3));
    }

    #[test]
    fn test_trailing_episode_marker() {
        let ctx = parse_path("v.mkv", "/lib/OVA ピスはめ！ ＃1/v.mkv");
        assert_eq!(ctx.series_name.as_deref(), Some("OVA ピスはめ！"));
        assert_eq!(ctx.episode, Some(1));

        let ctx = parse_path("v.mkv", "/lib/OVA ピスはめ！ 2/v.mkv");
        assert_eq!(ctx.episode, Some(2));
    }

    #[test]
    fn test_short_series_name_rejected() {
        let ctx = parse_path("v.mkv", "/lib/X (2020)/v.mkv");
        assert_eq!(ctx.series_name, None);
        // Year is still taken even when the residual name is too short.
        assert_eq!(ctx.year, Some(2020));
    }

    #[test]
    fn test_existing_fields_not_overwritten() {
        let mut ctx = ParseContext::new("v.mkv", Some("/lib/Other Show [tmdbid-5]/v.mkv"));
        ctx.series_name = Some("Known".to_string());
        ctx.tmdb_id = Some(1);
        FolderContextPlugin.parse(&mut ctx);

        assert_eq!(ctx.series_name.as_deref(), Some("Known"));
        assert_eq!(ctx.tmdb_id, Some(1));
    }
}
