//! Subtitle discovery, matching and relocation.
//!
//! A subtitle belongs to a video when its stripped base name equals the
//! video stem, or when both carry an `SxxEyy` marker that agrees after
//! zero-padding. Trailing language codes and descriptor tags
//! (`.chs.assfonts` and friends) are peeled off dot-part by dot-part to
//! reach the base identifier.

use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{info, warn};

use crate::constants::SUBTITLE_EXTENSIONS;

static EPISODE_RE: OnceLock<Regex> = OnceLock::new();
static SEPARATOR_RE: OnceLock<Regex> = OnceLock::new();

/// Non-semantic tags that may trail a subtitle name without identifying it.
const DESCRIPTOR_TAGS: &[&str] = &[
    "assfonts",
    "fonts",
    "hi",
    "forced",
    "sdh",
    "cc",
    "default",
    "full",
    "signs",
    "songs",
    "commentary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubtitleLanguage {
    Chs,
    Cht,
    Eng,
    Jpn,
    Kor,
}

impl SubtitleLanguage {
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Chs => "chs",
            Self::Cht => "cht",
            Self::Eng => "eng",
            Self::Jpn => "jpn",
            Self::Kor => "kor",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "chs" | "sc" | "zh" | "chi" | "zho" | "zh-cn" | "zh-hans" | "chinese" | "简体"
            | "简中" => Some(Self::Chs),
            "cht" | "tc" | "zh-tw" | "zh-hk" | "zh-hant" | "繁体" | "繁中" => Some(Self::Cht),
            "eng" | "en" | "english" => Some(Self::Eng),
            "jpn" | "ja" | "jap" | "japanese" | "日语" => Some(Self::Jpn),
            "kor" | "ko" | "korean" | "韩语" => Some(Self::Kor),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SubtitleFile {
    pub path: PathBuf,
    pub filename: String,
    pub extension: String,
    pub language: Option<SubtitleLanguage>,
}

#[derive(Debug, Error)]
pub enum SubtitleError {
    #[error("Subtitle file not found: {0}")]
    NotFound(String),

    #[error("Destination file already exists: {0}")]
    DestinationExists(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

fn episode_re() -> &'static Regex {
    EPISODE_RE.get_or_init(|| Regex::new(r"[Ss](\d+)[Ee](\d+)").expect("valid regex"))
}

#[derive(Default)]
pub struct SubtitleService;

impl SubtitleService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Collects subtitle files directly in and below `folder`.
    #[must_use]
    pub fn scan(&self, folder: &Path) -> Vec<SubtitleFile> {
        if !folder.is_dir() {
            return Vec::new();
        }

        walkdir::WalkDir::new(folder)
            .follow_links(true)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| self.parse_file(entry.path()))
            .collect()
    }

    fn parse_file(&self, path: &Path) -> Option<SubtitleFile> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        if !SUBTITLE_EXTENSIONS.contains(&extension.as_str()) {
            return None;
        }

        let filename = path.file_name()?.to_str()?.to_string();
        Some(SubtitleFile {
            language: Self::extract_language(&filename),
            path: path.to_path_buf(),
            filename,
            extension,
        })
    }

    /// Detects a language tag scanning dot-parts right-to-left, skipping
    /// descriptor tags (`S01E01.chs.assfonts.ass` → chs), with a bracket
    /// fallback for names like `Title [CHS].srt`.
    #[must_use]
    pub fn extract_language(filename: &str) -> Option<SubtitleLanguage> {
        let stem = Path::new(filename).file_stem()?.to_str()?;

        for part in stem.split('.').rev() {
            let tag = part.to_lowercase();
            if let Some(language) = SubtitleLanguage::from_tag(&tag) {
                return Some(language);
            }
            if !DESCRIPTOR_TAGS.contains(&tag.as_str()) {
                break;
            }
        }

        static BRACKET_TAG_RE: OnceLock<Regex> = OnceLock::new();
        let re = BRACKET_TAG_RE
            .get_or_init(|| Regex::new(r"[\[(]([^\])]+)[\])]").expect("valid regex"));
        for caps in re.captures_iter(stem) {
            if let Some(language) = SubtitleLanguage::from_tag(&caps[1].to_lowercase()) {
                return Some(language);
            }
        }

        None
    }

    /// Base identifier of a subtitle: the stem with trailing language codes
    /// and descriptor tags stripped.
    #[must_use]
    pub fn base_name(filename: &str) -> String {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(filename);

        let mut parts: Vec<&str> = stem.split('.').collect();
        while parts.len() > 1 {
            let tag = parts[parts.len() - 1].to_lowercase();
            if SubtitleLanguage::from_tag(&tag).is_some() || DESCRIPTOR_TAGS.contains(&tag.as_str())
            {
                parts.pop();
            } else {
                break;
            }
        }

        parts.join(".")
    }

    /// Whether a subtitle base matches a video stem, by name or by episode
    /// marker.
    #[must_use]
    pub fn names_match(video_stem: &str, subtitle_base: &str) -> bool {
        if video_stem.eq_ignore_ascii_case(subtitle_base) {
            return true;
        }

        let normalize = |s: &str| -> String {
            SEPARATOR_RE
                .get_or_init(|| Regex::new(r"[\s._-]+").expect("valid regex"))
                .replace_all(&s.to_lowercase(), "")
                .into_owned()
        };
        if normalize(video_stem) == normalize(subtitle_base) {
            return true;
        }

        let video_ep = episode_re().captures(video_stem);
        let sub_ep = episode_re().captures(subtitle_base);
        if let (Some(v), Some(s)) = (video_ep, sub_ep) {
            let pad = |m: &str| format!("{:0>2}", m);
            return pad(&v[1]) == pad(&s[1]) && pad(&v[2]) == pad(&s[2]);
        }

        false
    }

    /// Whether a subtitle base carries an `SxxEyy` marker matching the given
    /// season/episode pair.
    #[must_use]
    pub fn episode_matches(subtitle_base: &str, season: i32, episode: i32) -> bool {
        episode_re().captures(subtitle_base).is_some_and(|caps| {
            caps[1].parse() == Ok(season) && caps[2].parse() == Ok(episode)
        })
    }

    /// Renames a subtitle to match a video stem, preserving the language
    /// tag, then moves it into `dest_folder` when that differs.
    pub async fn rename_to_video(
        &self,
        subtitle: &SubtitleFile,
        video_stem: &str,
        dest_folder: &Path,
    ) -> Result<PathBuf, SubtitleError> {
        if !subtitle.path.exists() {
            return Err(SubtitleError::NotFound(
                subtitle.path.to_string_lossy().to_string(),
            ));
        }

        let mut new_name = video_stem.to_string();
        if let Some(language) = subtitle.language {
            new_name.push('.');
            new_name.push_str(language.tag());
        }
        new_name.push('.');
        new_name.push_str(&subtitle.extension);

        let dest = dest_folder.join(&new_name);
        if dest.exists() && dest != subtitle.path {
            return Err(SubtitleError::DestinationExists(
                dest.to_string_lossy().to_string(),
            ));
        }

        tokio::fs::create_dir_all(dest_folder).await?;
        if tokio::fs::rename(&subtitle.path, &dest).await.is_err() {
            tokio::fs::copy(&subtitle.path, &dest).await?;
            tokio::fs::remove_file(&subtitle.path).await?;
        }

        Ok(dest)
    }

    /// Finds subtitles next to the source video that match it, and relocates
    /// them alongside the destination video. Returns the moved paths;
    /// individual failures are logged, not fatal.
    pub async fn relocate_matching(
        &self,
        source_video: &Path,
        dest_video: &Path,
        season: Option<i32>,
        episode: Option<i32>,
    ) -> Vec<PathBuf> {
        let Some(source_folder) = source_video.parent() else {
            return Vec::new();
        };
        let Some(dest_folder) = dest_video.parent() else {
            return Vec::new();
        };
        let source_stem = source_video
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();
        let dest_stem = dest_video
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default();

        let mut moved = Vec::new();

        for subtitle in self.scan(source_folder) {
            let base = Self::base_name(&subtitle.filename);

            let matched = Self::names_match(source_stem, &base)
                || match (season, episode) {
                    (Some(season), Some(episode)) => {
                        Self::episode_matches(&base, season, episode)
                    }
                    _ => false,
                };
            if !matched {
                continue;
            }

            match self.rename_to_video(&subtitle, dest_stem, dest_folder).await {
                Ok(path) => {
                    info!("Subtitle relocated: {} -> {}", subtitle.filename, path.display());
                    moved.push(path);
                }
                Err(e) => warn!("Subtitle relocation failed for {}: {e}", subtitle.filename),
            }
        }

        moved
    }
}
