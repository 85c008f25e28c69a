//! Video file discovery with path safety checks.

use regex::Regex;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

use crate::constants::{BLOCKED_PATHS, SUBTITLE_SCAN_EXTENSIONS, VIDEO_EXTENSIONS};

static SUBTITLE_EPISODE_RE: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Folder not found: {0}")]
    NotFound(String),

    #[error("Not a directory: {0}")]
    NotADirectory(String),

    #[error("Path contains an illegal sequence: {0}")]
    InvalidPath(String),

    #[error("Access to system directory refused: {0}")]
    Blocked(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub filename: String,
    pub path: PathBuf,
    pub size: u64,
    pub extension: String,
    /// An orphan subtitle picked up because its name carries an `SxxEyy`
    /// marker; not a video.
    pub is_subtitle: bool,
}

/// Rejects traversal sequences and system roots before any disk access.
pub fn sanitize_scan_path(path_str: &str) -> Result<PathBuf, ScanError> {
    for pattern in ["..", "~", "\0"] {
        if path_str.contains(pattern) {
            return Err(ScanError::InvalidPath(pattern.replace('\0', "NUL")));
        }
    }

    let normalized = path_str.replace('\\', "/");
    for blocked in BLOCKED_PATHS {
        let blocked_normalized = blocked.replace('\\', "/");
        if normalized.eq_ignore_ascii_case(&blocked_normalized)
            || normalized
                .to_lowercase()
                .starts_with(&format!("{}/", blocked_normalized.to_lowercase()))
        {
            return Err(ScanError::Blocked((*blocked).to_string()));
        }
    }

    Ok(PathBuf::from(path_str))
}

#[derive(Default)]
pub struct FileService;

impl FileService {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Recursively scans a folder for video files, plus subtitles whose
    /// names carry an episode marker. Walk order is directory order, which
    /// downstream job fan-out preserves.
    pub fn scan_folder(&self, folder_path: &str) -> Result<Vec<ScannedFile>, ScanError> {
        let path = sanitize_scan_path(folder_path)?;

        if !path.exists() {
            return Err(ScanError::NotFound(folder_path.to_string()));
        }
        if !path.is_dir() {
            return Err(ScanError::NotADirectory(folder_path.to_string()));
        }

        let episode_re = SUBTITLE_EPISODE_RE
            .get_or_init(|| Regex::new(r"[Ss]\d+[Ee]\d+").expect("valid regex"));

        let mut files = Vec::new();
        for entry in walkdir::WalkDir::new(&path)
            .follow_links(true)
            .sort_by_file_name()
            .into_iter()
            .filter_map(std::result::Result::ok)
        {
            let file_path = entry.path();
            if !file_path.is_file() {
                continue;
            }

            let extension = file_path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();

            let is_video = VIDEO_EXTENSIONS.contains(&extension.as_str());
            let is_marked_subtitle = SUBTITLE_SCAN_EXTENSIONS.contains(&extension.as_str())
                && file_path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| episode_re.is_match(stem));

            if !is_video && !is_marked_subtitle {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or_default();

            files.push(ScannedFile {
                filename: file_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or_default()
                    .to_string(),
                path: file_path.to_path_buf(),
                size,
                extension,
                is_subtitle: !is_video,
            });
        }

        Ok(files)
    }
}
