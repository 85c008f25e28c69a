//! Application-wide constants
//!
//! Centralizes magic values that are used across multiple modules.

/// Video file extensions recognized during folder scans and imports.
pub const VIDEO_EXTENSIONS: &[&str] = &[
    "mp4", "mkv", "avi", "wmv", "mov", "flv", "rmvb", "ts", "m2ts", "bdmv", "webm", "3gp", "mpg",
    "mpeg", "vob", "iso",
];

/// Subtitle extensions considered for association and relocation.
pub const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "idx", "vtt", "sup"];

/// Subtitle extensions included in folder scans when the filename carries an
/// `SxxEyy` marker (orphan subtitles that can be matched later).
pub const SUBTITLE_SCAN_EXTENSIONS: &[&str] = &["ass", "ssa", "srt", "vtt", "sub"];

/// System directories that must never be scanned.
pub const BLOCKED_PATHS: &[&str] = &[
    "/etc",
    "/var",
    "/usr",
    "/bin",
    "/sbin",
    "/boot",
    "/root",
    "/proc",
    "/sys",
    "C:\\Windows",
    "C:\\Program Files",
    "C:\\Program Files (x86)",
];

/// TMDB endpoints and image CDN.
pub mod tmdb {
    pub const API_BASE_URL: &str = "https://api.themoviedb.org/3";

    pub const SITE_URL: &str = "https://www.themoviedb.org";

    pub const IMAGE_BASE_URL: &str = "https://image.tmdb.org/t/p";

    /// Sizes accepted by the image CDN.
    pub const IMAGE_SIZES: &[&str] = &["w92", "w154", "w185", "w342", "w500", "w780", "original"];

    /// Maximum search results kept from one query.
    pub const MAX_SEARCH_RESULTS: usize = 20;
}
