use serde::{Deserialize, Serialize};

/// Episode information extracted from a filename and its surrounding folders.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedInfo {
    pub original_filename: String,
    pub series_name: Option<String>,
    pub season: Option<i32>,
    pub episode: Option<i32>,
    pub year: Option<i32>,
    /// TMDB id found in a parent folder tag like `[tmdbid-12345]`.
    pub tmdb_id: Option<i64>,
    pub is_parsed: bool,
    pub confidence: f32,
    /// Plugin tags in match order, for diagnostics.
    pub matched_patterns: Vec<String>,
}
