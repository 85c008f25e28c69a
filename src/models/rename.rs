use serde::Serialize;

use crate::models::scrape::LinkMode;

/// Inputs for placing a single video file into the library layout.
#[derive(Debug, Clone)]
pub struct RenameRequest {
    pub source_path: String,
    pub title: String,
    pub season: i32,
    pub episode: i32,
    pub episode_title: Option<String>,
    pub year: Option<i32>,
    pub tmdb_id: Option<i64>,
    pub original_title: Option<String>,
    pub air_date: Option<String>,
    /// When `None`, organize next to the source file.
    pub output_dir: Option<String>,
    pub link_mode: LinkMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenamePreview {
    pub source_path: String,
    pub dest_path: String,
    pub dest_folder: String,
    pub new_filename: String,
    pub will_create_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenameOutcome {
    pub source_path: String,
    pub dest_path: String,
}
