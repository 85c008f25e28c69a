//! Destination-path computation and file placement.
//!
//! `preview` is pure path math; `execute` touches the filesystem. The
//! destination layout is `<base>/<series folder>/<season folder>/<file>`
//! with every segment rendered from the naming templates and sanitized.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::config::NamingConfig;
use crate::models::rename::{RenameOutcome, RenamePreview, RenameRequest};
use crate::models::scrape::LinkMode;
use crate::services::template::{
    self, TemplateError, TemplateValues, format_template, sanitize_segment,
};

#[derive(Debug, Error)]
pub enum RenameError {
    #[error("Source file not found: {0}")]
    SourceNotFound(String),

    #[error("Destination file already exists: {0}")]
    DestinationExists(String),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct RenameService {
    naming: NamingConfig,
}

impl RenameService {
    #[must_use]
    pub const fn new(naming: NamingConfig) -> Self {
        Self { naming }
    }

    /// Computes the destination without touching the filesystem (existence
    /// checks for `will_create_dirs` are read-only).
    pub fn preview(&self, request: &RenameRequest) -> Result<RenamePreview, RenameError> {
        let source_path = Path::new(&request.source_path);
        let extension = source_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();

        let values = Self::template_values(request);

        let mut filename = sanitize_segment(&format_template(&self.naming.episode_file, &values)?);
        // An absent episode title leaves a dangling separator behind.
        filename = filename.trim_end_matches([' ', '-']).to_string();
        if !extension.is_empty() {
            filename.push('.');
            filename.push_str(extension);
        }

        let series_folder = template::strip_empty_artifacts(&sanitize_segment(&format_template(
            &self.naming.series_folder,
            &values,
        )?));
        let season_folder = sanitize_segment(&format_template(&self.naming.season_folder, &values)?);

        let base_dir = request.output_dir.as_ref().map_or_else(
            || {
                source_path
                    .parent()
                    .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
            },
            PathBuf::from,
        );

        let dest_folder = base_dir.join(&series_folder).join(&season_folder);
        let dest_path = dest_folder.join(&filename);

        let mut will_create_dirs = Vec::new();
        let mut check_dir = dest_folder.clone();
        loop {
            if check_dir.exists() || Some(check_dir.as_path()) == base_dir.parent() {
                break;
            }
            will_create_dirs.insert(0, check_dir.to_string_lossy().to_string());
            match check_dir.parent() {
                Some(parent) => check_dir = parent.to_path_buf(),
                None => break,
            }
        }

        Ok(RenamePreview {
            source_path: request.source_path.clone(),
            dest_path: dest_path.to_string_lossy().to_string(),
            dest_folder: dest_folder.to_string_lossy().to_string(),
            new_filename: filename,
            will_create_dirs,
        })
    }

    /// Performs the placement. Refuses to overwrite an existing destination.
    pub async fn execute(&self, request: &RenameRequest) -> Result<RenameOutcome, RenameError> {
        let source_path = PathBuf::from(&request.source_path);

        if !source_path.exists() {
            return Err(RenameError::SourceNotFound(request.source_path.clone()));
        }

        let preview = self.preview(request)?;
        let dest_path = PathBuf::from(&preview.dest_path);
        let dest_folder = PathBuf::from(&preview.dest_folder);

        tokio::fs::create_dir_all(&dest_folder).await?;

        if dest_path.exists() && dest_path != source_path {
            return Err(RenameError::DestinationExists(preview.dest_path));
        }

        Self::place(&source_path, &dest_path, request.link_mode).await?;

        Ok(RenameOutcome {
            source_path: request.source_path.clone(),
            dest_path: preview.dest_path,
        })
    }

    async fn place(source: &Path, dest: &Path, mode: LinkMode) -> Result<(), RenameError> {
        match mode {
            LinkMode::Copy => {
                tokio::fs::copy(source, dest).await?;
                info!("Copied {} -> {}", source.display(), dest.display());
            }
            LinkMode::Hardlink => {
                tokio::fs::hard_link(source, dest).await?;
                info!("Hardlinked {} -> {}", source.display(), dest.display());
            }
            LinkMode::Symlink => {
                Self::symlink(source, dest).await?;
                info!("Symlinked {} -> {}", source.display(), dest.display());
            }
            // In-place placement is rewritten to a move with a computed
            // output dir before it reaches this point.
            LinkMode::Move | LinkMode::Inplace => {
                // rename cannot cross devices; fall back to copy + remove.
                if tokio::fs::rename(source, dest).await.is_err() {
                    tokio::fs::copy(source, dest).await?;
                    tokio::fs::remove_file(source).await?;
                }
                info!("Moved {} -> {}", source.display(), dest.display());
            }
        }
        Ok(())
    }

    #[cfg(unix)]
    async fn symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
        tokio::fs::symlink(source, dest).await
    }

    #[cfg(windows)]
    async fn symlink(source: &Path, dest: &Path) -> std::io::Result<()> {
        tokio::fs::symlink_file(source, dest).await
    }

    fn template_values(request: &RenameRequest) -> TemplateValues {
        TemplateValues {
            title: request.title.clone(),
            original_title: request.original_title.clone(),
            year: request.year,
            season: request.season,
            episode: request.episode,
            episode_title: request.episode_title.clone(),
            air_date: request.air_date.clone(),
            tmdb_id: request.tmdb_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn service() -> RenameService {
        RenameService::new(NamingConfig::default())
    }

    fn request(source: &Path, output: &Path, mode: LinkMode) -> RenameRequest {
        RenameRequest {
            source_path: source.to_string_lossy().to_string(),
            title: "My Show".to_string(),
            season: 1,
            episode: 2,
            episode_title: Some("Second".to_string()),
            year: Some(2020),
            tmdb_id: Some(10),
            original_title: None,
            air_date: None,
            output_dir: Some(output.to_string_lossy().to_string()),
            link_mode: mode,
        }
    }

    async fn write_source(dir: &TempDir) -> PathBuf {
        let source = dir.path().join("in").join("raw - 02.mkv");
        tokio::fs::create_dir_all(source.parent().unwrap())
            .await
            .unwrap();
        tokio::fs::write(&source, b"video-bytes").await.unwrap();
        source
    }

    #[test]
    fn test_preview_layout() {
        let out = TempDir::new().unwrap();
        let req = request(Path::new("/in/raw.mkv"), out.path(), LinkMode::Move);

        let preview = service().preview(&req).unwrap();
        assert!(preview.dest_path.ends_with(
            "My Show (2020) [tmdbid-10]/Season 1/My Show - S01E02 - Second.mkv"
        ));
        assert_eq!(preview.new_filename, "My Show - S01E02 - Second.mkv");
        assert_eq!(preview.will_create_dirs.len(), 2);
    }

    #[test]
    fn test_preview_without_episode_title() {
        let out = TempDir::new().unwrap();
        let mut req = request(Path::new("/in/raw.mkv"), out.path(), LinkMode::Move);
        req.episode_title = None;

        let preview = service().preview(&req).unwrap();
        assert_eq!(preview.new_filename, "My Show - S01E02.mkv");
    }

    #[tokio::test]
    async fn test_preview_and_execute_agree() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_source(&dir).await;
        let req = request(&source, out.path(), LinkMode::Copy);

        let svc = service();
        let preview = svc.preview(&req).unwrap();
        let outcome = svc.execute(&req).await.unwrap();

        assert_eq!(preview.dest_path, outcome.dest_path);
    }

    #[tokio::test]
    async fn test_move_relocates_file() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_source(&dir).await;
        let req = request(&source, out.path(), LinkMode::Move);

        let outcome = service().execute(&req).await.unwrap();

        assert!(!source.exists());
        let content = tokio::fs::read(&outcome.dest_path).await.unwrap();
        assert_eq!(content, b"video-bytes");
    }

    #[tokio::test]
    async fn test_copy_keeps_source() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_source(&dir).await;
        let req = request(&source, out.path(), LinkMode::Copy);

        let outcome = service().execute(&req).await.unwrap();

        assert!(source.exists());
        let content = tokio::fs::read(&outcome.dest_path).await.unwrap();
        assert_eq!(content, b"video-bytes");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hardlink_shares_inode() {
        use std::os::unix::fs::MetadataExt;

        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_source(&dir).await;
        let req = request(&source, out.path(), LinkMode::Hardlink);

        let outcome = service().execute(&req).await.unwrap();

        let src_meta = std::fs::metadata(&source).unwrap();
        let dest_meta = std::fs::metadata(&outcome.dest_path).unwrap();
        assert_eq!(src_meta.ino(), dest_meta.ino());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_symlink_points_at_source() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_source(&dir).await;
        let req = request(&source, out.path(), LinkMode::Symlink);

        let outcome = service().execute(&req).await.unwrap();

        let target = tokio::fs::read_link(&outcome.dest_path).await.unwrap();
        assert_eq!(target, source);
    }

    #[tokio::test]
    async fn test_destination_exists_refused() {
        let dir = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        let source = write_source(&dir).await;
        let req = request(&source, out.path(), LinkMode::Move);

        let svc = service();
        let preview = svc.preview(&req).unwrap();
        tokio::fs::create_dir_all(&preview.dest_folder)
            .await
            .unwrap();
        tokio::fs::write(&preview.dest_path, b"already-here")
            .await
            .unwrap();

        let err = svc.execute(&req).await.unwrap_err();
        assert!(matches!(err, RenameError::DestinationExists(_)));
        // Source must be left untouched.
        assert!(source.exists());
        let existing = tokio::fs::read(&preview.dest_path).await.unwrap();
        assert_eq!(existing, b"already-here");
    }

    #[tokio::test]
    async fn test_missing_source() {
        let out = TempDir::new().unwrap();
        let req = request(Path::new("/nope/missing.mkv"), out.path(), LinkMode::Move);

        let err = service().execute(&req).await.unwrap_err();
        assert!(matches!(err, RenameError::SourceNotFound(_)));
    }
}
