//! Smoke tests for the public crate surface: parsing, templates, and the
//! job store lifecycle against an on-disk database.

use seriarr::config::Config;
use seriarr::db::{JobProgress, JobStatus, NewJob, Store};
use seriarr::models::scrape::LinkMode;
use seriarr::parser::Parser;
use seriarr::services::template::{format_template, sanitize_segment, TemplateValues};
use tempfile::TempDir;

#[test]
fn smoke_parser_covers_common_layouts() {
    let parser = Parser::new();

    let info = parser.parse("Show Name - S01E03 - Pilot.mkv", None);
    assert_eq!(info.series_name.as_deref(), Some("Show Name"));
    assert_eq!((info.season, info.episode), (Some(1), Some(3)));

    let info = parser.parse(
        "e2.mkv",
        Some("/library/Great Series (2022) [tmdbid-777]/Season 2/e2.mkv"),
    );
    assert_eq!(info.tmdb_id, Some(777));
    assert_eq!(info.season, Some(2));
    assert_eq!(info.year, Some(2022));

    let info = parser.parse("ある作品 第12話.mp4", None);
    assert_eq!(info.episode, Some(12));
}

#[test]
fn smoke_naming_templates_render_default_layout() {
    let config = Config::default();
    let values = TemplateValues {
        title: "Great: Series?".to_string(),
        original_title: None,
        year: Some(2022),
        season: 2,
        episode: 7,
        episode_title: Some("The One".to_string()),
        air_date: None,
        tmdb_id: Some(777),
    };

    let series = sanitize_segment(&format_template(&config.naming.series_folder, &values).unwrap());
    let episode = sanitize_segment(&format_template(&config.naming.episode_file, &values).unwrap());

    assert_eq!(series, "Great Series (2022) [tmdbid-777]");
    assert_eq!(episode, "Great Series - S02E07 - The One");
}

#[tokio::test]
async fn smoke_store_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("seriarr.db");
    let db_url = format!("sqlite:{}", db_path.display());

    let job_id = {
        let store = Store::new(&db_url).await.expect("first open");
        let job = store
            .create_job(NewJob {
                scan_path: "/in".to_string(),
                target_folder: "/library".to_string(),
                metadata_dir: String::new(),
                link_mode: LinkMode::Hardlink,
                delete_empty_parent: true,
                config_reuse_id: None,
                source: "manual".to_string(),
                advanced_settings: None,
            })
            .await
            .expect("create job");
        store
            .update_job_status(
                job.id,
                JobStatus::Success,
                JobProgress {
                    success_count: Some(1),
                    ..JobProgress::default()
                },
            )
            .await
            .expect("update job");
        job.id
    };

    // Reopening runs the migrations again; the add-column migration must be
    // a no-op on an up-to-date schema and the data must still be there.
    let store = Store::new(&db_url).await.expect("reopen");
    let job = store.get_job(job_id).await.unwrap().expect("job persisted");
    assert_eq!(job.status, "success");
    assert_eq!(job.link_mode, 1);
    assert!(job.delete_empty_parent);
}
