use anyhow::Result;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::entities::{manual_jobs, scrape_jobs};

pub mod migrator;
pub mod repositories;

pub use repositories::job::{JobProgress, JobStatus, NewJob, decode_advanced_settings};
pub use repositories::scrape_task::NewScrapeTask;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let in_memory = db_url.contains(":memory:");
        if !in_memory {
            let path_str = db_url.trim_start_matches("sqlite:");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        // An in-memory database exists per connection, so the pool must
        // never hand out a second one.
        opt.max_connections(if in_memory { 1 } else { 5 })
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!("Database connected & migrations applied");

        Ok(Self { conn })
    }

    fn job_repo(&self) -> repositories::job::JobRepository {
        repositories::job::JobRepository::new(self.conn.clone())
    }

    fn scrape_task_repo(&self) -> repositories::scrape_task::ScrapeTaskRepository {
        repositories::scrape_task::ScrapeTaskRepository::new(self.conn.clone())
    }

    // ========== Manual jobs ==========

    pub async fn create_job(&self, job: NewJob) -> Result<manual_jobs::Model> {
        self.job_repo().create(job).await
    }

    pub async fn get_job(&self, id: i32) -> Result<Option<manual_jobs::Model>> {
        self.job_repo().get(id).await
    }

    pub async fn list_jobs(
        &self,
        limit: u64,
        offset: u64,
        search: Option<&str>,
        status: Option<JobStatus>,
    ) -> Result<(Vec<manual_jobs::Model>, u64)> {
        self.job_repo().list(limit, offset, search, status).await
    }

    pub async fn update_job_status(
        &self,
        id: i32,
        status: JobStatus,
        progress: JobProgress,
    ) -> Result<()> {
        self.job_repo().update_status(id, status, progress).await
    }

    pub async fn delete_jobs(&self, ids: &[i32]) -> Result<u64> {
        self.job_repo().delete(ids).await
    }

    // ========== Scrape tasks ==========

    pub async fn create_scrape_task(&self, task: NewScrapeTask) -> Result<scrape_jobs::Model> {
        self.scrape_task_repo().create(task).await
    }

    pub async fn get_scrape_task(&self, id: i32) -> Result<Option<scrape_jobs::Model>> {
        self.scrape_task_repo().get(id).await
    }

    pub async fn mark_scrape_task_running(&self, id: i32) -> Result<()> {
        self.scrape_task_repo().mark_running(id).await
    }

    pub async fn mark_scrape_task_finished(
        &self,
        id: i32,
        status: &str,
        result_message: &str,
        dest_path: Option<&str>,
    ) -> Result<()> {
        self.scrape_task_repo()
            .mark_finished(id, status, result_message, dest_path)
            .await
    }

    pub async fn list_scrape_tasks_for_job(&self, job_id: i32) -> Result<Vec<scrape_jobs::Model>> {
        self.scrape_task_repo().list_for_job(job_id).await
    }

    pub async fn count_unfinished_scrape_tasks(&self, job_id: i32) -> Result<u64> {
        self.scrape_task_repo().count_unfinished_for_job(job_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::scrape::{AdvancedSettings, LinkMode};

    async fn memory_store() -> Store {
        Store::new("sqlite::memory:").await.unwrap()
    }

    fn new_job(scan_path: &str) -> NewJob {
        NewJob {
            scan_path: scan_path.to_string(),
            target_folder: "/library".to_string(),
            metadata_dir: String::new(),
            link_mode: LinkMode::Move,
            delete_empty_parent: false,
            config_reuse_id: None,
            source: "manual".to_string(),
            advanced_settings: None,
        }
    }

    #[tokio::test]
    async fn test_job_roundtrip() {
        let store = memory_store().await;

        let created = store.create_job(new_job("/in")).await.unwrap();
        assert_eq!(created.status, "pending");
        assert_eq!(created.link_mode, 2);

        let loaded = store.get_job(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.scan_path, "/in");

        store
            .update_job_status(
                created.id,
                JobStatus::Success,
                JobProgress {
                    finished_at: Some(chrono::Utc::now().to_rfc3339()),
                    success_count: Some(3),
                    total_count: Some(3),
                    ..JobProgress::default()
                },
            )
            .await
            .unwrap();

        let loaded = store.get_job(created.id).await.unwrap().unwrap();
        assert_eq!(loaded.status, "success");
        assert_eq!(loaded.success_count, 3);
        assert!(loaded.finished_at.is_some());
    }

    #[tokio::test]
    async fn test_job_list_filters() {
        let store = memory_store().await;
        store.create_job(new_job("/downloads/a")).await.unwrap();
        let other = store.create_job(new_job("/media/b")).await.unwrap();
        store
            .update_job_status(other.id, JobStatus::Failed, JobProgress::default())
            .await
            .unwrap();

        let (rows, total) = store.list_jobs(10, 0, Some("downloads"), None).await.unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].scan_path, "/downloads/a");

        let (rows, total) = store
            .list_jobs(10, 0, None, Some(JobStatus::Failed))
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(rows[0].scan_path, "/media/b");
    }

    #[tokio::test]
    async fn test_advanced_settings_json_roundtrip() {
        let store = memory_store().await;

        let mut job = new_job("/in");
        job.advanced_settings = Some(AdvancedSettings {
            use_global_download: false,
            download_fanart: true,
            ..AdvancedSettings::default()
        });

        let created = store.create_job(job).await.unwrap();
        let loaded = store.get_job(created.id).await.unwrap().unwrap();
        let decoded = decode_advanced_settings(loaded.advanced_settings.as_deref()).unwrap();
        assert!(!decoded.use_global_download);
        assert!(decoded.download_fanart);

        // Malformed payloads from older versions decode to None.
        assert!(decode_advanced_settings(Some("{not json")).is_none());
    }

    #[tokio::test]
    async fn test_scrape_task_lifecycle() {
        let store = memory_store().await;
        let job = store.create_job(new_job("/in")).await.unwrap();

        let task = store
            .create_scrape_task(NewScrapeTask {
                file_path: "/in/a.mkv".to_string(),
                output_dir: "/library".to_string(),
                metadata_dir: String::new(),
                link_mode: LinkMode::Copy,
                delete_empty_parent: false,
                source: "manual".to_string(),
                source_id: Some(job.id),
                advanced_settings: None,
            })
            .await
            .unwrap();

        assert_eq!(store.count_unfinished_scrape_tasks(job.id).await.unwrap(), 1);

        store.mark_scrape_task_running(task.id).await.unwrap();
        store
            .mark_scrape_task_finished(task.id, "success", "Scrape complete", Some("/library/x"))
            .await
            .unwrap();

        let tasks = store.list_scrape_tasks_for_job(job.id).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].status, "success");
        assert_eq!(tasks[0].dest_path.as_deref(), Some("/library/x"));
        assert_eq!(store.count_unfinished_scrape_tasks(job.id).await.unwrap(), 0);
    }
}
