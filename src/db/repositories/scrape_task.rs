use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};

use crate::entities::{prelude::*, scrape_jobs};
use crate::models::scrape::{AdvancedSettings, LinkMode};

use super::job::JobStatus;

#[derive(Debug, Clone)]
pub struct NewScrapeTask {
    pub file_path: String,
    pub output_dir: String,
    pub metadata_dir: String,
    pub link_mode: LinkMode,
    pub delete_empty_parent: bool,
    pub source: String,
    pub source_id: Option<i32>,
    pub advanced_settings: Option<AdvancedSettings>,
}

pub struct ScrapeTaskRepository {
    conn: DatabaseConnection,
}

impl ScrapeTaskRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, task: NewScrapeTask) -> Result<scrape_jobs::Model> {
        let advanced_settings = task
            .advanced_settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let model = scrape_jobs::ActiveModel {
            file_path: Set(task.file_path),
            output_dir: Set(task.output_dir),
            metadata_dir: Set(task.metadata_dir),
            link_mode: Set(task.link_mode.as_i32()),
            delete_empty_parent: Set(task.delete_empty_parent),
            source: Set(task.source),
            source_id: Set(task.source_id),
            advanced_settings: Set(advanced_settings),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            status: Set(JobStatus::Pending.as_str().to_string()),
            ..Default::default()
        };

        Ok(model.insert(&self.conn).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Option<scrape_jobs::Model>> {
        Ok(ScrapeJobs::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn mark_running(&self, id: i32) -> Result<()> {
        let model = scrape_jobs::ActiveModel {
            id: Set(id),
            status: Set(JobStatus::Running.as_str().to_string()),
            started_at: Set(Some(chrono::Utc::now().to_rfc3339())),
            ..Default::default()
        };
        model.update(&self.conn).await?;
        Ok(())
    }

    /// Records the terminal outcome of a scrape. `status` is the
    /// `ScrapeStatus` string, not a queue lifecycle state.
    pub async fn mark_finished(
        &self,
        id: i32,
        status: &str,
        result_message: &str,
        dest_path: Option<&str>,
    ) -> Result<()> {
        let model = scrape_jobs::ActiveModel {
            id: Set(id),
            status: Set(status.to_string()),
            result_message: Set(Some(result_message.to_string())),
            dest_path: Set(dest_path.map(std::string::ToString::to_string)),
            finished_at: Set(Some(chrono::Utc::now().to_rfc3339())),
            ..Default::default()
        };
        model.update(&self.conn).await?;
        Ok(())
    }

    pub async fn list_for_job(&self, job_id: i32) -> Result<Vec<scrape_jobs::Model>> {
        Ok(ScrapeJobs::find()
            .filter(scrape_jobs::Column::SourceId.eq(job_id))
            .order_by_asc(scrape_jobs::Column::Id)
            .all(&self.conn)
            .await?)
    }

    pub async fn count_unfinished_for_job(&self, job_id: i32) -> Result<u64> {
        Ok(ScrapeJobs::find()
            .filter(scrape_jobs::Column::SourceId.eq(job_id))
            .filter(
                scrape_jobs::Column::Status
                    .is_in([JobStatus::Pending.as_str(), JobStatus::Running.as_str()]),
            )
            .count(&self.conn)
            .await?)
    }
}
