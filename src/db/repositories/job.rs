use anyhow::Result;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::entities::{manual_jobs, prelude::*};
use crate::models::scrape::{AdvancedSettings, LinkMode};

/// Lifecycle of a manual job row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Self {
        match value {
            "running" => Self::Running,
            "success" => Self::Success,
            "failed" => Self::Failed,
            "cancelled" => Self::Cancelled,
            _ => Self::Pending,
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone)]
pub struct NewJob {
    pub scan_path: String,
    pub target_folder: String,
    pub metadata_dir: String,
    pub link_mode: LinkMode,
    pub delete_empty_parent: bool,
    pub config_reuse_id: Option<i32>,
    pub source: String,
    pub advanced_settings: Option<AdvancedSettings>,
}

/// Partial update applied when a job changes state; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default)]
pub struct JobProgress {
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub success_count: Option<i32>,
    pub skip_count: Option<i32>,
    pub error_count: Option<i32>,
    pub total_count: Option<i32>,
    pub error_message: Option<String>,
}

pub struct JobRepository {
    conn: DatabaseConnection,
}

impl JobRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn create(&self, job: NewJob) -> Result<manual_jobs::Model> {
        let advanced_settings = job
            .advanced_settings
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let model = manual_jobs::ActiveModel {
            scan_path: Set(job.scan_path),
            target_folder: Set(job.target_folder),
            metadata_dir: Set(job.metadata_dir),
            link_mode: Set(job.link_mode.as_i32()),
            delete_empty_parent: Set(job.delete_empty_parent),
            config_reuse_id: Set(job.config_reuse_id),
            source: Set(job.source),
            advanced_settings: Set(advanced_settings),
            created_at: Set(chrono::Utc::now().to_rfc3339()),
            status: Set(JobStatus::Pending.as_str().to_string()),
            success_count: Set(0),
            skip_count: Set(0),
            error_count: Set(0),
            total_count: Set(0),
            ..Default::default()
        };

        Ok(model.insert(&self.conn).await?)
    }

    pub async fn get(&self, id: i32) -> Result<Option<manual_jobs::Model>> {
        Ok(ManualJobs::find_by_id(id).one(&self.conn).await?)
    }

    pub async fn list(
        &self,
        limit: u64,
        offset: u64,
        search: Option<&str>,
        status: Option<JobStatus>,
    ) -> Result<(Vec<manual_jobs::Model>, u64)> {
        let mut condition = Condition::all();
        if let Some(search) = search {
            let pattern = format!("%{search}%");
            condition = condition.add(
                Condition::any()
                    .add(manual_jobs::Column::ScanPath.like(pattern.clone()))
                    .add(manual_jobs::Column::TargetFolder.like(pattern)),
            );
        }
        if let Some(status) = status {
            condition = condition.add(manual_jobs::Column::Status.eq(status.as_str()));
        }

        let total = ManualJobs::find()
            .filter(condition.clone())
            .count(&self.conn)
            .await?;

        let rows = ManualJobs::find()
            .filter(condition)
            .order_by_desc(manual_jobs::Column::CreatedAt)
            .limit(limit)
            .offset(offset)
            .all(&self.conn)
            .await?;

        Ok((rows, total))
    }

    pub async fn update_status(
        &self,
        id: i32,
        status: JobStatus,
        progress: JobProgress,
    ) -> Result<()> {
        let mut model = manual_jobs::ActiveModel {
            id: Set(id),
            status: Set(status.as_str().to_string()),
            ..Default::default()
        };

        if let Some(started_at) = progress.started_at {
            model.started_at = Set(Some(started_at));
        }
        if let Some(finished_at) = progress.finished_at {
            model.finished_at = Set(Some(finished_at));
        }
        if let Some(success_count) = progress.success_count {
            model.success_count = Set(success_count);
        }
        if let Some(skip_count) = progress.skip_count {
            model.skip_count = Set(skip_count);
        }
        if let Some(error_count) = progress.error_count {
            model.error_count = Set(error_count);
        }
        if let Some(total_count) = progress.total_count {
            model.total_count = Set(total_count);
        }
        if let Some(error_message) = progress.error_message {
            model.error_message = Set(Some(error_message));
        }

        model.update(&self.conn).await?;
        Ok(())
    }

    pub async fn delete(&self, ids: &[i32]) -> Result<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = ManualJobs::delete_many()
            .filter(manual_jobs::Column::Id.is_in(ids.iter().copied()))
            .exec(&self.conn)
            .await?;
        Ok(result.rows_affected)
    }
}

/// Decodes the advanced-settings JSON column; malformed payloads from old
/// versions are treated as absent.
#[must_use]
pub fn decode_advanced_settings(raw: Option<&str>) -> Option<AdvancedSettings> {
    raw.and_then(|json| serde_json::from_str(json).ok())
}
