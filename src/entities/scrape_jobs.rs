use sea_orm::entity::prelude::*;

/// Per-file scrape task, created by the manual-job worker and consumed by
/// the scrape-task worker. `status` holds either a job lifecycle state
/// (pending/running) or the terminal `ScrapeStatus` string.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "scrape_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub file_path: String,
    pub output_dir: String,
    #[sea_orm(default_value = "")]
    pub metadata_dir: String,
    pub link_mode: i32,
    pub delete_empty_parent: bool,
    #[sea_orm(default_value = "manual")]
    pub source: String,
    /// Id of the manual job this task was fanned out from.
    pub source_id: Option<i32>,
    pub advanced_settings: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub status: String,
    pub result_message: Option<String>,
    pub dest_path: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
