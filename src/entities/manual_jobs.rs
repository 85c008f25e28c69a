use sea_orm::entity::prelude::*;

/// User-created organize job: scan a path, fan out one scrape task per
/// discovered file. Timestamps are ISO-8601 text; `link_mode` uses the
/// stable numeric mapping (1 hardlink, 2 move, 3 copy, 4 symlink,
/// 5 in-place).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "manual_jobs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub scan_path: String,
    pub target_folder: String,
    #[sea_orm(default_value = "")]
    pub metadata_dir: String,
    pub link_mode: i32,
    pub delete_empty_parent: bool,
    pub config_reuse_id: Option<i32>,
    #[sea_orm(default_value = "manual")]
    pub source: String,
    /// JSON-encoded `AdvancedSettings`, when the job overrides the global
    /// config.
    pub advanced_settings: Option<String>,
    pub created_at: String,
    pub started_at: Option<String>,
    pub finished_at: Option<String>,
    pub status: String,
    pub success_count: i32,
    pub skip_count: i32,
    pub error_count: i32,
    pub total_count: i32,
    pub error_message: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
