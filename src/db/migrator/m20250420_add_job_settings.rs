use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Upgrade path for databases created before per-job metadata dirs
        // and advanced settings existed. Fresh databases already get these
        // columns from the initial migration, hence the has_column guards.
        if !manager.has_column("manual_jobs", "metadata_dir").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(ManualJobs::Table)
                        .add_column(
                            ColumnDef::new(ManualJobs::MetadataDir)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_column("manual_jobs", "source").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(ManualJobs::Table)
                        .add_column(
                            ColumnDef::new(ManualJobs::Source)
                                .text()
                                .not_null()
                                .default("manual"),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager
            .has_column("manual_jobs", "advanced_settings")
            .await?
        {
            manager
                .alter_table(
                    Table::alter()
                        .table(ManualJobs::Table)
                        .add_column(ColumnDef::new(ManualJobs::AdvancedSettings).text().null())
                        .to_owned(),
                )
                .await?;
        }

        if !manager.has_column("scrape_jobs", "metadata_dir").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(ScrapeJobs::Table)
                        .add_column(
                            ColumnDef::new(ScrapeJobs::MetadataDir)
                                .text()
                                .not_null()
                                .default(""),
                        )
                        .to_owned(),
                )
                .await?;
        }

        if !manager
            .has_column("scrape_jobs", "advanced_settings")
            .await?
        {
            manager
                .alter_table(
                    Table::alter()
                        .table(ScrapeJobs::Table)
                        .add_column(ColumnDef::new(ScrapeJobs::AdvancedSettings).text().null())
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        if manager.has_column("manual_jobs", "advanced_settings").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(ManualJobs::Table)
                        .drop_column(ManualJobs::AdvancedSettings)
                        .to_owned(),
                )
                .await?;
        }

        if manager.has_column("scrape_jobs", "advanced_settings").await? {
            manager
                .alter_table(
                    Table::alter()
                        .table(ScrapeJobs::Table)
                        .drop_column(ScrapeJobs::AdvancedSettings)
                        .to_owned(),
                )
                .await?;
        }

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ManualJobs {
    #[sea_orm(iden = "manual_jobs")]
    Table,
    MetadataDir,
    Source,
    AdvancedSettings,
}

#[derive(DeriveIden)]
enum ScrapeJobs {
    #[sea_orm(iden = "scrape_jobs")]
    Table,
    MetadataDir,
    AdvancedSettings,
}
