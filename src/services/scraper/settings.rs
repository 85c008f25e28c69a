//! Effective per-scrape configuration.
//!
//! Advanced settings shadow the global config per category; each category
//! only applies when its `use_global_*` flag is cleared. The result is
//! flattened once at the top of a scrape so downstream code never sees the
//! raw override blob.

use crate::config::{Config, DownloadConfig, MetadataConfig, NamingConfig, OrganizeConfig};
use crate::models::scrape::AdvancedSettings;

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub organize: OrganizeConfig,
    pub download: DownloadConfig,
    pub naming: NamingConfig,
    pub metadata: MetadataConfig,
}

impl ResolvedSettings {
    #[must_use]
    pub fn resolve(config: &Config, advanced: Option<&AdvancedSettings>) -> Self {
        let Some(advanced) = advanced else {
            return Self::from_global(config);
        };

        let organize = if advanced.use_global_organize {
            config.organize.clone()
        } else {
            OrganizeConfig {
                min_file_size_mb: advanced.min_file_size_mb,
                file_ext_whitelist: if advanced.file_ext_whitelist.is_empty() {
                    config.organize.file_ext_whitelist.clone()
                } else {
                    advanced.file_ext_whitelist.clone()
                },
                file_name_blacklist: advanced.file_name_blacklist.clone(),
                ..config.organize.clone()
            }
        };

        let download = if advanced.use_global_download {
            config.download.clone()
        } else {
            DownloadConfig {
                download_poster: advanced.download_poster,
                download_thumb: advanced.download_thumb,
                download_fanart: advanced.download_fanart,
            }
        };

        let naming = if advanced.use_global_naming {
            config.naming.clone()
        } else {
            // Empty override templates keep the global value so a partial
            // override never produces empty path segments.
            NamingConfig {
                series_folder: pick(
                    &advanced.series_folder_template,
                    &config.naming.series_folder,
                ),
                season_folder: pick(
                    &advanced.season_folder_template,
                    &config.naming.season_folder,
                ),
                episode_file: pick(&advanced.episode_file_template, &config.naming.episode_file),
            }
        };

        let metadata = if advanced.use_global_metadata {
            config.metadata.clone()
        } else {
            MetadataConfig {
                nfo_enabled: advanced.nfo_enabled,
                scrape_title: advanced.scrape_title,
                scrape_plot: advanced.scrape_plot,
            }
        };

        Self {
            organize,
            download,
            naming,
            metadata,
        }
    }

    fn from_global(config: &Config) -> Self {
        Self {
            organize: config.organize.clone(),
            download: config.download.clone(),
            naming: config.naming.clone(),
            metadata: config.metadata.clone(),
        }
    }
}

fn pick(override_value: &str, global_value: &str) -> String {
    if override_value.trim().is_empty() {
        global_value.to_string()
    } else {
        override_value.to_string()
    }
}
