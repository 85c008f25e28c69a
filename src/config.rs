use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,

    pub tmdb: TmdbConfig,

    pub organize: OrganizeConfig,

    pub download: DownloadConfig,

    pub naming: NamingConfig,

    pub metadata: MetadataConfig,

    pub emby: EmbyConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub database_path: String,

    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            database_path: "sqlite:data/seriarr.db".to_string(),
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TmdbConfig {
    /// v3 API key or v4 Bearer token. Bearer tokens start with `eyJ`.
    pub api_token: String,

    pub proxy_url: Option<String>,

    pub language: String,

    /// Request timeout in seconds for all TMDB calls.
    pub task_timeout: u64,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_token: String::new(),
            proxy_url: None,
            language: "zh-CN".to_string(),
            task_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    pub organize_dir: String,

    pub metadata_dir: String,

    pub min_file_size_mb: u64,

    pub file_ext_whitelist: Vec<String>,

    pub file_name_blacklist: Vec<String>,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        Self {
            organize_dir: String::new(),
            metadata_dir: String::new(),
            min_file_size_mb: 100,
            file_ext_whitelist: vec![
                "mkv".to_string(),
                "mp4".to_string(),
                "avi".to_string(),
                "wmv".to_string(),
                "ts".to_string(),
                "rmvb".to_string(),
            ],
            file_name_blacklist: vec!["sample".to_string(), "trailer".to_string()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    pub download_poster: bool,

    pub download_thumb: bool,

    pub download_fanart: bool,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            download_poster: true,
            download_thumb: true,
            download_fanart: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    pub series_folder: String,

    pub season_folder: String,

    pub episode_file: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            series_folder: "{title} ({year}) [tmdbid-{tmdb_id}]".to_string(),
            season_folder: "Season {season}".to_string(),
            episode_file: "{title} - S{season:02d}E{episode:02d} - {episode_title}".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    pub nfo_enabled: bool,

    pub scrape_title: bool,

    pub scrape_plot: bool,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            nfo_enabled: true,
            scrape_title: true,
            scrape_plot: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbyConfig {
    pub enabled: bool,

    pub base_url: String,

    pub api_key: String,

    /// Consult the library for an existing episode before each scrape.
    pub check_before_scrape: bool,
}

impl Default for EmbyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            base_url: "http://localhost:8096".to_string(),
            api_key: String::new(),
            check_before_scrape: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let paths = Self::config_paths();

        for path in &paths {
            if path.exists() {
                info!("Loading config from: {}", path.display());
                return Self::load_from_path(path);
            }
        }

        info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::default_config_path();
        self.save_to_path(&path)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Config saved to: {}", path.display());
        Ok(())
    }

    fn config_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config.toml")];

        if let Some(config_dir) = dirs::config_dir() {
            paths.push(config_dir.join("seriarr").join("config.toml"));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".seriarr").join("config.toml"));
        }

        paths
    }

    fn default_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    pub fn create_default_if_missing() -> Result<bool> {
        let path = Self::default_config_path();
        if path.exists() {
            Ok(false)
        } else {
            let config = Self::default();
            config.save_to_path(&path)?;
            info!("Created default config file: {}", path.display());
            Ok(true)
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.tmdb.task_timeout == 0 {
            anyhow::bail!("TMDB task_timeout must be > 0");
        }

        if self.emby.enabled && self.emby.base_url.is_empty() {
            anyhow::bail!("Emby base URL cannot be empty when enabled");
        }

        Ok(())
    }
}
