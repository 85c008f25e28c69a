//! Shared application state wiring the store and services together.

use std::sync::Arc;
use tokio::sync::RwLock;

use crate::clients::emby::EmbyClient;
use crate::clients::tmdb::TmdbClient;
use crate::config::Config;
use crate::db::Store;
use crate::services::{JobService, ScraperService};

#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<RwLock<Config>>,

    pub store: Store,

    pub tmdb: TmdbClient,

    pub scraper: Arc<ScraperService>,

    pub jobs: Arc<JobService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let store = Store::new(&config.general.database_path).await?;
        let config = Arc::new(RwLock::new(config));

        let tmdb = TmdbClient::new(Arc::clone(&config));
        let emby = EmbyClient::new(Arc::clone(&config));
        let scraper = Arc::new(ScraperService::new(
            Arc::clone(&config),
            tmdb.clone(),
            emby,
        ));
        let jobs = JobService::new(store.clone(), Arc::clone(&config), Arc::clone(&scraper));

        Ok(Self {
            config,
            store,
            tmdb,
            scraper,
            jobs,
        })
    }
}
