//! Job queue and workers.
//!
//! Two symmetric stages share one mechanism: an in-memory unbounded FIFO of
//! row ids plus a single background worker that is (re)started on demand
//! whenever something is enqueued. Manual jobs scan a path and fan out one
//! scrape task per discovered file; the scrape-task worker drives the
//! orchestrator and persists each terminal outcome. The manual job is
//! considered done once its tasks are dispatched - the two stages are
//! deliberately decoupled, so `success_count` on the job row means
//! "dispatched", while the scrape-task rows carry the eventual per-file
//! results.

use anyhow::{Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::db::{JobProgress, JobStatus, NewJob, NewScrapeTask, Store, decode_advanced_settings};
use crate::entities::manual_jobs;
use crate::models::scrape::{LinkMode, ScrapeRequest, ScrapeStatus};
use crate::services::files::FileService;
use crate::services::scraper::{ResolvedSettings, ScraperService};

/// FIFO of row ids with a lazily started single worker. The receiver sits
/// behind an async mutex so a replacement worker can take over if a
/// previous one ended.
struct WorkQueue {
    tx: mpsc::UnboundedSender<i32>,
    rx: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<i32>>>,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl WorkQueue {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Arc::new(tokio::sync::Mutex::new(rx)),
            worker: std::sync::Mutex::new(None),
        }
    }

    fn enqueue(&self, id: i32) {
        let _ = self.tx.send(id);
    }

    fn ensure_worker<F, Fut>(&self, run: F)
    where
        F: Fn(i32) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut guard = self.worker.lock().expect("worker handle lock poisoned");
        if guard.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }

        let rx = Arc::clone(&self.rx);
        *guard = Some(tokio::spawn(async move {
            let mut rx = rx.lock().await;
            while let Some(id) = rx.recv().await {
                run(id).await;
            }
        }));
    }
}

pub struct JobService {
    store: Store,
    config: Arc<RwLock<Config>>,
    scraper: Arc<ScraperService>,
    files: FileService,
    jobs: WorkQueue,
    tasks: WorkQueue,
}

impl JobService {
    #[must_use]
    pub fn new(store: Store, config: Arc<RwLock<Config>>, scraper: Arc<ScraperService>) -> Arc<Self> {
        Arc::new(Self {
            store,
            config,
            scraper,
            files: FileService::new(),
            jobs: WorkQueue::new(),
            tasks: WorkQueue::new(),
        })
    }

    /// Persists a new manual job and queues it for execution.
    pub async fn create_job(self: &Arc<Self>, job: NewJob) -> Result<manual_jobs::Model> {
        let model = self.store.create_job(job).await?;
        info!("Job {} queued: {}", model.id, model.scan_path);
        self.enqueue_job(model.id);
        Ok(model)
    }

    pub fn enqueue_job(self: &Arc<Self>, job_id: i32) {
        self.jobs.enqueue(job_id);

        let service = Arc::clone(self);
        self.jobs.ensure_worker(move |id| {
            let service = Arc::clone(&service);
            async move {
                service.execute_job(id).await;
            }
        });
    }

    fn enqueue_task(self: &Arc<Self>, task_id: i32) {
        self.tasks.enqueue(task_id);

        let service = Arc::clone(self);
        self.tasks.ensure_worker(move |id| {
            let service = Arc::clone(&service);
            async move {
                service.execute_task(id).await;
            }
        });
    }

    /// Blocks until the job row is terminal and every scrape task fanned
    /// out from it has finished.
    pub async fn wait_for_job(
        &self,
        job_id: i32,
        timeout: std::time::Duration,
    ) -> Result<manual_jobs::Model> {
        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let job = self
                .store
                .get_job(job_id)
                .await?
                .with_context(|| format!("Job {job_id} not found"))?;

            if JobStatus::parse(&job.status).is_terminal()
                && self.store.count_unfinished_scrape_tasks(job_id).await? == 0
            {
                return Ok(job);
            }

            if tokio::time::Instant::now() >= deadline {
                anyhow::bail!("Timed out waiting for job {job_id}");
            }
            tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        }
    }

    /// One manual job: scan, fan out scrape tasks, finish. Worker-level
    /// errors land on the job row, never in the worker loop.
    async fn execute_job(self: &Arc<Self>, job_id: i32) {
        let job = match self.store.get_job(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                error!("Job {job_id} not found");
                return;
            }
            Err(e) => {
                error!("Failed to load job {job_id}: {e:#}");
                return;
            }
        };

        info!("Starting job {job_id}: {}", job.scan_path);
        if let Err(e) = self
            .store
            .update_job_status(
                job_id,
                JobStatus::Running,
                JobProgress {
                    started_at: Some(chrono::Utc::now().to_rfc3339()),
                    ..JobProgress::default()
                },
            )
            .await
        {
            error!("Failed to mark job {job_id} running: {e:#}");
            return;
        }

        match self.fan_out(&job).await {
            Ok(FanOut {
                dispatched,
                skipped,
                total,
            }) => {
                let message = (total == 0).then(|| "No video files found".to_string());
                let update = self
                    .store
                    .update_job_status(
                        job_id,
                        JobStatus::Success,
                        JobProgress {
                            finished_at: Some(chrono::Utc::now().to_rfc3339()),
                            success_count: Some(dispatched),
                            skip_count: Some(skipped),
                            total_count: Some(total),
                            error_message: message,
                            ..JobProgress::default()
                        },
                    )
                    .await;
                if let Err(e) = update {
                    error!("Failed to finish job {job_id}: {e:#}");
                }
                info!("Job {job_id} completed: {dispatched} file(s) dispatched");
            }
            Err(e) => {
                error!("Job {job_id} failed: {e:#}");
                let update = self
                    .store
                    .update_job_status(
                        job_id,
                        JobStatus::Failed,
                        JobProgress {
                            finished_at: Some(chrono::Utc::now().to_rfc3339()),
                            error_message: Some(format!("{e:#}")),
                            ..JobProgress::default()
                        },
                    )
                    .await;
                if let Err(e) = update {
                    error!("Failed to record job {job_id} failure: {e:#}");
                }
            }
        }
    }

    async fn fan_out(self: &Arc<Self>, job: &manual_jobs::Model) -> Result<FanOut> {
        let advanced = decode_advanced_settings(job.advanced_settings.as_deref());
        let settings = {
            let config = self.config.read().await;
            ResolvedSettings::resolve(&config, advanced.as_ref())
        };

        let scan_path = Path::new(&job.scan_path);
        let files: Vec<PathBuf> = if scan_path.is_file() {
            vec![scan_path.to_path_buf()]
        } else {
            self.files
                .scan_folder(&job.scan_path)?
                .into_iter()
                .filter(|f| !f.is_subtitle)
                .map(|f| f.path)
                .collect()
        };

        #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
        let total = files.len() as i32;
        self.store
            .update_job_status(
                job.id,
                JobStatus::Running,
                JobProgress {
                    total_count: Some(total),
                    ..JobProgress::default()
                },
            )
            .await?;

        let min_bytes = settings.organize.min_file_size_mb * 1024 * 1024;
        let blacklist: Vec<String> = settings
            .organize
            .file_name_blacklist
            .iter()
            .map(|s| s.to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        let whitelist: Vec<String> = settings
            .organize
            .file_ext_whitelist
            .iter()
            .map(|s| s.trim_start_matches('.').to_lowercase())
            .collect();

        let mut dispatched = 0;
        let mut skipped = 0;

        for path in files {
            let filename = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_lowercase();
            let extension = path
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_lowercase)
                .unwrap_or_default();

            if blacklist.iter().any(|word| filename.contains(word)) {
                info!("Skipping blacklisted file: {}", path.display());
                skipped += 1;
                continue;
            }
            if !whitelist.is_empty() && !whitelist.contains(&extension) {
                skipped += 1;
                continue;
            }
            if min_bytes > 0 {
                let size = tokio::fs::metadata(&path).await.map(|m| m.len()).unwrap_or(0);
                if size < min_bytes {
                    info!("Skipping small file: {}", path.display());
                    skipped += 1;
                    continue;
                }
            }

            let task = self
                .store
                .create_scrape_task(NewScrapeTask {
                    file_path: path.to_string_lossy().to_string(),
                    output_dir: job.target_folder.clone(),
                    metadata_dir: job.metadata_dir.clone(),
                    link_mode: LinkMode::from_i32(job.link_mode),
                    delete_empty_parent: job.delete_empty_parent,
                    source: job.source.clone(),
                    source_id: Some(job.id),
                    advanced_settings: advanced.clone(),
                })
                .await?;

            info!("Job {} dispatched file: {}", job.id, path.display());
            self.enqueue_task(task.id);
            dispatched += 1;
        }

        Ok(FanOut {
            dispatched,
            skipped,
            total,
        })
    }

    /// One scrape task: run the orchestrator with auto-select and persist
    /// the terminal outcome.
    async fn execute_task(self: &Arc<Self>, task_id: i32) {
        let task = match self.store.get_scrape_task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                error!("Scrape task {task_id} not found");
                return;
            }
            Err(e) => {
                error!("Failed to load scrape task {task_id}: {e:#}");
                return;
            }
        };

        if let Err(e) = self.store.mark_scrape_task_running(task.id).await {
            error!("Failed to mark scrape task {task_id} running: {e:#}");
            return;
        }

        let link_mode = LinkMode::from_i32(task.link_mode);
        let request = ScrapeRequest {
            file_path: task.file_path.clone(),
            output_dir: Some(task.output_dir.clone()).filter(|dir| !dir.is_empty()),
            metadata_dir: Some(task.metadata_dir.clone()).filter(|dir| !dir.is_empty()),
            link_mode,
            auto_select: true,
            advanced_settings: decode_advanced_settings(task.advanced_settings.as_deref()),
        };

        let result = self.scraper.scrape_file(&request, None).await;
        info!(
            "Scrape task {task_id} finished: {} ({})",
            result.status.as_str(),
            task.file_path
        );

        if let Err(e) = self
            .store
            .mark_scrape_task_finished(
                task.id,
                result.status.as_str(),
                &result.message,
                result.dest_path.as_deref(),
            )
            .await
        {
            error!("Failed to record scrape task {task_id} outcome: {e:#}");
        }

        if result.status == ScrapeStatus::Success
            && task.delete_empty_parent
            && matches!(link_mode, LinkMode::Move | LinkMode::Inplace)
        {
            Self::prune_empty_parent(&task.file_path).await;
        }
    }

    /// After a move, drop the source's parent directory when nothing is
    /// left in it.
    async fn prune_empty_parent(file_path: &str) {
        let Some(parent) = Path::new(file_path).parent() else {
            return;
        };

        match tokio::fs::read_dir(parent).await {
            Ok(mut entries) => {
                if let Ok(None) = entries.next_entry().await {
                    if let Err(e) = tokio::fs::remove_dir(parent).await {
                        warn!("Could not remove empty folder {}: {e}", parent.display());
                    } else {
                        info!("Removed empty folder: {}", parent.display());
                    }
                }
            }
            Err(_) => {}
        }
    }
}

struct FanOut {
    dispatched: i32,
    skipped: i32,
    total: i32,
}
