//! Command-line interface.

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, Subcommand};
use std::time::Duration;

use crate::config::Config;
use crate::db::NewJob;
use crate::models::scrape::{LinkMode, LogLevel, ScrapeRequest, ScrapeResult};
use crate::parser::Parser;
use crate::state::SharedState;

#[derive(ClapParser)]
#[command(name = "seriarr", about = "Scrape and organize TV episodes with TMDB metadata", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a default config.toml in the working directory
    Init,

    /// Parse a filename (optionally with its full path) and print the result
    Parse {
        filename: String,

        /// Full path, for folder-context extraction
        #[arg(long)]
        path: Option<String>,
    },

    /// Parse a file and show the TMDB candidates it would match
    Preview { file: String },

    /// Scrape and organize a single file
    Scrape {
        file: String,

        /// Destination library root; defaults to organizing next to the file
        #[arg(long)]
        output: Option<String>,

        /// Placement mode: move, copy, hardlink, symlink or inplace
        #[arg(long, default_value = "move")]
        mode: String,

        /// Separate root for NFO and artwork
        #[arg(long)]
        metadata_dir: Option<String>,
    },

    /// Scan a folder, queue a job, and organize everything it contains
    Organize {
        scan_path: String,

        /// Destination library root
        #[arg(long)]
        target: String,

        /// Placement mode: move, copy, hardlink, symlink or inplace
        #[arg(long, default_value = "move")]
        mode: String,

        /// Separate root for NFO and artwork
        #[arg(long)]
        metadata_dir: Option<String>,

        /// Remove source folders that end up empty after a move
        #[arg(long)]
        delete_empty_parent: bool,
    },

    /// List jobs and their per-file outcomes
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: u64,
    },

    /// Verify a TMDB API token and store it on success
    VerifyToken { token: String },

    /// Probe TMDB connectivity, optionally through an explicit proxy
    TestProxy {
        #[arg(long)]
        proxy: Option<String>,
    },
}

pub fn parse_link_mode(mode: &str) -> Result<LinkMode> {
    match mode.to_lowercase().as_str() {
        "hardlink" => Ok(LinkMode::Hardlink),
        "move" => Ok(LinkMode::Move),
        "copy" => Ok(LinkMode::Copy),
        "symlink" => Ok(LinkMode::Symlink),
        "inplace" | "in-place" => Ok(LinkMode::Inplace),
        other => anyhow::bail!(
            "Unknown mode '{other}' (expected move, copy, hardlink, symlink or inplace)"
        ),
    }
}

pub fn cmd_parse(filename: &str, path: Option<&str>) -> Result<()> {
    let parser = Parser::new();
    let info = parser.parse(filename, path);
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

pub async fn cmd_preview(config: Config, file: &str) -> Result<()> {
    let state = SharedState::new(config).await?;
    let preview = state.scraper.preview(file).await;

    println!(
        "Parsed: {} S{}E{}",
        preview.parsed_title.as_deref().unwrap_or("?"),
        preview
            .parsed_season
            .map_or("?".to_string(), |s| s.to_string()),
        preview
            .parsed_episode
            .map_or("?".to_string(), |e| e.to_string()),
    );

    if preview.search_results.is_empty() {
        println!("No TMDB candidates found");
    } else {
        for result in &preview.search_results {
            println!(
                "  {} - {} ({})",
                result.id,
                result.name,
                result
                    .first_air_date
                    .map_or("????".to_string(), |d| d.to_string()),
            );
        }
    }
    Ok(())
}

pub async fn cmd_scrape(
    config: Config,
    file: &str,
    output: Option<String>,
    mode: &str,
    metadata_dir: Option<String>,
) -> Result<()> {
    let state = SharedState::new(config).await?;
    let request = ScrapeRequest {
        file_path: file.to_string(),
        output_dir: output,
        metadata_dir,
        link_mode: parse_link_mode(mode)?,
        auto_select: true,
        advanced_settings: None,
    };

    let result = state.scraper.scrape_file(&request, None).await;
    print_scrape_result(&result);
    Ok(())
}

pub async fn cmd_organize(
    config: Config,
    scan_path: &str,
    target: &str,
    mode: &str,
    metadata_dir: Option<String>,
    delete_empty_parent: bool,
) -> Result<()> {
    let state = SharedState::new(config).await?;

    let job = state
        .jobs
        .create_job(NewJob {
            scan_path: scan_path.to_string(),
            target_folder: target.to_string(),
            metadata_dir: metadata_dir.unwrap_or_default(),
            link_mode: parse_link_mode(mode)?,
            delete_empty_parent,
            config_reuse_id: None,
            source: "manual".to_string(),
            advanced_settings: None,
        })
        .await?;

    println!("Job {} queued, scanning {scan_path} ...", job.id);

    let finished = state
        .jobs
        .wait_for_job(job.id, Duration::from_secs(24 * 60 * 60))
        .await?;

    println!(
        "Job {} {}: {} dispatched, {} skipped, {} total",
        finished.id,
        finished.status,
        finished.success_count,
        finished.skip_count,
        finished.total_count
    );

    let tasks = state.store.list_scrape_tasks_for_job(job.id).await?;
    for task in tasks {
        let outcome = task.dest_path.as_deref().unwrap_or_else(|| {
            task.result_message.as_deref().unwrap_or("")
        });
        println!("  [{}] {} -> {}", task.status, task.file_path, outcome);
    }
    Ok(())
}

pub async fn cmd_jobs(config: Config, limit: u64) -> Result<()> {
    let state = SharedState::new(config).await?;
    let (jobs, total) = state.store.list_jobs(limit, 0, None, None).await?;

    println!("{total} job(s)");
    for job in jobs {
        println!(
            "#{} [{}] {} -> {} (dispatched {}, skipped {}, total {})",
            job.id,
            job.status,
            job.scan_path,
            job.target_folder,
            job.success_count,
            job.skip_count,
            job.total_count
        );

        // The job row only records dispatch; per-file outcomes live on the
        // scrape-task rows.
        let tasks = state.store.list_scrape_tasks_for_job(job.id).await?;
        let done = tasks
            .iter()
            .filter(|t| !matches!(t.status.as_str(), "pending" | "running"))
            .count();
        let succeeded = tasks.iter().filter(|t| t.status == "success").count();
        if !tasks.is_empty() {
            println!("    scrapes: {succeeded}/{done} succeeded ({} task(s))", tasks.len());
        }
        if let Some(error) = &job.error_message {
            println!("    note: {error}");
        }
    }

    Ok(())
}

pub async fn cmd_verify_token(config: Config, token: &str) -> Result<()> {
    let state = SharedState::new(config).await?;
    let status = state
        .tmdb
        .save_and_verify_token(token)
        .await
        .context("Token verification failed")?;

    if status.is_valid {
        println!("Token is valid and has been saved");
    } else {
        println!(
            "Token rejected: {}",
            status.error_message.unwrap_or_default()
        );
    }
    Ok(())
}

pub async fn cmd_test_proxy(config: Config, proxy: Option<&str>) -> Result<()> {
    let state = SharedState::new(config).await?;
    let (ok, message, latency) = state.tmdb.test_proxy(proxy).await;

    match latency {
        Some(ms) => println!("{message} ({ms} ms)"),
        None => println!("{message}"),
    }
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

fn print_scrape_result(result: &ScrapeResult) {
    for step in &result.scrape_logs {
        let marker = if step.completed { "✓" } else { "✗" };
        println!("{marker} {}", step.name);
        for entry in &step.logs {
            let prefix = match entry.level {
                LogLevel::Error => "error: ",
                LogLevel::Warning => "warn:  ",
                _ => "",
            };
            println!("    {prefix}{}", entry.message);
        }
    }

    println!("Status: {}", result.status.as_str());
    if !result.message.is_empty() {
        println!("{}", result.message);
    }
    if let Some(dest) = &result.dest_path {
        println!("Placed at: {dest}");
    }
    if !result.search_results.is_empty()
        && matches!(
            result.status,
            crate::models::scrape::ScrapeStatus::NeedSelection
        )
    {
        println!("Candidates:");
        for candidate in &result.search_results {
            println!(
                "  {} - {} ({} seasons, {} episodes)",
                candidate.id,
                candidate.name,
                candidate
                    .number_of_seasons
                    .map_or("?".to_string(), |n| n.to_string()),
                candidate
                    .number_of_episodes
                    .map_or("?".to_string(), |n| n.to_string()),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_link_mode() {
        assert_eq!(parse_link_mode("move").unwrap(), LinkMode::Move);
        assert_eq!(parse_link_mode("Copy").unwrap(), LinkMode::Copy);
        assert_eq!(parse_link_mode("HARDLINK").unwrap(), LinkMode::Hardlink);
        assert_eq!(parse_link_mode("in-place").unwrap(), LinkMode::Inplace);
        assert!(parse_link_mode("teleport").is_err());
    }
}
