pub mod cli;
pub mod clients;
pub mod config;
pub mod constants;
pub mod db;
pub mod entities;
pub mod models;
pub mod parser;
pub mod services;
pub mod state;

use clap::Parser;
use cli::{Cli, Commands};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub use config::Config;

pub async fn run() -> anyhow::Result<()> {
    let config = Config::load()?;
    run_with_config(config).await
}

pub async fn run_with_config(config: Config) -> anyhow::Result<()> {
    config.validate()?;
    init_logging(&config);

    let cli = Cli::parse();
    execute_command(cli, config).await
}

fn init_logging(config: &Config) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.general.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn execute_command(cli: Cli, config: Config) -> anyhow::Result<()> {
    match cli.command {
        None => {
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
            Ok(())
        }

        Some(Commands::Init) => {
            if Config::create_default_if_missing()? {
                println!("Config file created. Edit config.toml and set your TMDB token.");
            } else {
                println!("config.toml already exists, leaving it alone.");
            }
            Ok(())
        }

        Some(Commands::Parse { filename, path }) => cli::cmd_parse(&filename, path.as_deref()),

        Some(Commands::Preview { file }) => cli::cmd_preview(config, &file).await,

        Some(Commands::Scrape {
            file,
            output,
            mode,
            metadata_dir,
        }) => cli::cmd_scrape(config, &file, output, &mode, metadata_dir).await,

        Some(Commands::Organize {
            scan_path,
            target,
            mode,
            metadata_dir,
            delete_empty_parent,
        }) => {
            cli::cmd_organize(
                config,
                &scan_path,
                &target,
                &mode,
                metadata_dir,
                delete_empty_parent,
            )
            .await
        }

        Some(Commands::Jobs { limit }) => cli::cmd_jobs(config, limit).await,

        Some(Commands::VerifyToken { token }) => cli::cmd_verify_token(config, &token).await,

        Some(Commands::TestProxy { proxy }) => cli::cmd_test_proxy(config, proxy.as_deref()).await,
    }
}
