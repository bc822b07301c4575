//! Wires argument parsing, config loading, tracing, and the application
//! context together, then dispatches to the command handlers.

use std::path::{Path, PathBuf};

use clap::Parser;

use crate::app::App;
use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::setup_tracing::setup_tracing_for_command;
use crate::{commands, error};

const DEFAULT_CONFIG_PATH: &str = "config.json";

pub async fn run() -> i32 {
    let cli = Cli::parse();
    setup_tracing_for_command(&cli.command, cli.verbose);

    let config_path: PathBuf = cli
        .config
        .clone()
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
        .into();

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    let data_path = resolve_data_path(&config, cli.data.as_deref());

    let mut app = match App::new(config, data_path) {
        Ok(app) => app,
        Err(e) => return fail(&e),
    };

    match cli.command {
        Commands::Enqueue { command, max_retries } => {
            commands::enqueue::handle(&app, command, max_retries).await
        }
        Commands::Worker { action } => commands::worker::handle(&app, action).await,
        Commands::Status => commands::status::handle(&app),
        Commands::List {
            state,
            limit,
            offset,
            verbose,
        } => commands::list::handle(&app, state, limit, offset, verbose),
        Commands::Dlq { action } => commands::dlq::handle(&app, action).await,
        Commands::Config { action } => commands::config::handle(&mut app, &config_path, action),
    }
}

fn resolve_data_path(config: &Config, override_path: Option<&str>) -> PathBuf {
    override_path
        .map(PathBuf::from)
        .unwrap_or_else(|| Path::new(&config.data_file).to_path_buf())
}

fn fail(e: &error::QueueError) -> i32 {
    eprintln!("{e}");
    1
}
