use time::format_description::parse;
use tracing_subscriber::fmt::time::OffsetTime;

use crate::cli::Commands;

/// Sets up the global tracing subscriber. Operational commands (worker
/// start/stop) default to `info`; read-only commands (`status`, `list`,
/// `dlq stats`) default to `warn` to keep their output uncluttered.
/// `--verbose` raises the floor to `debug`; `RUST_LOG` always wins.
pub fn setup_tracing_for_command(command: &Commands, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        match command {
            Commands::Worker { .. } => "info",
            _ => "warn",
        }
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_level(true)
        .with_ansi(true)
        .with_timer(OffsetTime::new(
            time::UtcOffset::current_local_offset().unwrap_or(time::UtcOffset::UTC),
            parse("[hour]:[minute]:[second].[subsecond digits:2]").unwrap(),
        ))
        .compact()
        .init();
}
