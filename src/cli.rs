use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = env!("CARGO_PKG_NAME"))]
#[command(about = env!("CARGO_PKG_DESCRIPTION"))]
pub struct Cli {
    /// Path to config.json (default: ./config.json)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Path to the job store file, overrides the config's `data_file`
    #[arg(long, global = true)]
    pub data: Option<String>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Enqueue a new job. Pass a raw command string, or a JSON object
    /// like {"command": "...", "max_retries": 5}.
    Enqueue {
        command: String,
        #[arg(long)]
        max_retries: Option<u32>,
    },
    /// Manage the worker pool
    Worker {
        #[command(subcommand)]
        action: WorkerAction,
    },
    /// Show aggregate queue statistics
    Status,
    /// List jobs, optionally filtered by state
    List {
        #[arg(long = "state")]
        state: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long)]
        verbose: bool,
    },
    /// Inspect and manage the dead-letter queue
    Dlq {
        #[command(subcommand)]
        action: DlqAction,
    },
    /// Read or mutate config.json
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
pub enum WorkerAction {
    /// Start the worker pool in the foreground (blocks until Ctrl-C)
    Start {
        #[arg(long)]
        count: Option<u32>,
    },
    /// Stop the running worker pool
    Stop,
    /// Show per-worker status
    Status,
}

#[derive(Subcommand)]
pub enum DlqAction {
    /// List dead-lettered jobs
    List {
        #[arg(long, default_value_t = 0)]
        offset: usize,
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Retry one or more dead jobs, or all of them with --all
    Retry {
        ids: Vec<String>,
        #[arg(long)]
        all: bool,
    },
    /// Permanently delete one or more dead jobs
    Delete { ids: Vec<String> },
    /// Delete every dead job, optionally restricted by age
    Clear {
        #[arg(long = "older-than")]
        older_than: Option<i64>,
        #[arg(long)]
        confirm: bool,
    },
    /// Aggregate dead-letter statistics
    Stats,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Set a single configuration key
    Set { key: String, value: String },
    /// Reload configuration from disk
    Reload,
}
