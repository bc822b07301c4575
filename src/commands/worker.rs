use crate::app::App;
use crate::cli::WorkerAction;

/// Runs the worker pool in the foreground until Ctrl-C, then shuts down
/// gracefully. `stop`/`status` only make sense against the pool owned by
/// *this* invocation - a separate `durablequeue worker stop` process has
/// no pool to reach, since this crate does not ship a persistent daemon
/// (see SPEC_FULL.md's ambient Non-Goals).
pub async fn handle(app: &App, action: WorkerAction) -> i32 {
    match action {
        WorkerAction::Start { count } => {
            let count = count.unwrap_or(app.config.worker_count);
            app.pool.start(count).await;
            println!("worker pool started with {count} worker(s), press Ctrl-C to stop");

            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for shutdown signal: {e}");
            }

            println!("shutting down...");
            app.pool.stop().await;
            0
        }
        WorkerAction::Stop => {
            eprintln!(
                "no worker pool is running in this process - stop the process running \
                 `worker start` directly (Ctrl-C or SIGTERM)"
            );
            1
        }
        WorkerAction::Status => {
            let statuses = app.pool.status().await;
            if statuses.is_empty() {
                println!("no workers running in this process");
                return 0;
            }
            for status in statuses {
                println!(
                    "{}: running={} shutdown_requested={}",
                    status.id, status.running, status.shutdown_requested
                );
            }
            0
        }
    }
}
