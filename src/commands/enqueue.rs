use serde::Deserialize;

use crate::app::App;

#[derive(Deserialize)]
struct JsonJob {
    command: String,
    max_retries: Option<u32>,
}

pub async fn handle(app: &App, command: String, max_retries_flag: Option<u32>) -> i32 {
    let (command, max_retries) = if command.trim_start().starts_with('{') {
        match serde_json::from_str::<JsonJob>(&command) {
            Ok(parsed) => (parsed.command, parsed.max_retries.or(max_retries_flag)),
            Err(e) => {
                eprintln!("invalid job JSON: {e}");
                return 1;
            }
        }
    } else {
        (command, max_retries_flag)
    };

    let max_retries = max_retries.unwrap_or(app.config.max_retries);

    match app.coordinator.enqueue(command, max_retries).await {
        Ok(job) => {
            println!("enqueued {} (max_retries={})", job.id, job.max_retries);
            0
        }
        Err(e) => {
            eprintln!("{e}");
            1
        }
    }
}
