use std::str::FromStr;

use crate::app::App;
use crate::job::{Job, JobState};

pub fn handle(
    app: &App,
    state_filter: Option<String>,
    limit: usize,
    offset: usize,
    verbose: bool,
) -> i32 {
    let state = match state_filter {
        Some(s) => match JobState::from_str(&s) {
            Ok(state) => Some(state),
            Err(e) => {
                eprintln!("{e}");
                return 1;
            }
        },
        None => None,
    };

    let mut jobs: Vec<Job> = match state {
        Some(s) => app.store.list_by_state(s),
        None => app.store.all(),
    };
    jobs.sort_by_key(|j| j.created_at);

    let page: Vec<Job> = jobs.into_iter().skip(offset).take(limit).collect();
    if page.is_empty() {
        println!("no jobs");
        return 0;
    }

    for job in &page {
        if verbose {
            println!(
                "{} [{}] attempts={}/{} command={:?} created={} updated={}{}",
                job.id,
                job.state,
                job.attempts,
                job.max_retries,
                job.command,
                job.created_at,
                job.updated_at,
                job.error_message
                    .as_ref()
                    .map(|m| format!(" error={m:?}"))
                    .unwrap_or_default(),
            );
        } else {
            println!("{} [{}] {}", job.id, job.state, job.command);
        }
    }
    0
}
