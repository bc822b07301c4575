use uuid::Uuid;

use crate::app::App;
use crate::cli::DlqAction;

pub async fn handle(app: &App, action: DlqAction) -> i32 {
    match action {
        DlqAction::List { offset, limit } => {
            let jobs = app.dlq.list(offset, limit);
            if jobs.is_empty() {
                println!("no dead-lettered jobs");
            }
            for job in jobs {
                println!(
                    "{} command={:?} attempts={} error={:?} updated={}",
                    job.id, job.command, job.attempts, job.error_message, job.updated_at
                );
            }
            0
        }
        DlqAction::Retry { ids, all } => {
            if all {
                match app.dlq.retry_all().await {
                    Ok(n) => {
                        println!("retried {n} job(s)");
                        0
                    }
                    Err(e) => {
                        eprintln!("{e}");
                        1
                    }
                }
            } else {
                match parse_ids(&ids) {
                    Ok(ids) => match app.dlq.retry_many(&ids).await {
                        Ok(n) => {
                            println!("retried {n} job(s)");
                            0
                        }
                        Err(e) => {
                            eprintln!("{e}");
                            1
                        }
                    },
                    Err(msg) => {
                        eprintln!("{msg}");
                        1
                    }
                }
            }
        }
        DlqAction::Delete { ids } => match parse_ids(&ids) {
            Ok(ids) => match app.dlq.delete_many(&ids) {
                Ok(n) => {
                    println!("deleted {n} job(s)");
                    0
                }
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            },
            Err(msg) => {
                eprintln!("{msg}");
                1
            }
        },
        DlqAction::Clear { older_than, confirm } => {
            if !confirm {
                eprintln!("refusing to clear the dead-letter queue without --confirm");
                return 1;
            }
            let result = match older_than {
                Some(days) => app.dlq.clear_older_than(days),
                None => app.dlq.clear_all(),
            };
            match result {
                Ok(n) => {
                    println!("cleared {n} job(s)");
                    0
                }
                Err(e) => {
                    eprintln!("{e}");
                    1
                }
            }
        }
        DlqAction::Stats => {
            let stats = app.dlq.statistics();
            println!("dead-letter count:  {}", stats.count);
            println!(
                "oldest:             {}",
                stats
                    .oldest_updated_at
                    .map_or("n/a".to_string(), |t| t.to_string())
            );
            println!(
                "newest:             {}",
                stats
                    .newest_updated_at
                    .map_or("n/a".to_string(), |t| t.to_string())
            );
            println!("timeout failures:   {}", stats.timeout_count);
            0
        }
    }
}

fn parse_ids(raw: &[String]) -> Result<Vec<Uuid>, String> {
    raw.iter()
        .map(|s| Uuid::parse_str(s).map_err(|_| format!("invalid job id: {s}")))
        .collect()
}
