use crate::app::App;
use crate::job::JobState;

pub fn handle(app: &App) -> i32 {
    let stats = app.store.statistics();
    println!("queue status:");
    for state in JobState::ALL {
        let count = stats.get(&state).copied().unwrap_or(0);
        println!("  {state:<10} {count}");
    }
    if app.pool.is_running() {
        println!("worker pool: running");
    } else {
        println!("worker pool: stopped");
    }
    0
}
