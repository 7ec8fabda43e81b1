//! `bodydouble run`: the long-running orchestrator.

use bodydouble_core::{Config, DataPaths, PhaseOrchestrator, SessionContext, SessionSummary};

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let paths = DataPaths::discover()?;
    let config = Config::load_from(&paths.config())?;
    let ctx = SessionContext::interactive(&paths, config)?;

    println!("=== Pomodoro Body Double ===");
    println!(
        "Work: {} min | Break: {} min",
        ctx.config.timer.work_minutes, ctx.config.timer.break_minutes
    );
    println!("Data: {}", paths.root.display());
    println!("---");

    let runtime = tokio::runtime::Runtime::new()?;
    let summary = runtime.block_on(async move {
        let mut orchestrator = PhaseOrchestrator::new(ctx);
        let finished = tokio::select! {
            result = orchestrator.run() => Some(result),
            _ = tokio::signal::ctrl_c() => None,
        };
        match finished {
            Some(result) => result,
            None => {
                tracing::info!("interrupted, ending session");
                orchestrator.end_session()
            }
        }
    })?;

    print_summary(&summary);
    Ok(())
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("=== Session Complete ===");
    println!("Duration: {:.1} hours", summary.hours);
    println!("Work sessions: {}", summary.work_sessions);
    println!("Fun sessions: {}", summary.fun_sessions);
    for (task, stats) in &summary.session_log {
        println!(
            "  {task}: {} sessions, {:.0} min",
            stats.sessions,
            stats.hours * 60.0
        );
    }
}
