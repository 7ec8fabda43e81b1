use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "bodydouble", version, about = "Pomodoro body double for working with an agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the session until the agent ends it (or Ctrl-C)
    Run,
    /// Write an acknowledgment for the running session
    Ack {
        /// `end`, `continue`, `extend` or `<action>:<task name>`
        content: String,
    },
    /// Inspect and drain the agent's prompt queue
    Queue {
        #[command(subcommand)]
        action: commands::queue::QueueAction,
    },
    /// Inspect or steer the live session
    Session {
        #[command(subcommand)]
        action: commands::session::SessionAction,
    },
    /// Task catalog management
    Task {
        #[command(subcommand)]
        action: commands::task::TaskAction,
    },
    /// One-off chore timers
    Chore {
        #[command(subcommand)]
        action: commands::chore::ChoreAction,
    },
    /// Configuration management
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

fn log_filter() -> tracing_subscriber::EnvFilter {
    let level = std::env::var("BODYDOUBLE_LOG").unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::EnvFilter::try_new(level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Run => commands::run::run(),
        Commands::Ack { content } => commands::ack::run(&content),
        Commands::Queue { action } => commands::queue::run(action),
        Commands::Session { action } => commands::session::run(action),
        Commands::Task { action } => commands::task::run(action),
        Commands::Chore { action } => commands::chore::run(action),
        Commands::Config { action } => commands::config::run(action),
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
