//! Task catalog commands for CLI.

use bodydouble_core::{DataPaths, TaskCatalogStore, TaskType, WorkLogStore};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum TaskAction {
    /// List known tasks
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a task to the catalog with a zeroed log entry
    Add {
        /// Task name
        name: String,
        /// File under fun_productive instead of work_tasks
        #[arg(long)]
        fun: bool,
    },
}

pub fn run(action: TaskAction) -> Result<(), Box<dyn std::error::Error>> {
    let paths = DataPaths::discover()?;
    paths.ensure_layout()?;
    let tasks = TaskCatalogStore::new(paths.tasks());

    match action {
        TaskAction::List { json } => {
            let catalog = tasks.load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&catalog)?);
            } else {
                for entry in &catalog.work_tasks {
                    println!("work  {}", entry.name);
                }
                for entry in &catalog.fun_productive {
                    println!("fun   {}", entry.name);
                }
            }
        }
        TaskAction::Add { name, fun } => {
            let name = name.trim();
            if name.is_empty() || name.contains(':') {
                return Err("task names must be non-empty and must not contain ':'".into());
            }
            let task_type = if fun { TaskType::Fun } else { TaskType::Work };

            let mut catalog = tasks.load()?;
            if let Some(existing) = catalog.resolve(name) {
                if existing != task_type {
                    return Err(format!("{name} is already a {existing} task").into());
                }
            } else {
                catalog.add(name, task_type);
                tasks.save(&catalog)?;
            }

            let log = WorkLogStore::new(paths.log());
            let mut doc = log.load()?;
            doc.ensure_project(name);
            log.save(&doc)?;
            println!("task added: {name} ({task_type})");
        }
    }
    Ok(())
}
