//! `config.toml` commands for CLI.
//!
//! Changes take effect the next time `bodydouble run` starts.

use bodydouble_core::{Config, DataPaths};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print one setting
    Get {
        /// Dot path, e.g. "timer.work_minutes" or "ack.overdue_minutes"
        key: String,
    },
    /// Change one setting and write config.toml
    Set {
        /// Dot path
        key: String,
        /// JSON value, or plain text for string settings
        value: String,
    },
    /// Print every setting as JSON
    List,
    /// Overwrite config.toml with the built-in defaults
    Reset,
}

pub fn run(action: ConfigAction) -> Result<(), Box<dyn std::error::Error>> {
    let path = DataPaths::discover()?.config();

    match action {
        ConfigAction::Get { key } => {
            println!("{}", Config::load_from(&path)?.get(&key)?);
        }
        ConfigAction::Set { key, value } => {
            let mut config = Config::load_from(&path)?;
            config.set(&key, &value)?;
            config.save_to(&path)?;
            println!("{key} = {}", config.get(&key)?);
        }
        ConfigAction::List => {
            let config = Config::load_from(&path)?;
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
        ConfigAction::Reset => {
            Config::default().save_to(&path)?;
            println!("{} reset to defaults", path.display());
        }
    }
    Ok(())
}
