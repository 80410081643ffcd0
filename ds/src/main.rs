use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;

use draftstore::cli::{Cli, Command};
use draftstore::config::Config;
use draftstore::{FileStore, KvStore};

fn setup_logging() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();
    Ok(())
}

fn main() -> Result<()> {
    setup_logging().context("Failed to setup logging")?;

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let store_path = cli.store.unwrap_or(config.store_path);

    info!("draftstore opening {}", store_path.display());
    let store = FileStore::open(&store_path)?;

    match cli.command {
        Command::List => {
            let keys = store.keys()?;
            if keys.is_empty() {
                println!("No drafts found");
            } else {
                for key in keys {
                    println!("{}", key.cyan());
                }
            }
        }
        Command::Show { key } => match store.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("{} No value for key: {}", "✗".red(), key),
        },
        Command::Delete { key } => {
            store.delete(&key)?;
            println!("{} Deleted: {}", "✓".green(), key);
        }
    }

    Ok(())
}
