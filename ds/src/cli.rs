//! CLI argument parsing for draftstore

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ds")]
#[command(author, version, about = "Inspect locally saved editor drafts", long_about = None)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the store directory
    #[arg(short, long)]
    pub store: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored keys
    List,

    /// Print the value stored under a key
    Show {
        /// Key to display
        #[arg(required = true)]
        key: String,
    },

    /// Delete a key
    Delete {
        /// Key to delete
        #[arg(required = true)]
        key: String,
    },
}
