//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// PromptForge - prompt template authoring
#[derive(Parser)]
#[command(
    name = "pf",
    about = "Author, preview and trial prompt templates",
    version = env!("CARGO_PKG_VERSION"),
    after_help = "Logs are written to: ~/.local/share/promptforge/logs/promptforge.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands
#[derive(Subcommand)]
pub enum Command {
    /// List the variables a template uses
    Vars {
        /// Template file
        file: PathBuf,

        /// Print the template with placeholders highlighted
        #[arg(long)]
        highlight: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Render a template with the given values
    Render {
        /// Template file
        file: PathBuf,

        /// Variable value as name=value (repeatable)
        #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,

        /// Fail if any variable has no value
        #[arg(long, conflicts_with = "sample")]
        strict: bool,

        /// Show missing variables as [NAME]
        #[arg(long)]
        sample: bool,
    },

    /// Render a template and run it once against a model
    Trial {
        /// Template file
        file: PathBuf,

        /// Model to run (see `pf models`)
        #[arg(short, long)]
        model: String,

        /// Variable value as name=value (repeatable)
        #[arg(short, long = "set", value_name = "NAME=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },

    /// List trial models and whether their credentials are set
    Models {
        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Fill in a template interactively with live preview
    Fill {
        /// Template file
        file: PathBuf,

        /// Keep a draft under this id while editing
        #[arg(short, long)]
        draft_id: Option<String>,

        /// Edit the template itself instead of filling its variables
        #[arg(long)]
        author: bool,
    },
}

/// Output format for listing commands
#[derive(Clone, Debug, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "plain" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Unknown format: {}. Use: text or json", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Parse `name=value`; the value may itself contain `=`
pub fn parse_assignment(s: &str) -> Result<(String, String), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected NAME=VALUE, got '{}'", s))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Missing variable name in '{}'", s));
    }
    Ok((name.to_string(), value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_vars() {
        let cli = Cli::parse_from(["pf", "vars", "welcome.txt", "--highlight"]);
        match cli.command {
            Command::Vars { file, highlight, .. } => {
                assert_eq!(file, PathBuf::from("welcome.txt"));
                assert!(highlight);
            }
            _ => panic!("Expected Vars command"),
        }
    }

    #[test]
    fn test_cli_parse_render_sets() {
        let cli = Cli::parse_from(["pf", "render", "t.txt", "--set", "a=X", "-s", "b=1=2", "--sample"]);
        if let Command::Render {
            set, strict, sample, ..
        } = cli.command
        {
            assert_eq!(
                set,
                vec![("a".to_string(), "X".to_string()), ("b".to_string(), "1=2".to_string())]
            );
            assert!(!strict);
            assert!(sample);
        } else {
            panic!("Expected Render command");
        }
    }

    #[test]
    fn test_cli_strict_conflicts_with_sample() {
        assert!(Cli::try_parse_from(["pf", "render", "t.txt", "--strict", "--sample"]).is_err());
    }

    #[test]
    fn test_cli_parse_fill() {
        let cli = Cli::parse_from(["pf", "-c", "/path/to/config.yml", "fill", "t.txt", "--draft-id", "t1"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/config.yml")));
        assert!(matches!(
            cli.command,
            Command::Fill { draft_id: Some(ref id), author: false, .. } if id == "t1"
        ));
    }

    #[test]
    fn test_parse_assignment() {
        assert_eq!(parse_assignment("name=Ana").unwrap(), ("name".to_string(), "Ana".to_string()));
        assert_eq!(parse_assignment("empty=").unwrap(), ("empty".to_string(), String::new()));
        assert!(parse_assignment("novalue").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn test_output_format_from_str() {
        assert!(matches!("text".parse::<OutputFormat>(), Ok(OutputFormat::Text)));
        assert!(matches!("JSON".parse::<OutputFormat>(), Ok(OutputFormat::Json)));
        assert!("table".parse::<OutputFormat>().is_err());
    }
}
