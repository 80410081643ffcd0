//! PromptForge - prompt template authoring
//!
//! CLI entry point for inspecting, rendering, trialling and filling templates.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::info;

use promptforge::cli::{Cli, Command, OutputFormat};
use promptforge::config::Config;
use promptforge::repl;
use promptforge::template::{MissingPolicy, Segment, Template, Values, highlight, render, render_with};
use promptforge::trial::{ConfiguredBackends, ModelId, TrialOrchestrator};

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("promptforge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Setup tracing subscriber - write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::File::create(log_dir.join("promptforge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    setup_logging(cli.verbose).context("Failed to setup logging")?;

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    // Dispatch command
    match cli.command {
        Command::Vars {
            file,
            highlight,
            format,
        } => cmd_vars(&file, highlight, format),
        Command::Render {
            file,
            set,
            strict,
            sample,
        } => cmd_render(&file, set, strict, sample),
        Command::Trial { file, model, set } => cmd_trial(&config, &file, &model, set).await,
        Command::Models { format } => cmd_models(&config, format),
        Command::Fill {
            file,
            draft_id,
            author,
        } => repl::run_interactive(&config, &file, draft_id, author).await,
    }
}

fn read_template(file: &Path) -> Result<Template> {
    Template::from_file(file).context(format!("Failed to load template {}", file.display()))
}

/// List variables, or print the template with placeholders highlighted
fn cmd_vars(file: &Path, with_highlight: bool, format: OutputFormat) -> Result<()> {
    let template = read_template(file)?;

    if with_highlight {
        for segment in highlight(&template.text) {
            match segment {
                Segment::Text(text) => print!("{}", text),
                Segment::Placeholder { raw, .. } => print!("{}", raw.yellow().bold()),
            }
        }
        println!();
        return Ok(());
    }

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&template.variables)?),
        OutputFormat::Text => {
            if template.variables.is_empty() {
                println!("{}", "No variables found.".dimmed());
            }
            for variable in &template.variables {
                println!("{}", variable);
            }
        }
    }
    Ok(())
}

fn cmd_render(file: &Path, set: Vec<(String, String)>, strict: bool, sample: bool) -> Result<()> {
    let template = read_template(file)?;
    let values: Values = set.into_iter().collect();

    let policy = if strict {
        MissingPolicy::Error
    } else if sample {
        MissingPolicy::Sample
    } else {
        MissingPolicy::Keep
    };

    let rendered = render_with(&template.text, &values, policy)?;
    print!("{}", rendered);
    if !rendered.ends_with('\n') {
        println!();
    }
    Ok(())
}

async fn cmd_trial(config: &Config, file: &Path, model: &str, set: Vec<(String, String)>) -> Result<()> {
    let template = read_template(file)?;
    let values: Values = set.into_iter().collect();
    let prompt = render(&template.text, &values);

    let orchestrator = TrialOrchestrator::new(Arc::new(ConfiguredBackends::from_config(config)), &config.trial);

    eprintln!("{} {}", "Running trial on".dimmed(), model.yellow());
    let output = orchestrator.run_trial_named(model, &prompt).await?;

    println!("{}", output.text);
    if output.stop_reason.is_truncated() {
        eprintln!("{}", repl::TRUNCATED_NOTE.yellow());
    }
    eprintln!(
        "{}",
        format!(
            "{} in {:.1}s, {} input / {} output tokens",
            output.model,
            output.elapsed.as_secs_f64(),
            output.usage.input_tokens,
            output.usage.output_tokens
        )
        .dimmed()
    );
    Ok(())
}

fn cmd_models(config: &Config, format: OutputFormat) -> Result<()> {
    let backends = ConfiguredBackends::from_config(config);

    match format {
        OutputFormat::Json => {
            let models: Vec<serde_json::Value> = ModelId::ALL
                .iter()
                .map(|model| {
                    serde_json::json!({
                        "id": model.as_str(),
                        "provider": model.provider().to_string(),
                        "credentials": backends.has_credentials(*model),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&models)?);
        }
        OutputFormat::Text => {
            println!("{:<16} {:<10} {}", "MODEL".bold(), "PROVIDER".bold(), "CREDENTIALS".bold());
            for model in ModelId::ALL {
                let credentials = if backends.has_credentials(model) {
                    "ok".green()
                } else {
                    format!("missing {}", backends.credential_env(model)).red()
                };
                println!("{:<16} {:<10} {}", model.as_str(), model.provider().to_string(), credentials);
            }
        }
    }
    Ok(())
}
