//! REPL session management

use colored::Colorize;
use eyre::Result;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tokio::sync::mpsc;
use tracing::debug;

use crate::preview::{Mode, value_field};
use crate::session::{SessionError, SessionHandle, Submission, ViewUpdate};

/// One line of user input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    /// `name=value`
    Assign { name: String, value: String },
    Trial(String),
    Copy,
    Submit,
    Show,
    Cooldown,
    Help,
    Quit,
    Unknown(String),
}

/// Parse a trimmed, non-empty input line
pub fn parse_input(line: &str) -> ReplInput {
    if let Some(command) = line.strip_prefix('/') {
        let mut parts = command.split_whitespace();
        return match parts.next().unwrap_or("") {
            "trial" | "t" => match parts.next() {
                Some(model) => ReplInput::Trial(model.to_string()),
                None => ReplInput::Unknown(line.to_string()),
            },
            "copy" => ReplInput::Copy,
            "submit" => ReplInput::Submit,
            "show" | "s" => ReplInput::Show,
            "cooldown" => ReplInput::Cooldown,
            "help" | "h" => ReplInput::Help,
            "quit" | "q" | "exit" => ReplInput::Quit,
            _ => ReplInput::Unknown(line.to_string()),
        };
    }

    match line.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => ReplInput::Assign {
            name: name.trim().to_string(),
            value: value.trim_start().to_string(),
        },
        _ => ReplInput::Unknown(line.to_string()),
    }
}

/// Shown under a trial reply that hit the token limit
pub const TRUNCATED_NOTE: &str = "(reply cut off at the max-tokens limit)";

/// Terminal rendering of a view update
///
/// Restore offers are handled by the REPL itself and print nothing here.
pub fn format_update(update: &ViewUpdate) -> Option<String> {
    match update {
        ViewUpdate::Badges(variables) if variables.is_empty() => Some(format!("{}", "no variables".dimmed())),
        ViewUpdate::Badges(variables) => {
            let badges: Vec<String> = variables.iter().map(|v| format!("[{}]", v).cyan().to_string()).collect();
            Some(format!("{} {}", "vars:".dimmed(), badges.join(" ")))
        }
        ViewUpdate::Preview(text) => Some(format!("{}\n{}", "preview:".dimmed(), text)),
        ViewUpdate::ErrorBanner(message) => Some(format!("{} {}", "error:".red().bold(), message)),
        ViewUpdate::OfferRestore { .. } => None,
        ViewUpdate::TrialStarted { model } => Some(format!("{} {}", "running trial on".dimmed(), model.to_string().yellow())),
        ViewUpdate::TrialResult(Ok(output)) => {
            let mut text = format!(
                "{} ({} in {:.1}s, {} tokens)\n{}",
                "trial result".bright_green(),
                output.model,
                output.elapsed.as_secs_f64(),
                output.usage.output_tokens,
                output.text
            );
            if output.stop_reason.is_truncated() {
                text.push_str(&format!("\n{}", TRUNCATED_NOTE.yellow()));
            }
            Some(text)
        }
        ViewUpdate::TrialResult(Err(e)) => Some(format!("{} {}", "trial failed:".red().bold(), e)),
        ViewUpdate::Copied => Some(format!("{}", "copied to clipboard".bright_green())),
        ViewUpdate::Submitted => None,
    }
}

/// Form field an assignment edits
///
/// In use-mode the template text is fixed, so every name is a variable,
/// `text` included.
pub fn field_for(mode: Mode, name: &str) -> String {
    match mode {
        Mode::Use => value_field(name),
        Mode::Author => name.to_string(),
    }
}

/// Interactive fill session
pub struct FillRepl {
    handle: SessionHandle,
    mode: Mode,
}

impl FillRepl {
    pub fn new(handle: SessionHandle, mode: Mode) -> Self {
        Self { handle, mode }
    }

    /// Run the REPL main loop until submit or quit
    pub async fn run(&mut self, mut updates: mpsc::UnboundedReceiver<ViewUpdate>) -> Result<()> {
        debug!(session = %self.handle.id(), "FillRepl::run: called");
        let mut rl = DefaultEditor::new().map_err(|e| eyre::eyre!("Failed to initialize readline: {}", e))?;
        self.print_welcome();

        let offered = self.handle.attach().await.unwrap_or(false);
        if offered {
            self.answer_restore(&mut rl, &mut updates).await?;
        }

        let printer = tokio::spawn(async move {
            while let Some(update) = updates.recv().await {
                if let Some(text) = format_update(&update) {
                    println!("{}", text);
                }
            }
        });

        loop {
            let readline = rl.readline(&format!("{} ", ">".bright_green()));

            match readline {
                Ok(line) => {
                    let input = line.trim();
                    if input.is_empty() {
                        continue;
                    }
                    let _ = rl.add_history_entry(input);

                    if !self.handle_input(parse_input(input)).await {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    // Ctrl+C - just show new prompt
                    println!("^C");
                    continue;
                }
                Err(ReadlineError::Eof) => {
                    // Ctrl+D - exit
                    println!();
                    break;
                }
                Err(err) => {
                    let _ = self.handle.detach().await;
                    return Err(eyre::eyre!("Readline error: {}", err));
                }
            }
        }

        let _ = self.handle.detach().await;
        let _ = printer.await;
        Ok(())
    }

    /// Ask whether to restore the saved draft; anything but yes discards it
    async fn answer_restore(
        &mut self,
        rl: &mut DefaultEditor,
        updates: &mut mpsc::UnboundedReceiver<ViewUpdate>,
    ) -> Result<()> {
        while let Ok(update) = updates.try_recv() {
            match update {
                ViewUpdate::OfferRestore { saved_at, fields } => {
                    println!(
                        "{} {} ({} fields)",
                        "Found a draft saved".bright_cyan(),
                        saved_at.format("%Y-%m-%d %H:%M:%S UTC"),
                        fields.len()
                    );
                }
                other => {
                    if let Some(text) = format_update(&other) {
                        println!("{}", text);
                    }
                }
            }
        }

        let answer = match rl.readline("Restore it? [y/N] ") {
            Ok(answer) => answer,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => String::new(),
            Err(err) => return Err(eyre::eyre!("Readline error: {}", err)),
        };

        let result = if matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
            self.handle.restore_draft().await
        } else {
            self.handle.discard_draft().await
        };
        if let Err(e) = result {
            debug!(error = %e, "FillRepl::answer_restore: draft choice failed");
        }
        Ok(())
    }

    /// Handle one input; returns false when the REPL should exit
    async fn handle_input(&mut self, input: ReplInput) -> bool {
        let result = match input {
            ReplInput::Assign { name, value } => self.handle.field_changed(&field_for(self.mode, &name), &value).await,
            ReplInput::Trial(model) => self.handle.request_trial(&model).await.map(|_| ()),
            ReplInput::Copy => self.handle.copy_preview().await,
            ReplInput::Submit => match self.handle.submit().await {
                Ok(submission) => {
                    print_submission(&submission);
                    return false;
                }
                Err(e) => Err(e),
            },
            ReplInput::Show => match self.handle.current_view().await {
                Ok(view) => {
                    if let Some(text) = format_update(&ViewUpdate::Badges(view.variables)) {
                        println!("{}", text);
                    }
                    if let Some(preview) = view.preview {
                        println!("{}", preview);
                    }
                    Ok(())
                }
                Err(e) => Err(e),
            },
            ReplInput::Cooldown => {
                let remaining = self.handle.cooldown_remaining();
                if self.handle.can_run_trial() {
                    println!("{}", "A trial can run now.".bright_green());
                } else if remaining.is_zero() {
                    println!("{}", "A trial is still running.".yellow());
                } else {
                    println!("Next trial in {:.1}s", remaining.as_secs_f64());
                }
                Ok(())
            }
            ReplInput::Help => {
                self.print_help();
                Ok(())
            }
            ReplInput::Quit => return false,
            ReplInput::Unknown(line) => {
                println!("{} Unknown input: {}", "?".yellow(), line);
                println!("Type {} for available commands", "/help".yellow());
                Ok(())
            }
        };

        match result {
            Ok(()) => true,
            Err(SessionError::Closed) => false,
            // Everything else was reported on the error banner
            Err(_) => true,
        }
    }

    /// Print welcome message
    fn print_welcome(&self) {
        println!();
        println!("{}", "PromptForge".bright_cyan().bold());
        match self.mode {
            Mode::Use => println!("Set values with {}", "name=value".yellow()),
            Mode::Author => println!("Edit fields with {} or {}", "text=...".yellow(), "name=...".yellow()),
        }
        println!("Type {} for help, {} to quit", "/help".yellow(), "/quit".yellow());
        println!();
    }

    /// Print help message
    fn print_help(&self) {
        println!();
        println!("{}", "Available Commands:".bright_cyan());
        println!("  {:16} Set a field", "name=value".yellow());
        println!("  {:16} Run the current prompt against a model", "/trial <model>".yellow());
        println!("  {:16} Copy the current prompt", "/copy".yellow());
        println!("  {:16} Show variables and preview now", "/show".yellow());
        println!("  {:16} Time until the next trial", "/cooldown".yellow());
        println!("  {:16} Finish and print the result", "/submit".yellow());
        println!("  {:16} Exit without submitting", "/quit".yellow());
        println!();
    }
}

fn print_submission(submission: &Submission) {
    match submission {
        Submission::Prompt(filled) => {
            println!("{}", "Final prompt:".bright_cyan());
            println!("{}", filled.final_prompt);
        }
        Submission::Template(template) => {
            println!("{}", "Template:".bright_cyan());
            match serde_yaml::to_string(template) {
                Ok(yaml) => print!("{}", yaml),
                Err(e) => println!("{} {}", "error:".red(), e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{StopReason, TokenUsage};
    use crate::trial::{ModelId, TrialError, TrialOutput};
    use std::time::Duration;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_input("name = Ana Lee"),
            ReplInput::Assign {
                name: "name".to_string(),
                value: "Ana Lee".to_string()
            }
        );
        assert_eq!(
            parse_input("url=a=b"),
            ReplInput::Assign {
                name: "url".to_string(),
                value: "a=b".to_string()
            }
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_input("/trial gpt-4o"), ReplInput::Trial("gpt-4o".to_string()));
        assert_eq!(parse_input("/q"), ReplInput::Quit);
        assert_eq!(parse_input("/submit"), ReplInput::Submit);
        assert!(matches!(parse_input("/trial"), ReplInput::Unknown(_)));
        assert!(matches!(parse_input("just words"), ReplInput::Unknown(_)));
        assert!(matches!(parse_input("=value"), ReplInput::Unknown(_)));
    }

    #[test]
    fn test_field_for_mode() {
        assert_eq!(field_for(Mode::Use, "text"), value_field("text"));
        assert_eq!(field_for(Mode::Use, "userName"), value_field("userName"));
        assert_eq!(field_for(Mode::Author, "text"), "text");
        assert_eq!(field_for(Mode::Author, "name"), "name");
    }

    #[test]
    fn test_format_updates() {
        colored::control::set_override(false);

        assert_eq!(
            format_update(&ViewUpdate::Badges(vec!["a".to_string(), "b".to_string()])).unwrap(),
            "vars: [a] [b]"
        );
        assert_eq!(
            format_update(&ViewUpdate::TrialResult(Err(TrialError::RateLimited {
                retry_after: Duration::from_secs(3),
                in_flight: false,
            })))
            .unwrap(),
            "trial failed: Trials are cooling down, try again in 3s"
        );
        assert_eq!(
            format_update(&ViewUpdate::TrialStarted {
                model: ModelId::ClaudeHaiku
            })
            .unwrap(),
            "running trial on claude-haiku"
        );
        assert!(format_update(&ViewUpdate::Submitted).is_none());

        let output = TrialOutput {
            model: ModelId::Gpt4o,
            text: "Once upon".to_string(),
            stop_reason: StopReason::MaxTokens,
            usage: TokenUsage::default(),
            elapsed: Duration::from_millis(1500),
        };
        assert_eq!(
            format_update(&ViewUpdate::TrialResult(Ok(output))).unwrap(),
            format!("trial result (gpt-4o in 1.5s, 0 tokens)\nOnce upon\n{}", TRUNCATED_NOTE)
        );
    }
}
