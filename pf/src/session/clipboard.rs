//! Clipboard capability

use std::io::Write;
use std::process::{Command, Stdio};

use eyre::{Context, Result, eyre};
use tracing::debug;

/// Copy text somewhere the user can paste it from
pub trait Clipboard: Send + Sync {
    fn copy(&self, text: &str) -> Result<()>;
}

/// Pipes text to an external command such as `wl-copy` or `pbcopy`
#[derive(Debug, Clone)]
pub struct CommandClipboard {
    program: String,
    args: Vec<String>,
}

impl CommandClipboard {
    /// Parse a whitespace-separated command line
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or_else(|| eyre!("Clipboard command is empty"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }
}

impl Clipboard for CommandClipboard {
    fn copy(&self, text: &str) -> Result<()> {
        debug!(program = %self.program, text_len = text.len(), "CommandClipboard::copy: called");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .context(format!("Failed to run clipboard command '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(text.as_bytes())
                .context("Failed to write to clipboard command")?;
        }

        let output = child.wait_with_output().context("Failed to wait for clipboard command")?;
        if !output.status.success() {
            return Err(eyre!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        let clipboard = CommandClipboard::new("xclip -selection clipboard").unwrap();
        assert_eq!(clipboard.program, "xclip");
        assert_eq!(clipboard.args, vec!["-selection", "clipboard"]);
        assert!(CommandClipboard::new("   ").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_pipes_to_command() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("copied.txt");
        let clipboard = CommandClipboard::new(&format!("tee {}", out.display())).unwrap();

        clipboard.copy("Hi X").unwrap();
        assert_eq!(std::fs::read_to_string(&out).unwrap(), "Hi X");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_is_error() {
        let clipboard = CommandClipboard::new("false").unwrap();
        assert!(clipboard.copy("x").is_err());
    }

    #[test]
    fn test_missing_program_is_error() {
        let clipboard = CommandClipboard::new("promptforge-no-such-clipboard-tool").unwrap();
        assert!(clipboard.copy("x").is_err());
    }
}
