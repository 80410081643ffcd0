//! Interactive fill session for PromptForge
//!
//! Drives a form session from the terminal: assignments are edits, slash
//! commands are the form's buttons, and view updates print as they arrive.

mod session;

pub use session::{FillRepl, ReplInput, TRUNCATED_NOTE, field_for, format_update, parse_input};

use std::path::Path;
use std::sync::Arc;

use eyre::{Context, Result};

use crate::config::Config;
use crate::draft::DraftStore;
use crate::preview::Mode;
use crate::session::{CommandClipboard, Session, SessionOptions, SessionServices};
use crate::template::Template;
use crate::trial::{ConfiguredBackends, TrialOrchestrator};

/// Run the interactive fill session
///
/// This is the main entry point for `pf fill`.
pub async fn run_interactive(config: &Config, file: &Path, draft_id: Option<String>, author: bool) -> Result<()> {
    let template = Template::from_file(file)?;

    let kv = draftstore::FileStore::open(&config.drafts.store_dir).context("Failed to open draft store")?;
    let services = SessionServices {
        drafts: DraftStore::new(Arc::new(kv)),
        trials: Arc::new(TrialOrchestrator::new(
            Arc::new(ConfiguredBackends::from_config(config)),
            &config.trial,
        )),
        clipboard: Arc::new(CommandClipboard::new(&config.clipboard.command)?),
    };

    let mode = if author { Mode::Author } else { Mode::Use };
    let mut options =
        SessionOptions::new(mode, template.name, template.text.trim_end_matches('\n')).with_config(config);
    if let Some(draft_id) = draft_id {
        options = options.with_draft_id(draft_id);
    }

    let (handle, updates) = Session::spawn(options, services);
    let mut repl = FillRepl::new(handle, mode);
    repl.run(updates).await
}
