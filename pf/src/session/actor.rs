//! Session - actor that owns one form's editing state
//!
//! Every host event for a form goes through one task, so preview, autosave,
//! restore and trial bookkeeping never race each other. Timers are plain
//! deadlines polled by the actor loop; dropping the loop drops all pending
//! work with it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::clipboard::Clipboard;
use super::handle::SessionHandle;
use super::messages::{SessionCommand, SessionError, SessionResponse, Submission, ViewUpdate};
use crate::config::Config;
use crate::debounce::Debouncer;
use crate::draft::{DEFAULT_AUTOSAVE_DEBOUNCE, DraftStore, SavedDraft};
use crate::preview::{DEFAULT_PREVIEW_DEBOUNCE, DerivedView, Mode, PreviewController};
use crate::template::{Template, render, suggest_category, suggest_name};
use crate::trial::{ModelId, TrialError, TrialOrchestrator, TrialOutput};

/// Author-mode field holding the template name
pub const NAME_FIELD: &str = "name";

/// Author-mode field holding the template description
pub const DESCRIPTION_FIELD: &str = "description";

/// Author-mode field holding the template category
pub const CATEGORY_FIELD: &str = "category";

/// How a session is set up
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub mode: Mode,
    /// Template name; in author-mode the `name` field overrides it
    pub name: String,
    /// Initial template text; fixed in use-mode
    pub text: String,
    /// Drafts are only kept when an id is given
    pub draft_id: Option<String>,
    pub preview_debounce: Duration,
    pub autosave_debounce: Duration,
}

impl SessionOptions {
    pub fn new(mode: Mode, name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            mode,
            name: name.into(),
            text: text.into(),
            draft_id: None,
            preview_debounce: DEFAULT_PREVIEW_DEBOUNCE,
            autosave_debounce: DEFAULT_AUTOSAVE_DEBOUNCE,
        }
    }

    /// Take the debounce windows from the loaded configuration
    pub fn with_config(mut self, config: &Config) -> Self {
        self.preview_debounce = config.preview.debounce();
        self.autosave_debounce = config.drafts.debounce();
        self
    }

    pub fn with_draft_id(mut self, draft_id: impl Into<String>) -> Self {
        self.draft_id = Some(draft_id.into());
        self
    }
}

/// Collaborators a session talks to
#[derive(Clone)]
pub struct SessionServices {
    pub drafts: DraftStore,
    pub trials: Arc<TrialOrchestrator>,
    pub clipboard: Arc<dyn Clipboard>,
}

type TrialOutcome = Result<TrialOutput, TrialError>;

pub struct Session {
    id: String,
    mode: Mode,
    name: String,
    draft_id: Option<String>,
    preview: PreviewController,
    autosave: Debouncer,
    services: SessionServices,
    events: mpsc::UnboundedSender<ViewUpdate>,
    trial_tx: mpsc::Sender<TrialOutcome>,
    trial_rx: mpsc::Receiver<TrialOutcome>,
    pending_restore: Option<SavedDraft>,
}

impl Session {
    /// Spawn a session actor
    ///
    /// Returns the command handle and the stream of view updates. The stream
    /// ends once the session is detached.
    pub fn spawn(
        options: SessionOptions,
        services: SessionServices,
    ) -> (SessionHandle, mpsc::UnboundedReceiver<ViewUpdate>) {
        let id = Uuid::now_v7().to_string();
        debug!(%id, mode = ?options.mode, draft_id = ?options.draft_id, "Session::spawn: called");

        let (tx, rx) = mpsc::channel(256);
        let (events, events_rx) = mpsc::unbounded_channel();
        let (trial_tx, trial_rx) = mpsc::channel(4);

        let trials = Arc::clone(&services.trials);
        let session = Self {
            id: id.clone(),
            mode: options.mode,
            name: options.name,
            draft_id: options.draft_id,
            preview: PreviewController::new(options.mode, options.text, options.preview_debounce),
            autosave: Debouncer::new("autosave", options.autosave_debounce),
            services,
            events,
            trial_tx,
            trial_rx,
            pending_restore: None,
        };

        tokio::spawn(actor_loop(session, rx));
        info!(%id, "Session spawned");

        (SessionHandle::new(id, tx, trials), events_rx)
    }

    fn emit(&self, update: ViewUpdate) {
        // The host may have stopped listening; updates are best-effort
        let _ = self.events.send(update);
    }

    /// Report a failure on the banner and hand it back for the reply
    fn fail(&self, err: SessionError) -> SessionError {
        warn!(session = %self.id, error = %err, "Session operation failed");
        self.emit(ViewUpdate::ErrorBanner(err.to_string()));
        err
    }

    fn emit_view(&self, view: DerivedView) {
        self.emit(ViewUpdate::Badges(view.variables));
        if let Some(preview) = view.preview {
            self.emit(ViewUpdate::Preview(preview));
        }
    }

    /// The edit pipeline: buffer the value and restart both timers
    fn field_changed(&mut self, field: &str, value: &str) {
        debug!(session = %self.id, %field, "Session::field_changed: called");
        self.preview.on_edit(field, value);
        if self.draft_id.is_some() {
            self.autosave.arm();
        }
    }

    async fn attach(&mut self) -> SessionResponse<bool> {
        debug!(session = %self.id, "Session::attach: called");
        self.emit_view(self.preview.derive());

        let Some(draft_id) = self.draft_id.clone() else {
            return Ok(false);
        };

        match self.services.drafts.load(&draft_id).await {
            Ok(Some(draft)) => {
                info!(session = %self.id, %draft_id, saved_at = %draft.saved_at, "Offering draft restore");
                self.emit(ViewUpdate::OfferRestore {
                    saved_at: draft.saved_at,
                    fields: draft.fields.clone(),
                });
                self.pending_restore = Some(draft);
                Ok(true)
            }
            Ok(None) => Ok(false),
            Err(e) => Err(self.fail(e.into())),
        }
    }

    fn restore_draft(&mut self) -> SessionResponse<()> {
        debug!(session = %self.id, "Session::restore_draft: called");
        let draft = self
            .pending_restore
            .take()
            .ok_or_else(|| self.fail(SessionError::NoPendingDraft))?;

        for (field, value) in &draft.fields {
            self.field_changed(field, value);
        }
        info!(session = %self.id, field_count = draft.fields.len(), "Draft restored");
        Ok(())
    }

    async fn discard_draft(&mut self) -> SessionResponse<()> {
        debug!(session = %self.id, "Session::discard_draft: called");
        if self.pending_restore.take().is_none() {
            return Err(self.fail(SessionError::NoPendingDraft));
        }
        self.clear_draft().await
    }

    async fn clear_draft(&mut self) -> SessionResponse<()> {
        let Some(draft_id) = self.draft_id.clone() else {
            return Ok(());
        };
        self.services
            .drafts
            .clear(&draft_id)
            .await
            .map_err(|e| self.fail(e.into()))
    }

    async fn save_draft(&self) {
        let Some(draft_id) = self.draft_id.as_deref() else {
            return;
        };
        debug!(session = %self.id, %draft_id, "Session::save_draft: called");
        if let Err(e) = self.services.drafts.save(draft_id, self.preview.fields()).await {
            self.fail(e.into());
        }
    }

    fn build_submission(&self) -> SessionResponse<Submission> {
        match self.mode {
            Mode::Author => {
                let field = |name: &str| {
                    self.preview
                        .fields()
                        .get(name)
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                };
                let description = field(DESCRIPTION_FIELD);

                let name = match (field(NAME_FIELD), self.name.trim(), &description) {
                    (Some(name), _, _) => name,
                    (None, seed, _) if !seed.is_empty() => seed.to_string(),
                    (None, _, Some(description)) => suggest_name(description),
                    (None, _, None) => String::new(),
                };

                let mut template = Template::new(name, self.preview.text())?;
                if let Some(description) = description {
                    let category = field(CATEGORY_FIELD).unwrap_or_else(|| suggest_category(&description).to_string());
                    template = template.with_description(description).with_category(category);
                } else if let Some(category) = field(CATEGORY_FIELD) {
                    template = template.with_category(category);
                }
                Ok(Submission::Template(template))
            }
            Mode::Use => {
                let template = Template::new(self.name.clone(), self.preview.text())?;
                Ok(Submission::Prompt(template.fill(self.preview.values())?))
            }
        }
    }

    async fn submit(&mut self) -> SessionResponse<Submission> {
        debug!(session = %self.id, "Session::submit: called");
        let submission = self.build_submission().map_err(|e| self.fail(e))?;

        // A pending autosave would resurrect the draft after it is cleared
        self.autosave.cancel();
        self.pending_restore = None;
        if let Err(e) = self.clear_draft().await {
            // Already on the banner; the filled result still stands
            warn!(session = %self.id, error = %e, "Submitted, but the draft was not cleared");
        }

        info!(session = %self.id, "Form submitted");
        self.emit(ViewUpdate::Submitted);
        Ok(submission)
    }

    /// Text a trial or copy acts on: the live rendering in use-mode
    fn current_output(&self) -> String {
        match self.mode {
            Mode::Use => render(self.preview.text(), self.preview.values()),
            Mode::Author => self.preview.text().to_string(),
        }
    }

    fn request_trial(&mut self, model: &str) -> SessionResponse<ModelId> {
        debug!(session = %self.id, %model, "Session::request_trial: called");
        let accepted = model
            .parse::<ModelId>()
            .and_then(|model| self.services.trials.accept(model, &self.current_output()))
            .map_err(|e| self.fail(e.into()))?;

        let model = accepted.request().model;
        let tx = self.trial_tx.clone();
        let session = self.id.clone();
        tokio::spawn(async move {
            let outcome = accepted.run().await;
            if tx.send(outcome).await.is_err() {
                debug!(%session, "Session ended before the trial finished, result discarded");
            }
        });

        self.emit(ViewUpdate::TrialStarted { model });
        Ok(model)
    }

    async fn copy_preview(&mut self) -> SessionResponse<()> {
        debug!(session = %self.id, "Session::copy_preview: called");
        let text = self.current_output();
        let clipboard = Arc::clone(&self.services.clipboard);
        let result = tokio::task::spawn_blocking(move || clipboard.copy(&text))
            .await
            .map_err(|e| SessionError::Clipboard(e.to_string()))
            .and_then(|r| r.map_err(|e| SessionError::Clipboard(format!("{:#}", e))));

        match result {
            Ok(()) => {
                self.emit(ViewUpdate::Copied);
                Ok(())
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn detach(&mut self) {
        debug!(session = %self.id, "Session::detach: called");
        self.preview.cancel();
        self.autosave.cancel();
        self.pending_restore = None;
        info!(session = %self.id, "Session detached");
    }

    /// Handle one command; returns false once the session should stop
    async fn handle(&mut self, cmd: SessionCommand) -> bool {
        match cmd {
            SessionCommand::FieldChanged { field, value } => {
                self.field_changed(&field, &value);
            }

            SessionCommand::Attach { reply } => {
                let result = self.attach().await;
                let _ = reply.send(result);
            }

            SessionCommand::RestoreDraft { reply } => {
                let result = self.restore_draft();
                let _ = reply.send(result);
            }

            SessionCommand::DiscardDraft { reply } => {
                let result = self.discard_draft().await;
                let _ = reply.send(result);
            }

            SessionCommand::Submit { reply } => {
                let result = self.submit().await;
                let _ = reply.send(result);
            }

            SessionCommand::RequestTrial { model, reply } => {
                let result = self.request_trial(&model);
                let _ = reply.send(result);
            }

            SessionCommand::CopyPreview { reply } => {
                let result = self.copy_preview().await;
                let _ = reply.send(result);
            }

            SessionCommand::CurrentView { reply } => {
                let _ = reply.send(self.preview.derive());
            }

            SessionCommand::Detach { reply } => {
                self.detach();
                let _ = reply.send(());
                return false;
            }
        }
        true
    }
}

async fn actor_loop(mut session: Session, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!(session = %session.id, "actor_loop: called");

    loop {
        tokio::select! {
            cmd = rx.recv() => {
                let Some(cmd) = cmd else {
                    debug!(session = %session.id, "actor_loop: all handles dropped");
                    session.detach();
                    break;
                };
                if !session.handle(cmd).await {
                    break;
                }
            }

            _ = session.preview.timer().expired() => {
                if let Some(view) = session.preview.settle() {
                    debug!(session = %session.id, "actor_loop: preview settled");
                    session.emit_view(view);
                }
            }

            _ = session.autosave.expired() => {
                session.autosave.cancel();
                session.save_draft().await;
            }

            Some(outcome) = session.trial_rx.recv() => {
                debug!(session = %session.id, ok = outcome.is_ok(), "actor_loop: trial finished");
                session.emit(ViewUpdate::TrialResult(outcome));
            }
        }
    }

    debug!(session = %session.id, "actor_loop: stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrialConfig;
    use crate::llm::client::mock::MockLlmClient;
    use crate::llm::{CompletionResponse, LlmClient};
    use crate::preview::{TEXT_FIELD, value_field};
    use crate::trial::BackendResolver;
    use draftstore::{KvStore, MemoryStore};
    use std::sync::Mutex;

    struct Fixed(Arc<MockLlmClient>);

    impl BackendResolver for Fixed {
        fn resolve(&self, _model: ModelId) -> Result<Arc<dyn LlmClient>, TrialError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Default)]
    struct RecordingClipboard(Mutex<Vec<String>>);

    impl Clipboard for RecordingClipboard {
        fn copy(&self, text: &str) -> eyre::Result<()> {
            self.0.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    struct Fixture {
        kv: Arc<MemoryStore>,
        clipboard: Arc<RecordingClipboard>,
        services: SessionServices,
    }

    fn fixture(client: MockLlmClient) -> Fixture {
        let kv = Arc::new(MemoryStore::new());
        let clipboard = Arc::new(RecordingClipboard::default());
        let services = SessionServices {
            drafts: DraftStore::new(kv.clone()),
            trials: Arc::new(TrialOrchestrator::new(
                Arc::new(Fixed(Arc::new(client))),
                &TrialConfig::default(),
            )),
            clipboard: clipboard.clone(),
        };
        Fixture { kv, clipboard, services }
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<ViewUpdate>) -> Vec<ViewUpdate> {
        let mut updates = Vec::new();
        while let Ok(update) = rx.try_recv() {
            updates.push(update);
        }
        updates
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_edits_produce_one_update() {
        let fx = fixture(MockLlmClient::new(vec![]));
        let (handle, mut rx) = Session::spawn(SessionOptions::new(Mode::Author, "t", ""), fx.services);

        for text in ["H", "Hi <%", "Hi <%= a", "Hi <%= a %>", "Hi <%= a %> <%= b %>"] {
            handle.field_changed(TEXT_FIELD, text).await.unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(400)).await;
        handle.current_view().await.unwrap();

        let badges: Vec<_> = drain(&mut rx)
            .into_iter()
            .filter_map(|u| match u {
                ViewUpdate::Badges(b) => Some(b),
                _ => None,
            })
            .collect();
        assert_eq!(badges, vec![vec!["a".to_string(), "b".to_string()]]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_use_mode_submit_and_copy() {
        let fx = fixture(MockLlmClient::new(vec![]));
        let options = SessionOptions::new(Mode::Use, "greeting", "Hi <%= a %> and <%= b %>").with_draft_id("t1");
        let (handle, mut rx) = Session::spawn(options, fx.services);

        handle.field_changed(&value_field("a"), "X").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(fx.kv.get("draft:t1").unwrap().is_some(), "autosave after inactivity");

        // Strict fill refuses while b is missing
        assert!(matches!(handle.submit().await, Err(SessionError::Template(_))));

        handle.copy_preview().await.unwrap();
        assert_eq!(fx.clipboard.0.lock().unwrap().as_slice(), ["Hi X and <%= b %>"]);

        handle.field_changed(&value_field("b"), "Y").await.unwrap();
        match handle.submit().await.unwrap() {
            Submission::Prompt(filled) => {
                assert_eq!(filled.final_prompt, "Hi X and Y");
                assert_eq!(filled.template_name, "greeting");
            }
            other => panic!("expected a filled prompt, got {:?}", other),
        }
        assert!(fx.kv.get("draft:t1").unwrap().is_none(), "submit clears the draft");

        // The edit before submit must not resave the draft later
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.current_view().await.unwrap();
        assert!(fx.kv.get("draft:t1").unwrap().is_none());

        let updates = drain(&mut rx);
        assert!(updates.iter().any(|u| matches!(u, ViewUpdate::Preview(p) if p == "Hi X and <%= b %>")));
        assert!(updates.iter().any(|u| matches!(u, ViewUpdate::ErrorBanner(m) if m.contains("b"))));
        assert!(updates.iter().any(|u| matches!(u, ViewUpdate::Copied)));
        assert!(updates.iter().any(|u| matches!(u, ViewUpdate::Submitted)));
    }

    /// Stores values but refuses to delete them
    #[derive(Default)]
    struct UndeletableStore(MemoryStore);

    impl KvStore for UndeletableStore {
        fn get(&self, key: &str) -> eyre::Result<Option<String>> {
            self.0.get(key)
        }

        fn set(&self, key: &str, value: &str) -> eyre::Result<()> {
            self.0.set(key, value)
        }

        fn delete(&self, _key: &str) -> eyre::Result<()> {
            Err(eyre::eyre!("disk is read-only"))
        }

        fn keys(&self) -> eyre::Result<Vec<String>> {
            self.0.keys()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_survives_failed_draft_clear() {
        let mut services = fixture(MockLlmClient::new(vec![])).services;
        services.drafts = DraftStore::new(Arc::new(UndeletableStore::default()));
        let options = SessionOptions::new(Mode::Use, "greeting", "Hi <%= a %>").with_draft_id("t1");
        let (handle, mut rx) = Session::spawn(options, services);

        handle.field_changed(&value_field("a"), "X").await.unwrap();
        tokio::time::sleep(Duration::from_millis(1100)).await;

        match handle.submit().await.unwrap() {
            Submission::Prompt(filled) => assert_eq!(filled.final_prompt, "Hi X"),
            other => panic!("expected a filled prompt, got {:?}", other),
        }

        let updates = drain(&mut rx);
        assert!(updates.iter().any(|u| matches!(u, ViewUpdate::ErrorBanner(m) if m.contains("read-only"))));
        assert!(updates.iter().any(|u| matches!(u, ViewUpdate::Submitted)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_author_submit_suggests_name_and_category() {
        let fx = fixture(MockLlmClient::new(vec![]));
        let (handle, _rx) = Session::spawn(SessionOptions::new(Mode::Author, "", ""), fx.services);

        handle.field_changed(TEXT_FIELD, "Dear <%= name %>").await.unwrap();
        handle
            .field_changed(DESCRIPTION_FIELD, "Welcome email for new users")
            .await
            .unwrap();

        match handle.submit().await.unwrap() {
            Submission::Template(template) => {
                assert_eq!(template.name, "email-template");
                assert_eq!(template.category.as_deref(), Some("Email"));
                assert_eq!(template.variables, vec!["name"]);
            }
            other => panic!("expected a template, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_trial_result_delivered_as_update() {
        let fx = fixture(MockLlmClient::new(vec![Ok(CompletionResponse::text("Bonjour"))]));
        let (handle, mut rx) =
            Session::spawn(SessionOptions::new(Mode::Use, "t", "Say hi to <%= who %>"), fx.services);

        handle.field_changed(&value_field("who"), "Ana").await.unwrap();
        assert_eq!(handle.request_trial("gpt-4o-mini").await.unwrap(), ModelId::Gpt4oMini);
        assert!(!handle.can_run_trial());
        assert!(matches!(
            handle.request_trial("gpt-4o-mini").await,
            Err(SessionError::Trial(TrialError::RateLimited { .. }))
        ));

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.current_view().await.unwrap();

        let updates = drain(&mut rx);
        assert!(matches!(updates.first(), Some(ViewUpdate::TrialStarted { model: ModelId::Gpt4oMini })));
        let result = updates.iter().find_map(|u| match u {
            ViewUpdate::TrialResult(r) => Some(r.clone()),
            _ => None,
        });
        assert_eq!(result.unwrap().unwrap().text, "Bonjour");
        assert!(handle.cooldown_remaining() > Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_detach_drops_pending_work() {
        let client = MockLlmClient::new(vec![Ok(CompletionResponse::text("late"))]).with_delay(Duration::from_secs(3));
        let fx = fixture(client);
        let options = SessionOptions::new(Mode::Use, "t", "Hi <%= a %>").with_draft_id("t1");
        let (handle, mut rx) = Session::spawn(options, fx.services);

        handle.field_changed(&value_field("a"), "X").await.unwrap();
        handle.request_trial("claude-sonnet").await.unwrap();
        handle.detach().await.unwrap();

        tokio::time::sleep(Duration::from_secs(5)).await;

        let mut updates = Vec::new();
        while let Some(update) = rx.recv().await {
            updates.push(update);
        }
        assert!(matches!(updates.as_slice(), [ViewUpdate::TrialStarted { .. }]));
        assert!(fx.kv.keys().unwrap().is_empty(), "no orphaned autosave");
        assert!(matches!(handle.field_changed("x", "y").await, Err(SessionError::Closed)));
    }
}
