use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use carepoint_core::models::draft::DraftRecord;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::RecordId;
use carepoint_core::models::snapshot::{FieldValue, FormSnapshot};
use carepoint_forms::error::FormError;
use carepoint_forms::numeric::NumericInput;
use carepoint_forms::rules::{ValidationContext, ValidationErrors, ValidationResult};
use carepoint_forms::{FormDefinition, definition};
use carepoint_storage::drafts::DraftStore;
use carepoint_storage::error::StorageError;

use crate::autosave::{AutosaveHandle, DraftSink, SaveStatus};
use crate::clock::Clock;
use crate::config::SessionConfig;
use crate::error::{SessionError, SubmitError};
use crate::notify::{Notification, Notifier, Severity};
use crate::sections::SectionTracker;
use crate::service::{LookupCandidate, RecordService};
use crate::submit::SubmissionPipeline;

/// Everything a session needs from its host.
#[derive(Clone)]
pub struct SessionDeps {
    pub drafts: DraftStore,
    pub records: Arc<dyn RecordService>,
    pub notifier: Arc<dyn Notifier>,
    pub clock: Arc<dyn Clock>,
    pub config: SessionConfig,
}

/// What the host shows when asking whether to restore a saved draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftPrompt {
    pub saved_at: jiff::Timestamp,
    pub current_section: SectionKey,
    pub completed_sections: usize,
}

impl DraftPrompt {
    fn from_draft(draft: &DraftRecord) -> Self {
        Self {
            saved_at: draft.saved_at,
            current_section: draft.ui_state.current_section,
            completed_sections: draft.ui_state.completed_sections.len(),
        }
    }
}

struct SessionState {
    snapshot: FormSnapshot,
    tracker: SectionTracker,
    /// Set when the form was prefilled from an existing record; submit
    /// then updates instead of creating.
    record_id: Option<RecordId>,
    /// Bumped on every reset so in-flight submissions can tell they are stale.
    generation: u64,
}

impl SessionState {
    fn fresh(form: &'static dyn FormDefinition) -> Self {
        Self {
            snapshot: form.defaults(),
            tracker: SectionTracker::new(form),
            record_id: None,
            generation: 0,
        }
    }

    fn reset(&mut self, form: &'static dyn FormDefinition) {
        self.snapshot = form.defaults();
        self.tracker.reset();
        self.record_id = None;
        self.generation += 1;
    }
}

fn lock(state: &Mutex<SessionState>) -> MutexGuard<'_, SessionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn write_draft(
    drafts: &DraftStore,
    owner_id: &str,
    form_type: FormType,
    clock: &dyn Clock,
    state: &SessionState,
) -> Result<(), StorageError> {
    drafts
        .save_at(
            owner_id,
            form_type,
            &state.snapshot,
            &state.tracker.ui_state(),
            clock.now(),
        )
        .map(|_| ())
}

/// Persists the live session state for one autosave task.
///
/// The state lock is held for the whole write, and a sink spawned before
/// a reset writes nothing afterwards.
struct SessionDraftSink {
    owner_id: String,
    form_type: FormType,
    drafts: DraftStore,
    clock: Arc<dyn Clock>,
    state: Arc<Mutex<SessionState>>,
    generation: u64,
}

impl DraftSink for SessionDraftSink {
    fn persist(&self) -> Result<(), StorageError> {
        let state = lock(&self.state);
        if state.generation != self.generation {
            debug!(owner_id = %self.owner_id, "skipping autosave for a reset session");
            return Ok(());
        }
        write_draft(
            &self.drafts,
            &self.owner_id,
            self.form_type,
            self.clock.as_ref(),
            &state,
        )
    }
}

/// One user filling in one form.
///
/// Ties together the field validator, section tracker, draft store,
/// autosave, and submission pipeline. Every method takes `&self`. Edits
/// only wait on storage while an autosave write is in progress.
///
/// Must be opened inside a tokio runtime: the autosave task is spawned
/// on it.
pub struct FormSession {
    owner_id: String,
    form: &'static dyn FormDefinition,
    state: Arc<Mutex<SessionState>>,
    pending: Mutex<Option<DraftRecord>>,
    autosave: Mutex<Option<AutosaveHandle>>,
    pipeline: SubmissionPipeline,
    drafts: DraftStore,
    notifier: Arc<dyn Notifier>,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
}

impl FormSession {
    /// Start a session and look for a saved draft. When one exists the
    /// returned prompt should be shown to the user, followed by either
    /// [`restore_draft`](Self::restore_draft) or
    /// [`discard_draft`](Self::discard_draft).
    pub fn open(
        owner_id: impl Into<String>,
        form_type: FormType,
        deps: SessionDeps,
    ) -> (Self, Option<DraftPrompt>) {
        let owner_id = owner_id.into();
        let form = definition(form_type);
        let state = Arc::new(Mutex::new(SessionState::fresh(form)));

        let pending = deps.drafts.load(&owner_id, form_type);
        let prompt = pending.as_ref().map(DraftPrompt::from_draft);
        info!(
            owner_id = %owner_id,
            %form_type,
            has_draft = prompt.is_some(),
            "form session opened"
        );

        let session = Self {
            owner_id,
            form,
            state,
            pending: Mutex::new(pending),
            autosave: Mutex::new(None),
            pipeline: SubmissionPipeline::new(form, deps.records),
            drafts: deps.drafts,
            notifier: deps.notifier,
            clock: deps.clock,
            config: deps.config,
        };
        session.restart_autosave();
        (session, prompt)
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn form_type(&self) -> FormType {
        self.form.form_type()
    }

    pub fn form(&self) -> &'static dyn FormDefinition {
        self.form
    }

    fn ctx(&self) -> ValidationContext {
        ValidationContext::at(self.clock.today())
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        lock(&self.state)
    }

    fn mark_dirty(&self) {
        let autosave = self.autosave.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(handle) = autosave.as_ref() {
            handle.mark_dirty();
        }
    }

    fn restart_autosave(&self) {
        let sink = SessionDraftSink {
            owner_id: self.owner_id.clone(),
            form_type: self.form.form_type(),
            drafts: self.drafts.clone(),
            clock: Arc::clone(&self.clock),
            state: Arc::clone(&self.state),
            generation: self.state().generation,
        };
        let handle = AutosaveHandle::spawn(
            &self.config,
            Arc::new(sink) as Arc<dyn DraftSink>,
            Arc::clone(&self.notifier),
        );
        let previous = self
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle);
        drop(previous);
    }

    fn clear_draft(&self) {
        if let Err(e) = self.drafts.clear(&self.owner_id, self.form.form_type()) {
            warn!(owner_id = %self.owner_id, error = %e, "failed to clear draft");
        }
    }

    // ── Draft restoration ────────────────────────────────────────

    pub fn pending_draft(&self) -> Option<DraftPrompt> {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(DraftPrompt::from_draft)
    }

    /// Replace the whole snapshot and navigation state with the pending
    /// draft. Returns `false` when there was nothing to restore.
    pub fn restore_draft(&self) -> bool {
        let Some(draft) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        else {
            return false;
        };
        let ctx = self.ctx();
        {
            let mut state = self.state();
            let state = &mut *state;
            state.snapshot = draft.form_data;
            state.tracker.restore(&draft.ui_state, &state.snapshot, &ctx);
            state.record_id = None;
        }
        info!(
            owner_id = %self.owner_id,
            form_type = %draft.form_type,
            saved_at = %draft.saved_at,
            "draft restored"
        );
        true
    }

    /// Drop the pending draft and delete it from storage.
    pub fn discard_draft(&self) {
        let had_draft = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if had_draft {
            self.clear_draft();
        }
    }

    // ── Field edits ──────────────────────────────────────────────

    pub fn snapshot(&self) -> FormSnapshot {
        self.state().snapshot.clone()
    }

    pub fn value(&self, path: &str) -> Option<FieldValue> {
        self.state().snapshot.get(path).cloned()
    }

    /// Set a field and return its fresh validation result.
    pub fn set_field(
        &self,
        path: &str,
        value: impl Into<FieldValue>,
    ) -> Result<ValidationResult, SessionError> {
        if self.form.field(path).is_none() {
            return Err(FormError::UnknownField {
                form: self.form.name().to_string(),
                path: path.to_string(),
            }
            .into());
        }
        let value = value.into();
        let ctx = self.ctx();
        let result = {
            let mut state = self.state();
            if value.is_absent() {
                state.snapshot.remove(path);
            } else {
                state.snapshot.set(path, value);
            }
            self.form.validate_field(path, &state.snapshot, &ctx)
        };
        self.mark_dirty();
        Ok(result)
    }

    /// Set a numeric field from raw text input. Unparseable text is kept
    /// and reported as "not a number" rather than becoming zero.
    pub fn set_numeric(&self, path: &str, raw: &str) -> Result<ValidationResult, SessionError> {
        self.set_field(path, NumericInput::parse(raw).into_field_value())
    }

    pub fn clear_field(&self, path: &str) -> Result<ValidationResult, SessionError> {
        self.set_field(path, FieldValue::Empty)
    }

    pub fn validate_field(&self, path: &str) -> ValidationResult {
        let ctx = self.ctx();
        let state = self.state();
        self.form.validate_field(path, &state.snapshot, &ctx)
    }

    /// Copy values from an existing record into the form. When the record
    /// came from this same form, a later submit updates it instead of
    /// creating a new one.
    pub fn prefill(&self, candidate: LookupCandidate) {
        let fields = candidate.prefill.len();
        let same_form = candidate.source == self.form.form_type();
        {
            let mut state = self.state();
            state.snapshot.extend(candidate.prefill);
            state.record_id = same_form.then_some(candidate.record_id);
        }
        info!(
            owner_id = %self.owner_id,
            record_id = %candidate.record_id,
            fields,
            "form prefilled from existing record"
        );
        self.mark_dirty();
    }

    // ── Sections ─────────────────────────────────────────────────

    pub fn sections(&self) -> Vec<SectionKey> {
        self.form.section_keys()
    }

    pub fn current_section(&self) -> SectionKey {
        self.state().tracker.current()
    }

    pub fn completed_sections(&self) -> BTreeSet<SectionKey> {
        self.state().tracker.completed().clone()
    }

    pub fn is_expanded(&self, key: SectionKey) -> bool {
        self.state().tracker.is_expanded(key)
    }

    pub fn completion_percentage(&self) -> u8 {
        let ctx = self.ctx();
        let state = self.state();
        state.tracker.completion_percentage(&state.snapshot, &ctx)
    }

    pub fn is_section_valid(&self, key: SectionKey) -> bool {
        let ctx = self.ctx();
        let state = self.state();
        state.tracker.is_section_valid(key, &state.snapshot, &ctx)
    }

    pub fn section_errors(&self, key: SectionKey) -> ValidationErrors {
        let ctx = self.ctx();
        let state = self.state();
        self.form
            .validate_section(key, &state.snapshot, &ctx)
            .into_iter()
            .collect()
    }

    /// "Continue". Blocked while the current section has errors.
    pub fn advance(&self) -> Result<SectionKey, SessionError> {
        let ctx = self.ctx();
        let next = {
            let mut state = self.state();
            let state = &mut *state;
            state.tracker.advance(&state.snapshot, &ctx)?
        };
        debug!(section = %next, "advanced");
        self.mark_dirty();
        Ok(next)
    }

    pub fn retreat(&self) -> SectionKey {
        let section = self.state().tracker.retreat();
        self.mark_dirty();
        section
    }

    /// Tab click. Never gated on validity.
    pub fn jump_to(&self, key: SectionKey) -> Result<SectionKey, SessionError> {
        let section = self.state().tracker.jump_to(key)?;
        self.mark_dirty();
        Ok(section)
    }

    pub fn toggle_section(&self, key: SectionKey) -> bool {
        self.state().tracker.toggle_expanded(key)
    }

    // ── Persistence ──────────────────────────────────────────────

    pub fn save_status(&self) -> SaveStatus {
        self.autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(SaveStatus::Idle, AutosaveHandle::status)
    }

    pub fn subscribe_save_status(&self) -> Option<watch::Receiver<SaveStatus>> {
        self.autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(AutosaveHandle::subscribe)
    }

    /// Write the draft immediately, bypassing the debounce window.
    pub fn save_now(&self) -> Result<(), SessionError> {
        let state = self.state();
        write_draft(
            &self.drafts,
            &self.owner_id,
            self.form.form_type(),
            self.clock.as_ref(),
            &state,
        )?;
        Ok(())
    }

    // ── Submission ───────────────────────────────────────────────

    /// Validate and submit the whole form.
    ///
    /// On success the draft is cleared and the form starts over from its
    /// defaults. On failure the draft and in-memory values are kept so the
    /// user can retry. If the session is reset while the record service
    /// call is in flight, the outcome is discarded and
    /// [`SubmitError::Superseded`] is returned.
    pub async fn submit(&self) -> Result<RecordId, SessionError> {
        let (snapshot, target, generation) = {
            let state = self.state();
            (state.snapshot.clone(), state.record_id, state.generation)
        };
        let ctx = self.ctx();
        let result = self.pipeline.submit(&snapshot, target, &ctx).await;

        {
            let mut state = self.state();
            if state.generation != generation {
                warn!(owner_id = %self.owner_id, "submission finished after reset, ignoring result");
                return Err(SubmitError::Superseded.into());
            }
            if result.is_ok() {
                state.reset(self.form);
                self.clear_draft();
            }
        }

        match result {
            Ok(id) => {
                self.restart_autosave();
                self.notifier.notify(Notification::new(
                    Severity::Success,
                    format!("{} submitted", self.form.name()),
                    format!("Record {id} saved."),
                ));
                Ok(id)
            }
            Err(e) => {
                match &e {
                    SubmitError::Validation(errors) => {
                        self.notifier.notify(Notification::new(
                            Severity::Warning,
                            "Please fix the highlighted fields",
                            format!("{} field(s) need attention.", errors.len()),
                        ))
                    }
                    SubmitError::External(external) => self.notifier.notify(Notification::new(
                        Severity::Error,
                        "Submission failed",
                        format!("{external}. Your draft has been kept; try again."),
                    )),
                    SubmitError::Mapping(err) => self.notifier.notify(Notification::new(
                        Severity::Error,
                        "Submission failed",
                        err.to_string(),
                    )),
                    SubmitError::InFlight | SubmitError::Superseded => {}
                }
                Err(e.into())
            }
        }
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Start over: defaults, first section, no draft. Any submission still
    /// in flight will be ignored when it returns.
    pub fn reset(&self) {
        {
            let mut state = self.state();
            state.reset(self.form);
            self.clear_draft();
        }
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.restart_autosave();
        info!(owner_id = %self.owner_id, form_type = %self.form.form_type(), "form session reset");
    }

    /// Stop autosave. Unsaved edits since the last write are not flushed.
    pub fn close(&self) {
        let handle = self
            .autosave
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.stop();
            info!(owner_id = %self.owner_id, form_type = %self.form.form_type(), "form session closed");
        }
    }
}
