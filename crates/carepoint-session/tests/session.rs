use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use carepoint_core::models::draft::UiState;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::{RecordId, RecordPayload};
use carepoint_core::models::snapshot::{FieldValue, FormSnapshot};
use carepoint_forms::forms::{billing, patient_admission as adm, vitals};
use carepoint_session::clock::FixedClock;
use carepoint_session::config::SessionConfig;
use carepoint_session::error::{NavigationError, SessionError, SubmitError};
use carepoint_session::notify::{Notification, Notifier, Severity};
use carepoint_session::service::{BoxFuture, ExternalError, LookupCandidate, RecordService};
use carepoint_session::session::{FormSession, SessionDeps};
use carepoint_storage::drafts::DraftStore;
use carepoint_storage::error::StorageError;
use carepoint_storage::kv::{KeyValueStore, MemoryStore};
use jiff::civil::date;
use tokio::sync::Notify;

const OWNER: &str = "dr-mehta";

#[derive(Default)]
struct FakeRecords {
    creates: AtomicUsize,
    updates: Mutex<Vec<RecordId>>,
    fail: AtomicBool,
    /// When set, `create` signals `entered` and waits on `release`.
    gated: AtomicBool,
    entered: Notify,
    release: Notify,
}

impl FakeRecords {
    fn creates(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }
}

impl RecordService for FakeRecords {
    fn create(&self, _record: RecordPayload) -> BoxFuture<'_, Result<RecordId, ExternalError>> {
        Box::pin(async move {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.gated.load(Ordering::SeqCst) {
                self.entered.notify_one();
                self.release.notified().await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(ExternalError::new("record service unavailable"));
            }
            Ok(RecordId::new())
        })
    }

    fn update(
        &self,
        id: RecordId,
        _record: RecordPayload,
    ) -> BoxFuture<'_, Result<(), ExternalError>> {
        Box::pin(async move {
            self.updates.lock().unwrap().push(id);
            Ok(())
        })
    }
}

#[derive(Default)]
struct RecordingNotifier(Mutex<Vec<Notification>>);

impl RecordingNotifier {
    fn last(&self) -> Option<Notification> {
        self.0.lock().unwrap().last().cloned()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.0.lock().unwrap().push(notification);
    }
}

struct Harness {
    drafts: DraftStore,
    records: Arc<FakeRecords>,
    notifier: Arc<RecordingNotifier>,
}

impl Harness {
    fn new() -> Self {
        Self {
            drafts: DraftStore::new(Arc::new(MemoryStore::new())),
            records: Arc::new(FakeRecords::default()),
            notifier: Arc::new(RecordingNotifier::default()),
        }
    }

    fn deps(&self) -> SessionDeps {
        SessionDeps {
            drafts: self.drafts.clone(),
            records: self.records.clone(),
            notifier: self.notifier.clone(),
            clock: Arc::new(FixedClock(date(2024, 1, 1))),
            config: SessionConfig::default(),
        }
    }

    fn open(&self) -> FormSession {
        let (session, prompt) = FormSession::open(OWNER, FormType::PatientAdmission, self.deps());
        assert!(prompt.is_none());
        session
    }

    fn has_draft(&self) -> bool {
        self.drafts.exists(OWNER, FormType::PatientAdmission)
    }
}

fn admission_values() -> FormSnapshot {
    let mut s = FormSnapshot::new();
    s.set(adm::FULL_NAME, "Asha Rao");
    s.set(adm::DATE_OF_BIRTH, date(1975, 3, 9));
    s.set(adm::GENDER, "Female");
    s.set(adm::PHONE, "9876543210");
    s.set(adm::ADMISSION_DATE, date(2024, 1, 2));
    s.set(adm::WARD, "General");
    s.set(adm::ATTENDING_DOCTOR, "Dr. Mehta");
    s.set(adm::REASON, "Observation after fall");
    s.set(billing::CONSULTATION_FEE, 500.0);
    s
}

fn admission_defaults() -> FormSnapshot {
    carepoint_forms::definition(FormType::PatientAdmission).defaults()
}

fn fill(session: &FormSession, values: &FormSnapshot) {
    for (path, value) in values.iter() {
        session.set_field(path, value.clone()).unwrap();
    }
}

#[tokio::test]
async fn insurance_without_company_never_calls_service() {
    let h = Harness::new();
    let session = h.open();
    fill(&session, &admission_values());
    session.set_field(billing::PAYMENT_MODE, "Insurance").unwrap();
    session.set_field(billing::POLICY_NUMBER, "SH-0091").unwrap();

    let err = session.submit().await.unwrap_err();
    let SessionError::Submit(SubmitError::Validation(errors)) = err else {
        panic!("expected a validation failure");
    };
    assert!(errors.contains(billing::INSURANCE_COMPANY));
    assert_eq!(h.records.creates(), 0);
    assert_eq!(h.notifier.last().map(|n| n.severity), Some(Severity::Warning));
    // Nothing was lost.
    assert_eq!(
        session.value(adm::FULL_NAME),
        Some(FieldValue::from("Asha Rao"))
    );
}

#[tokio::test]
async fn successful_submit_clears_draft_and_resets() {
    let h = Harness::new();
    let session = h.open();
    fill(&session, &admission_values());
    session.advance().unwrap();
    session.save_now().unwrap();
    assert!(h.has_draft());

    let id = session.submit().await.unwrap();
    assert_eq!(h.records.creates(), 1);
    assert!(!h.has_draft());
    assert_eq!(session.snapshot(), admission_defaults());
    assert_eq!(session.current_section(), SectionKey::Registration);
    assert!(session.completed_sections().is_empty());

    let note = h.notifier.last().unwrap();
    assert_eq!(note.severity, Severity::Success);
    assert!(note.description.contains(&id.to_string()));
}

#[tokio::test]
async fn external_failure_keeps_draft_and_allows_retry() {
    let h = Harness::new();
    let session = h.open();
    fill(&session, &admission_values());
    session.save_now().unwrap();
    h.records.fail.store(true, Ordering::SeqCst);

    let err = session.submit().await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::Submit(SubmitError::External(ref e)) if e.message == "record service unavailable"
    ));
    assert!(h.has_draft());
    assert_eq!(h.notifier.last().map(|n| n.severity), Some(Severity::Error));
    assert_eq!(
        session.value(adm::WARD),
        Some(FieldValue::from("General"))
    );

    h.records.fail.store(false, Ordering::SeqCst);
    session.submit().await.unwrap();
    assert_eq!(h.records.creates(), 2);
    assert!(!h.has_draft());
}

#[tokio::test]
async fn prefilled_form_updates_existing_record() {
    let h = Harness::new();
    let session = h.open();
    let existing = RecordId::new();
    let mut prefill = admission_values();
    prefill.remove(adm::REASON);
    session.prefill(LookupCandidate {
        record_id: existing,
        source: FormType::PatientAdmission,
        label: "Asha Rao".to_string(),
        prefill,
    });
    assert!(!session.is_section_valid(SectionKey::Admission));
    session
        .set_field(adm::REASON, "Scheduled knee surgery")
        .unwrap();

    let id = session.submit().await.unwrap();
    assert_eq!(id, existing);
    assert_eq!(h.records.creates(), 0);
    assert_eq!(*h.records.updates.lock().unwrap(), vec![existing]);
}

#[tokio::test]
async fn concurrent_submit_rejected_and_reset_supersedes() {
    let h = Harness::new();
    h.records.gated.store(true, Ordering::SeqCst);
    let session = h.open();
    fill(&session, &admission_values());
    session.save_now().unwrap();

    let (first, ()) = tokio::join!(session.submit(), async {
        h.records.entered.notified().await;
        let second = session.submit().await;
        assert!(matches!(
            second,
            Err(SessionError::Submit(SubmitError::InFlight))
        ));
        session.reset();
        h.records.release.notify_one();
    });

    assert!(matches!(
        first,
        Err(SessionError::Submit(SubmitError::Superseded))
    ));
    assert_eq!(h.records.creates(), 1);
    assert_eq!(session.snapshot(), admission_defaults());
    assert!(!h.has_draft());
}

#[tokio::test]
async fn numeric_text_is_not_coerced() {
    let h = Harness::new();
    let session = h.open();

    let result = session.set_numeric(vitals::PULSE, "eighty").unwrap();
    assert!(!result.is_valid);
    assert_eq!(result.message.as_deref(), Some("Pulse must be a number"));
    assert_eq!(session.value(vitals::PULSE), Some(FieldValue::from("eighty")));

    let result = session.set_numeric(vitals::PULSE, " 88 ").unwrap();
    assert!(result.is_valid);
    assert_eq!(session.value(vitals::PULSE), Some(FieldValue::Number(88.0)));

    session.set_numeric(vitals::PULSE, "").unwrap();
    assert_eq!(session.value(vitals::PULSE), None);
}

#[tokio::test]
async fn unknown_field_is_rejected() {
    let h = Harness::new();
    let session = h.open();
    let err = session.set_field("registration.shoe_size", "44").unwrap_err();
    assert!(matches!(err, SessionError::Form(_)));
}

#[tokio::test]
async fn continue_blocked_until_section_valid() {
    let h = Harness::new();
    let session = h.open();
    let err = session.advance().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Navigation(NavigationError::Blocked { section: SectionKey::Registration, .. })
    ));
    assert!(session.section_errors(SectionKey::Registration).contains(adm::GENDER));

    assert_eq!(session.jump_to(SectionKey::Vitals).unwrap(), SectionKey::Vitals);
    assert_eq!(session.retreat(), SectionKey::Admission);
    assert!(session.is_expanded(SectionKey::Admission));
}

#[tokio::test]
async fn open_offers_saved_draft_and_restore_replaces_state() {
    let h = Harness::new();
    let mut saved = FormSnapshot::new();
    saved.set(adm::FULL_NAME, "Asha Rao");
    saved.set(adm::DATE_OF_BIRTH, date(1975, 3, 9));
    let ui = UiState {
        current_section: SectionKey::Admission,
        completed_sections: BTreeSet::new(),
    };
    let record = h
        .drafts
        .save(OWNER, FormType::PatientAdmission, &saved, &ui)
        .unwrap();

    let (session, prompt) = FormSession::open(OWNER, FormType::PatientAdmission, h.deps());
    let prompt = prompt.expect("draft prompt");
    assert_eq!(prompt.saved_at, record.saved_at);
    assert_eq!(prompt.current_section, SectionKey::Admission);
    assert_eq!(session.pending_draft(), Some(prompt));

    assert!(session.restore_draft());
    assert!(!session.restore_draft());
    assert_eq!(session.snapshot(), saved);
    // Defaults are not merged back in.
    assert_eq!(session.value(billing::PAYMENT_MODE), None);
    assert_eq!(
        session.value(adm::DATE_OF_BIRTH),
        Some(FieldValue::Date(date(1975, 3, 9)))
    );
    assert_eq!(session.current_section(), SectionKey::Admission);
    assert!(h.has_draft());
}

#[tokio::test]
async fn discard_draft_deletes_it() {
    let h = Harness::new();
    let ui = UiState {
        current_section: SectionKey::Registration,
        completed_sections: BTreeSet::new(),
    };
    h.drafts
        .save(OWNER, FormType::PatientAdmission, &admission_values(), &ui)
        .unwrap();

    let (session, prompt) = FormSession::open(OWNER, FormType::PatientAdmission, h.deps());
    assert!(prompt.is_some());
    session.discard_draft();
    assert!(!h.has_draft());
    assert!(session.pending_draft().is_none());
    assert_eq!(session.value(billing::PAYMENT_MODE), Some(FieldValue::from("Cash")));
}

#[tokio::test]
async fn completion_tracks_progress() {
    let h = Harness::new();
    let session = h.open();
    assert_eq!(session.completion_percentage(), 0);
    fill(&session, &admission_values());
    assert_eq!(session.completion_percentage(), 13);
    session.advance().unwrap();
    assert_eq!(session.completion_percentage(), 38);
}

#[tokio::test]
async fn close_stops_autosave() {
    let h = Harness::new();
    let session = h.open();
    assert!(session.subscribe_save_status().is_some());
    session.close();
    assert!(session.subscribe_save_status().is_none());
    // Edits after close stay in memory.
    session.set_field(adm::WARD, "ICU").unwrap();
    assert_eq!(session.value(adm::WARD), Some(FieldValue::from("ICU")));
}

#[tokio::test]
async fn save_now_stamps_draft_with_session_clock() {
    let h = Harness::new();
    let session = h.open();
    session.set_field(adm::FULL_NAME, "Asha Rao").unwrap();
    session.save_now().unwrap();

    let draft = h.drafts.load(OWNER, FormType::PatientAdmission).unwrap();
    let midnight: jiff::Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
    assert_eq!(draft.saved_at, midnight);
}

/// Memory store whose writes take a while, so a reset can land mid-write.
struct SlowStore {
    inner: MemoryStore,
    delay: Duration,
    writing: AtomicBool,
}

impl SlowStore {
    fn new(delay: Duration) -> Self {
        Self {
            inner: MemoryStore::new(),
            delay,
            writing: AtomicBool::new(false),
        }
    }

    async fn wait_for_write(&self) {
        while !self.writing.load(Ordering::SeqCst) {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    }
}

impl KeyValueStore for SlowStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writing.store(true, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }

    fn keys(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        self.inner.keys(prefix)
    }
}

fn open_with_slow_store() -> (FormSession, Arc<SlowStore>, DraftStore) {
    let kv = Arc::new(SlowStore::new(Duration::from_millis(200)));
    let drafts = DraftStore::new(kv.clone());
    let deps = SessionDeps {
        drafts: drafts.clone(),
        records: Arc::new(FakeRecords::default()),
        notifier: Arc::new(RecordingNotifier::default()),
        clock: Arc::new(FixedClock(date(2024, 1, 1))),
        config: SessionConfig {
            autosave_debounce: Duration::from_millis(10),
            saved_display: Duration::from_millis(10),
        },
    };
    let (session, _) = FormSession::open(OWNER, FormType::PatientAdmission, deps);
    (session, kv, drafts)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn reset_during_autosave_write_leaves_no_draft() {
    let (session, kv, drafts) = open_with_slow_store();
    session.set_field(adm::FULL_NAME, "Asha Rao").unwrap();

    kv.wait_for_write().await;
    session.reset();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!drafts.exists(OWNER, FormType::PatientAdmission));
    assert_eq!(session.snapshot(), admission_defaults());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn submit_during_autosave_write_leaves_no_draft() {
    let (session, kv, drafts) = open_with_slow_store();
    fill(&session, &admission_values());

    kv.wait_for_write().await;
    session.submit().await.unwrap();
    tokio::time::sleep(Duration::from_millis(300)).await;

    assert!(!drafts.exists(OWNER, FormType::PatientAdmission));
    assert_eq!(session.snapshot(), admission_defaults());
}
