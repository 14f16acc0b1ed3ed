use std::io::Write;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::RecordId;
use carepoint_forms::forms::{billing, opd_visit as opd, vitals};
use carepoint_session::clock::{Clock, SystemClock};
use carepoint_session::notify::TracingNotifier;
use carepoint_session::service::LookupService;
use carepoint_session::session::{FormSession, SessionDeps};
use carepoint_storage::drafts::DraftStore;
use carepoint_storage::file::FileStore;
use carepoint_storage::kv::KeyValueStore;

use crate::config::CarepointConfig;
use crate::local_records::LocalRecordService;

/// Local tools for CarePoint drafts and records.
#[derive(Debug, Parser)]
#[command(name = "carepoint-desktop", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Inspect or remove saved drafts
    #[command(subcommand)]
    Drafts(DraftsCommand),
    /// Inspect submitted records
    #[command(subcommand)]
    Records(RecordsCommand),
    /// Fill in and submit an OPD visit end to end
    Walkthrough {
        /// User the session belongs to
        owner: String,
    },
    /// Show or reset the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum DraftsCommand {
    /// List every draft saved for a user
    List { owner: String },
    /// Print one draft as JSON
    Show {
        owner: String,
        /// doctor_registration, patient_admission or opd_visit
        form: FormType,
    },
    /// Delete one draft
    Clear { owner: String, form: FormType },
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum RecordsCommand {
    /// List every record, oldest first
    List,
    /// Print one record as JSON
    Show { id: RecordId },
    /// Find records whose name matches the query
    Search {
        form: FormType,
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
pub enum ConfigCommand {
    /// Print the active configuration
    Show,
    /// Delete the configuration file
    Reset,
}

/// Storage and services opened from the config.
pub struct Desktop {
    pub config: CarepointConfig,
    pub drafts: DraftStore,
    pub records: LocalRecordService,
    pub clock: Arc<dyn Clock>,
}

impl Desktop {
    pub fn open(config: CarepointConfig) -> eyre::Result<Self> {
        let mut drafts = FileStore::open(config.drafts_dir())?;
        if let Some(quota) = config.storage_quota_bytes {
            drafts = drafts.with_quota(quota);
        }
        let records = FileStore::open(config.records_dir())?;
        Ok(Self {
            drafts: DraftStore::new(Arc::new(drafts) as Arc<dyn KeyValueStore>),
            records: LocalRecordService::new(Arc::new(records)),
            clock: Arc::new(SystemClock),
            config,
        })
    }

    fn session_deps(&self) -> SessionDeps {
        SessionDeps {
            drafts: self.drafts.clone(),
            records: Arc::new(self.records.clone()),
            notifier: Arc::new(TracingNotifier),
            clock: Arc::clone(&self.clock),
            config: self.config.session_config(),
        }
    }
}

pub async fn run(command: Command, desktop: &Desktop, out: &mut dyn Write) -> eyre::Result<()> {
    match command {
        Command::Drafts(DraftsCommand::List { owner }) => {
            let drafts = desktop.drafts.list(&owner);
            if drafts.is_empty() {
                writeln!(out, "no drafts for {owner}")?;
            }
            for draft in drafts {
                writeln!(
                    out,
                    "{:<20} saved {}  section {}  {} complete",
                    draft.form_type,
                    draft.saved_at,
                    draft.ui_state.current_section,
                    draft.ui_state.completed_sections.len()
                )?;
            }
        }
        Command::Drafts(DraftsCommand::Show { owner, form }) => {
            match desktop.drafts.load(&owner, form) {
                Some(draft) => writeln!(out, "{}", serde_json::to_string_pretty(&draft)?)?,
                None => writeln!(out, "no {form} draft for {owner}")?,
            }
        }
        Command::Drafts(DraftsCommand::Clear { owner, form }) => {
            desktop.drafts.clear(&owner, form)?;
            writeln!(out, "cleared {form} draft for {owner}")?;
        }
        Command::Records(RecordsCommand::List) => {
            for record in desktop.records.list()? {
                writeln!(
                    out,
                    "{}  {:<20} {}",
                    record.id,
                    record.payload.form_type(),
                    record.payload.display_name()
                )?;
            }
        }
        Command::Records(RecordsCommand::Show { id }) => match desktop.records.get(id)? {
            Some(record) => writeln!(out, "{}", serde_json::to_string_pretty(&record)?)?,
            None => writeln!(out, "no record {id}")?,
        },
        Command::Records(RecordsCommand::Search { form, query }) => {
            let query = query.join(" ");
            for candidate in desktop.records.search(form, &query).await? {
                writeln!(out, "{}  {}", candidate.record_id, candidate.label)?;
            }
        }
        Command::Walkthrough { owner } => walkthrough(desktop, &owner, out).await?,
        Command::Config(ConfigCommand::Show) => {
            writeln!(out, "{}", serde_json::to_string_pretty(&desktop.config)?)?
        }
        Command::Config(ConfigCommand::Reset) => {
            crate::config::delete_config()?;
            writeln!(out, "config deleted; defaults will be written on next start")?;
        }
    }
    Ok(())
}

/// Fill in and submit an OPD visit end to end. A matching earlier record
/// prefills the patient details; an earlier visit is updated in place.
async fn walkthrough(desktop: &Desktop, owner: &str, out: &mut dyn Write) -> eyre::Result<()> {
    let (session, prompt) = FormSession::open(owner, FormType::OpdVisit, desktop.session_deps());
    if let Some(prompt) = prompt {
        writeln!(
            out,
            "found a draft saved {} at section {}; discarding it",
            prompt.saved_at, prompt.current_section
        )?;
        session.discard_draft();
    }

    let candidates = desktop.records.search(FormType::OpdVisit, "Ravi Kumar").await?;
    match candidates.into_iter().next() {
        Some(candidate) => {
            writeln!(out, "prefilling from {}", candidate.label)?;
            session.prefill(candidate);
        }
        None => {
            session.set_field(opd::FULL_NAME, "Ravi Kumar")?;
            session.set_field(opd::DOCTOR, "Dr. Iyer")?;
        }
    }
    if let Err(e) = session.advance() {
        writeln!(out, "continue blocked: {e}")?;
    }
    session.set_field(opd::VISIT_DATE, desktop.clock.today())?;

    session.jump_to(SectionKey::Vitals)?;
    let pulse = session.set_numeric(vitals::PULSE, "eighty")?;
    if let Some(message) = pulse.message {
        writeln!(out, "pulse rejected: {message}")?;
    }
    session.set_numeric(vitals::PULSE, "82")?;
    session.set_numeric(vitals::TEMPERATURE, "37.2")?;

    session.jump_to(SectionKey::Consultation)?;
    session.set_field(opd::CHIEF_COMPLAINT, "Persistent dry cough")?;
    session.set_field(opd::SYMPTOMS, vec!["cough".to_string(), "fatigue".to_string()])?;
    session.set_field(opd::DIAGNOSIS, "Acute bronchitis")?;
    session.set_field(opd::PRESCRIPTIONS, vec!["Honey lozenges".to_string()])?;

    session.set_numeric(billing::CONSULTATION_FEE, "300")?;
    session.set_numeric(billing::DISCOUNT_AMOUNT, "50")?;

    session.jump_to(SectionKey::Registration)?;
    for _ in session.sections() {
        let section = session.current_section();
        session.advance()?;
        writeln!(
            out,
            "{section} complete, {}% done",
            session.completion_percentage()
        )?;
    }

    session.save_now()?;
    writeln!(out, "draft saved: {}", desktop.drafts.exists(owner, FormType::OpdVisit))?;

    let id = session.submit().await?;
    writeln!(out, "submitted visit {id}")?;
    writeln!(
        out,
        "draft remaining: {}",
        desktop.drafts.exists(owner, FormType::OpdVisit)
    )?;
    session.close();
    Ok(())
}
