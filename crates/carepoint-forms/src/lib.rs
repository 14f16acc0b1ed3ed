//! carepoint-forms
//!
//! Form definitions and the field validator. Pure data with no storage or I/O.
//! Defines the sections, fields, validation rules, cross-field refinements,
//! and record mapping for each supported form.

pub mod error;
pub mod forms;
pub mod mapping;
pub mod numeric;
pub mod rules;

use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::RecordPayload;
use carepoint_core::models::snapshot::FormSnapshot;

use error::FormError;
use rules::{FieldKind, FieldSpec, SectionSpec, ValidationContext, ValidationErrors, ValidationResult};

/// Trait implemented by each long form.
pub trait FormDefinition: Send + Sync {
    fn form_type(&self) -> FormType;

    /// Human-readable name (e.g., "Doctor Registration").
    fn name(&self) -> &str;

    /// The ordered sections of this form.
    fn sections(&self) -> &[SectionSpec];

    /// Cross-field refinements. Returns only failures.
    fn refine(&self, _snapshot: &FormSnapshot, _ctx: &ValidationContext) -> Vec<ValidationResult> {
        Vec::new()
    }

    /// Map a validated snapshot to the external record shape.
    fn to_record(
        &self,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> Result<RecordPayload, FormError>;

    /// Values a fresh session starts from.
    fn defaults(&self) -> FormSnapshot {
        FormSnapshot::new()
    }

    fn section_keys(&self) -> Vec<SectionKey> {
        self.sections().iter().map(|s| s.key).collect()
    }

    fn section(&self, key: SectionKey) -> Option<&SectionSpec> {
        self.sections().iter().find(|s| s.key == key)
    }

    fn field(&self, path: &str) -> Option<&FieldSpec> {
        self.sections()
            .iter()
            .flat_map(|s| &s.fields)
            .find(|f| f.path == path)
    }

    fn section_of(&self, path: &str) -> Option<SectionKey> {
        self.sections()
            .iter()
            .find(|s| s.fields.iter().any(|f| f.path == path))
            .map(|s| s.key)
    }

    /// Paths of every date-typed field, used to revive drafts.
    fn date_paths(&self) -> Vec<&'static str> {
        self.sections()
            .iter()
            .flat_map(|s| &s.fields)
            .filter(|f| f.kind == FieldKind::Date)
            .map(|f| f.path)
            .collect()
    }

    /// Validate one field, including any refinement that targets it.
    fn validate_field(
        &self,
        path: &str,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> ValidationResult {
        let Some(spec) = self.field(path) else {
            return ValidationResult::fail(path, format!("unknown field for {}", self.name()));
        };
        let result = rules::check_field(spec, snapshot, ctx);
        if !result.is_valid {
            return result;
        }
        self.refine(snapshot, ctx)
            .into_iter()
            .find(|r| r.field_path == path)
            .unwrap_or(result)
    }

    /// Results for every field in a section, refinements applied.
    fn validate_section(
        &self,
        key: SectionKey,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> Vec<ValidationResult> {
        let Some(section) = self.section(key) else {
            return Vec::new();
        };
        let refinements = self.refine(snapshot, ctx);
        section
            .fields
            .iter()
            .map(|spec| {
                let result = rules::check_field(spec, snapshot, ctx);
                if !result.is_valid {
                    return result;
                }
                refinements
                    .iter()
                    .find(|r| r.field_path == spec.path)
                    .cloned()
                    .unwrap_or(result)
            })
            .collect()
    }

    fn is_section_valid(
        &self,
        key: SectionKey,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> bool {
        self.validate_section(key, snapshot, ctx)
            .iter()
            .all(|r| r.is_valid)
    }

    /// Full-schema validation including every refinement.
    fn validate_all(
        &self,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> Result<(), ValidationErrors> {
        let errors: ValidationErrors = self
            .sections()
            .iter()
            .flat_map(|s| self.validate_section(s.key, snapshot, ctx))
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Look up the definition for a form type.
pub fn definition(form_type: FormType) -> &'static dyn FormDefinition {
    match form_type {
        FormType::DoctorRegistration => &forms::doctor_registration::DoctorRegistration,
        FormType::PatientAdmission => &forms::patient_admission::PatientAdmission,
        FormType::OpdVisit => &forms::opd_visit::OpdVisit,
    }
}

/// Return all registered form definitions.
pub fn all_definitions() -> Vec<&'static dyn FormDefinition> {
    FormType::ALL.into_iter().map(definition).collect()
}
