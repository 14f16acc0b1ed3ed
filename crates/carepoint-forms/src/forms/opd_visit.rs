use std::sync::LazyLock;

use carepoint_core::age::age_on;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::{RecordPayload, VisitRecord, split_full_name};
use carepoint_core::models::snapshot::FormSnapshot;

use crate::error::FormError;
use crate::forms::{charge_fields, full_name_field, refine_blood_pressure, vitals_section};
use crate::mapping::{
    billing_input, list, optional_text, required_date, required_text, vitals_reading,
};
use crate::rules::{
    FieldKind, FieldSpec, Pattern, Rule, SectionSpec, ValidationContext, ValidationResult,
};
use crate::FormDefinition;

pub const FULL_NAME: &str = "registration.full_name";
pub const PATIENT_ID: &str = "registration.patient_id";
pub const DATE_OF_BIRTH: &str = "registration.date_of_birth";
pub const VISIT_DATE: &str = "registration.visit_date";
pub const DOCTOR: &str = "registration.doctor";
pub const CHIEF_COMPLAINT: &str = "consultation.chief_complaint";
pub const SYMPTOMS: &str = "consultation.symptoms";
pub const DIAGNOSIS: &str = "consultation.diagnosis";
pub const PRESCRIPTIONS: &str = "consultation.prescriptions";
pub const FOLLOW_UP_REQUIRED: &str = "consultation.follow_up_required";
pub const FOLLOW_UP_DATE: &str = "consultation.follow_up_date";

/// Outpatient visit: who was seen, vitals, the consultation itself, and
/// the visit bill.
pub struct OpdVisit;

impl FormDefinition for OpdVisit {
    fn form_type(&self) -> FormType {
        FormType::OpdVisit
    }

    fn name(&self) -> &str {
        "OPD Visit"
    }

    fn sections(&self) -> &[SectionSpec] {
        static SECTIONS: LazyLock<Vec<SectionSpec>> = LazyLock::new(|| {
            vec![
                SectionSpec {
                    key: SectionKey::Registration,
                    title: "Patient",
                    fields: vec![
                        full_name_field(FULL_NAME),
                        FieldSpec::optional(PATIENT_ID, "Patient ID", FieldKind::Text).rule(
                            Rule::Pattern(Pattern::new(
                                r"^P[0-9]{4,10}$",
                                "must look like P000123",
                            )),
                        ),
                        FieldSpec::optional(DATE_OF_BIRTH, "Date of birth", FieldKind::Date)
                            .rule(Rule::DateNotInFuture)
                            .rule(Rule::AgeBetween { min: 0, max: 120 }),
                        FieldSpec::required(VISIT_DATE, "Visit date", FieldKind::Date)
                            .rule(Rule::DateNotInFuture),
                        FieldSpec::required(DOCTOR, "Doctor", FieldKind::Text),
                    ],
                },
                vitals_section(),
                SectionSpec {
                    key: SectionKey::Consultation,
                    title: "Consultation",
                    fields: vec![
                        FieldSpec::required(CHIEF_COMPLAINT, "Chief complaint", FieldKind::Text)
                            .rule(Rule::MinLength(3))
                            .rule(Rule::MaxLength(500)),
                        FieldSpec::optional(SYMPTOMS, "Symptoms", FieldKind::List),
                        FieldSpec::required(DIAGNOSIS, "Diagnosis", FieldKind::Text)
                            .rule(Rule::MaxLength(500)),
                        FieldSpec::optional(PRESCRIPTIONS, "Prescriptions", FieldKind::List),
                        FieldSpec::optional(FOLLOW_UP_REQUIRED, "Follow-up", FieldKind::Flag),
                        FieldSpec::optional(FOLLOW_UP_DATE, "Follow-up date", FieldKind::Date)
                            .rule(Rule::DateNotInPast),
                    ],
                },
                SectionSpec {
                    key: SectionKey::Billing,
                    title: "Billing",
                    fields: charge_fields(),
                },
            ]
        });
        &SECTIONS
    }

    fn refine(&self, snapshot: &FormSnapshot, _ctx: &ValidationContext) -> Vec<ValidationResult> {
        let mut failures = Vec::new();
        if snapshot.flag(FOLLOW_UP_REQUIRED) && snapshot.is_blank(FOLLOW_UP_DATE) {
            failures.push(ValidationResult::fail(
                FOLLOW_UP_DATE,
                "Follow-up date is required when a follow-up is scheduled",
            ));
        }
        failures.extend(refine_blood_pressure(snapshot));
        failures
    }

    fn to_record(
        &self,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> Result<RecordPayload, FormError> {
        let (first_name, last_name) = split_full_name(&required_text(snapshot, FULL_NAME)?);
        let age = snapshot
            .date(DATE_OF_BIRTH)
            .and_then(|dob| age_on(dob, ctx.today));
        let follow_up = if snapshot.flag(FOLLOW_UP_REQUIRED) {
            Some(required_date(snapshot, FOLLOW_UP_DATE)?)
        } else {
            None
        };

        Ok(RecordPayload::Visit(VisitRecord {
            first_name,
            last_name,
            patient_id: optional_text(snapshot, PATIENT_ID),
            age,
            visit_date: required_date(snapshot, VISIT_DATE)?,
            doctor: required_text(snapshot, DOCTOR)?,
            chief_complaint: required_text(snapshot, CHIEF_COMPLAINT)?,
            symptoms: list(snapshot, SYMPTOMS),
            vitals: vitals_reading(snapshot),
            diagnosis: required_text(snapshot, DIAGNOSIS)?,
            prescriptions: list(snapshot, PRESCRIPTIONS),
            follow_up,
            billing: billing_input(snapshot).summarize(),
        }))
    }
}
