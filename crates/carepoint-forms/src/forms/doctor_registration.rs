use std::sync::LazyLock;

use carepoint_core::age::age_on;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::{DoctorRecord, RecordPayload, split_full_name};
use carepoint_core::models::snapshot::FormSnapshot;

use crate::error::FormError;
use crate::forms::{GENDERS, full_name_field, phone_rule};
use crate::mapping::{list, required_date, required_number, required_text};
use crate::rules::{
    FieldKind, FieldSpec, Pattern, Rule, SectionSpec, ValidationContext, ValidationResult,
};
use crate::FormDefinition;

pub const FULL_NAME: &str = "personal.full_name";
pub const EMAIL: &str = "personal.email";
pub const PHONE: &str = "personal.phone";
pub const GENDER: &str = "personal.gender";
pub const DATE_OF_BIRTH: &str = "personal.date_of_birth";
pub const DEPARTMENT: &str = "professional.department";
pub const SPECIALIZATION: &str = "professional.specialization";
pub const REGISTRATION_NUMBER: &str = "professional.registration_number";
pub const EXPERIENCE_YEARS: &str = "professional.experience_years";
pub const QUALIFICATIONS: &str = "professional.qualifications";
pub const LANGUAGES: &str = "professional.languages";
pub const AVAILABLE_DAYS: &str = "schedule.available_days";
pub const CONSULTATION_START: &str = "schedule.consultation_start";
pub const CONSULTATION_END: &str = "schedule.consultation_end";
pub const CONSULTATION_FEE: &str = "schedule.consultation_fee";

/// Doctor registration wizard: personal details, professional credentials,
/// and the weekly consultation schedule.
pub struct DoctorRegistration;

impl FormDefinition for DoctorRegistration {
    fn form_type(&self) -> FormType {
        FormType::DoctorRegistration
    }

    fn name(&self) -> &str {
        "Doctor Registration"
    }

    fn sections(&self) -> &[SectionSpec] {
        static SECTIONS: LazyLock<Vec<SectionSpec>> = LazyLock::new(|| {
            let time_rule = || {
                Rule::Pattern(Pattern::new(
                    r"^([01][0-9]|2[0-3]):[0-5][0-9]$",
                    "must be a 24-hour time (HH:MM)",
                ))
            };

            vec![
                SectionSpec {
                    key: SectionKey::Personal,
                    title: "Personal Information",
                    fields: vec![
                        full_name_field(FULL_NAME),
                        FieldSpec::required(EMAIL, "Email", FieldKind::Text).rule(Rule::Pattern(
                            Pattern::new(
                                r"^[^@\s]+@[^@\s]+\.[^@\s]+$",
                                "must be a valid email address",
                            ),
                        )),
                        FieldSpec::required(PHONE, "Phone", FieldKind::Text).rule(phone_rule()),
                        FieldSpec::required(GENDER, "Gender", FieldKind::Choice)
                            .rule(Rule::OneOf(GENDERS)),
                        FieldSpec::required(DATE_OF_BIRTH, "Date of birth", FieldKind::Date)
                            .rule(Rule::DateNotInFuture)
                            .rule(Rule::AgeBetween { min: 21, max: 80 }),
                    ],
                },
                SectionSpec {
                    key: SectionKey::Professional,
                    title: "Professional Details",
                    fields: vec![
                        FieldSpec::required(DEPARTMENT, "Department", FieldKind::Text),
                        FieldSpec::required(SPECIALIZATION, "Specialization", FieldKind::Text)
                            .rule(Rule::MinLength(2)),
                        FieldSpec::required(
                            REGISTRATION_NUMBER,
                            "Registration number",
                            FieldKind::Text,
                        )
                        .rule(Rule::Pattern(Pattern::new(
                            r"^[A-Z]{2,4}-?[0-9]{4,8}$",
                            "must look like MCI-123456",
                        ))),
                        FieldSpec::required(EXPERIENCE_YEARS, "Experience", FieldKind::Number)
                            .rule(Rule::Range {
                                min: 0.0,
                                max: 60.0,
                            })
                            .rule(Rule::WholeNumber),
                        FieldSpec::required(QUALIFICATIONS, "Qualifications", FieldKind::List)
                            .rule(Rule::MinItems(1)),
                        FieldSpec::optional(LANGUAGES, "Languages", FieldKind::List),
                    ],
                },
                SectionSpec {
                    key: SectionKey::Schedule,
                    title: "Schedule & Fees",
                    fields: vec![
                        FieldSpec::required(AVAILABLE_DAYS, "Available days", FieldKind::List)
                            .rule(Rule::MinItems(1)),
                        FieldSpec::required(
                            CONSULTATION_START,
                            "Consultation start",
                            FieldKind::Text,
                        )
                        .rule(time_rule()),
                        FieldSpec::required(CONSULTATION_END, "Consultation end", FieldKind::Text)
                            .rule(time_rule()),
                        FieldSpec::required(
                            CONSULTATION_FEE,
                            "Consultation fee",
                            FieldKind::Number,
                        )
                        .rule(Rule::Range {
                            min: 0.0,
                            max: 100_000.0,
                        }),
                    ],
                },
            ]
        });
        &SECTIONS
    }

    fn refine(&self, snapshot: &FormSnapshot, _ctx: &ValidationContext) -> Vec<ValidationResult> {
        let mut failures = Vec::new();
        // Zero-padded HH:MM compares correctly as text.
        if let (Some(start), Some(end)) = (
            snapshot.text(CONSULTATION_START),
            snapshot.text(CONSULTATION_END),
        ) && end <= start
        {
            failures.push(ValidationResult::fail(
                CONSULTATION_END,
                "Consultation end must be after consultation start",
            ));
        }
        failures
    }

    fn to_record(
        &self,
        snapshot: &FormSnapshot,
        ctx: &ValidationContext,
    ) -> Result<RecordPayload, FormError> {
        let (first_name, last_name) = split_full_name(&required_text(snapshot, FULL_NAME)?);
        let date_of_birth = required_date(snapshot, DATE_OF_BIRTH)?;
        let age = age_on(date_of_birth, ctx.today)
            .ok_or_else(|| FormError::MissingField(DATE_OF_BIRTH.to_string()))?;

        Ok(RecordPayload::Doctor(DoctorRecord {
            first_name,
            last_name,
            email: required_text(snapshot, EMAIL)?.to_lowercase(),
            phone: required_text(snapshot, PHONE)?,
            gender: required_text(snapshot, GENDER)?,
            date_of_birth,
            age,
            department: required_text(snapshot, DEPARTMENT)?,
            specialization: required_text(snapshot, SPECIALIZATION)?,
            registration_number: required_text(snapshot, REGISTRATION_NUMBER)?,
            experience_years: required_number(snapshot, EXPERIENCE_YEARS)? as u32,
            qualifications: list(snapshot, QUALIFICATIONS),
            languages: list(snapshot, LANGUAGES),
            available_days: list(snapshot, AVAILABLE_DAYS),
            consultation_start: required_text(snapshot, CONSULTATION_START)?,
            consultation_end: required_text(snapshot, CONSULTATION_END)?,
            consultation_fee: required_number(snapshot, CONSULTATION_FEE)?,
        }))
    }
}
