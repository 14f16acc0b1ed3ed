use std::sync::LazyLock;

use carepoint_core::age::age_on;
use carepoint_core::models::form::{FormType, SectionKey};
use carepoint_core::models::record::{
    AdmissionRecord, InsuranceDetails, PaymentMode, RecordPayload, split_full_name,
};
use carepoint_core::models::snapshot::FormSnapshot;

use crate::error::FormError;
use crate::forms::{
    GENDERS, billing, charge_fields, full_name_field, phone_rule, refine_blood_pressure,
    vitals_section,
};
use crate::mapping::{
    billing_input, list, optional_text, required_date, required_text, vitals_reading,
};
use crate::rules::{
    FieldKind, FieldSpec, Pattern, Rule, SectionSpec, ValidationContext, ValidationResult,
};
use crate::FormDefinition;

pub const FULL_NAME: &str = "registration.full_name";
pub const DATE_OF_BIRTH: &str = "registration.date_of_birth";
pub const GENDER: &str = "registration.gender";
pub const PHONE: &str = "registration.phone";
pub const ADDRESS: &str = "registration.address";
pub const ALLERGIES: &str = "registration.allergies";
pub const ADMISSION_DATE: &str = "admission.admission_date";
pub const WARD: &str = "admission.ward";
pub const BED_NUMBER: &str = "admission.bed_number";
pub const ATTENDING_DOCTOR: &str = "admission.attending_doctor";
pub const REASON: &str = "admission.reason";

pub const WARDS: &[&str] = &[
    "General",
    "ICU",
    "Maternity",
    "Pediatric",
    "Surgical",
    "Private",
];

/// In-patient admission: patient registration, admission details, vitals
/// on arrival, and the initial bill.
pub struct PatientAdmission;

impl FormDefinition for PatientAdmission {
    fn form_type(&self) -> FormType {
        FormType::PatientAdmission
    }

    fn name(&self) -> &str {
        "Patient Admission"
    }

    fn sections(&self) -> &[SectionSpec] {
        static SECTIONS: LazyLock<Vec<SectionSpec>> = LazyLock::new(|| {
            let mut billing_fields = vec![
                FieldSpec::required(billing::PAYMENT_MODE, "Payment mode", FieldKind::Choice)
                    .rule(Rule::OneOf(&PaymentMode::LABELS)),
                FieldSpec::optional(
                    billing::INSURANCE_COMPANY,
                    "Insurance company",
                    FieldKind::Text,
                )
                .rule(Rule::MaxLength(100)),
                FieldSpec::optional(billing::POLICY_NUMBER, "Policy number", FieldKind::Text)
                    .rule(Rule::MaxLength(40)),
            ];
            billing_fields.extend(charge_fields());

            vec![
                SectionSpec {
                    key: SectionKey::Registration,
                    title: "Patient Registration",
                    fields: vec![
                        full_name_field(FULL_NAME),
                        FieldSpec::required(DATE_OF_BIRTH, "Date of birth", FieldKind::Date)
                            .rule(Rule::DateNotInFuture)
                            .rule(Rule::AgeBetween { min: 0, max: 120 }),
                        FieldSpec::required(GENDER, "Gender", FieldKind::Choice)
                            .rule(Rule::OneOf(GENDERS)),
                        FieldSpec::required(PHONE, "Phone", FieldKind::Text).rule(phone_rule()),
                        FieldSpec::optional(ADDRESS, "Address", FieldKind::Text)
                            .rule(Rule::MaxLength(250)),
                        FieldSpec::optional(ALLERGIES, "Allergies", FieldKind::List),
                    ],
                },
                SectionSpec {
                    key: SectionKey::Admission,
                    title: "Admission Details",
                    fields: vec![
                        FieldSpec::required(ADMISSION_DATE, "Admission date", FieldKind::Date)
                            .rule(Rule::DateNotInPast),
                        FieldSpec::required(WARD, "Ward", FieldKind::Choice)
                            .rule(Rule::OneOf(WARDS)),
                        FieldSpec::optional(BED_NUMBER, "Bed number", FieldKind::Text).rule(
                            Rule::Pattern(Pattern::new(
                                r"^[A-Z]?[0-9]{1,4}$",
                                "must be a bed code like B12",
                            )),
                        ),
                        FieldSpec::required(
                            ATTENDING_DOCTOR,
                            "Attending doctor",
                            FieldKind::Text,
                        ),
                        FieldSpec::required(REASON, "Reason for admission", FieldKind::Text)
                            .rule(Rule::MinLength(5))
                            .rule(Rule::MaxLength(500)),
                    ],
                },
                vitals_section(),
                SectionSpec {
                    key: SectionKey::Billing,
                    title: "Billing",
                    fields: billing_fields,
                },
            ]
        });
        &SECTIONS
    }

    fn refine(&self, snapshot: &FormSnapshot, _ctx: &ValidationContext) -> Vec<ValidationResult> {
        let mut failures = Vec::new();
        if snapshot.text(billing::PAYMENT_MODE) == Some("Insurance") {
            if snapshot.is_blank(billing::INSURANCE_COMPANY) {
                failures.push(ValidationResult::fail(
                    billing::INSURANCE_COMPANY,
                    "Insurance company is required for insurance payments",
                ));
            }
            if snapshot.is_blank(billing::POLICY_NUMBER) {
                failures.push(ValidationResult::fail(
                    billing::POLICY_NUMBER,
                    "Policy number is required for insurance payments",
                ));
            }
        }
        failures.extend(refine_blood_pressure(snapshot));
        failures
    }

    fn defaults(&self) -> FormSnapshot {
        let mut snapshot = FormSnapshot::new();
        snapshot.set(billing::PAYMENT_MODE, "Cash");
        snapshot
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

        let mode_label = required_text(snapshot, billing::PAYMENT_MODE)?;
        let payment_mode = PaymentMode::from_label(&mode_label)
            .ok_or_else(|| FormError::MissingField(billing::PAYMENT_MODE.to_string()))?;
        let insurance = match payment_mode {
            PaymentMode::Insurance => Some(InsuranceDetails {
                company: required_text(snapshot, billing::INSURANCE_COMPANY)?,
                policy_number: required_text(snapshot, billing::POLICY_NUMBER)?,
            }),
            PaymentMode::Cash | PaymentMode::Card => None,
        };

        Ok(RecordPayload::Admission(AdmissionRecord {
            first_name,
            last_name,
            date_of_birth,
            age,
            gender: required_text(snapshot, GENDER)?,
            phone: required_text(snapshot, PHONE)?,
            address: optional_text(snapshot, ADDRESS),
            admission_date: required_date(snapshot, ADMISSION_DATE)?,
            ward: required_text(snapshot, WARD)?,
            bed_number: optional_text(snapshot, BED_NUMBER),
            attending_doctor: required_text(snapshot, ATTENDING_DOCTOR)?,
            reason: required_text(snapshot, REASON)?,
            allergies: list(snapshot, ALLERGIES),
            vitals: vitals_reading(snapshot),
            payment_mode,
            insurance,
            billing: billing_input(snapshot).summarize(),
        }))
    }
}
