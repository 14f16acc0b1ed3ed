pub mod doctor_registration;
pub mod opd_visit;
pub mod patient_admission;

use carepoint_core::models::form::SectionKey;
use carepoint_core::models::snapshot::FormSnapshot;

use crate::mapping;
use crate::rules::{FieldKind, FieldSpec, Pattern, Rule, SectionSpec, ValidationResult};

pub const GENDERS: &[&str] = &["Male", "Female", "Other"];

pub(crate) fn phone_rule() -> Rule {
    Rule::Pattern(Pattern::new(
        r"^\+?[0-9]{10,15}$",
        "must be 10 to 15 digits, optionally starting with +",
    ))
}

pub(crate) fn full_name_field(path: &'static str) -> FieldSpec {
    FieldSpec::required(path, "Full name", FieldKind::Text)
        .rule(Rule::MinLength(2))
        .rule(Rule::MaxLength(100))
        .rule(Rule::Pattern(Pattern::new(
            r"^[\p{L} .'-]+$",
            "may only contain letters, spaces, dots, apostrophes and hyphens",
        )))
}

/// Vital sign paths shared by the admission and visit forms.
pub mod vitals {
    pub const TEMPERATURE: &str = "vitals.temperature_c";
    pub const PULSE: &str = "vitals.pulse_bpm";
    pub const RESPIRATORY_RATE: &str = "vitals.respiratory_rate";
    pub const SPO2: &str = "vitals.spo2_percent";
    pub const SYSTOLIC: &str = "vitals.systolic_mmhg";
    pub const DIASTOLIC: &str = "vitals.diastolic_mmhg";
}

/// Billing paths shared by the admission and visit forms.
pub mod billing {
    pub const PAYMENT_MODE: &str = "billing.payment_mode";
    pub const INSURANCE_COMPANY: &str = "billing.insurance_company";
    pub const POLICY_NUMBER: &str = "billing.policy_number";
    pub const CONSULTATION_FEE: &str = "billing.consultation_fee";
    pub const INVESTIGATION_ESTIMATE: &str = "billing.investigation_estimate";
    pub const PROCEDURE_CHARGES: &str = "billing.procedure_charges";
    pub const DISCOUNT_AMOUNT: &str = "billing.discount_amount";
}

pub(crate) fn vitals_section() -> SectionSpec {
    let reading = |path, label, min, max| {
        FieldSpec::optional(path, label, FieldKind::Number).rule(Rule::Range { min, max })
    };
    SectionSpec {
        key: SectionKey::Vitals,
        title: "Vitals",
        fields: vec![
            reading(vitals::TEMPERATURE, "Temperature (°C)", 30.0, 45.0),
            reading(vitals::PULSE, "Pulse", 20.0, 250.0),
            reading(vitals::RESPIRATORY_RATE, "Respiratory rate", 4.0, 60.0),
            reading(vitals::SPO2, "SpO2", 50.0, 100.0),
            reading(vitals::SYSTOLIC, "Systolic BP", 50.0, 260.0),
            reading(vitals::DIASTOLIC, "Diastolic BP", 30.0, 160.0),
        ],
    }
}

/// Charge fields. The consultation fee is the only mandatory charge.
pub(crate) fn charge_fields() -> Vec<FieldSpec> {
    let charge = |path, label| {
        FieldSpec::optional(path, label, FieldKind::Number).rule(Rule::Range {
            min: 0.0,
            max: 10_000_000.0,
        })
    };
    vec![
        FieldSpec::required(billing::CONSULTATION_FEE, "Consultation fee", FieldKind::Number)
            .rule(Rule::Range {
                min: 0.0,
                max: 10_000_000.0,
            }),
        charge(billing::INVESTIGATION_ESTIMATE, "Investigation estimate"),
        charge(billing::PROCEDURE_CHARGES, "Procedure charges"),
        charge(billing::DISCOUNT_AMOUNT, "Discount"),
    ]
}

/// Diastolic pressure must sit below systolic when both are recorded.
pub(crate) fn refine_blood_pressure(snapshot: &FormSnapshot) -> Option<ValidationResult> {
    let systolic = mapping::number(snapshot, vitals::SYSTOLIC)?;
    let diastolic = mapping::number(snapshot, vitals::DIASTOLIC)?;
    (diastolic >= systolic).then(|| {
        ValidationResult::fail(
            vitals::DIASTOLIC,
            "Diastolic BP must be lower than systolic BP",
        )
    })
}
