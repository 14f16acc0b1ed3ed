use std::fmt;
use std::str::FromStr;

use jiff::civil::Date;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::billing::BillingSummary;
use crate::error::CoreError;
use crate::models::form::FormType;
use crate::vitals::VitalsReading;

/// Identifier handed back by the record service on create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn new() -> Self {
        RecordId(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for RecordId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(RecordId(Uuid::parse_str(s.trim())?))
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum PaymentMode {
    Cash,
    Card,
    Insurance,
}

impl PaymentMode {
    pub const LABELS: [&'static str; 3] = ["Cash", "Card", "Insurance"];

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Cash" => Some(PaymentMode::Cash),
            "Card" => Some(PaymentMode::Card),
            "Insurance" => Some(PaymentMode::Insurance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct InsuranceDetails {
    pub company: String,
    pub policy_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DoctorRecord {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub gender: String,
    pub date_of_birth: Date,
    pub age: u32,
    pub department: String,
    pub specialization: String,
    pub registration_number: String,
    pub experience_years: u32,
    pub qualifications: Vec<String>,
    pub languages: Vec<String>,
    pub available_days: Vec<String>,
    pub consultation_start: String,
    pub consultation_end: String,
    pub consultation_fee: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AdmissionRecord {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Date,
    pub age: u32,
    pub gender: String,
    pub phone: String,
    pub address: Option<String>,
    pub admission_date: Date,
    pub ward: String,
    pub bed_number: Option<String>,
    pub attending_doctor: String,
    pub reason: String,
    pub allergies: Vec<String>,
    pub vitals: VitalsReading,
    pub payment_mode: PaymentMode,
    pub insurance: Option<InsuranceDetails>,
    pub billing: BillingSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VisitRecord {
    pub first_name: String,
    pub last_name: String,
    pub patient_id: Option<String>,
    pub age: Option<u32>,
    pub visit_date: Date,
    pub doctor: String,
    pub chief_complaint: String,
    pub symptoms: Vec<String>,
    pub vitals: VitalsReading,
    pub diagnosis: String,
    pub prescriptions: Vec<String>,
    pub follow_up: Option<Date>,
    pub billing: BillingSummary,
}

/// The external record shape a submitted form maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum RecordPayload {
    Doctor(DoctorRecord),
    Admission(AdmissionRecord),
    Visit(VisitRecord),
}

impl RecordPayload {
    /// The form that produces this kind of record.
    pub fn form_type(&self) -> FormType {
        match self {
            RecordPayload::Doctor(_) => FormType::DoctorRegistration,
            RecordPayload::Admission(_) => FormType::PatientAdmission,
            RecordPayload::Visit(_) => FormType::OpdVisit,
        }
    }

    /// Display name of the person the record is about.
    pub fn display_name(&self) -> String {
        let (first, last) = match self {
            RecordPayload::Doctor(r) => (&r.first_name, &r.last_name),
            RecordPayload::Admission(r) => (&r.first_name, &r.last_name),
            RecordPayload::Visit(r) => (&r.first_name, &r.last_name),
        };
        if last.is_empty() {
            first.clone()
        } else {
            format!("{first} {last}")
        }
    }
}

/// Split a full name at the first run of whitespace.
///
/// `"John Doe"` → `("John", "Doe")`, `"Mary Ann Lee"` → `("Mary", "Ann Lee")`,
/// `"Cher"` → `("Cher", "")`.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let trimmed = full_name.trim();
    match trimmed.split_once(char::is_whitespace) {
        Some((first, rest)) => (first.to_string(), rest.trim_start().to_string()),
        None => (trimmed.to_string(), String::new()),
    }
}
