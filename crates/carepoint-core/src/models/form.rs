use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreError;

/// The kinds of long-form records a session can edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum FormType {
    DoctorRegistration,
    PatientAdmission,
    OpdVisit,
}

impl FormType {
    pub const ALL: [FormType; 3] = [
        FormType::DoctorRegistration,
        FormType::PatientAdmission,
        FormType::OpdVisit,
    ];

    /// Stable identifier used in storage keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::DoctorRegistration => "doctor_registration",
            FormType::PatientAdmission => "patient_admission",
            FormType::OpdVisit => "opd_visit",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for FormType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::UnknownFormType(s.to_string()))
    }
}

/// A logical section of a long form. Each form definition picks its own
/// ordered subset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum SectionKey {
    Personal,
    Professional,
    Schedule,
    Registration,
    Admission,
    Vitals,
    Consultation,
    Billing,
}

impl SectionKey {
    pub const ALL: [SectionKey; 8] = [
        SectionKey::Personal,
        SectionKey::Professional,
        SectionKey::Schedule,
        SectionKey::Registration,
        SectionKey::Admission,
        SectionKey::Vitals,
        SectionKey::Consultation,
        SectionKey::Billing,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SectionKey::Personal => "personal",
            SectionKey::Professional => "professional",
            SectionKey::Schedule => "schedule",
            SectionKey::Registration => "registration",
            SectionKey::Admission => "admission",
            SectionKey::Vitals => "vitals",
            SectionKey::Consultation => "consultation",
            SectionKey::Billing => "billing",
        }
    }
}

impl fmt::Display for SectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for SectionKey {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKey::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| CoreError::UnknownSection(s.to_string()))
    }
}
