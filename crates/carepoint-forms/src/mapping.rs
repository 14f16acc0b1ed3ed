//! Helpers for reading a validated snapshot into record shapes.

use jiff::civil::Date;

use carepoint_core::billing::BillingInput;
use carepoint_core::models::snapshot::{FieldValue, FormSnapshot};
use carepoint_core::vitals::VitalsReading;

use crate::error::FormError;
use crate::forms::{billing, vitals};
use crate::numeric::NumericInput;

pub fn required_text(snapshot: &FormSnapshot, path: &str) -> Result<String, FormError> {
    optional_text(snapshot, path).ok_or_else(|| FormError::MissingField(path.to_string()))
}

pub fn optional_text(snapshot: &FormSnapshot, path: &str) -> Option<String> {
    snapshot.text(path).map(str::to_string)
}

pub fn required_date(snapshot: &FormSnapshot, path: &str) -> Result<Date, FormError> {
    snapshot
        .date(path)
        .ok_or_else(|| FormError::MissingField(path.to_string()))
}

/// Numbers may sit in the snapshot as parsed values or as numeric text
/// (e.g. after a prefill).
pub fn number(snapshot: &FormSnapshot, path: &str) -> Option<f64> {
    match snapshot.get(path)? {
        FieldValue::Number(n) => Some(*n),
        FieldValue::Text(raw) => match NumericInput::parse(raw) {
            NumericInput::Value(n) => Some(n),
            NumericInput::Empty | NumericInput::Invalid(_) => None,
        },
        _ => None,
    }
}

pub fn required_number(snapshot: &FormSnapshot, path: &str) -> Result<f64, FormError> {
    number(snapshot, path).ok_or_else(|| FormError::MissingField(path.to_string()))
}

/// An optional charge left blank contributes nothing to the bill.
pub fn amount_or_zero(snapshot: &FormSnapshot, path: &str) -> f64 {
    number(snapshot, path).unwrap_or(0.0)
}

/// Unset optional collections map to an empty list.
pub fn list(snapshot: &FormSnapshot, path: &str) -> Vec<String> {
    snapshot.list(path).to_vec()
}

pub fn vitals_reading(snapshot: &FormSnapshot) -> VitalsReading {
    VitalsReading {
        temperature_c: number(snapshot, vitals::TEMPERATURE),
        pulse_bpm: number(snapshot, vitals::PULSE),
        respiratory_rate: number(snapshot, vitals::RESPIRATORY_RATE),
        spo2_percent: number(snapshot, vitals::SPO2),
        systolic_mmhg: number(snapshot, vitals::SYSTOLIC),
        diastolic_mmhg: number(snapshot, vitals::DIASTOLIC),
    }
}

pub fn billing_input(snapshot: &FormSnapshot) -> BillingInput {
    BillingInput {
        consultation_fee: amount_or_zero(snapshot, billing::CONSULTATION_FEE),
        investigation_estimate: amount_or_zero(snapshot, billing::INVESTIGATION_ESTIMATE),
        procedure_charges: amount_or_zero(snapshot, billing::PROCEDURE_CHARGES),
        discount_amount: amount_or_zero(snapshot, billing::DISCOUNT_AMOUNT),
    }
}
