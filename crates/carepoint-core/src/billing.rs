//! Bill arithmetic shown on the admission and visit billing sections.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Charge components as entered on a billing section.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingInput {
    pub consultation_fee: f64,
    pub investigation_estimate: f64,
    pub procedure_charges: f64,
    pub discount_amount: f64,
}

/// Charge components plus the derived amount due.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillingSummary {
    pub consultation_fee: f64,
    pub investigation_estimate: f64,
    pub procedure_charges: f64,
    pub discount_amount: f64,
    pub total_payable: f64,
}

impl BillingInput {
    pub fn gross(&self) -> f64 {
        self.consultation_fee + self.investigation_estimate + self.procedure_charges
    }

    /// Gross charges less discount, never below zero.
    pub fn total_payable(&self) -> f64 {
        (self.gross() - self.discount_amount).max(0.0)
    }

    pub fn summarize(&self) -> BillingSummary {
        BillingSummary {
            consultation_fee: self.consultation_fee,
            investigation_estimate: self.investigation_estimate,
            procedure_charges: self.procedure_charges,
            discount_amount: self.discount_amount,
            total_payable: self.total_payable(),
        }
    }
}
