//! Vital sign readings and their status bands.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VitalsReading {
    pub temperature_c: Option<f64>,
    pub pulse_bpm: Option<f64>,
    pub respiratory_rate: Option<f64>,
    pub spo2_percent: Option<f64>,
    pub systolic_mmhg: Option<f64>,
    pub diastolic_mmhg: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VitalSign {
    Temperature,
    Pulse,
    RespiratoryRate,
    Spo2,
    Systolic,
    Diastolic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum VitalStatus {
    Low,
    Normal,
    Elevated,
    Critical,
}

/// Thresholds for one sign. Values below `critical_low` or at/above
/// `critical_high` are critical; `[low, high]` is the normal band.
struct Band {
    critical_low: f64,
    low: f64,
    high: f64,
    critical_high: f64,
}

impl VitalSign {
    fn band(&self) -> Band {
        match self {
            VitalSign::Temperature => Band {
                critical_low: 35.0,
                low: 36.1,
                high: 37.5,
                critical_high: 40.0,
            },
            VitalSign::Pulse => Band {
                critical_low: 40.0,
                low: 60.0,
                high: 100.0,
                critical_high: 130.0,
            },
            VitalSign::RespiratoryRate => Band {
                critical_low: 8.0,
                low: 12.0,
                high: 20.0,
                critical_high: 30.0,
            },
            VitalSign::Spo2 => Band {
                critical_low: 90.0,
                low: 95.0,
                high: 100.0,
                critical_high: f64::INFINITY,
            },
            VitalSign::Systolic => Band {
                critical_low: 70.0,
                low: 90.0,
                high: 120.0,
                critical_high: 180.0,
            },
            VitalSign::Diastolic => Band {
                critical_low: 40.0,
                low: 60.0,
                high: 80.0,
                critical_high: 120.0,
            },
        }
    }

    pub fn classify(&self, value: f64) -> VitalStatus {
        let band = self.band();
        if value < band.critical_low {
            VitalStatus::Critical
        } else if value < band.low {
            VitalStatus::Low
        } else if value <= band.high {
            VitalStatus::Normal
        } else if value < band.critical_high {
            VitalStatus::Elevated
        } else {
            VitalStatus::Critical
        }
    }
}

impl VitalsReading {
    /// Status of every sign that was recorded, in a fixed order.
    pub fn statuses(&self) -> Vec<(VitalSign, VitalStatus)> {
        [
            (VitalSign::Temperature, self.temperature_c),
            (VitalSign::Pulse, self.pulse_bpm),
            (VitalSign::RespiratoryRate, self.respiratory_rate),
            (VitalSign::Spo2, self.spo2_percent),
            (VitalSign::Systolic, self.systolic_mmhg),
            (VitalSign::Diastolic, self.diastolic_mmhg),
        ]
        .into_iter()
        .filter_map(|(sign, value)| value.map(|v| (sign, sign.classify(v))))
        .collect()
    }

    pub fn has_critical(&self) -> bool {
        self.statuses()
            .iter()
            .any(|(_, status)| *status == VitalStatus::Critical)
    }
}
