use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::vital::Vital;

/// One time-windowed accumulation of vital values for a patient.
///
/// A reading starts out carrying a single field, since each telemetry message
/// updates one vital at a time, and accumulates further fields for up to 60
/// seconds after its creation timestamp. `is_alert` is monotonic within that
/// window: once any contributing value breaches its threshold the flag stays
/// set for the life of the reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: Uuid,
    pub patient_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oxygen_saturation: Option<f64>,
    pub is_alert: bool,
}

impl Reading {
    /// New empty reading for a patient, timestamped at its creation.
    pub fn new(patient_id: &str, timestamp: DateTime<Utc>) -> Self {
        Reading {
            id: Uuid::new_v4(),
            patient_id: patient_id.to_string(),
            timestamp,
            heart_rate: None,
            temperature: None,
            systolic_bp: None,
            diastolic_bp: None,
            oxygen_saturation: None,
            is_alert: false,
        }
    }

    pub fn set_vital(&mut self, vital: Vital, value: f64) {
        match vital {
            Vital::HeartRate => self.heart_rate = Some(value),
            Vital::Temperature => self.temperature = Some(value),
            Vital::SystolicBp => self.systolic_bp = Some(value),
            Vital::DiastolicBp => self.diastolic_bp = Some(value),
            Vital::OxygenSaturation => self.oxygen_saturation = Some(value),
        }
    }

    pub fn vital(&self, vital: Vital) -> Option<f64> {
        match vital {
            Vital::HeartRate => self.heart_rate,
            Vital::Temperature => self.temperature,
            Vital::SystolicBp => self.systolic_bp,
            Vital::DiastolicBp => self.diastolic_bp,
            Vital::OxygenSaturation => self.oxygen_saturation,
        }
    }
}
