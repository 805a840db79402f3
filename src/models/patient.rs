use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::vital::Vital;

/// Acceptable `[min, max]` range for one vital. Values strictly outside the
/// range are flagged; values exactly at min or max are not.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRange {
    pub min: f64,
    pub max: f64,
}

impl ThresholdRange {
    /// Strict-exclusive comparison: only `value < min` or `value > max`
    /// counts as a breach.
    pub fn breached_by(&self, value: f64) -> bool {
        value < self.min || value > self.max
    }
}

fn ordered_range(range: &ThresholdRange) -> Result<(), ValidationError> {
    if range.min > range.max {
        return Err(ValidationError::new("threshold_min_above_max"));
    }
    Ok(())
}

/// Per-patient alert thresholds. Diastolic blood pressure carries no
/// threshold; only the systolic component is checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VitalThresholds {
    #[validate(custom = "ordered_range")]
    pub heart_rate: ThresholdRange,
    #[validate(custom = "ordered_range")]
    pub temperature: ThresholdRange,
    #[validate(custom = "ordered_range")]
    pub blood_pressure: ThresholdRange,
    #[validate(custom = "ordered_range")]
    pub oxygen_saturation: ThresholdRange,
}

impl VitalThresholds {
    /// Threshold range for a vital, or None for vitals that are never
    /// checked.
    pub fn for_vital(&self, vital: Vital) -> Option<ThresholdRange> {
        match vital {
            Vital::HeartRate => Some(self.heart_rate),
            Vital::Temperature => Some(self.temperature),
            Vital::SystolicBp => Some(self.blood_pressure),
            Vital::DiastolicBp => None,
            Vital::OxygenSaturation => Some(self.oxygen_saturation),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    /// External patient identifier, unique across the directory.
    #[validate(length(min = 1))]
    pub patient_id: String,
    #[validate(length(min = 1))]
    pub name: String,
    #[validate(range(min = 0, max = 130))]
    pub age: i64,
    pub gender: String,
    /// Free-text condition label, e.g. "Post-operative recovery".
    pub condition: String,
    /// Identifier of the external telemetry channel this patient's sensors
    /// report to.
    #[validate(length(min = 1))]
    pub channel_id: String,
    #[validate]
    pub thresholds: VitalThresholds,
}
