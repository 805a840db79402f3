use serde::{Deserialize, Serialize};

/// One monitored physiological measurement. Blood pressure is split into its
/// systolic and diastolic components because sensors report them on separate
/// field indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Vital {
    HeartRate,
    Temperature,
    SystolicBp,
    DiastolicBp,
    OxygenSaturation,
}

impl Vital {
    /// Maps a telemetry field index to its vital slot. The numbering is fixed
    /// by the sensor firmware: field1 through field5.
    pub fn from_field_index(index: u8) -> Option<Self> {
        match index {
            1 => Some(Vital::HeartRate),
            2 => Some(Vital::Temperature),
            3 => Some(Vital::SystolicBp),
            4 => Some(Vital::DiastolicBp),
            5 => Some(Vital::OxygenSaturation),
            _ => None,
        }
    }

    /// Column name in the readings table.
    pub fn column(self) -> &'static str {
        match self {
            Vital::HeartRate => "heart_rate",
            Vital::Temperature => "temperature",
            Vital::SystolicBp => "systolic_bp",
            Vital::DiastolicBp => "diastolic_bp",
            Vital::OxygenSaturation => "oxygen_saturation",
        }
    }

    /// JSON key used in broadcast payloads and API responses.
    pub fn key(self) -> &'static str {
        match self {
            Vital::HeartRate => "heartRate",
            Vital::Temperature => "temperature",
            Vital::SystolicBp => "systolicBp",
            Vital::DiastolicBp => "diastolicBp",
            Vital::OxygenSaturation => "oxygenSaturation",
        }
    }
}
