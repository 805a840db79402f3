//! Demo seeding for local operation.

use anyhow::{Context, Result};
use tracing::info;
use validator::Validate;

use super::Database;
use crate::models::{Patient, ThresholdRange, VitalThresholds};

fn adult_thresholds() -> VitalThresholds {
    VitalThresholds {
        heart_rate: ThresholdRange { min: 60.0, max: 100.0 },
        temperature: ThresholdRange { min: 36.1, max: 37.8 },
        blood_pressure: ThresholdRange { min: 90.0, max: 140.0 },
        oxygen_saturation: ThresholdRange { min: 92.0, max: 100.0 },
    }
}

fn demo_patients() -> Vec<Patient> {
    vec![
        Patient {
            patient_id: "P-001".into(),
            name: "Eleanor Vance".into(),
            age: 67,
            gender: "female".into(),
            condition: "Post-operative recovery".into(),
            channel_id: "ward7-bed1".into(),
            thresholds: adult_thresholds(),
        },
        Patient {
            patient_id: "P-002".into(),
            name: "Marcus Webb".into(),
            age: 54,
            gender: "male".into(),
            condition: "Cardiac observation".into(),
            channel_id: "ward7-bed2".into(),
            thresholds: VitalThresholds {
                heart_rate: ThresholdRange { min: 55.0, max: 95.0 },
                ..adult_thresholds()
            },
        },
        Patient {
            patient_id: "P-003".into(),
            name: "Ines Okafor".into(),
            age: 41,
            gender: "female".into(),
            condition: "Pneumonia".into(),
            channel_id: "ward7-bed3".into(),
            thresholds: VitalThresholds {
                oxygen_saturation: ThresholdRange { min: 94.0, max: 100.0 },
                ..adult_thresholds()
            },
        },
    ]
}

/// Inserts the demo patients if the directory is empty. Each record passes
/// explicit validation before it is persisted.
pub async fn seed_demo_data(db: &Database) -> Result<()> {
    if db.count_patients().await? > 0 {
        return Ok(());
    }
    for patient in demo_patients() {
        patient
            .validate()
            .with_context(|| format!("invalid demo patient {}", patient.patient_id))?;
        db.insert_patient(&patient).await?;
    }
    info!("seeded demo patients");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();

        seed_demo_data(&db).await.unwrap();
        let first = db.count_patients().await.unwrap();
        assert!(first > 0);

        seed_demo_data(&db).await.unwrap();
        assert_eq!(db.count_patients().await.unwrap(), first);
    }
}
