use chrono::{DateTime, TimeZone, Utc};
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use super::{Database, DbError};
use crate::models::{Patient, Reading, Vital, VitalThresholds};

#[derive(FromRow)]
struct PatientRow {
    patient_id: String,
    name: String,
    age: i64,
    gender: String,
    condition: String,
    channel_id: String,
    thresholds: String,
}

impl TryFrom<PatientRow> for Patient {
    type Error = DbError;

    fn try_from(row: PatientRow) -> Result<Self, DbError> {
        let thresholds: VitalThresholds =
            serde_json::from_str(&row.thresholds).map_err(|source| DbError::Thresholds {
                patient_id: row.patient_id.clone(),
                source,
            })?;
        Ok(Patient {
            patient_id: row.patient_id,
            name: row.name,
            age: row.age,
            gender: row.gender,
            condition: row.condition,
            channel_id: row.channel_id,
            thresholds,
        })
    }
}

#[derive(FromRow)]
struct ReadingRow {
    id: String,
    patient_id: String,
    timestamp: i64,
    heart_rate: Option<f64>,
    temperature: Option<f64>,
    systolic_bp: Option<f64>,
    diastolic_bp: Option<f64>,
    oxygen_saturation: Option<f64>,
    is_alert: bool,
}

impl TryFrom<ReadingRow> for Reading {
    type Error = DbError;

    fn try_from(row: ReadingRow) -> Result<Self, DbError> {
        let timestamp = Utc
            .timestamp_millis_opt(row.timestamp)
            .single()
            .ok_or(DbError::Timestamp(row.timestamp))?;
        Ok(Reading {
            id: Uuid::parse_str(&row.id)?,
            patient_id: row.patient_id,
            timestamp,
            heart_rate: row.heart_rate,
            temperature: row.temperature,
            systolic_bp: row.systolic_bp,
            diastolic_bp: row.diastolic_bp,
            oxygen_saturation: row.oxygen_saturation,
            is_alert: row.is_alert,
        })
    }
}

impl Database {
    // ===== Patient Directory =====

    #[instrument(skip(self))]
    pub async fn list_patients(&self) -> Result<Vec<Patient>, DbError> {
        let rows = sqlx::query_as::<_, PatientRow>("SELECT * FROM patients ORDER BY patient_id")
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(Patient::try_from).collect()
    }

    #[instrument(skip(self))]
    pub async fn get_patient(&self, patient_id: &str) -> Result<Option<Patient>, DbError> {
        let row = sqlx::query_as::<_, PatientRow>("SELECT * FROM patients WHERE patient_id = ?")
            .bind(patient_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Patient::try_from).transpose()
    }

    /// Resolves a telemetry channel to the patient whose sensors report on
    /// it, if any.
    #[instrument(skip(self))]
    pub async fn find_patient_by_channel(
        &self,
        channel_id: &str,
    ) -> Result<Option<Patient>, DbError> {
        let row = sqlx::query_as::<_, PatientRow>("SELECT * FROM patients WHERE channel_id = ?")
            .bind(channel_id)
            .fetch_optional(self.pool())
            .await?;
        row.map(Patient::try_from).transpose()
    }

    #[instrument(skip(self, patient), fields(patient_id = %patient.patient_id))]
    pub async fn insert_patient(&self, patient: &Patient) -> Result<(), DbError> {
        let thresholds = serde_json::to_string(&patient.thresholds).map_err(|source| {
            DbError::Thresholds {
                patient_id: patient.patient_id.clone(),
                source,
            }
        })?;
        sqlx::query(
            "INSERT INTO patients (patient_id, name, age, gender, condition, channel_id, thresholds)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&patient.patient_id)
        .bind(&patient.name)
        .bind(patient.age)
        .bind(&patient.gender)
        .bind(&patient.condition)
        .bind(&patient.channel_id)
        .bind(thresholds)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    pub async fn count_patients(&self) -> Result<i64, DbError> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM patients")
            .fetch_one(self.pool())
            .await?;
        Ok(count.0)
    }

    // ===== Reading Store =====

    /// Up to `limit` most-recent readings for a patient, newest first.
    #[instrument(skip(self))]
    pub async fn recent_readings(
        &self,
        patient_id: &str,
        limit: i64,
    ) -> Result<Vec<Reading>, DbError> {
        let rows = sqlx::query_as::<_, ReadingRow>(
            "SELECT * FROM readings WHERE patient_id = ? ORDER BY timestamp DESC LIMIT ?",
        )
        .bind(patient_id)
        .bind(limit)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(Reading::try_from).collect()
    }

    /// Most recent reading for a patient created at or after `cutoff`. This
    /// is the merge-window lookup: a reading accumulates fields for as long
    /// as its creation timestamp stays within the window.
    #[instrument(skip(self))]
    pub async fn latest_reading_since(
        &self,
        patient_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Option<Reading>, DbError> {
        let row = sqlx::query_as::<_, ReadingRow>(
            "SELECT * FROM readings WHERE patient_id = ? AND timestamp >= ?
             ORDER BY timestamp DESC LIMIT 1",
        )
        .bind(patient_id)
        .bind(cutoff.timestamp_millis())
        .fetch_optional(self.pool())
        .await?;
        row.map(Reading::try_from).transpose()
    }

    #[instrument(skip(self, reading), fields(patient_id = %reading.patient_id))]
    pub async fn insert_reading(&self, reading: &Reading) -> Result<(), DbError> {
        sqlx::query(
            "INSERT INTO readings
             (id, patient_id, timestamp, heart_rate, temperature, systolic_bp, diastolic_bp, oxygen_saturation, is_alert)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(reading.id.to_string())
        .bind(&reading.patient_id)
        .bind(reading.timestamp.timestamp_millis())
        .bind(reading.heart_rate)
        .bind(reading.temperature)
        .bind(reading.systolic_bp)
        .bind(reading.diastolic_bp)
        .bind(reading.oxygen_saturation)
        .bind(reading.is_alert)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    /// Overwrites a single vital on an existing reading and ORs the alert
    /// flag in. The flag is monotonic: a later benign value never clears it.
    #[instrument(skip(self))]
    pub async fn merge_reading_vital(
        &self,
        id: &Uuid,
        vital: Vital,
        value: f64,
        alert: bool,
    ) -> Result<(), DbError> {
        // Column name comes from a fixed enum, never from input.
        let sql = format!(
            "UPDATE readings SET {} = ?, is_alert = MAX(is_alert, ?) WHERE id = ?",
            vital.column()
        );
        sqlx::query(&sql)
            .bind(value)
            .bind(alert)
            .bind(id.to_string())
            .execute(self.pool())
            .await?;
        Ok(())
    }
}
