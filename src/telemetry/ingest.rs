//! Ingestion pipeline: telemetry message in, persisted reading and broadcast
//! events out.
//!
//! Best-effort by design: any failure here is logged and the message dropped;
//! nothing propagates back to the transport or to any client.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, instrument};

use crate::db::{Database, DbError};
use crate::models::Vital;
use crate::websocket::server::{EventSink, OutboundEvent};

/// Trailing window during which a patient's most recent reading keeps
/// accumulating fields, in seconds.
pub const MERGE_WINDOW_SECS: i64 = 60;

/// One inbound message from the telemetry broker: a topic addressing a
/// `(channel, field)` pair and a decimal value as text.
#[derive(Debug, Clone)]
pub struct TelemetryMessage {
    pub topic: String,
    pub payload: String,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("topic {0:?} does not match <channel>/sensor/field<N>")]
    MalformedTopic(String),
    #[error("unknown field index {index} on channel {channel}")]
    UnknownField { channel: String, index: u8 },
    #[error("no patient linked to channel {0}")]
    UnknownChannel(String),
    #[error("payload {0:?} is not a finite number")]
    InvalidPayload(String),
    #[error(transparent)]
    Database(#[from] DbError),
}

impl IngestError {
    /// Messages that simply do not concern us are discarded without noise;
    /// everything else is a real failure.
    fn is_silent_discard(&self) -> bool {
        matches!(
            self,
            IngestError::MalformedTopic(_)
                | IngestError::UnknownField { .. }
                | IngestError::UnknownChannel(_)
        )
    }
}

/// Parsed topic: which channel reported, and which vital slot the field
/// index maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicAddress {
    pub channel: String,
    pub vital: Vital,
}

impl TopicAddress {
    /// Topics follow the broker convention `<channel>/sensor/field<N>`.
    pub fn parse(topic: &str) -> Result<Self, IngestError> {
        let malformed = || IngestError::MalformedTopic(topic.to_string());
        let mut segments = topic.split('/');
        let channel = segments.next().filter(|s| !s.is_empty()).ok_or_else(malformed)?;
        let kind = segments.next().ok_or_else(malformed)?;
        let field = segments.next().ok_or_else(malformed)?;
        if kind != "sensor" || segments.next().is_some() {
            return Err(malformed());
        }
        let index: u8 = field
            .strip_prefix("field")
            .and_then(|n| n.parse().ok())
            .ok_or_else(malformed)?;
        let vital = Vital::from_field_index(index).ok_or(IngestError::UnknownField {
            channel: channel.to_string(),
            index,
        })?;
        Ok(TopicAddress {
            channel: channel.to_string(),
            vital,
        })
    }
}

pub struct Ingestor {
    db: Database,
    sink: Arc<dyn EventSink>,
}

impl Ingestor {
    pub fn new(db: Database, sink: Arc<dyn EventSink>) -> Self {
        Ingestor { db, sink }
    }

    /// Processes one message, swallowing every error. The pipeline must
    /// survive any input.
    pub async fn handle_message(&self, msg: &TelemetryMessage) {
        match self.process(msg, Utc::now()).await {
            Ok(()) => {}
            Err(e) if e.is_silent_discard() => {
                debug!(topic = %msg.topic, "discarding telemetry message: {e}");
            }
            Err(e) => {
                error!(topic = %msg.topic, "telemetry ingestion failed: {e}");
            }
        }
    }

    /// Core pipeline with an injectable ingest time so the merge window is
    /// testable.
    #[instrument(skip(self, msg), fields(topic = %msg.topic))]
    pub(crate) async fn process(
        &self,
        msg: &TelemetryMessage,
        now: DateTime<Utc>,
    ) -> Result<(), IngestError> {
        let address = TopicAddress::parse(&msg.topic)?;
        let patient = self
            .db
            .find_patient_by_channel(&address.channel)
            .await?
            .ok_or_else(|| IngestError::UnknownChannel(address.channel.clone()))?;

        let value: f64 = msg
            .payload
            .trim()
            .parse()
            .map_err(|_| IngestError::InvalidPayload(msg.payload.clone()))?;
        if !value.is_finite() {
            return Err(IngestError::InvalidPayload(msg.payload.clone()));
        }

        let breached = patient
            .thresholds
            .for_vital(address.vital)
            .map_or(false, |range| range.breached_by(value));

        // Merge into the most recent reading still inside the window, or
        // start a new one. Messages are drained one at a time, so this
        // read-then-write sequence is single-writer.
        let cutoff = now - Duration::seconds(MERGE_WINDOW_SECS);
        let is_alert = match self.db.latest_reading_since(&patient.patient_id, cutoff).await? {
            Some(reading) => {
                self.db
                    .merge_reading_vital(&reading.id, address.vital, value, breached)
                    .await?;
                reading.is_alert || breached
            }
            None => {
                let mut reading = crate::models::Reading::new(&patient.patient_id, now);
                reading.set_vital(address.vital, value);
                reading.is_alert = breached;
                self.db.insert_reading(&reading).await?;
                breached
            }
        };

        let mut update = serde_json::Map::new();
        update.insert(address.vital.key().to_string(), json!(value));
        update.insert("timestamp".to_string(), json!(now));
        update.insert("isAlert".to_string(), json!(is_alert));
        self.sink.publish(OutboundEvent::PatientUpdate {
            patient_id: patient.patient_id.clone(),
            reading: update.into(),
        });

        if breached {
            let mut alert = serde_json::Map::new();
            alert.insert(address.vital.key().to_string(), json!(value));
            alert.insert("timestamp".to_string(), json!(now));
            self.sink.publish(OutboundEvent::PatientAlert {
                patient_id: patient.patient_id,
                name: patient.name,
                reading: alert.into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Patient, ThresholdRange, VitalThresholds};
    use crate::websocket::server::MockEventSink;
    use chrono::TimeZone;
    use mockall::Sequence;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.run_migrations().await.unwrap();
        db.insert_patient(&Patient {
            patient_id: "P-001".into(),
            name: "Eleanor Vance".into(),
            age: 67,
            gender: "female".into(),
            condition: "Post-operative recovery".into(),
            channel_id: "ward7-bed1".into(),
            thresholds: VitalThresholds {
                heart_rate: ThresholdRange { min: 60.0, max: 100.0 },
                temperature: ThresholdRange { min: 36.0, max: 38.0 },
                blood_pressure: ThresholdRange { min: 90.0, max: 140.0 },
                oxygen_saturation: ThresholdRange { min: 92.0, max: 100.0 },
            },
        })
        .await
        .unwrap();
        db
    }

    fn t0() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    fn msg(topic: &str, payload: &str) -> TelemetryMessage {
        TelemetryMessage {
            topic: topic.into(),
            payload: payload.into(),
        }
    }

    fn quiet_sink(expected_events: usize) -> Arc<MockEventSink> {
        let mut sink = MockEventSink::new();
        sink.expect_publish().times(expected_events).return_const(());
        Arc::new(sink)
    }

    #[test]
    fn topics_parse_into_channel_and_vital() {
        let address = TopicAddress::parse("ward7-bed1/sensor/field3").unwrap();
        assert_eq!(address.channel, "ward7-bed1");
        assert_eq!(address.vital, Vital::SystolicBp);

        assert!(matches!(
            TopicAddress::parse("ward7-bed1/field3"),
            Err(IngestError::MalformedTopic(_))
        ));
        assert!(matches!(
            TopicAddress::parse("ward7-bed1/actuator/field3"),
            Err(IngestError::MalformedTopic(_))
        ));
        assert!(matches!(
            TopicAddress::parse("ward7-bed1/sensor/field9"),
            Err(IngestError::UnknownField { index: 9, .. })
        ));
        assert!(matches!(
            TopicAddress::parse("/sensor/field1"),
            Err(IngestError::MalformedTopic(_))
        ));
    }

    #[tokio::test]
    async fn breaching_value_persists_an_alert_and_emits_both_events() {
        let db = test_db().await;
        let mut sink = MockEventSink::new();
        let mut seq = Sequence::new();
        sink.expect_publish()
            .once()
            .in_sequence(&mut seq)
            .withf(|event| match event {
                OutboundEvent::PatientUpdate { patient_id, reading } => {
                    patient_id == "P-001"
                        && reading["heartRate"] == 110.0
                        && reading["isAlert"] == true
                }
                _ => false,
            })
            .return_const(());
        sink.expect_publish()
            .once()
            .in_sequence(&mut seq)
            .withf(|event| match event {
                OutboundEvent::PatientAlert { patient_id, name, reading } => {
                    patient_id == "P-001"
                        && name == "Eleanor Vance"
                        && reading["heartRate"] == 110.0
                }
                _ => false,
            })
            .return_const(());

        let ingestor = Ingestor::new(db.clone(), Arc::new(sink));
        ingestor
            .process(&msg("ward7-bed1/sensor/field1", "110"), t0())
            .await
            .unwrap();

        let readings = db.recent_readings("P-001", 100).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].heart_rate, Some(110.0));
        assert!(readings[0].is_alert);
    }

    #[tokio::test]
    async fn in_range_value_emits_only_the_update_event() {
        let db = test_db().await;
        let mut sink = MockEventSink::new();
        sink.expect_publish()
            .once()
            .withf(|event| match event {
                OutboundEvent::PatientUpdate { reading, .. } => {
                    reading["heartRate"] == 80.0 && reading["isAlert"] == false
                }
                _ => false,
            })
            .return_const(());

        let ingestor = Ingestor::new(db.clone(), Arc::new(sink));
        ingestor
            .process(&msg("ward7-bed1/sensor/field1", "80"), t0())
            .await
            .unwrap();

        let readings = db.recent_readings("P-001", 100).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert!(!readings[0].is_alert);
    }

    #[tokio::test]
    async fn messages_within_the_window_merge_into_one_reading() {
        let db = test_db().await;
        let ingestor = Ingestor::new(db.clone(), quiet_sink(3));

        ingestor
            .process(&msg("ward7-bed1/sensor/field1", "80"), t0())
            .await
            .unwrap();
        ingestor
            .process(
                &msg("ward7-bed1/sensor/field2", "37.2"),
                t0() + Duration::seconds(10),
            )
            .await
            .unwrap();

        let readings = db.recent_readings("P-001", 100).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].heart_rate, Some(80.0));
        assert_eq!(readings[0].temperature, Some(37.2));

        // 61 seconds after the first message: the window has elapsed, a new
        // reading begins accumulating independently.
        ingestor
            .process(
                &msg("ward7-bed1/sensor/field5", "97"),
                t0() + Duration::seconds(61),
            )
            .await
            .unwrap();

        let readings = db.recent_readings("P-001", 100).await.unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].oxygen_saturation, Some(97.0));
        assert!(readings[0].heart_rate.is_none());
    }

    #[tokio::test]
    async fn alert_flag_is_monotonic_within_a_reading() {
        let db = test_db().await;
        let ingestor = Ingestor::new(db.clone(), quiet_sink(3));

        ingestor
            .process(&msg("ward7-bed1/sensor/field1", "110"), t0())
            .await
            .unwrap();
        ingestor
            .process(
                &msg("ward7-bed1/sensor/field2", "37.0"),
                t0() + Duration::seconds(5),
            )
            .await
            .unwrap();

        let readings = db.recent_readings("P-001", 100).await.unwrap();
        assert_eq!(readings.len(), 1);
        assert!(readings[0].is_alert);
    }

    #[tokio::test]
    async fn diastolic_bp_is_never_threshold_checked() {
        let db = test_db().await;
        // Wildly out of any plausible range, still only the update event.
        let ingestor = Ingestor::new(db.clone(), quiet_sink(1));
        ingestor
            .process(&msg("ward7-bed1/sensor/field4", "400"), t0())
            .await
            .unwrap();

        let readings = db.recent_readings("P-001", 100).await.unwrap();
        assert_eq!(readings[0].diastolic_bp, Some(400.0));
        assert!(!readings[0].is_alert);
    }

    #[tokio::test]
    async fn unmatched_channel_persists_and_broadcasts_nothing() {
        let db = test_db().await;
        let ingestor = Ingestor::new(db.clone(), quiet_sink(0));

        let err = ingestor
            .process(&msg("ward9-unknown/sensor/field1", "80"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::UnknownChannel(_)));
        assert!(err.is_silent_discard());
        assert!(db.recent_readings("P-001", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn non_numeric_payloads_are_rejected() {
        let db = test_db().await;
        let ingestor = Ingestor::new(db.clone(), quiet_sink(0));

        for payload in ["abc", "", "NaN", "inf", "1.2.3"] {
            let err = ingestor
                .process(&msg("ward7-bed1/sensor/field1", payload), t0())
                .await
                .unwrap_err();
            assert!(matches!(err, IngestError::InvalidPayload(_)), "{payload:?}");
        }
        assert!(db.recent_readings("P-001", 100).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn handle_message_swallows_every_error() {
        let db = test_db().await;
        let ingestor = Ingestor::new(db, quiet_sink(0));
        ingestor.handle_message(&msg("garbage", "nope")).await;
        ingestor
            .handle_message(&msg("ward9-unknown/sensor/field1", "80"))
            .await;
    }
}
