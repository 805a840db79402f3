//! Telemetry broker client.
//!
//! Subscribes to the broker over WebSocket and feeds inbound frames into a
//! bounded queue with a single consumer, so the pipeline's merge-or-create
//! sequence runs one message at a time. Connection loss triggers a delayed
//! reconnect; individual messages are never retried.

use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{info, warn};

use super::ingest::{Ingestor, TelemetryMessage};
use crate::config::TelemetryConfig;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const QUEUE_DEPTH: usize = 256;
/// All sensor fields on all channels; resolution to a patient happens in the
/// pipeline, which discards messages for unlinked channels.
const SUBSCRIPTION_PATTERN: &str = "+/sensor/+";

#[derive(Debug, Deserialize)]
struct BrokerFrame {
    topic: String,
    payload: String,
}

/// Runs the broker client until the process exits.
pub async fn run(config: TelemetryConfig, ingestor: Ingestor) {
    let (tx, mut rx) = mpsc::channel::<TelemetryMessage>(QUEUE_DEPTH);

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            ingestor.handle_message(&msg).await;
        }
    });

    loop {
        match connect_and_stream(&config, &tx).await {
            Ok(()) => warn!("telemetry broker closed the connection"),
            Err(e) => warn!("telemetry broker connection failed: {e}"),
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect_and_stream(
    config: &TelemetryConfig,
    tx: &mpsc::Sender<TelemetryMessage>,
) -> anyhow::Result<()> {
    let (stream, _) = connect_async(&config.broker_url).await?;
    let (mut sink, mut frames) = stream.split();

    let subscribe = json!({
        "action": "subscribe",
        "pattern": SUBSCRIPTION_PATTERN,
        "username": config.username,
        "password": config.password,
    });
    sink.send(Message::Text(subscribe.to_string())).await?;
    info!(pattern = SUBSCRIPTION_PATTERN, "subscribed to telemetry broker");

    while let Some(frame) = frames.next().await {
        match frame? {
            Message::Text(text) => match serde_json::from_str::<BrokerFrame>(&text) {
                Ok(frame) => {
                    let msg = TelemetryMessage {
                        topic: frame.topic,
                        payload: frame.payload,
                    };
                    if tx.send(msg).await.is_err() {
                        return Ok(());
                    }
                }
                Err(e) => warn!("unparseable broker frame: {e}"),
            },
            Message::Ping(payload) => sink.send(Message::Pong(payload)).await?,
            Message::Close(_) => return Ok(()),
            _ => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broker_frames_deserialize_topic_and_payload() {
        let frame: BrokerFrame =
            serde_json::from_str(r#"{"topic":"ward7-bed1/sensor/field1","payload":"72.5"}"#)
                .unwrap();
        assert_eq!(frame.topic, "ward7-bed1/sensor/field1");
        assert_eq!(frame.payload, "72.5");
    }
}
