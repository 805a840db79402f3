//! Connection registry and event fan-out.
//!
//! The `Broadcaster` actor owns the set of connected viewer sessions and
//! delivers every published event to each of them, at most once. There is no
//! replay for late joiners and no delivery acknowledgment.

use std::collections::HashMap;

use actix::prelude::*;
use serde::Serialize;
use tracing::{debug, error, info};

/// Server-to-client push event. Serializes to `{"event": ..., "data": ...}`
/// with the event names the dashboard frontend subscribes to.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    #[serde(rename_all = "camelCase")]
    PatientUpdate {
        patient_id: String,
        reading: serde_json::Value,
    },
    #[serde(rename_all = "camelCase")]
    PatientAlert {
        patient_id: String,
        name: String,
        reading: serde_json::Value,
    },
}

/// Serialized event text pushed to a session.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct WsMessage(pub String);

#[derive(Message)]
#[rtype(result = "usize")]
pub struct Connect {
    pub addr: Recipient<WsMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub id: usize,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Publish(pub OutboundEvent);

#[derive(Default)]
pub struct Broadcaster {
    sessions: HashMap<usize, Recipient<WsMessage>>,
    next_id: usize,
}

impl Actor for Broadcaster {
    type Context = Context<Self>;
}

impl Handler<Connect> for Broadcaster {
    type Result = usize;

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) -> usize {
        self.next_id += 1;
        self.sessions.insert(self.next_id, msg.addr);
        info!(viewers = self.sessions.len(), "viewer connected");
        self.next_id
    }
}

impl Handler<Disconnect> for Broadcaster {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        self.sessions.remove(&msg.id);
        info!(viewers = self.sessions.len(), "viewer disconnected");
    }
}

impl Handler<Publish> for Broadcaster {
    type Result = ();

    fn handle(&mut self, msg: Publish, _: &mut Context<Self>) {
        let text = match serde_json::to_string(&msg.0) {
            Ok(text) => text,
            Err(e) => {
                error!("failed to serialize broadcast event: {e}");
                return;
            }
        };
        debug!(viewers = self.sessions.len(), "broadcasting event");
        for addr in self.sessions.values() {
            addr.do_send(WsMessage(text.clone()));
        }
    }
}

/// Seam between the ingestion pipeline and the broadcast channel.
#[cfg_attr(test, mockall::automock)]
pub trait EventSink: Send + Sync {
    fn publish(&self, event: OutboundEvent);
}

impl EventSink for Addr<Broadcaster> {
    fn publish(&self, event: OutboundEvent) {
        self.do_send(Publish(event));
    }
}
