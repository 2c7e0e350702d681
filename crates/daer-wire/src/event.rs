// SPDX-License-Identifier: MIT

//! The Event Log wire contract (spec §6): external consumers (the
//! dashboard) see `{event_id, execution_id, event_type, sequence,
//! step_number?, timestamp, data}`, not the internally-tagged
//! `daer_core::Event` shape the Runtime uses for replay.

use chrono::{DateTime, Utc};
use daer_core::event::Event;
use daer_core::ids::{EventId, ExecutionId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One event as it crosses the wire to an external subscriber.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WireEvent {
    pub event_id: EventId,
    pub execution_id: ExecutionId,
    pub event_type: String,
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step_number: Option<u32>,
    pub timestamp: DateTime<Utc>,
    pub data: Value,
}

impl From<&Event> for WireEvent {
    /// `daer_core::Event` flattens its payload's fields next to `event_type`
    /// for storage compactness; the wire contract nests them under `data`
    /// instead, so this re-serializes the event and peels `event_type` back
    /// out of the flattened object.
    fn from(event: &Event) -> Self {
        let mut data = serde_json::to_value(&event.payload).unwrap_or(Value::Null);
        if let Value::Object(map) = &mut data {
            map.remove("event_type");
        }
        Self {
            event_id: event.event_id,
            execution_id: event.execution_id,
            event_type: event.event_type().to_string(),
            sequence: event.sequence,
            step_number: event.step_number,
            timestamp: event.timestamp,
            data,
        }
    }
}

impl From<Event> for WireEvent {
    fn from(event: Event) -> Self {
        Self::from(&event)
    }
}

/// What a subscriber to the event bus asks to receive (spec §6 "Clients
/// subscribe either to all events or to a specific `execution_id`").
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Subscription {
    All,
    Execution { execution_id: ExecutionId },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
