//! Server-pushed event frames.
//!
//! Responses answer a request by id; events arrive unsolicited on any
//! connection that joined a data channel. Both travel as single JSON
//! lines on the same socket, so a reader distinguishes them by shape:
//! events carry an `"event"` tag, responses carry an `"id"`.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::types::RpcResponse;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// A simulation payload relayed to every subscriber of the channel.
    SimulationData {
        data_channel_id: String,
        payload: Value,
    },
}

impl Event {
    pub fn channel(&self) -> &str {
        match self {
            Event::SimulationData {
                data_channel_id, ..
            } => data_channel_id,
        }
    }
}

/// One line read from the server side of a connection.
#[derive(Debug)]
pub enum ServerFrame {
    Response(RpcResponse),
    Event(Event),
}

impl ServerFrame {
    pub fn parse(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        if value.get("event").is_some() {
            Ok(ServerFrame::Event(serde_json::from_value(value)?))
        } else {
            Ok(ServerFrame::Response(serde_json::from_value(value)?))
        }
    }
}
