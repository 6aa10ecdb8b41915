use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Tags recognized on the event channel wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    TranscriptionProgress,
    TranscriptionStarted,
    TranscriptionCompleted,
    TranscriptionError,
    ModelStatus,
    ContainerStatus,
    SystemStatus,
    Error,
    Info,
    Ping,
    Pong,
    /// Anything else on the wire; logged and discarded
    #[serde(other)]
    Unknown,
}

/// Message exchanged over the event channel: `{"type": <tag>, "data": <payload>}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventMessage {
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default)]
    pub data: Value,
}

impl EventMessage {
    pub fn new(kind: EventType, data: Value) -> Self {
        Self { kind, data }
    }

    /// Payload-less message (ping, pong, simple signals)
    pub fn signal(kind: EventType) -> Self {
        Self {
            kind,
            data: Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_tag_round_trip() {
        let msg: EventMessage =
            serde_json::from_str(r#"{"type":"transcription_progress","data":{"progress":40}}"#)
                .unwrap();
        assert_eq!(msg.kind, EventType::TranscriptionProgress);
        assert_eq!(msg.data["progress"], 40);
    }

    #[test]
    fn test_unrecognized_tag_maps_to_unknown() {
        let msg: EventMessage =
            serde_json::from_str(r#"{"type":"made_up_tag","data":null}"#).unwrap();
        assert_eq!(msg.kind, EventType::Unknown);
    }

    #[test]
    fn test_missing_data_defaults_to_null() {
        let msg: EventMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.kind, EventType::Ping);
        assert!(msg.data.is_null());
    }
}
