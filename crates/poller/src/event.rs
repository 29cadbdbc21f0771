use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "OBJECT_CREATED")]
    ObjectCreated,
    #[serde(rename = "OBJECT_DELETED")]
    ObjectDeleted,
}

/// The webhook payload. Field names and the epoch-seconds timestamp
/// are a wire contract; existing receivers depend on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub event_type: EventType,
    pub bucket: String,
    pub object_key: String,
    pub timestamp: f64,
}

impl ChangeEvent {
    pub fn new(event_type: EventType, bucket: &str, object_key: &str) -> Self {
        Self {
            event_type,
            bucket: bucket.to_string(),
            object_key: object_key.to_string(),
            timestamp: Utc::now().timestamp_millis() as f64 / 1000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_to_wire_format() {
        let event = ChangeEvent {
            event_type: EventType::ObjectCreated,
            bucket: "invoices".to_string(),
            object_key: "2024/jan.pdf".to_string(),
            timestamp: 1717000000.25,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "OBJECT_CREATED");
        assert_eq!(json["bucket"], "invoices");
        assert_eq!(json["object_key"], "2024/jan.pdf");
        assert_eq!(json["timestamp"], 1717000000.25);
    }

    #[test]
    fn test_new_stamps_current_time() {
        let event = ChangeEvent::new(EventType::ObjectDeleted, "b", "k");
        assert!(event.timestamp > 1_700_000_000.0);
    }
}
