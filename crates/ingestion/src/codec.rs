//! Wire decoding for realtime messages

use contracts::StreamEvent;

use crate::error::{IngestionError, Result};

/// Decode one raw message into a stream event
///
/// Only the envelope and field types are checked here; coordinate and speed
/// ranges are checked by the reconciler so the drop is counted there.
pub fn decode_event(channel_id: &str, raw: &str) -> Result<StreamEvent> {
    serde_json::from_str(raw.trim()).map_err(|e| IngestionError::DecodeFailed {
        channel_id: channel_id.to_string(),
        message: e.to_string(),
    })
}

/// Encode a stream event in wire form
pub fn encode_event(event: &StreamEvent) -> String {
    // StreamEvent holds only strings and numbers, serialization cannot fail
    serde_json::to_string(event).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Alert, EntityDelta};

    #[test]
    fn decodes_delta_with_extra_keys() {
        let raw = r#"{"event":"bus_location","data":{"bus_id":"12","lat":6.92,"lng":79.86,"speed":32.5,"heading":180}}"#;
        match decode_event("live", raw).unwrap() {
            StreamEvent::Delta(delta) => {
                assert_eq!(delta.entity_id, "12");
                assert_eq!(delta.speed, Some(32.5));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn rejects_garbage() {
        let err = decode_event("live", "{not json").unwrap_err();
        assert!(matches!(err, IngestionError::DecodeFailed { ref channel_id, .. } if channel_id == "live"));
        assert!(decode_event("live", r#"{"event":"bus_location","data":{"lat":1.0}}"#).is_err());
    }

    #[test]
    fn encoded_events_decode_back() {
        let events = [
            StreamEvent::Delta(EntityDelta::new("3").position(6.9, 79.8).status("idle")),
            StreamEvent::Alert(Alert {
                category: "delay".into(),
                message: "Bus 3 running late".into(),
                entity_id: Some("3".into()),
            }),
        ];
        for event in events {
            assert_eq!(decode_event("x", &encode_event(&event)).unwrap(), event);
        }
    }
}
