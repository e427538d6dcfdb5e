//! # Detector Wire Protocol
//!
//! The pitch-detection service speaks a minimal protocol over one duplex
//! WebSocket: the client sends raw PCM16 audio blocks as binary frames, the
//! service replies with JSON text frames. This module owns the endpoint
//! derivation and the inbound message shape; it never touches the socket.

use serde::Deserialize;

/// Path of the tuner WebSocket on the backend.
pub const TUNER_WS_PATH: &str = "/ws/tuner";

/// A message from the pitch-detection service.
///
/// Unrecognized `type` values deserialize to [`DetectorMessage::Unknown`] so
/// newer backends can add message kinds without breaking older clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DetectorMessage {
    /// One pitch measurement: detected frequency and its deviation from the
    /// nearest equal-temperament note, in cents.
    Pitch { frequency: f32, cents: f32 },
    #[serde(other)]
    Unknown,
}

/// Parses one inbound text frame.
///
/// Malformed frames are an error for the caller to log and drop; they are
/// never fatal to the connection.
pub fn parse_message(text: &str) -> Result<DetectorMessage, serde_json::Error> {
    serde_json::from_str(text)
}

/// Derives the tuner WebSocket URL from the backend base URL: the scheme is
/// upgraded (`http`→`ws`, `https`→`wss`) and [`TUNER_WS_PATH`] appended.
pub fn tuner_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let upgraded = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{upgraded}{TUNER_WS_PATH}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pitch_messages() {
        let msg = parse_message(r#"{"type":"pitch","frequency":110.0,"cents":-3.5}"#).unwrap();
        assert_eq!(
            msg,
            DetectorMessage::Pitch {
                frequency: 110.0,
                cents: -3.5
            }
        );
    }

    #[test]
    fn unrecognized_types_are_not_errors() {
        let msg = parse_message(r#"{"type":"status","detail":"warming up"}"#).unwrap();
        assert_eq!(msg, DetectorMessage::Unknown);
    }

    #[test]
    fn malformed_frames_are_errors() {
        assert!(parse_message("{not json").is_err());
        assert!(parse_message(r#"{"frequency":110.0}"#).is_err());
        assert!(parse_message(r#"{"type":"pitch","frequency":"loud"}"#).is_err());
    }

    #[test]
    fn endpoint_upgrades_the_scheme() {
        assert_eq!(
            tuner_endpoint("http://localhost:8080"),
            "ws://localhost:8080/ws/tuner"
        );
        assert_eq!(
            tuner_endpoint("https://chords.example.com/"),
            "wss://chords.example.com/ws/tuner"
        );
    }
}
