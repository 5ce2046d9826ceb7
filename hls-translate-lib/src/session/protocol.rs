//! Wire protocol for the remote realtime translation service.
//!
//! Outbound messages are built as exact JSON shapes; inbound messages are
//! parsed through a permissive envelope (unknown event types and extra
//! fields must never fail a session) and then classified into the small
//! set of events the session state machine reacts to.

use serde::Deserialize;
use serde_json::json;

/// Instruction template sent with every translation request.
fn translation_instructions(language: &str) -> String {
    format!(
        "Translate the spoken words in this audio to {language}. \
         If audio cannot be translated, mark it as intranslatable in the transcript."
    )
}

/// `conversation.item.create` carrying one chunk's base64 PCM audio.
pub fn append_audio(base64_audio: &str) -> serde_json::Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "message",
            "role": "user",
            "content": [
                {
                    "type": "input_audio",
                    "audio": base64_audio,
                }
            ]
        }
    })
}

/// `response.create` requesting an audio+text translation.
pub fn request_translation(language: &str) -> serde_json::Value {
    json!({
        "type": "response.create",
        "response": {
            "modalities": ["audio", "text"],
            "instructions": translation_instructions(language),
        }
    })
}

/// `session.update` continuation, used both as keep-alive and as the
/// response to a session-expired error.
pub fn session_continue() -> serde_json::Value {
    json!({
        "type": "session.update",
        "session": {
            "instructions": "Continue translation.",
        }
    })
}

/// Typed view of a server event, classified from the raw envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerEvent {
    /// One base64 audio fragment; arrival order is output order.
    AudioDelta { delta: String },
    /// The final transcript for the response.
    TranscriptDone { transcript: String },
    /// All audio fragments have been delivered.
    OutputItemDone,
    /// The response finished with a status (possibly incomplete).
    ResponseDone {
        status: Option<String>,
        reason: Option<String>,
    },
    /// Server-reported error event.
    Error {
        code: Option<String>,
        message: Option<String>,
    },
    /// Anything this pipeline does not react to.
    Other { event_type: String },
}

impl ServerEvent {
    /// True when the response finished but was cut off for output-token
    /// limits; the session treats this as a hard failure.
    pub fn is_token_limit(&self) -> bool {
        matches!(
            self,
            ServerEvent::ResponseDone { status: Some(s), reason: Some(r) }
                if s == "incomplete" && r == "max_output_tokens"
        )
    }

    /// True when the response was withheld by the content filter.
    pub fn is_content_filtered(&self) -> bool {
        matches!(
            self,
            ServerEvent::ResponseDone { status: Some(s), reason: Some(r) }
                if s == "incomplete" && r == "content_filter"
        )
    }

    /// True for the server's session-expired error.
    pub fn is_session_expired(&self) -> bool {
        matches!(
            self,
            ServerEvent::Error { code: Some(c), .. } if c == "session_expired"
        )
    }
}

/// Permissive envelope for everything the server sends.
#[derive(Debug, Deserialize)]
struct RawServerEvent {
    #[serde(rename = "type")]
    event_type: String,
    delta: Option<String>,
    transcript: Option<String>,
    response: Option<RawResponse>,
    error: Option<RawError>,
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    status: Option<String>,
    status_details: Option<RawStatusDetails>,
}

#[derive(Debug, Deserialize)]
struct RawStatusDetails {
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawError {
    code: Option<String>,
    message: Option<String>,
}

/// Parse one text frame into a classified event. Returns `None` for frames
/// that are not JSON objects with a `type` field.
pub fn parse_server_event(text: &str) -> Option<ServerEvent> {
    let raw: RawServerEvent = serde_json::from_str(text).ok()?;
    let event = match raw.event_type.as_str() {
        "response.audio.delta" => match raw.delta {
            Some(delta) => ServerEvent::AudioDelta { delta },
            None => ServerEvent::Other {
                event_type: raw.event_type,
            },
        },
        "response.audio_transcript.done" => ServerEvent::TranscriptDone {
            transcript: raw.transcript.unwrap_or_default(),
        },
        "response.output_item.done" => ServerEvent::OutputItemDone,
        "response.done" => {
            let (status, reason) = match raw.response {
                Some(r) => (r.status, r.status_details.and_then(|d| d.reason)),
                None => (None, None),
            };
            ServerEvent::ResponseDone { status, reason }
        }
        "error" => {
            let (code, message) = match raw.error {
                Some(e) => (e.code, e.message),
                None => (None, None),
            };
            ServerEvent::Error { code, message }
        }
        _ => ServerEvent::Other {
            event_type: raw.event_type,
        },
    };
    Some(event)
}

/// Serialize an outbound message for the socket.
pub fn encode(message: &serde_json::Value) -> String {
    message.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_audio_shape() {
        let msg = append_audio("QUJD");
        assert_eq!(msg["type"], "conversation.item.create");
        assert_eq!(msg["item"]["role"], "user");
        assert_eq!(msg["item"]["content"][0]["type"], "input_audio");
        assert_eq!(msg["item"]["content"][0]["audio"], "QUJD");
    }

    #[test]
    fn request_translation_shape() {
        let msg = request_translation("french");
        assert_eq!(msg["type"], "response.create");
        assert_eq!(msg["response"]["modalities"][0], "audio");
        assert_eq!(msg["response"]["modalities"][1], "text");
        let instructions = msg["response"]["instructions"].as_str().unwrap();
        assert!(instructions.contains("to french"));
        assert!(instructions.contains("intranslatable"));
    }

    #[test]
    fn session_continue_shape() {
        let msg = session_continue();
        assert_eq!(msg["type"], "session.update");
        assert_eq!(msg["session"]["instructions"], "Continue translation.");
    }

    #[test]
    fn parses_audio_delta() {
        let event =
            parse_server_event(r#"{"type":"response.audio.delta","delta":"AAAA"}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::AudioDelta {
                delta: "AAAA".into()
            }
        );
    }

    #[test]
    fn parses_transcript_done() {
        let event = parse_server_event(
            r#"{"type":"response.audio_transcript.done","transcript":"bonjour"}"#,
        )
        .unwrap();
        assert_eq!(
            event,
            ServerEvent::TranscriptDone {
                transcript: "bonjour".into()
            }
        );
    }

    #[test]
    fn parses_incomplete_token_limit() {
        let event = parse_server_event(
            r#"{"type":"response.done","response":{"status":"incomplete","status_details":{"reason":"max_output_tokens"}}}"#,
        )
        .unwrap();
        assert!(event.is_token_limit());
        assert!(!event.is_content_filtered());
    }

    #[test]
    fn parses_content_filter() {
        let event = parse_server_event(
            r#"{"type":"response.done","response":{"status":"incomplete","status_details":{"reason":"content_filter"}}}"#,
        )
        .unwrap();
        assert!(event.is_content_filtered());
    }

    #[test]
    fn parses_session_expired() {
        let event = parse_server_event(
            r#"{"type":"error","error":{"code":"session_expired","message":"stale"}}"#,
        )
        .unwrap();
        assert!(event.is_session_expired());
    }

    #[test]
    fn unknown_types_classify_as_other() {
        let event = parse_server_event(r#"{"type":"session.updated","session":{}}"#).unwrap();
        assert_eq!(
            event,
            ServerEvent::Other {
                event_type: "session.updated".into()
            }
        );
    }

    #[test]
    fn extra_fields_are_tolerated() {
        let event = parse_server_event(
            r#"{"type":"response.output_item.done","item":{"id":"x"},"event_id":"e1"}"#,
        )
        .unwrap();
        assert_eq!(event, ServerEvent::OutputItemDone);
    }

    #[test]
    fn non_json_frames_are_ignored() {
        assert!(parse_server_event("not json").is_none());
        assert!(parse_server_event("[1,2,3]").is_none());
    }
}
