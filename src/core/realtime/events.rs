//! Event types exchanged over the realtime event channel.

use base64::prelude::*;
use serde::{Deserialize, Serialize};

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Session fields updated once the event channel opens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionUpdate {
    pub instructions: String,
}

/// Response parameters for `response.create`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseRequest {
    pub modalities: Vec<String>,
    pub instructions: String,
}

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },

    /// Append audio to input buffer (WebSocket transport only)
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded PCM16 audio
        audio: String,
    },

    /// Clear the input audio buffer
    #[serde(rename = "input_audio_buffer.clear")]
    InputAudioBufferClear,

    /// Commit the input audio buffer
    #[serde(rename = "input_audio_buffer.commit")]
    InputAudioBufferCommit,

    /// Request a response
    #[serde(rename = "response.create")]
    ResponseCreate { response: ResponseRequest },
}

impl ClientEvent {
    pub fn session_update(instructions: &str) -> Self {
        ClientEvent::SessionUpdate {
            session: SessionUpdate {
                instructions: instructions.to_string(),
            },
        }
    }

    /// A text-only response with the given instructions
    pub fn text_response(instructions: &str) -> Self {
        ClientEvent::ResponseCreate {
            response: ResponseRequest {
                modalities: vec!["text".to_string()],
                instructions: instructions.to_string(),
            },
        }
    }

    /// Create an audio append event from raw bytes.
    pub fn audio_append(data: &[u8]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: BASE64_STANDARD.encode(data),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Error details carried by an `error` event
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct ApiError {
    #[serde(default, rename = "type")]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Server events the session reacts to. Anything else lands in `Unknown`.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Streamed text fragment of the transcript
    #[serde(rename = "response.output_text.delta", alias = "response.text.delta")]
    OutputTextDelta {
        #[serde(default)]
        delta: Option<String>,
    },

    /// Text output finished
    #[serde(rename = "response.output_text.done", alias = "response.text.done")]
    OutputTextDone,

    /// Response finished
    #[serde(rename = "response.completed", alias = "response.done")]
    ResponseCompleted,

    /// Speech started (server VAD)
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,

    /// Speech stopped (server VAD)
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,

    /// Audio output fragment (WebSocket transport)
    #[serde(rename = "response.audio.delta", alias = "response.output_audio.delta")]
    AudioDelta {
        /// Base64-encoded PCM16 audio
        #[serde(default)]
        delta: Option<String>,
    },

    /// Error reported by the remote side
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<ApiError>,
    },

    #[serde(other)]
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_event_wire_format() {
        let update = serde_json::to_value(ClientEvent::session_update("be brief")).unwrap();
        assert_eq!(
            update,
            json!({"type": "session.update", "session": {"instructions": "be brief"}})
        );

        let clear = serde_json::to_value(ClientEvent::InputAudioBufferClear).unwrap();
        assert_eq!(clear, json!({"type": "input_audio_buffer.clear"}));

        let response = serde_json::to_value(ClientEvent::text_response("transcribe")).unwrap();
        assert_eq!(
            response,
            json!({
                "type": "response.create",
                "response": {"modalities": ["text"], "instructions": "transcribe"}
            })
        );
    }

    #[test]
    fn test_audio_append_is_base64() {
        let event = ClientEvent::audio_append(&[0x01, 0x02, 0x03]);
        assert_eq!(
            event,
            ClientEvent::InputAudioBufferAppend {
                audio: "AQID".to_string()
            }
        );
    }

    #[test]
    fn test_server_event_parsing() {
        let delta: ServerEvent = serde_json::from_str(
            r#"{"type":"response.output_text.delta","event_id":"e1","delta":"Hel"}"#,
        )
        .unwrap();
        assert_eq!(
            delta,
            ServerEvent::OutputTextDelta {
                delta: Some("Hel".to_string())
            }
        );

        let done: ServerEvent =
            serde_json::from_str(r#"{"type":"response.output_text.done","text":"Hello"}"#)
                .unwrap();
        assert_eq!(done, ServerEvent::OutputTextDone);

        let started: ServerEvent = serde_json::from_str(
            r#"{"type":"input_audio_buffer.speech_started","audio_start_ms":10,"item_id":"i"}"#,
        )
        .unwrap();
        assert_eq!(started, ServerEvent::SpeechStarted);
    }

    #[test]
    fn test_null_delta_still_parses() {
        let delta: ServerEvent =
            serde_json::from_str(r#"{"type":"response.output_text.delta","delta":null}"#).unwrap();
        assert_eq!(delta, ServerEvent::OutputTextDelta { delta: None });

        let missing: ServerEvent =
            serde_json::from_str(r#"{"type":"response.text.delta"}"#).unwrap();
        assert_eq!(missing, ServerEvent::OutputTextDelta { delta: None });

        let audio: ServerEvent =
            serde_json::from_str(r#"{"type":"response.audio.delta","delta":null}"#).unwrap();
        assert_eq!(audio, ServerEvent::AudioDelta { delta: None });
    }

    #[test]
    fn test_server_event_aliases() {
        let delta: ServerEvent =
            serde_json::from_str(r#"{"type":"response.text.delta","delta":"x"}"#).unwrap();
        assert!(matches!(delta, ServerEvent::OutputTextDelta { .. }));

        let done: ServerEvent = serde_json::from_str(r#"{"type":"response.done"}"#).unwrap();
        assert_eq!(done, ServerEvent::ResponseCompleted);
    }

    #[test]
    fn test_server_event_error_message() {
        let event: ServerEvent = serde_json::from_str(
            r#"{"type":"error","error":{"type":"invalid_request_error","message":"bad"}}"#,
        )
        .unwrap();
        match event {
            ServerEvent::Error { error } => {
                assert_eq!(error.unwrap().message.as_deref(), Some("bad"));
            }
            other => panic!("unexpected event {other:?}"),
        }

        let bare: ServerEvent = serde_json::from_str(r#"{"type":"error"}"#).unwrap();
        assert_eq!(bare, ServerEvent::Error { error: None });
    }

    #[test]
    fn test_unknown_event() {
        let event: ServerEvent =
            serde_json::from_str(r#"{"type":"rate_limits.updated","rate_limits":[]}"#).unwrap();
        assert_eq!(event, ServerEvent::Unknown);

        assert!(serde_json::from_str::<ServerEvent>("not json").is_err());
    }
}
