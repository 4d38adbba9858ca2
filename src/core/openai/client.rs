//! HTTP client for the OpenAI REST endpoints behind the gateway's proxy routes.

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::config::{
    DEFAULT_AUDIO_FILE_NAME, REALTIME_SESSION_INSTRUCTIONS, REALTIME_SESSIONS_PATH, SPEECH_PATH,
    SpeechFormat, SpeechModel, TRANSCRIPTION_RESPONSE_FORMAT, TRANSCRIPTIONS_PATH,
    TranscriptionModel,
};
use super::{OpenAIError, OpenAIResult};

/// Body of `POST /v1/realtime/sessions`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RealtimeSessionRequest {
    pub model: String,
    pub voice: String,
    pub instructions: String,
}

impl RealtimeSessionRequest {
    pub fn transcription(model: &str, voice: &str) -> Self {
        Self {
            model: model.to_string(),
            voice: voice.to_string(),
            instructions: REALTIME_SESSION_INSTRUCTIONS.to_string(),
        }
    }
}

/// Body of `POST /v1/audio/speech`
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SpeechRequest {
    pub model: SpeechModel,
    pub voice: String,
    pub input: String,
    pub format: SpeechFormat,
}

/// Audio file forwarded to the transcription endpoint
#[derive(Debug, Clone)]
pub struct AudioUpload {
    pub data: Bytes,
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

/// Transcript reshaped from the verbose transcription response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub transcript: String,
    pub language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TextEntry {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct SegmentEntry {
    #[serde(default)]
    language: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct VerboseTranscription {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    results: Option<Vec<TextEntry>>,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    detected_language: Option<String>,
    #[serde(default)]
    segments: Option<Vec<SegmentEntry>>,
}

impl From<VerboseTranscription> for Transcription {
    fn from(data: VerboseTranscription) -> Self {
        let transcript = data
            .text
            .or_else(|| {
                data.results
                    .and_then(|results| results.into_iter().next())
                    .and_then(|entry| entry.text)
            })
            .unwrap_or_default();

        let language = data.language.or(data.detected_language).or_else(|| {
            data.segments
                .and_then(|segments| segments.into_iter().next())
                .and_then(|segment| segment.language)
        });

        Transcription {
            transcript,
            language,
        }
    }
}

/// Thin OpenAI REST client.
///
/// Cloning is cheap; the underlying `reqwest::Client` pools connections.
#[derive(Debug, Clone)]
pub struct OpenAIClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAIClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Read an error body as JSON, falling back to an empty object
    async fn json_details(response: reqwest::Response) -> Value {
        response
            .json::<Value>()
            .await
            .unwrap_or_else(|_| Value::Object(Default::default()))
    }

    /// Mint an ephemeral realtime session. The upstream JSON is returned unchanged.
    pub async fn create_realtime_session(
        &self,
        request: &RealtimeSessionRequest,
    ) -> OpenAIResult<Value> {
        debug!(model = %request.model, voice = %request.voice, "Creating realtime session");

        let response = self
            .http
            .post(self.url(REALTIME_SESSIONS_PATH))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("OpenAI-Beta", "realtime=v1")
            .json(request)
            .send()
            .await
            .map_err(|e| OpenAIError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let details = Self::json_details(response).await;
            warn!(status = %status, "Realtime session request rejected");
            return Err(OpenAIError::Upstream {
                status: status.as_u16(),
                details,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| OpenAIError::InvalidResponse(e.to_string()))
    }

    /// Synthesize speech, returning the encoded audio bytes.
    pub async fn synthesize_speech(&self, request: &SpeechRequest) -> OpenAIResult<Bytes> {
        debug!(voice = %request.voice, chars = request.input.len(), "Synthesizing speech");

        let response = self
            .http
            .post(self.url(SPEECH_PATH))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| OpenAIError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let details = Self::json_details(response).await;
            warn!(status = %status, "Speech synthesis rejected");
            return Err(OpenAIError::Upstream {
                status: status.as_u16(),
                details,
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| OpenAIError::Network(format!("Failed to read audio: {e}")))
    }

    /// Transcribe an uploaded audio file with the verbose response format.
    pub async fn transcribe(&self, upload: AudioUpload) -> OpenAIResult<Transcription> {
        let file_name = upload
            .file_name
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| DEFAULT_AUDIO_FILE_NAME.to_string());

        info!(
            "Sending {} bytes of audio to OpenAI transcription ({})",
            upload.data.len(),
            file_name
        );

        let mut file_part = Part::bytes(upload.data.to_vec()).file_name(file_name);
        if let Some(content_type) = upload.content_type.as_deref() {
            file_part = file_part
                .mime_str(content_type)
                .map_err(|e| OpenAIError::InvalidRequest(format!("Invalid MIME type: {e}")))?;
        }

        let form = Form::new()
            .part("file", file_part)
            .text("model", TranscriptionModel::default().as_str().to_string())
            .text("response_format", TRANSCRIPTION_RESPONSE_FORMAT.to_string());

        let response = self
            .http
            .post(self.url(TRANSCRIPTIONS_PATH))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| OpenAIError::Network(format!("Request failed: {e}")))?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| OpenAIError::Network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            warn!(status = %status, "Transcription rejected: {}", response_text);
            return Err(OpenAIError::Upstream {
                status: status.as_u16(),
                details: Value::String(response_text),
            });
        }

        let data: VerboseTranscription = serde_json::from_str(&response_text)
            .map_err(|e| OpenAIError::InvalidResponse(e.to_string()))?;
        let transcription = Transcription::from(data);

        info!(language = ?transcription.language, "Transcription complete");
        Ok(transcription)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Transcription {
        Transcription::from(serde_json::from_str::<VerboseTranscription>(json).unwrap())
    }

    #[test]
    fn test_transcription_prefers_text_and_language() {
        let t = parse(r#"{"text":"two tacos please","language":"english","segments":[{"language":"fr"}]}"#);
        assert_eq!(t.transcript, "two tacos please");
        assert_eq!(t.language.as_deref(), Some("english"));
    }

    #[test]
    fn test_transcription_fallbacks() {
        let t = parse(r#"{"results":[{"text":"from results"}],"segments":[{"language":"es"}]}"#);
        assert_eq!(t.transcript, "from results");
        assert_eq!(t.language.as_deref(), Some("es"));

        let t = parse(r#"{"detected_language":"de"}"#);
        assert_eq!(t.transcript, "");
        assert_eq!(t.language.as_deref(), Some("de"));

        let t = parse("{}");
        assert_eq!(t.transcript, "");
        assert!(t.language.is_none());
    }

    #[test]
    fn test_transcription_serializes_null_language() {
        let value = serde_json::to_value(Transcription {
            transcript: "hi".to_string(),
            language: None,
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"transcript": "hi", "language": null}));
    }

    #[test]
    fn test_speech_request_wire_format() {
        let request = SpeechRequest {
            model: SpeechModel::default(),
            voice: "alloy".to_string(),
            input: "Your order is on its way".to_string(),
            format: SpeechFormat::default(),
        };
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({
                "model": "gpt-4o-mini-tts",
                "voice": "alloy",
                "input": "Your order is on its way",
                "format": "mp3"
            })
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let client = OpenAIClient::new(reqwest::Client::new(), "sk", "https://api.openai.com/");
        assert_eq!(
            client.url(SPEECH_PATH),
            "https://api.openai.com/v1/audio/speech"
        );
    }
}
