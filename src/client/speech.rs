use bytes::Bytes;
use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{ClientError, ClientResult, SPEAK_PATH, gateway_endpoint};
use crate::config::DEFAULT_VOICE;

/// Plays synthesized audio; the returned future resolves when playback ends.
pub type PlaybackCallback =
    Arc<dyn Fn(Bytes) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

#[derive(Serialize)]
struct SpeakBody<'a> {
    text: &'a str,
    voice: &'a str,
}

struct Utterance {
    cancel: CancellationToken,
    speaking: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

/// Speaks assistant replies through the gateway's speech route.
///
/// At most one utterance is in flight: starting a new one cancels the
/// previous request or playback.
pub struct AssistantSpeech {
    http: reqwest::Client,
    endpoint: String,
    voice: String,
    muted: bool,
    last_utterance_id: Option<String>,
    on_playback: PlaybackCallback,
    current: Option<Utterance>,
}

impl AssistantSpeech {
    pub fn new(gateway_url: &str, on_playback: PlaybackCallback) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: gateway_endpoint(gateway_url, SPEAK_PATH),
            voice: DEFAULT_VOICE.to_string(),
            muted: false,
            last_utterance_id: None,
            on_playback,
            current: None,
        }
    }

    pub fn with_client(mut self, http: reqwest::Client) -> Self {
        self.http = http;
        self
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_muted(mut self, muted: bool) -> Self {
        self.muted = muted;
        self
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    pub fn is_speaking(&self) -> bool {
        self.current
            .as_ref()
            .is_some_and(|u| u.speaking.load(Ordering::SeqCst))
    }

    pub fn last_utterance_id(&self) -> Option<&str> {
        self.last_utterance_id.as_deref()
    }

    /// Speak `text` with the default voice
    pub fn speak(&mut self, id: &str, text: &str) {
        let voice = self.voice.clone();
        self.speak_with_voice(id, text, &voice);
    }

    pub fn speak_with_voice(&mut self, id: &str, text: &str, voice: &str) {
        if text.trim().is_empty() {
            return;
        }

        if self.muted {
            self.last_utterance_id = Some(id.to_string());
            return;
        }

        if self.last_utterance_id.as_deref() == Some(id) && self.is_speaking() {
            debug!(utterance = %id, "Utterance already playing");
            return;
        }

        self.stop();
        self.last_utterance_id = Some(id.to_string());

        let cancel = CancellationToken::new();
        let speaking = Arc::new(AtomicBool::new(true));
        let handle = tokio::spawn(run_utterance(
            self.http.clone(),
            self.endpoint.clone(),
            text.to_string(),
            voice.to_string(),
            self.on_playback.clone(),
            cancel.clone(),
            speaking.clone(),
        ));

        self.current = Some(Utterance {
            cancel,
            speaking,
            handle,
        });
    }

    /// Cancel the current request or playback
    pub fn stop(&mut self) {
        if let Some(utterance) = self.current.take() {
            utterance.cancel.cancel();
            utterance.speaking.store(false, Ordering::SeqCst);
        }
    }

    pub fn toggle_mute(&mut self) {
        let next = !self.muted;
        if next {
            self.stop();
        }
        self.muted = next;
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    /// Wait for the current utterance to finish playing or fail
    pub async fn wait(&mut self) {
        if let Some(utterance) = self.current.as_mut() {
            let _ = (&mut utterance.handle).await;
        }
    }
}

impl Drop for AssistantSpeech {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn fetch_speech(
    http: &reqwest::Client,
    endpoint: &str,
    text: &str,
    voice: &str,
) -> ClientResult<Bytes> {
    let response = http
        .post(endpoint)
        .json(&SpeakBody { text, voice })
        .send()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))?;

    let status = response.status();
    if !status.is_success() {
        return Err(ClientError::Gateway {
            status: status.as_u16(),
            message: response.text().await.unwrap_or_default(),
        });
    }

    response
        .bytes()
        .await
        .map_err(|e| ClientError::Network(e.to_string()))
}

async fn run_utterance(
    http: reqwest::Client,
    endpoint: String,
    text: String,
    voice: String,
    on_playback: PlaybackCallback,
    cancel: CancellationToken,
    speaking: Arc<AtomicBool>,
) {
    let fetched = tokio::select! {
        _ = cancel.cancelled() => None,
        result = fetch_speech(&http, &endpoint, &text, &voice) => Some(result),
    };

    match fetched {
        Some(Ok(audio)) => {
            tokio::select! {
                _ = cancel.cancelled() => {}
                _ = on_playback(audio) => {}
            }
        }
        Some(Err(e)) => warn!("Failed to speak via gateway: {}", e),
        None => debug!("Utterance cancelled"),
    }

    speaking.store(false, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn speech(url: &str) -> (AssistantSpeech, Arc<Mutex<Vec<Bytes>>>) {
        let played = Arc::new(Mutex::new(Vec::new()));
        let sink = played.clone();
        let speech = AssistantSpeech::new(
            url,
            Arc::new(move |audio| {
                let sink = sink.clone();
                Box::pin(async move { sink.lock().push(audio) })
            }),
        );
        (speech, played)
    }

    async fn mount_speak(server: &MockServer, delay: Duration) {
        Mock::given(method("POST"))
            .and(path(SPEAK_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "audio/mpeg")
                    .set_body_bytes(vec![0xFF, 0xFB, 0x90])
                    .set_delay(delay),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_speak_plays_audio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SPEAK_PATH))
            .and(body_json(serde_json::json!({"text": "Your order is placed", "voice": "alloy"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1, 2, 3]))
            .expect(1)
            .mount(&server)
            .await;

        let (mut speech, played) = speech(&server.uri());
        speech.speak("m1", "Your order is placed");
        assert!(speech.is_speaking());
        speech.wait().await;

        assert!(!speech.is_speaking());
        assert_eq!(played.lock().len(), 1);
        assert_eq!(played.lock()[0].as_ref(), &[1, 2, 3]);
        assert_eq!(speech.last_utterance_id(), Some("m1"));
    }

    #[tokio::test]
    async fn test_blank_text_skipped() {
        let (mut speech, _) = speech("http://localhost:1");
        speech.speak("m1", "   ");
        assert!(!speech.is_speaking());
        assert!(speech.last_utterance_id().is_none());
    }

    #[tokio::test]
    async fn test_muted_records_id_without_playing() {
        let server = MockServer::start().await;
        mount_speak(&server, Duration::ZERO).await;

        let (speech, played) = speech(&server.uri());
        let mut speech = speech.with_muted(true);
        speech.speak("m2", "hello");
        speech.wait().await;

        assert_eq!(speech.last_utterance_id(), Some("m2"));
        assert!(!speech.is_speaking());
        assert!(played.lock().is_empty());
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_repeat_of_playing_utterance_skipped() {
        let server = MockServer::start().await;
        mount_speak(&server, Duration::from_millis(300)).await;

        let (mut speech, played) = speech(&server.uri());
        speech.speak("m3", "hello");
        speech.speak("m3", "hello");
        speech.wait().await;

        assert_eq!(played.lock().len(), 1);
        assert_eq!(server.received_requests().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_new_utterance_cancels_previous() {
        let server = MockServer::start().await;
        mount_speak(&server, Duration::from_millis(300)).await;

        let (mut speech, played) = speech(&server.uri());
        speech.speak("m4", "first");
        speech.speak("m5", "second");
        speech.wait().await;

        assert_eq!(played.lock().len(), 1);
        assert_eq!(speech.last_utterance_id(), Some("m5"));
    }

    #[tokio::test]
    async fn test_toggle_mute_stops_playback() {
        let server = MockServer::start().await;
        mount_speak(&server, Duration::from_millis(300)).await;

        let (mut speech, played) = speech(&server.uri());
        speech.speak("m6", "hello");
        speech.toggle_mute();
        assert!(speech.is_muted());
        assert!(!speech.is_speaking());

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(played.lock().is_empty());

        speech.toggle_mute();
        assert!(!speech.is_muted());
    }

    #[tokio::test]
    async fn test_gateway_failure_stops_speaking() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(SPEAK_PATH))
            .respond_with(ResponseTemplate::new(400).set_body_json(
                serde_json::json!({"error": "Text is required for speech synthesis."}),
            ))
            .mount(&server)
            .await;

        let (mut speech, played) = speech(&server.uri());
        speech.speak("m7", "hello");
        speech.wait().await;

        assert!(!speech.is_speaking());
        assert!(played.lock().is_empty());
    }
}
