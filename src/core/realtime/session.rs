//! Realtime voice session state machine.
//!
//! The session owns at most one [`RealtimeLink`]. Callers drive it from a single
//! task: commands (`start_listening`, `stop_listening`, `disconnect`) and inbound
//! messages (`process_next`) are both `&mut self`, typically multiplexed with
//! `tokio::select!`.
//!
//! ```rust,ignore
//! let mut session = RealtimeVoiceSession::new(connector, on_final)
//!     .with_partial_callback(on_partial);
//! session.start_listening().await;
//! loop {
//!     tokio::select! {
//!         Some(cmd) = commands.recv() => match cmd {
//!             Command::Stop => session.stop_listening().await,
//!             Command::Quit => { session.disconnect().await; break; }
//!         },
//!         active = session.process_next() => if !active { break },
//!     }
//! }
//! ```

use std::sync::Arc;

use base64::prelude::*;
use bytes::Bytes;

use super::base::{
    DATA_CHANNEL_ERROR_MESSAGE, DEFAULT_REMOTE_ERROR_MESSAGE, RESPONSE_INSTRUCTIONS,
    RealtimeError, RealtimeStatus, RemoteAudioCallback, SESSION_INSTRUCTIONS, StatusCallback,
    TranscriptCallback, UNSUPPORTED_MESSAGE, UNSUPPORTED_START_MESSAGE,
};
use super::events::{ClientEvent, ServerEvent};
use super::transport::{LinkMessage, RealtimeConnector, RealtimeLink};

pub struct RealtimeVoiceSession {
    connector: Arc<dyn RealtimeConnector>,
    link: Option<Box<dyn RealtimeLink>>,
    supported: bool,
    status: RealtimeStatus,
    error: Option<String>,
    partial: String,
    listening: bool,
    on_final: TranscriptCallback,
    on_partial: Option<TranscriptCallback>,
    on_remote_audio: Option<RemoteAudioCallback>,
    on_status: Option<StatusCallback>,
}

impl RealtimeVoiceSession {
    /// Create a session. Capability is checked once here: without audio capture
    /// the session starts in `error` and stays disabled.
    pub fn new(connector: Arc<dyn RealtimeConnector>, on_final: TranscriptCallback) -> Self {
        let supported = connector.is_supported();
        Self {
            connector,
            link: None,
            supported,
            status: if supported {
                RealtimeStatus::Idle
            } else {
                RealtimeStatus::Error
            },
            error: if supported {
                None
            } else {
                Some(UNSUPPORTED_MESSAGE.to_string())
            },
            partial: String::new(),
            listening: false,
            on_final,
            on_partial: None,
            on_remote_audio: None,
            on_status: None,
        }
    }

    pub fn with_partial_callback(mut self, callback: TranscriptCallback) -> Self {
        self.on_partial = Some(callback);
        self
    }

    pub fn with_remote_audio_callback(mut self, callback: RemoteAudioCallback) -> Self {
        self.on_remote_audio = Some(callback);
        self
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    pub fn status(&self) -> RealtimeStatus {
        self.status
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_supported(&self) -> bool {
        self.supported
    }

    pub fn is_connected(&self) -> bool {
        self.link.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Text accumulated since the last delivered transcript
    pub fn partial_transcript(&self) -> &str {
        &self.partial
    }

    async fn set_status(&mut self, status: RealtimeStatus) {
        if self.status == status {
            return;
        }
        tracing::debug!(from = %self.status, to = %status, "Realtime status change");
        self.status = status;
        if let Some(cb) = &self.on_status {
            cb(status).await;
        }
    }

    async fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("Realtime session error: {}", message);
        self.error = Some(message);
        self.set_status(RealtimeStatus::Error).await;
    }

    async fn emit_partial(&self, text: String) {
        if let Some(cb) = &self.on_partial {
            cb(text).await;
        }
    }

    /// Release the link and reset buffers without touching the status
    async fn cleanup(&mut self) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
        }
        self.partial.clear();
        self.listening = false;
    }

    /// Establish the link if there is none.
    ///
    /// On failure the link is released and the session is left in `error`
    /// with the failure message.
    pub async fn connect(&mut self) -> Result<(), RealtimeError> {
        if !self.supported {
            return Err(RealtimeError::Unsupported(
                "Realtime voice not supported".to_string(),
            ));
        }
        if self.link.is_some() {
            return Ok(());
        }

        self.set_status(RealtimeStatus::Connecting).await;
        self.error = None;

        match self.connector.connect().await {
            Ok(link) => {
                self.link = Some(link);
                tracing::info!("Realtime session ready");
                self.set_status(RealtimeStatus::Ready).await;
                Ok(())
            }
            Err(e) => {
                tracing::error!("Realtime connection failed: {}", e);
                self.error = Some(e.to_string());
                self.cleanup().await;
                self.set_status(RealtimeStatus::Error).await;
                Err(e)
            }
        }
    }

    /// Connect if needed, then enable the microphone and clear the input buffer.
    pub async fn start_listening(&mut self) {
        if !self.supported {
            self.fail(UNSUPPORTED_START_MESSAGE).await;
            return;
        }

        if self.link.is_none() && self.connect().await.is_err() {
            return;
        }

        let has_microphone = self
            .link
            .as_ref()
            .map(|link| link.has_microphone())
            .unwrap_or(false);
        if !has_microphone {
            self.fail(RealtimeError::MicrophoneUnavailable.to_string())
                .await;
            return;
        }

        self.partial.clear();
        self.emit_partial(String::new()).await;

        let sent = match self.link.as_mut() {
            Some(link) => {
                link.set_microphone_enabled(true);
                link.send_event(&ClientEvent::InputAudioBufferClear).await
            }
            None => Err(RealtimeError::NotConnected),
        };
        if let Err(e) = sent {
            self.fail(e.to_string()).await;
            return;
        }

        self.listening = true;
        self.set_status(RealtimeStatus::Listening).await;
        tracing::info!("Listening started");
    }

    /// Disable the microphone, commit buffered audio and request a transcript.
    /// No-op without a link or when not listening.
    pub async fn stop_listening(&mut self) {
        let Some(link) = self.link.as_mut() else {
            return;
        };

        link.set_microphone_enabled(false);

        if !self.listening {
            return;
        }

        self.listening = false;
        self.set_status(RealtimeStatus::Processing).await;
        tracing::info!("Listening stopped, committing buffer");

        let sent = match self.link.as_mut() {
            Some(link) => {
                match link.send_event(&ClientEvent::InputAudioBufferCommit).await {
                    Ok(()) => {
                        link.send_event(&ClientEvent::text_response(RESPONSE_INSTRUCTIONS))
                            .await
                    }
                    Err(e) => Err(e),
                }
            }
            None => Err(RealtimeError::NotConnected),
        };
        if let Err(e) = sent {
            self.fail(e.to_string()).await;
        }
    }

    /// Tear down the link and reset buffers. Always safe to call.
    pub async fn disconnect(&mut self) {
        self.cleanup().await;
        let status = if self.supported {
            RealtimeStatus::Disconnected
        } else {
            RealtimeStatus::Error
        };
        self.set_status(status).await;
        tracing::info!("Disconnected realtime session");
    }

    /// Wait for and handle one inbound message.
    ///
    /// Returns `false` when there is no link (never connected, disconnected, or
    /// closed by the remote side).
    pub async fn process_next(&mut self) -> bool {
        let message = match self.link.as_mut() {
            Some(link) => link.recv().await,
            None => return false,
        };

        match message {
            Some(message) => {
                self.handle_link_message(message).await;
                self.link.is_some()
            }
            None => {
                self.handle_link_message(LinkMessage::Closed).await;
                false
            }
        }
    }

    pub async fn handle_link_message(&mut self, message: LinkMessage) {
        match message {
            LinkMessage::Open => {
                tracing::debug!("Realtime event channel open");
                let update = ClientEvent::session_update(SESSION_INSTRUCTIONS);
                let sent = match self.link.as_mut() {
                    Some(link) => link.send_event(&update).await,
                    None => Err(RealtimeError::NotConnected),
                };
                if let Err(e) = sent {
                    tracing::warn!("Failed to send session update: {}", e);
                }
            }
            LinkMessage::Text(text) => self.handle_text(&text).await,
            LinkMessage::Audio(data) => self.forward_remote_audio(data).await,
            LinkMessage::Error(details) => {
                tracing::warn!("Realtime event channel error: {}", details);
                self.fail(DATA_CHANNEL_ERROR_MESSAGE).await;
            }
            LinkMessage::Closed => {
                tracing::info!("Realtime link closed by remote");
                self.cleanup().await;
                if self.status != RealtimeStatus::Error {
                    self.set_status(RealtimeStatus::Disconnected).await;
                }
            }
        }
    }

    async fn forward_remote_audio(&self, data: Bytes) {
        if let Some(cb) = &self.on_remote_audio {
            cb(data).await;
        }
    }

    async fn handle_text(&mut self, text: &str) {
        let event = match serde_json::from_str::<ServerEvent>(text) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Failed to parse realtime message: {} - {}", e, text);
                return;
            }
        };

        match event {
            ServerEvent::OutputTextDelta { delta } => {
                self.partial.push_str(delta.as_deref().unwrap_or_default());
                self.emit_partial(self.partial.clone()).await;
            }
            ServerEvent::OutputTextDone | ServerEvent::ResponseCompleted => {
                self.transcript_done().await;
            }
            ServerEvent::SpeechStarted => {
                tracing::debug!("Speech started");
                self.set_status(RealtimeStatus::Listening).await;
            }
            ServerEvent::SpeechStopped => {
                tracing::debug!("Speech stopped");
                if self.status == RealtimeStatus::Listening {
                    self.set_status(RealtimeStatus::Processing).await;
                }
            }
            ServerEvent::AudioDelta { delta: None } => {}
            ServerEvent::AudioDelta { delta: Some(delta) } => {
                match BASE64_STANDARD.decode(delta.as_bytes()) {
                    Ok(pcm) => self.forward_remote_audio(Bytes::from(pcm)).await,
                    Err(e) => tracing::warn!("Invalid audio delta: {}", e),
                }
            }
            ServerEvent::Error { error } => {
                let message = error
                    .and_then(|e| e.message)
                    .unwrap_or_else(|| DEFAULT_REMOTE_ERROR_MESSAGE.to_string());
                self.fail(message).await;
            }
            ServerEvent::Unknown => {}
        }
    }

    async fn transcript_done(&mut self) {
        let trimmed = self.partial.trim().to_string();
        if !trimmed.is_empty() {
            tracing::info!(chars = trimmed.len(), "Final transcript ready");
            (self.on_final)(trimmed).await;
        }
        self.partial.clear();
        self.emit_partial(String::new()).await;
        self.set_status(RealtimeStatus::Ready).await;
    }
}
