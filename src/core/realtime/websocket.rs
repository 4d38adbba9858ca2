//! WebSocket transport.
//!
//! Connects to `wss://…/v1/realtime?model=<model>` with the ephemeral credential and
//! pumps microphone PCM chunks from a broadcast channel as
//! `input_audio_buffer.append` events while the microphone is enabled.
//!
//! Audio format: PCM 16-bit signed little-endian, 24kHz, mono.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use super::base::{DEFAULT_REALTIME_WS_URL, RealtimeError, RealtimeResult};
use super::events::ClientEvent;
use super::signaling::CredentialProvider;
use super::transport::{LinkMessage, RealtimeConnector, RealtimeLink};
use crate::config::DEFAULT_REALTIME_MODEL;

/// Channel capacity for outbound and inbound link messages
const CHANNEL_CAPACITY: usize = 256;

/// Connector for the WebSocket realtime endpoint
pub struct WebSocketConnector {
    credentials: Arc<dyn CredentialProvider>,
    url: String,
    model: String,
    microphone: Option<broadcast::Sender<Bytes>>,
}

impl WebSocketConnector {
    /// `microphone` carries PCM16 chunks; without it the connector reports
    /// audio capture as unsupported.
    pub fn new(
        credentials: Arc<dyn CredentialProvider>,
        microphone: Option<broadcast::Sender<Bytes>>,
    ) -> Self {
        Self {
            credentials,
            url: DEFAULT_REALTIME_WS_URL.to_string(),
            model: DEFAULT_REALTIME_MODEL.to_string(),
            microphone,
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    fn build_ws_url(&self) -> String {
        format!("{}?model={}", self.url, self.model)
    }
}

#[async_trait]
impl RealtimeConnector for WebSocketConnector {
    fn is_supported(&self) -> bool {
        self.microphone.is_some()
    }

    async fn connect(&self) -> RealtimeResult<Box<dyn RealtimeLink>> {
        let Some(microphone) = self.microphone.as_ref() else {
            return Err(RealtimeError::Unsupported(
                "Realtime voice not supported".to_string(),
            ));
        };

        let credential = self.credentials.fetch().await?;

        let url = self.build_ws_url();
        let parsed = url::Url::parse(&url)
            .map_err(|e| RealtimeError::ConnectionFailed(format!("Invalid URL {url}: {e}")))?;
        let host = match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => {
                return Err(RealtimeError::ConnectionFailed(format!(
                    "URL has no host: {url}"
                )));
            }
        };

        let request = http::Request::builder()
            .uri(&url)
            .header("Authorization", format!("Bearer {}", credential.value))
            .header("OpenAI-Beta", "realtime=v1")
            .header("Sec-WebSocket-Protocol", "realtime")
            .header(
                "Sec-WebSocket-Key",
                tungstenite::handshake::client::generate_key(),
            )
            .header("Sec-WebSocket-Version", "13")
            .header("Connection", "Upgrade")
            .header("Upgrade", "websocket")
            .header("Host", host)
            .body(())
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        let (ws_stream, _response) = tokio_tungstenite::connect_async(request)
            .await
            .map_err(|e| RealtimeError::ConnectionFailed(e.to_string()))?;

        tracing::info!("Connected to OpenAI Realtime API");

        let (mut ws_sink, mut ws_stream) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<String>(CHANNEL_CAPACITY);
        let (in_tx, in_rx) = mpsc::channel::<LinkMessage>(CHANNEL_CAPACITY);

        // The socket is usable as soon as the upgrade completes
        let _ = in_tx.send(LinkMessage::Open).await;

        let mic_enabled = Arc::new(AtomicBool::new(false));
        let cancel = CancellationToken::new();

        let task_mic_enabled = mic_enabled.clone();
        let task_cancel = cancel.clone();
        let mut mic_rx = Some(microphone.subscribe());

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }

                    // Handle outgoing messages
                    Some(json) = out_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send WebSocket message: {}", e);
                            let _ = in_tx.send(LinkMessage::Error(e.to_string())).await;
                            break;
                        }
                    }

                    // Pump microphone audio while enabled
                    chunk = async {
                        match mic_rx.as_mut() {
                            Some(rx) => rx.recv().await,
                            None => std::future::pending().await,
                        }
                    } => {
                        match chunk {
                            Ok(pcm) => {
                                if !task_mic_enabled.load(Ordering::SeqCst) {
                                    continue;
                                }
                                let json = match serde_json::to_string(&ClientEvent::audio_append(&pcm)) {
                                    Ok(j) => j,
                                    Err(e) => {
                                        tracing::error!("Failed to serialize audio event: {}", e);
                                        continue;
                                    }
                                };
                                if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                                    tracing::error!("Failed to send audio: {}", e);
                                    let _ = in_tx.send(LinkMessage::Error(e.to_string())).await;
                                    break;
                                }
                            }
                            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                                tracing::warn!(skipped, "Microphone audio lagged, chunks dropped");
                            }
                            Err(broadcast::error::RecvError::Closed) => {
                                tracing::debug!("Microphone source closed");
                                mic_rx = None;
                            }
                        }
                    }

                    // Handle incoming messages
                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => {
                                if in_tx.send(LinkMessage::Text(text.as_str().to_owned())).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Binary(data))) => {
                                if in_tx.send(LinkMessage::Audio(data)).await.is_err() {
                                    break;
                                }
                            }
                            Some(Ok(Message::Close(_))) | None => {
                                tracing::info!("WebSocket closed by server");
                                let _ = in_tx.send(LinkMessage::Closed).await;
                                break;
                            }
                            Some(Ok(Message::Ping(data))) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Some(Err(e)) => {
                                tracing::error!("WebSocket error: {}", e);
                                let _ = in_tx.send(LinkMessage::Error(e.to_string())).await;
                                break;
                            }
                            Some(Ok(_)) => {}
                        }
                    }

                    else => break,
                }
            }
            tracing::debug!("Realtime WebSocket task finished");
        });

        Ok(Box::new(WebSocketLink {
            outbound: out_tx,
            inbound: in_rx,
            mic_enabled,
            cancel,
            handle: Some(handle),
        }))
    }
}

/// Link over an open realtime WebSocket
pub struct WebSocketLink {
    outbound: mpsc::Sender<String>,
    inbound: mpsc::Receiver<LinkMessage>,
    mic_enabled: Arc<AtomicBool>,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

#[async_trait]
impl RealtimeLink for WebSocketLink {
    async fn send_text(&mut self, text: String) -> RealtimeResult<()> {
        self.outbound
            .send(text)
            .await
            .map_err(|_| RealtimeError::NotConnected)
    }

    async fn recv(&mut self) -> Option<LinkMessage> {
        self.inbound.recv().await
    }

    fn set_microphone_enabled(&mut self, enabled: bool) {
        self.mic_enabled.store(enabled, Ordering::SeqCst);
    }

    fn has_microphone(&self) -> bool {
        true
    }

    async fn close(&mut self) {
        self.mic_enabled.store(false, Ordering::SeqCst);
        // Wakes the task if it is parked on a full inbound queue
        self.inbound.close();
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for WebSocketLink {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
