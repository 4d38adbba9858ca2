//! WebRTC transport.
//!
//! The peer connection itself is supplied by the host through [`PeerFactory`];
//! this module owns the connection sequence: credential fetch, peer creation with
//! the `oai-events` data channel and a disabled microphone track, ICE-complete
//! offer, SDP exchange, and answer application.

use std::sync::Arc;

use async_trait::async_trait;

use super::base::{DATA_CHANNEL_LABEL, DEFAULT_ICE_SERVER, RealtimeError, RealtimeResult};
use super::signaling::{CredentialProvider, EphemeralCredential, SdpSignaling};
use super::transport::{LinkMessage, RealtimeConnector, RealtimeLink};

/// Options for creating a peer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerOptions {
    pub ice_servers: Vec<String>,
    pub data_channel_label: String,
}

impl Default for PeerOptions {
    fn default() -> Self {
        Self {
            ice_servers: vec![DEFAULT_ICE_SERVER.to_string()],
            data_channel_label: DATA_CHANNEL_LABEL.to_string(),
        }
    }
}

/// A host peer connection with one data channel and one microphone track.
#[async_trait]
pub trait PeerConnection: Send {
    /// Create an offer, apply it locally and wait for ICE gathering to complete.
    /// Returns the local SDP including gathered candidates.
    async fn create_offer(&mut self) -> RealtimeResult<String>;

    async fn set_remote_answer(&mut self, sdp: &str) -> RealtimeResult<()>;

    /// Send text over the data channel
    async fn send_data(&mut self, text: &str) -> RealtimeResult<()>;

    /// Data channel, remote track and state events
    async fn next_message(&mut self) -> Option<LinkMessage>;

    fn set_microphone_enabled(&mut self, enabled: bool);

    fn has_microphone(&self) -> bool;

    /// Close the data channel and the peer, stopping microphone tracks
    async fn close(&mut self);
}

/// Creates host peer connections.
#[async_trait]
pub trait PeerFactory: Send + Sync {
    /// Whether the host exposes audio capture
    fn supports_audio_capture(&self) -> bool;

    /// Create a peer with the data channel open-pending and the microphone
    /// track added in the disabled state
    async fn create_peer(&self, options: &PeerOptions) -> RealtimeResult<Box<dyn PeerConnection>>;
}

/// Connector performing the WebRTC connection sequence
pub struct WebRtcConnector {
    factory: Arc<dyn PeerFactory>,
    credentials: Arc<dyn CredentialProvider>,
    signaling: SdpSignaling,
    options: PeerOptions,
}

impl WebRtcConnector {
    pub fn new(
        factory: Arc<dyn PeerFactory>,
        credentials: Arc<dyn CredentialProvider>,
        signaling: SdpSignaling,
    ) -> Self {
        Self {
            factory,
            credentials,
            signaling,
            options: PeerOptions::default(),
        }
    }

    pub fn with_peer_options(mut self, options: PeerOptions) -> Self {
        self.options = options;
        self
    }

    async fn negotiate(
        &self,
        peer: &mut dyn PeerConnection,
        credential: &EphemeralCredential,
    ) -> RealtimeResult<()> {
        let offer = peer.create_offer().await?;
        let answer = self.signaling.exchange(credential, &offer).await?;
        peer.set_remote_answer(&answer).await
    }
}

#[async_trait]
impl RealtimeConnector for WebRtcConnector {
    fn is_supported(&self) -> bool {
        self.factory.supports_audio_capture()
    }

    async fn connect(&self) -> RealtimeResult<Box<dyn RealtimeLink>> {
        if !self.is_supported() {
            return Err(RealtimeError::Unsupported(
                "Realtime voice not supported".to_string(),
            ));
        }

        let credential = self.credentials.fetch().await?;

        let mut peer = self.factory.create_peer(&self.options).await?;

        if let Err(e) = self.negotiate(peer.as_mut(), &credential).await {
            peer.close().await;
            return Err(e);
        }

        tracing::info!("Realtime session ready over WebRTC");
        Ok(Box::new(WebRtcLink { peer: Some(peer) }))
    }
}

/// Link over an established peer connection.
///
/// Dropping the link without [`RealtimeLink::close`] still closes the peer on
/// the current runtime.
pub struct WebRtcLink {
    peer: Option<Box<dyn PeerConnection>>,
}

#[async_trait]
impl RealtimeLink for WebRtcLink {
    async fn send_text(&mut self, text: String) -> RealtimeResult<()> {
        match self.peer.as_mut() {
            Some(peer) => peer.send_data(&text).await,
            None => Err(RealtimeError::NotConnected),
        }
    }

    async fn recv(&mut self) -> Option<LinkMessage> {
        self.peer.as_mut()?.next_message().await
    }

    fn set_microphone_enabled(&mut self, enabled: bool) {
        if let Some(peer) = self.peer.as_mut() {
            peer.set_microphone_enabled(enabled);
        }
    }

    fn has_microphone(&self) -> bool {
        self.peer
            .as_ref()
            .map(|peer| peer.has_microphone())
            .unwrap_or(false)
    }

    async fn close(&mut self) {
        if let Some(mut peer) = self.peer.take() {
            peer.set_microphone_enabled(false);
            peer.close().await;
        }
    }
}

impl Drop for WebRtcLink {
    fn drop(&mut self) {
        let Some(mut peer) = self.peer.take() else {
            return;
        };
        peer.set_microphone_enabled(false);
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    peer.close().await;
                    tracing::debug!("Dropped WebRTC link closed");
                });
            }
            Err(_) => tracing::warn!("WebRTC link dropped outside a runtime, peer not closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::realtime::signaling::StaticCredentialProvider;
    use parking_lot::Mutex;
    use wiremock::matchers::{body_string, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct PeerLog {
        answer: Option<String>,
        closed: bool,
        close_calls: usize,
        sent: Vec<String>,
        mic_enabled: bool,
    }

    struct FakePeer {
        log: Arc<Mutex<PeerLog>>,
    }

    #[async_trait]
    impl PeerConnection for FakePeer {
        async fn create_offer(&mut self) -> RealtimeResult<String> {
            Ok("v=0 offer".to_string())
        }

        async fn set_remote_answer(&mut self, sdp: &str) -> RealtimeResult<()> {
            self.log.lock().answer = Some(sdp.to_string());
            Ok(())
        }

        async fn send_data(&mut self, text: &str) -> RealtimeResult<()> {
            self.log.lock().sent.push(text.to_string());
            Ok(())
        }

        async fn next_message(&mut self) -> Option<LinkMessage> {
            None
        }

        fn set_microphone_enabled(&mut self, enabled: bool) {
            self.log.lock().mic_enabled = enabled;
        }

        fn has_microphone(&self) -> bool {
            true
        }

        async fn close(&mut self) {
            let mut log = self.log.lock();
            log.closed = true;
            log.close_calls += 1;
        }
    }

    struct FakeFactory {
        supported: bool,
        log: Arc<Mutex<PeerLog>>,
    }

    #[async_trait]
    impl PeerFactory for FakeFactory {
        fn supports_audio_capture(&self) -> bool {
            self.supported
        }

        async fn create_peer(
            &self,
            options: &PeerOptions,
        ) -> RealtimeResult<Box<dyn PeerConnection>> {
            assert_eq!(options.data_channel_label, "oai-events");
            Ok(Box::new(FakePeer {
                log: self.log.clone(),
            }))
        }
    }

    fn connector(server: &MockServer, log: Arc<Mutex<PeerLog>>, supported: bool) -> WebRtcConnector {
        WebRtcConnector::new(
            Arc::new(FakeFactory { supported, log }),
            Arc::new(StaticCredentialProvider::new("ek_test")),
            SdpSignaling::new(&format!("{}/v1/realtime", server.uri()), "m", "v"),
        )
    }

    #[tokio::test]
    async fn test_connect_applies_answer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/realtime"))
            .and(body_string("v=0 offer"))
            .respond_with(ResponseTemplate::new(201).set_body_string("v=0 answer"))
            .mount(&server)
            .await;

        let log = Arc::new(Mutex::new(PeerLog::default()));
        let mut link = connector(&server, log.clone(), true).connect().await.unwrap();
        assert_eq!(log.lock().answer.as_deref(), Some("v=0 answer"));

        link.send_text("{}".to_string()).await.unwrap();
        link.set_microphone_enabled(true);
        assert_eq!(log.lock().sent, vec!["{}".to_string()]);
        assert!(log.lock().mic_enabled);
    }

    #[tokio::test]
    async fn test_connect_signaling_failure_closes_peer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let log = Arc::new(Mutex::new(PeerLog::default()));
        let result = connector(&server, log.clone(), true).connect().await;
        let err = result.err().unwrap();
        assert_eq!(err.to_string(), "Failed to establish realtime session");
        assert!(log.lock().closed);
        assert!(log.lock().answer.is_none());
    }

    #[tokio::test]
    async fn test_connect_unsupported() {
        let server = MockServer::start().await;
        let log = Arc::new(Mutex::new(PeerLog::default()));
        let connector = connector(&server, log, false);
        assert!(!connector.is_supported());
        assert!(matches!(
            connector.connect().await,
            Err(RealtimeError::Unsupported(_))
        ));
    }

    async fn answering_server() -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/realtime"))
            .respond_with(ResponseTemplate::new(201).set_body_string("v=0 answer"))
            .mount(&server)
            .await;
        server
    }

    async fn wait_closed(log: &Arc<Mutex<PeerLog>>) {
        for _ in 0..100 {
            if log.lock().closed {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("peer was never closed");
    }

    #[tokio::test]
    async fn test_close_releases_peer_once() {
        let server = answering_server().await;
        let log = Arc::new(Mutex::new(PeerLog::default()));
        let mut link = connector(&server, log.clone(), true).connect().await.unwrap();
        link.set_microphone_enabled(true);

        link.close().await;
        assert!(log.lock().closed);
        assert!(!log.lock().mic_enabled);
        assert!(!link.has_microphone());
        assert!(matches!(
            link.send_text("{}".to_string()).await,
            Err(RealtimeError::NotConnected)
        ));

        drop(link);
        tokio::task::yield_now().await;
        assert_eq!(log.lock().close_calls, 1);
    }

    #[tokio::test]
    async fn test_dropped_link_closes_peer() {
        let server = answering_server().await;
        let log = Arc::new(Mutex::new(PeerLog::default()));
        let link = connector(&server, log.clone(), true).connect().await.unwrap();
        assert!(!log.lock().closed);

        drop(link);
        wait_closed(&log).await;
        assert_eq!(log.lock().close_calls, 1);
    }

    #[tokio::test]
    async fn test_dropped_session_closes_peer() {
        use crate::core::realtime::RealtimeVoiceSession;

        let server = answering_server().await;
        let log = Arc::new(Mutex::new(PeerLog::default()));
        let mut session = RealtimeVoiceSession::new(
            Arc::new(connector(&server, log.clone(), true)),
            Arc::new(|_| Box::pin(async {})),
        );
        session.start_listening().await;
        assert!(session.is_connected());
        assert!(log.lock().mic_enabled);

        drop(session);
        wait_closed(&log).await;
        assert!(!log.lock().mic_enabled);
    }
}
