//! Realtime voice session over the WebSocket transport
//!
//! A local tungstenite server plays the realtime endpoint: it records the
//! event types it receives and answers `response.create` according to a script.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderValue;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use concierge_gateway::core::realtime::{
    GatewayCredentialProvider, RealtimeStatus, RealtimeVoiceSession, StaticCredentialProvider,
    WebSocketConnector,
};

#[derive(Clone, Copy)]
enum Script {
    /// Stream "Hello world" in three deltas, then finish
    Transcript,
    /// Report an error event
    RemoteError,
    /// Close the socket after the first client event
    CloseEarly,
    /// Push far more events than the client buffers, right after the upgrade
    Flood,
}

#[derive(Default)]
struct Observed {
    authorization: Option<String>,
    event_types: Vec<String>,
}

async fn spawn_realtime_server(script: Script) -> (SocketAddr, Arc<Mutex<Observed>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let observed = Arc::new(Mutex::new(Observed::default()));
    let server_observed = observed.clone();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let handshake_observed = server_observed.clone();
        let ws = accept_hdr_async(stream, move |req: &Request, mut resp: Response| {
            handshake_observed.lock().authorization = req
                .headers()
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            resp.headers_mut()
                .insert("sec-websocket-protocol", HeaderValue::from_static("realtime"));
            Ok::<Response, ErrorResponse>(resp)
        })
        .await
        .unwrap();

        let (mut sink, mut source) = ws.split();
        if let Script::Flood = script {
            for _ in 0..600 {
                let event = json!({"type": "rate_limits.updated", "rate_limits": []});
                if sink.send(Message::Text(event.to_string().into())).await.is_err() {
                    return;
                }
            }
        }
        while let Some(Ok(message)) = source.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let event: Value = serde_json::from_str(text.as_str()).unwrap();
            let kind = event["type"].as_str().unwrap_or_default().to_string();
            server_observed.lock().event_types.push(kind.clone());

            match script {
                Script::CloseEarly => {
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
                Script::Transcript if kind == "response.create" => {
                    for delta in ["Hel", "lo ", "world"] {
                        let event = json!({"type": "response.output_text.delta", "delta": delta});
                        sink.send(Message::Text(event.to_string().into())).await.unwrap();
                    }
                    let done = json!({"type": "response.output_text.done", "text": "Hello world"});
                    sink.send(Message::Text(done.to_string().into())).await.unwrap();
                }
                Script::RemoteError if kind == "response.create" => {
                    let event = json!({
                        "type": "error",
                        "error": {"type": "invalid_request_error", "message": "Buffer too small"},
                    });
                    sink.send(Message::Text(event.to_string().into())).await.unwrap();
                }
                _ => {}
            }
        }
    });

    (addr, observed)
}

type Sink = Arc<Mutex<Vec<String>>>;

fn session(connector: WebSocketConnector) -> (RealtimeVoiceSession, Sink, Sink) {
    let finals: Sink = Arc::new(Mutex::new(Vec::new()));
    let partials: Sink = Arc::new(Mutex::new(Vec::new()));
    let final_sink = finals.clone();
    let partial_sink = partials.clone();

    let session = RealtimeVoiceSession::new(
        Arc::new(connector),
        Arc::new(move |text| {
            let sink = final_sink.clone();
            Box::pin(async move { sink.lock().push(text) })
        }),
    )
    .with_partial_callback(Arc::new(move |text| {
        let sink = partial_sink.clone();
        Box::pin(async move { sink.lock().push(text) })
    }));
    (session, finals, partials)
}

async fn wait_for_event(observed: &Arc<Mutex<Observed>>, kind: &str) {
    for _ in 0..250 {
        if observed.lock().event_types.iter().any(|t| t == kind) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server never received {kind}");
}

#[tokio::test]
async fn test_transcript_round_trip() {
    let (addr, observed) = spawn_realtime_server(Script::Transcript).await;
    let (mic_tx, _) = broadcast::channel::<Bytes>(16);
    let connector = WebSocketConnector::new(
        Arc::new(StaticCredentialProvider::new("ek_static")),
        Some(mic_tx.clone()),
    )
    .with_url(format!("ws://{addr}/v1/realtime"));
    let (mut session, finals, partials) = session(connector);

    session.start_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Listening);
    assert!(session.is_connected());

    mic_tx.send(Bytes::from_static(&[0, 1, 2, 3])).unwrap();
    wait_for_event(&observed, "input_audio_buffer.append").await;

    session.stop_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Processing);

    timeout(Duration::from_secs(5), async {
        while finals.lock().is_empty() {
            assert!(session.process_next().await);
        }
    })
    .await
    .unwrap();

    assert_eq!(*finals.lock(), vec!["Hello world".to_string()]);
    assert_eq!(session.status(), RealtimeStatus::Ready);
    assert!(session.partial_transcript().is_empty());
    assert_eq!(partials.lock().last().map(String::as_str), Some(""));
    assert!(partials.lock().contains(&"Hello ".to_string()));

    let observed = observed.lock();
    assert_eq!(observed.authorization.as_deref(), Some("Bearer ek_static"));
    let position = |kind: &str| observed.event_types.iter().position(|t| t == kind).unwrap();
    assert!(position("input_audio_buffer.clear") < position("input_audio_buffer.commit"));
    assert!(position("input_audio_buffer.commit") < position("response.create"));
    assert!(observed.event_types.iter().any(|t| t == "session.update"));
    drop(observed);

    session.disconnect().await;
    assert_eq!(session.status(), RealtimeStatus::Disconnected);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_remote_error_event() {
    let (addr, _) = spawn_realtime_server(Script::RemoteError).await;
    let (mic_tx, _) = broadcast::channel::<Bytes>(16);
    let connector = WebSocketConnector::new(
        Arc::new(StaticCredentialProvider::new("ek_static")),
        Some(mic_tx),
    )
    .with_url(format!("ws://{addr}/v1/realtime"));
    let (mut session, finals, _) = session(connector);

    session.start_listening().await;
    session.stop_listening().await;

    timeout(Duration::from_secs(5), async {
        while session.status() != RealtimeStatus::Error {
            assert!(session.process_next().await);
        }
    })
    .await
    .unwrap();

    assert_eq!(session.error(), Some("Buffer too small"));
    assert!(finals.lock().is_empty());
}

#[tokio::test]
async fn test_remote_close_disconnects() {
    let (addr, _) = spawn_realtime_server(Script::CloseEarly).await;
    let (mic_tx, _) = broadcast::channel::<Bytes>(16);
    let connector = WebSocketConnector::new(
        Arc::new(StaticCredentialProvider::new("ek_static")),
        Some(mic_tx),
    )
    .with_url(format!("ws://{addr}/v1/realtime"));
    let (mut session, _, _) = session(connector);

    session.start_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Listening);

    timeout(Duration::from_secs(5), async {
        while session.process_next().await {}
    })
    .await
    .unwrap();

    assert_eq!(session.status(), RealtimeStatus::Disconnected);
    assert!(!session.is_connected());
    assert!(!session.process_next().await);
}

#[tokio::test]
async fn test_disconnect_with_unread_backlog() {
    let (addr, _) = spawn_realtime_server(Script::Flood).await;
    let (mic_tx, _) = broadcast::channel::<Bytes>(16);
    let connector = WebSocketConnector::new(
        Arc::new(StaticCredentialProvider::new("ek_static")),
        Some(mic_tx),
    )
    .with_url(format!("ws://{addr}/v1/realtime"));
    let (mut session, _, _) = session(connector);

    session.start_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Listening);

    // Let the reader fill its queue without anyone draining it
    tokio::time::sleep(Duration::from_millis(500)).await;

    timeout(Duration::from_secs(5), session.disconnect())
        .await
        .unwrap();
    assert_eq!(session.status(), RealtimeStatus::Disconnected);
    assert!(!session.is_connected());
}

#[tokio::test]
async fn test_credentials_fetched_from_gateway() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/openai/realtime-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "sess_1",
            "client_secret": {"value": "ek_from_gateway", "expires_at": 1_900_000_000},
        })))
        .expect(1)
        .mount(&gateway)
        .await;

    let (addr, observed) = spawn_realtime_server(Script::Transcript).await;
    let (mic_tx, _) = broadcast::channel::<Bytes>(16);
    let connector = WebSocketConnector::new(
        Arc::new(GatewayCredentialProvider::new(&gateway.uri())),
        Some(mic_tx),
    )
    .with_url(format!("ws://{addr}/v1/realtime"));
    let (mut session, _, _) = session(connector);

    session.start_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Listening);
    wait_for_event(&observed, "input_audio_buffer.clear").await;
    assert_eq!(
        observed.lock().authorization.as_deref(),
        Some("Bearer ek_from_gateway")
    );
}

#[tokio::test]
async fn test_gateway_credential_failure_is_error() {
    let gateway = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/openai/realtime-key"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({"error": "OPENAI_API_KEY is not configured"})),
        )
        .mount(&gateway)
        .await;

    let (mic_tx, _) = broadcast::channel::<Bytes>(16);
    let connector = WebSocketConnector::new(
        Arc::new(GatewayCredentialProvider::new(&gateway.uri())),
        Some(mic_tx),
    )
    .with_url("ws://127.0.0.1:1/v1/realtime");
    let (mut session, _, _) = session(connector);

    session.start_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Error);
    assert!(!session.is_connected());
    assert_eq!(session.error(), Some("OPENAI_API_KEY is not configured"));
}

#[tokio::test]
async fn test_unsupported_without_microphone() {
    let connector =
        WebSocketConnector::new(Arc::new(StaticCredentialProvider::new("ek")), None);
    let (mut session, _, _) = session(connector);
    assert!(!session.is_supported());
    assert_eq!(session.status(), RealtimeStatus::Error);

    session.start_listening().await;
    assert_eq!(session.status(), RealtimeStatus::Error);
    assert!(!session.is_connected());
}
