//! End-to-end tests for the realtime session against an in-process mock
//! backend.
//!
//! The mock is a bare tokio-tungstenite websocket server that records every
//! frame the client sends and lets tests inject server frames, so the
//! handshake ordering, pending-audio flush, turn gating and shutdown
//! sequence can all be asserted against real websocket traffic.

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;

use leadline_gateway::core::lead::{LeadRecord, lead_tool};
use leadline_gateway::core::realtime::openai::{RealtimeSession, RealtimeSessionConfig};
use leadline_gateway::core::realtime::{SessionHooks, SessionState};

struct MockBackend {
    port: u16,
    frames: mpsc::UnboundedReceiver<Value>,
    inject: mpsc::UnboundedSender<String>,
    closed: mpsc::UnboundedReceiver<()>,
}

/// Start a one-connection websocket server. `accept_delay` holds the
/// handshake open so tests can stage audio against a pending session.
async fn spawn_mock(accept_delay: Duration) -> MockBackend {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let (frames_tx, frames) = mpsc::unbounded_channel();
    let (inject, mut inject_rx) = mpsc::unbounded_channel::<String>();
    let (closed_tx, closed) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        tokio::time::sleep(accept_delay).await;
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        let mut inject_open = true;
        loop {
            tokio::select! {
                msg = ws.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        let value: Value = serde_json::from_str(text.as_str()).unwrap();
                        let _ = frames_tx.send(value);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                },
                injected = inject_rx.recv(), if inject_open => match injected {
                    Some(text) => {
                        if ws.send(Message::text(text)).await.is_err() {
                            break;
                        }
                    }
                    None => inject_open = false,
                },
            }
        }
        let _ = closed_tx.send(());
    });

    MockBackend {
        port,
        frames,
        inject,
        closed,
    }
}

fn test_config(port: u16) -> RealtimeSessionConfig {
    let mut config = RealtimeSessionConfig::new("sk-test".to_string());
    config.instructions = "Test receptionist".to_string();
    config.tools = vec![lead_tool()];
    config.endpoint = format!("ws://127.0.0.1:{port}/");
    config
}

async fn next_frame(mock: &mut MockBackend) -> Value {
    timeout(Duration::from_secs(2), mock.frames.recv())
        .await
        .expect("timed out waiting for a client frame")
        .expect("mock connection ended")
}

async fn wait_for_state(session: &RealtimeSession, want: SessionState) {
    timeout(Duration::from_secs(2), async {
        while session.state() != want {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("session never reached {want}"));
}

#[tokio::test]
async fn test_staged_audio_flushes_after_session_update() {
    let mut mock = spawn_mock(Duration::from_millis(100)).await;
    let session = RealtimeSession::start(test_config(mock.port), SessionHooks::new());

    // All three chunks arrive while the handshake is still open.
    session.send_audio("a1".to_string()).await;
    session.send_audio("a2".to_string()).await;
    session.send_audio("a3".to_string()).await;
    assert_eq!(session.state(), SessionState::Pending);

    // First frame on the wire is the session configuration.
    let first = next_frame(&mut mock).await;
    assert_eq!(first["type"], "session.update");
    assert_eq!(first["session"]["input_audio_format"], "g711_ulaw");
    assert_eq!(first["session"]["output_audio_format"], "g711_ulaw");
    assert_eq!(first["session"]["tools"][0]["name"], "capture_lead");
    assert_eq!(first["session"]["tool_choice"], "auto");

    // Then the staged chunks, in arrival order, with no response.create
    // interleaved.
    for expected in ["a1", "a2", "a3"] {
        let frame = next_frame(&mut mock).await;
        assert_eq!(frame["type"], "input_audio_buffer.append");
        assert_eq!(frame["audio"], expected);
    }

    wait_for_state(&session, SessionState::Open).await;

    // Live audio starts a turn: append then one response.create.
    session.send_audio("a4".to_string()).await;
    let frame = next_frame(&mut mock).await;
    assert_eq!(frame["type"], "input_audio_buffer.append");
    assert_eq!(frame["audio"], "a4");
    let frame = next_frame(&mut mock).await;
    assert_eq!(frame["type"], "response.create");

    // While the turn is in flight, more audio appends without a second
    // response.create.
    session.send_audio("a5".to_string()).await;
    let frame = next_frame(&mut mock).await;
    assert_eq!(frame["type"], "input_audio_buffer.append");
    assert_eq!(frame["audio"], "a5");

    // Terminal event releases the turn; the next chunk starts a new one.
    mock.inject
        .send(r#"{"type":"response.completed"}"#.to_string())
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    session.send_audio("a6".to_string()).await;
    let frame = next_frame(&mut mock).await;
    assert_eq!(frame["type"], "input_audio_buffer.append");
    let frame = next_frame(&mut mock).await;
    assert_eq!(frame["type"], "response.create");

    session.end().await;
}

#[tokio::test]
async fn test_audio_events_reach_subscribers_in_order() {
    let mut mock = spawn_mock(Duration::ZERO).await;

    let (audio_tx, mut audio_rx) = mpsc::unbounded_channel::<String>();
    let hooks = SessionHooks::new().on_audio(Arc::new(move |chunk| {
        let tx = audio_tx.clone();
        Box::pin(async move {
            let _ = tx.send(chunk);
        })
    }));

    let session = RealtimeSession::start(test_config(mock.port), hooks);
    wait_for_state(&session, SessionState::Open).await;
    let _ = next_frame(&mut mock).await; // session.update

    // Both protocol dialects must land in the same subscriber stream.
    mock.inject
        .send(r#"{"type":"response.output_audio.delta","audio":"b64-one"}"#.to_string())
        .unwrap();
    mock.inject
        .send(r#"{"type":"response.audio.delta","delta":"b64-two"}"#.to_string())
        .unwrap();

    let first = timeout(Duration::from_secs(2), audio_rx.recv())
        .await
        .unwrap()
        .unwrap();
    let second = timeout(Duration::from_secs(2), audio_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first, "b64-one");
    assert_eq!(second, "b64-two");

    session.end().await;
}

#[tokio::test]
async fn test_capture_lead_tool_call_emits_lead() {
    let mut mock = spawn_mock(Duration::ZERO).await;

    let (lead_tx, mut lead_rx) = mpsc::unbounded_channel::<LeadRecord>();
    let hooks = SessionHooks::new().on_lead(Arc::new(move |lead| {
        let tx = lead_tx.clone();
        Box::pin(async move {
            let _ = tx.send(lead);
        })
    }));

    let session = RealtimeSession::start(test_config(mock.port), hooks);
    wait_for_state(&session, SessionState::Open).await;
    let _ = next_frame(&mut mock).await; // session.update

    let tool_call = serde_json::json!({
        "type": "response.output_item.added",
        "item": {
            "type": "function_call",
            "name": "capture_lead",
            "arguments": "{\"name\":\"Jane Smith\",\"phone\":\"07700 900123\",\
                           \"address\":\"1 High Street\",\"postcode\":\"LS1 1AA\",\
                           \"description\":\"Fuse box keeps tripping\",\"urgency\":\"high\"}"
        }
    });
    mock.inject.send(tool_call.to_string()).unwrap();

    let lead = timeout(Duration::from_secs(2), lead_rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.name, "Jane Smith");
    assert_eq!(lead.postcode, "LS1 1AA");

    // Malformed arguments are logged and discarded, never emitted.
    let bad_call = serde_json::json!({
        "type": "response.output_item.added",
        "item": {
            "type": "function_call",
            "name": "capture_lead",
            "arguments": "{\"name\":\"No Phone\"}"
        }
    });
    mock.inject.send(bad_call.to_string()).unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(lead_rx.try_recv().is_err());

    session.end().await;
}

#[tokio::test]
async fn test_end_commits_then_closes() {
    let mut mock = spawn_mock(Duration::ZERO).await;
    let session = RealtimeSession::start(test_config(mock.port), SessionHooks::new());
    wait_for_state(&session, SessionState::Open).await;
    let _ = next_frame(&mut mock).await; // session.update

    session.end().await;
    assert_eq!(session.state(), SessionState::Closed);

    let frame = next_frame(&mut mock).await;
    assert_eq!(frame["type"], "input_audio_buffer.commit");

    // The connection winds down after the commit.
    timeout(Duration::from_secs(2), mock.closed.recv())
        .await
        .expect("mock connection never closed");

    // Second end is a no-op, and post-close audio is dropped silently.
    session.end().await;
    session.send_audio("late".to_string()).await;
    assert_eq!(session.state(), SessionState::Closed);
}

#[tokio::test]
async fn test_handshake_failure_leaves_session_pending_until_end() {
    // Nothing is listening on this port.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let session = RealtimeSession::start(test_config(port), SessionHooks::new());
    session.send_audio("staged".to_string()).await;

    // The refused connection does not change the observable state; the
    // session keeps accepting audio into the staging buffer.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(session.state(), SessionState::Pending);
    session.send_audio("more".to_string()).await;
    assert_eq!(session.state(), SessionState::Pending);

    // Call end is what closes the session, idempotently.
    session.end().await;
    assert_eq!(session.state(), SessionState::Closed);
    session.end().await;
    assert_eq!(session.state(), SessionState::Closed);
    session.send_audio("late".to_string()).await;
    assert_eq!(session.state(), SessionState::Closed);
}
