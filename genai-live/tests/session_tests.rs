//! End-to-end session behavior over the in-memory transport.

use async_trait::async_trait;
use genai_live::{
    Blob, ChannelCallbacks, ClientEvent, CloseEvent, Content, FunctionResponse, LiveClient,
    LiveCallbacks, LiveConnectConfig, LiveError, LiveEvent, LiveSession, MemoryConnector,
    MemoryPeer, Part, RealtimeInput, Role, ServerEvent, ServerMessage, SessionState,
};
use genai_types::normalize_contents;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver};

struct Harness {
    session: LiveSession,
    peer: MemoryPeer,
    events: UnboundedReceiver<LiveEvent>,
}

async fn open_with(config: LiveConnectConfig) -> Harness {
    let (connector, mut listener) = MemoryConnector::new();
    let client = LiveClient::builder()
        .api_key("test-key")
        .connector(Arc::new(connector))
        .build_with_env(|_| None)
        .unwrap();
    let (callbacks, events) = ChannelCallbacks::new();
    let session = client.connect("gemini-live", config, Arc::new(callbacks)).await.unwrap();
    let mut peer = listener.accept().await.unwrap();

    match peer.recv_event().await {
        Some(ClientEvent::Setup(setup)) => assert_eq!(setup.model, "models/gemini-live"),
        other => panic!("expected setup first, got {:?}", other),
    }
    Harness { session, peer, events }
}

async fn open() -> Harness {
    open_with(LiveConnectConfig::new().with_text_output()).await
}

/// Next message event, skipping `Open`.
async fn next_message(events: &mut UnboundedReceiver<LiveEvent>) -> genai_live::ServerMessage {
    loop {
        match events.recv().await {
            Some(LiveEvent::Open) => continue,
            Some(LiveEvent::Message(message)) => return message,
            other => panic!("expected a message, got {:?}", other),
        }
    }
}

async fn drain(mut events: UnboundedReceiver<LiveEvent>) -> Vec<LiveEvent> {
    let mut all = Vec::new();
    while let Some(event) = events.recv().await {
        all.push(event);
    }
    all
}

#[tokio::test]
async fn test_setup_handshake_opens_session() {
    let mut h = open().await;
    assert_eq!(h.session.state(), SessionState::Connecting);
    assert!(!h.session.session_id().is_empty());

    h.peer.send_setup_complete();
    h.session.wait_for_setup().await.unwrap();
    assert!(h.session.is_open());
    assert!(next_message(&mut h.events).await.is_setup_complete());
}

#[tokio::test]
async fn test_sends_before_setup_complete_are_queued_in_order() {
    let mut h = open().await;
    h.session.send_client_content("first", false).unwrap();
    h.session.send_realtime_input(RealtimeInput::text("second")).unwrap();

    match h.peer.recv_event().await {
        Some(ClientEvent::ClientContent(content)) => {
            assert_eq!(content.turns, vec![Content::user("first")]);
            assert!(!content.turn_complete);
        }
        other => panic!("unexpected frame: {:?}", other),
    }
    match h.peer.recv_event().await {
        Some(ClientEvent::RealtimeInput(input)) => assert_eq!(input.text.as_deref(), Some("second")),
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_client_content_frame_equals_normalized_turns() {
    let mut h = open().await;
    let parts = vec![Part::text("look at this"), Part::inline_bytes("image/png", b"\x89PNG")];
    let expected = normalize_contents(parts.clone().into()).unwrap();

    h.session.send_client_content(parts, true).unwrap();
    match h.peer.recv_event().await {
        Some(ClientEvent::ClientContent(content)) => {
            assert_eq!(content.turns, expected);
            assert!(content.turn_complete);
        }
        other => panic!("unexpected frame: {:?}", other),
    }

    let history = vec![Content::user("hi"), Content::model("hello"), Content::text("again")];
    h.session.send_client_content(history, true).unwrap();
    match h.peer.recv_event().await {
        Some(ClientEvent::ClientContent(content)) => {
            let roles: Vec<_> = content.turns.iter().map(|t| t.role).collect();
            assert_eq!(roles, vec![Some(Role::User), Some(Role::Model), Some(Role::User)]);
        }
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_client_content_sends_nothing() {
    let mut h = open().await;
    let err = h.session.send_client_content(Vec::<Content>::new(), true).unwrap_err();
    assert_eq!(err, LiveError::validation("turns is required"));

    let unwrapped = vec![Part::function_response(FunctionResponse::new("f", json!({})))];
    assert!(h.session.send_client_content(unwrapped, true).unwrap_err().is_validation());

    h.session.send_client_content("valid", true).unwrap();
    match h.peer.recv_event().await {
        Some(ClientEvent::ClientContent(content)) => {
            assert_eq!(content.turns[0].parts, vec![Part::text("valid")])
        }
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_realtime_input_requires_exactly_one_field() {
    let mut h = open().await;
    assert!(h.session.send_realtime_input(RealtimeInput::default()).unwrap_err().is_validation());

    let mut two = RealtimeInput::text("hi");
    two.audio = Some(Blob::from_bytes("audio/pcm;rate=16000", &[0, 1, 2, 3]));
    assert!(h.session.send_realtime_input(two).unwrap_err().is_validation());

    h.session.send_realtime_input(RealtimeInput::text("hi")).unwrap();
    match h.peer.recv_event().await {
        Some(ClientEvent::RealtimeInput(input)) => {
            assert_eq!(input, RealtimeInput::text("hi"));
        }
        other => panic!("unexpected frame: {:?}", other),
    }
}

#[tokio::test]
async fn test_activity_bracketing_with_manual_detection() {
    let mut h = open_with(LiveConnectConfig::new().without_automatic_activity_detection()).await;
    h.session.send_realtime_input(RealtimeInput::activity_start()).unwrap();
    h.session
        .send_realtime_input(RealtimeInput::audio_bytes("audio/pcm;rate=16000", &[1, 2, 3, 4]))
        .unwrap();
    h.session.send_realtime_input(RealtimeInput::activity_end()).unwrap();

    let mut fields = Vec::new();
    for _ in 0..3 {
        match h.peer.recv_event().await {
            Some(ClientEvent::RealtimeInput(input)) => fields.push(input.set_fields()[0]),
            other => panic!("unexpected frame: {:?}", other),
        }
    }
    assert_eq!(fields, vec!["activityStart", "audio", "activityEnd"]);
}

#[tokio::test]
async fn test_tool_response_with_single_outstanding_call() {
    let mut h = open().await;
    h.peer.send_json(&json!({"toolCall": {"functionCalls": [
        {"id": "call-1", "name": "f", "args": {}}
    ]}}));
    assert!(matches!(next_message(&mut h.events).await.event, ServerEvent::ToolCall(_)));
    assert_eq!(h.session.pending_tool_calls().len(), 1);

    h.session.send_tool_response(vec![FunctionResponse::new("f", json!({}))]).unwrap();
    match h.peer.recv_event().await {
        Some(ClientEvent::ToolResponse(response)) => {
            assert_eq!(response.function_responses[0].id.as_deref(), Some("call-1"));
        }
        other => panic!("unexpected frame: {:?}", other),
    }
    assert!(h.session.pending_tool_calls().is_empty());
}

#[tokio::test]
async fn test_tool_response_without_id_is_ambiguous_with_two_calls() {
    let mut h = open().await;
    h.peer.send_json(&json!({"toolCall": {"functionCalls": [
        {"id": "call-1", "name": "f", "args": {}},
        {"id": "call-2", "name": "f", "args": {"x": 1}}
    ]}}));
    next_message(&mut h.events).await;

    let err = h.session.send_tool_response(vec![FunctionResponse::new("f", json!({}))]).unwrap_err();
    assert!(err.is_validation());
    assert!(err.to_string().contains("must have an id"));

    let err = h.session.send_tool_response(vec![]).unwrap_err();
    assert_eq!(err, LiveError::validation("functionResponses is required"));
}

#[tokio::test]
async fn test_tool_calls_without_ids_are_answered_by_name() {
    let mut h = open().await;
    h.peer.send_json(&json!({"toolCall": {"functionCalls": [
        {"name": "a", "args": {}},
        {"name": "b", "args": {}}
    ]}}));
    next_message(&mut h.events).await;
    assert_eq!(h.session.pending_tool_calls().len(), 2);

    h.session.send_tool_response(vec![FunctionResponse::new("a", json!({"v": 1}))]).unwrap();
    h.session.send_tool_response(vec![FunctionResponse::new("b", json!({"v": 2}))]).unwrap();

    for name in ["a", "b"] {
        match h.peer.recv_event().await {
            Some(ClientEvent::ToolResponse(response)) => {
                assert_eq!(response.function_responses[0].name, name);
                assert_eq!(response.function_responses[0].id, None);
            }
            other => panic!("unexpected frame: {:?}", other),
        }
    }
    assert!(h.session.pending_tool_calls().is_empty());
}

#[tokio::test]
async fn test_tool_call_cancellation_retires_calls() {
    let mut h = open().await;
    h.peer.send_json(&json!({"toolCall": {"functionCalls": [
        {"id": "call-1", "name": "f", "args": {}},
        {"id": "call-2", "name": "g", "args": {}}
    ]}}));
    h.peer.send_json(&json!({"toolCallCancellation": {"ids": ["call-1"]}}));
    next_message(&mut h.events).await;
    next_message(&mut h.events).await;

    let pending = h.session.pending_tool_calls();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id.as_deref(), Some("call-2"));

    // One call left, so a response by name is no longer ambiguous.
    h.session.send_tool_response(vec![FunctionResponse::new("g", json!({"ok": true}))]).unwrap();
}

#[tokio::test]
async fn test_messages_delivered_in_wire_order() {
    let mut h = open().await;
    h.peer.send_setup_complete();
    h.peer.send_json(&json!({"serverContent": {
        "modelTurn": {"role": "model", "parts": [{"text": "Hel"}]},
        "turnComplete": false
    }}));
    h.peer.send_json(&json!({"serverContent": {"turnComplete": true}}));

    let first = next_message(&mut h.events).await;
    let second = next_message(&mut h.events).await;
    let third = next_message(&mut h.events).await;

    assert!(first.is_setup_complete());
    assert_eq!(second.text().as_deref(), Some("Hel"));
    assert!(!second.server_content().unwrap().is_turn_complete());
    assert!(third.server_content().unwrap().is_turn_complete());
}

#[tokio::test]
async fn test_open_is_first_event() {
    let mut h = open().await;
    h.peer.send_setup_complete();
    assert_eq!(h.events.recv().await, Some(LiveEvent::Open));
}

#[tokio::test]
async fn test_unrecognized_frame_is_dropped() {
    let mut h = open().await;
    h.peer.send_json(&json!({"somethingNew": {"x": 1}}));
    h.peer.send_text("{not json");
    h.peer.send_setup_complete();

    assert!(next_message(&mut h.events).await.is_setup_complete());
    h.session.wait_for_setup().await.unwrap();
    h.session.send_client_content("still open", true).unwrap();
}

#[tokio::test]
async fn test_binary_frames_are_decoded() {
    let mut h = open().await;
    h.peer.send_binary(br#"{"sessionResumptionUpdate":{"newHandle":"h-1","resumable":true}}"#.to_vec());
    let message = next_message(&mut h.events).await;
    assert!(matches!(message.event, ServerEvent::SessionResumptionUpdate(_)));
    assert_eq!(h.session.resumption_handle().as_deref(), Some("h-1"));
}

#[tokio::test]
async fn test_close_twice_delivers_one_close() {
    let h = open().await;
    h.session.close();
    h.session.close();
    h.session.closed().await;
    assert_eq!(h.session.state(), SessionState::Closed);

    let Harness { session, events, .. } = h;
    drop(session);
    let events = drain(events).await;
    assert_eq!(events.first(), Some(&LiveEvent::Open));
    let closes = events.iter().filter(|e| matches!(e, LiveEvent::Close(_))).count();
    assert_eq!(closes, 1);
    assert_eq!(events.last(), Some(&LiveEvent::Close(CloseEvent::client())));
}

#[tokio::test]
async fn test_close_flushes_queued_frames_then_close_frame() {
    let mut h = open().await;
    h.session.send_client_content("last words", true).unwrap();
    h.session.close();

    assert!(matches!(h.peer.recv_event().await, Some(ClientEvent::ClientContent(_))));
    assert!(matches!(h.peer.recv().await, Some(genai_live::Frame::Close(_))));
}

#[tokio::test]
async fn test_send_after_close_fails() {
    let h = open().await;
    h.session.close();
    assert_eq!(h.session.send_client_content("too late", true), Err(LiveError::SessionClosed));
    assert_eq!(
        h.session.send_realtime_input(RealtimeInput::text("too late")),
        Err(LiveError::SessionClosed)
    );
    assert_eq!(
        h.session.send_tool_response(vec![FunctionResponse::new("f", json!({})).with_id("x")]),
        Err(LiveError::SessionClosed)
    );
    assert!(matches!(h.session.wait_for_setup().await, Err(LiveError::SessionClosed)));
}

#[tokio::test]
async fn test_no_messages_after_client_close() {
    let h = open().await;
    h.session.close();
    h.peer.send_json(&json!({"serverContent": {"turnComplete": true}}));
    h.session.closed().await;

    let Harness { session, events, .. } = h;
    drop(session);
    let events = drain(events).await;
    assert!(events.iter().all(|e| !matches!(e, LiveEvent::Message(_))));
}

#[tokio::test]
async fn test_server_close_closes_session() {
    let mut h = open().await;
    h.peer.send_setup_complete();
    h.peer.close(1011, "internal error");
    h.session.closed().await;

    assert_eq!(
        h.session.send_client_content("anyone there?", true),
        Err(LiveError::SessionClosed)
    );
    let Harness { session, events, .. } = h;
    drop(session);
    let events = drain(events).await;
    assert_eq!(
        events.last(),
        Some(&LiveEvent::Close(CloseEvent::new(Some(1011), "internal error")))
    );
}

#[tokio::test]
async fn test_wait_for_setup_fails_when_closed_first() {
    let mut h = open().await;
    h.peer.disconnect();
    assert_eq!(h.session.wait_for_setup().await, Err(LiveError::SessionClosed));
}

#[tokio::test]
async fn test_transport_failure_reports_error_then_close() {
    let h = open().await;
    h.peer.fail("connection reset");
    h.session.closed().await;

    let Harness { session, events, .. } = h;
    drop(session);
    let events = drain(events).await;
    let n = events.len();
    assert!(n >= 3);
    assert!(matches!(&events[n - 2], LiveEvent::Error(LiveError::TransportError(_))));
    assert!(matches!(&events[n - 1], LiveEvent::Close(close) if !close.is_normal()));
}

#[tokio::test]
async fn test_drop_closes_session() {
    let Harness { session, mut peer, .. } = open().await;
    drop(session);
    assert!(matches!(peer.recv().await, Some(genai_live::Frame::Close(_))));
}

#[tokio::test]
async fn test_rejected_connect_is_connection_error() {
    let (connector, _listener) = MemoryConnector::new();
    connector.reject_with(LiveError::connection("authentication rejected (HTTP 401)"));
    let client = LiveClient::builder()
        .api_key("bad-key")
        .connector(Arc::new(connector))
        .build_with_env(|_| None)
        .unwrap();
    let (callbacks, _events) = ChannelCallbacks::new();

    let err = client
        .connect("gemini-live", LiveConnectConfig::new(), Arc::new(callbacks))
        .await
        .unwrap_err();
    assert!(matches!(err, LiveError::ConnectionError(msg) if msg.contains("401")));
}

#[tokio::test]
async fn test_malformed_model_is_connection_error() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = LiveClient::builder()
        .api_key("k")
        .connector(Arc::new(connector))
        .build_with_env(|_| None)
        .unwrap();

    for model in ["", "models/", "gemini live", "gemini?alt=json"] {
        let (callbacks, _events) = ChannelCallbacks::new();
        let err =
            client.connect(model, LiveConnectConfig::new(), Arc::new(callbacks)).await.unwrap_err();
        assert!(matches!(err, LiveError::ConnectionError(_)), "{model:?} gave {err:?}");
    }
    // Nothing reached the transport.
    assert!(listener.try_accept().is_none());
}

#[tokio::test]
async fn test_memory_peer_sees_request_url() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = LiveClient::builder()
        .api_key("secret")
        .connector(Arc::new(connector))
        .build_with_env(|_| None)
        .unwrap();
    let (callbacks, _events) = ChannelCallbacks::new();
    let _session =
        client.connect("gemini-live", LiveConnectConfig::new(), Arc::new(callbacks)).await.unwrap();
    let peer = listener.accept().await.unwrap();
    assert!(peer.request().url.as_str().contains("GenerativeService.BidiGenerateContent"));
    assert!(!peer.request().redacted_url().contains("secret"));
}

#[tokio::test]
async fn test_model_turn_parts_roundtrip_into_message() {
    let mut h = open().await;
    let turn = Content::new(Role::Model, vec![Part::inline_bytes("audio/pcm;rate=24000", &[9, 8, 7])]);
    h.peer.send_json(&json!({"serverContent": {"modelTurn": turn}}));
    let message = next_message(&mut h.events).await;
    assert_eq!(message.data(), Some(vec![9, 8, 7]));
    assert_eq!(message.text(), None);
}

/// Hook that takes a while and records how many invocations overlap.
struct SlowCallbacks {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    seen: mpsc::UnboundedSender<String>,
}

#[async_trait]
impl LiveCallbacks for SlowCallbacks {
    async fn on_message(&self, message: ServerMessage) {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.seen.send(message.text().unwrap_or_default());
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_slow_hook_holds_back_next_message() {
    let (connector, mut listener) = MemoryConnector::new();
    let client = LiveClient::builder()
        .api_key("test-key")
        .connector(Arc::new(connector))
        .build_with_env(|_| None)
        .unwrap();
    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    let callbacks = Arc::new(SlowCallbacks {
        in_flight: AtomicUsize::new(0),
        max_in_flight: AtomicUsize::new(0),
        seen: seen_tx,
    });
    let _session = client
        .connect("gemini-live", LiveConnectConfig::new(), callbacks.clone())
        .await
        .unwrap();
    let peer = listener.accept().await.unwrap();

    for i in 0..5 {
        peer.send_json(&json!({"serverContent": {
            "modelTurn": {"role": "model", "parts": [{"text": i.to_string()}]}
        }}));
    }

    let mut order = Vec::new();
    for _ in 0..5 {
        let text = tokio::time::timeout(Duration::from_secs(5), seen.recv()).await.unwrap().unwrap();
        order.push(text);
    }
    assert_eq!(order, vec!["0", "1", "2", "3", "4"]);
    assert_eq!(callbacks.max_in_flight.load(Ordering::SeqCst), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_senders_keep_frames_whole_and_ordered() {
    const TASKS: usize = 4;
    const PER_TASK: usize = 25;

    let Harness { session, mut peer, .. } = open().await;
    let session = Arc::new(session);

    let mut handles = Vec::new();
    for task in 0..TASKS {
        let session = session.clone();
        handles.push(tokio::spawn(async move {
            for i in 0..PER_TASK {
                session.send_client_content(format!("{task}:{i}"), true).unwrap();
                tokio::task::yield_now().await;
            }
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut next_index = [0usize; TASKS];
    for _ in 0..TASKS * PER_TASK {
        let text = match peer.recv().await {
            Some(genai_live::Frame::Text(text)) => text,
            other => panic!("unexpected frame: {:?}", other),
        };
        let turns = match genai_live::codec::decode_client(&text) {
            Ok(ClientEvent::ClientContent(content)) => content.turns,
            other => panic!("frame did not decode as clientContent: {:?}", other),
        };
        let label = turns[0].parts[0].as_text().unwrap().to_string();
        let (task, index) = label.split_once(':').unwrap();
        let (task, index): (usize, usize) = (task.parse().unwrap(), index.parse().unwrap());
        assert_eq!(index, next_index[task], "task {task} frames out of order");
        next_index[task] += 1;
    }
    assert!(next_index.iter().all(|n| *n == PER_TASK));
}
