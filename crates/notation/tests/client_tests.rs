//! Integration tests against a scripted in-process editor.
//!
//! Each test stands up a local WebSocket listener that plays back canned
//! replies and records every frame the client sent, so both sides of the
//! exchange can be asserted exactly.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use notation::{Action, EditorClient, Fraction};
use serde_json::{json, Value};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

/// Serve one accepted connection: record each incoming frame, answer it with
/// the next scripted reply, and hang up when the script runs out.
async fn serve_connection(stream: TcpStream, replies: Vec<Value>) -> Vec<Value> {
    let mut socket = accept_async(stream).await.expect("websocket handshake");
    let mut script = replies.into_iter();
    let mut received = Vec::new();
    loop {
        match socket.next().await {
            Some(Ok(Message::Text(text))) => {
                received.push(serde_json::from_str(&text).expect("client frame is JSON"));
                match script.next() {
                    Some(reply) => socket
                        .send(Message::Text(reply.to_string().into()))
                        .await
                        .expect("send scripted reply"),
                    None => break,
                }
            }
            Some(Ok(Message::Close(_))) | None => break,
            Some(Ok(_)) => continue,
            Some(Err(_)) => break,
        }
    }
    received
}

/// Start an editor fixture that accepts one connection per script and serves
/// each in turn. Returns the listen address and a handle yielding the frames
/// received on each connection.
async fn scripted_editor(scripts: Vec<Vec<Value>>) -> (SocketAddr, JoinHandle<Vec<Vec<Value>>>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fixture listener");
    let addr = listener.local_addr().expect("fixture address");
    let handle = tokio::spawn(async move {
        let mut sessions = Vec::new();
        for script in scripts {
            let (stream, _) = listener.accept().await.expect("accept connection");
            sessions.push(serve_connection(stream, script).await);
        }
        sessions
    });
    (addr, handle)
}

fn ok_reply(data: Value) -> Value {
    json!({"success": true, "data": data})
}

#[tokio::test]
async fn call_round_trips_the_editor_reply() {
    let (addr, handle) = scripted_editor(vec![vec![ok_reply(json!({"measure": 5}))]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let response = client.call("goToMeasure", json!({"measure": 5})).await;
    assert!(response.success);
    assert_eq!(response.data, Some(json!({"measure": 5})));
    assert!(client.is_connected().await);

    client.close().await;
    let sessions = handle.await.expect("fixture");
    assert_eq!(
        sessions[0],
        vec![json!({"action": "goToMeasure", "params": {"measure": 5}})]
    );
}

#[tokio::test]
async fn typed_send_matches_the_wire_contract() {
    let (addr, handle) = scripted_editor(vec![vec![ok_reply(json!({}))]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let action = Action::AddNote {
        pitch: 72,
        duration: Fraction::new(1, 8),
        advance_cursor_after_action: false,
    };
    let response = client.send(&action).await;
    assert!(response.success);

    client.close().await;
    let sessions = handle.await.expect("fixture");
    assert_eq!(
        sessions[0],
        vec![json!({
            "action": "addNote",
            "params": {
                "pitch": 72,
                "duration": {"numerator": 1, "denominator": 8},
                "advanceCursorAfterAction": false
            }
        })]
    );
}

#[tokio::test]
async fn failed_connect_becomes_a_failure_reply() {
    // Grab a port the OS just handed out, then close it again.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("address").port();
    drop(listener);

    let client = EditorClient::new("127.0.0.1", port);
    let response = client.call("ping", json!({})).await;
    assert!(!response.success);
    let error = response.error.expect("failure carries an error");
    assert!(
        error.contains("failed to connect"),
        "unexpected error: {error}"
    );
    assert!(!client.is_connected().await);
}

#[tokio::test]
async fn connect_is_idempotent() {
    let (addr, handle) = scripted_editor(vec![vec![]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    client.connect().await.expect("first connect");
    client.connect().await.expect("second connect");
    assert!(client.is_connected().await);

    client.close().await;
    let sessions = handle.await.expect("fixture");
    assert_eq!(sessions.len(), 1, "only one connection may be dialed");
    assert!(sessions[0].is_empty());
}

#[tokio::test]
async fn close_resets_the_slot_and_the_next_call_reconnects() {
    let (addr, handle) =
        scripted_editor(vec![vec![ok_reply(json!({}))], vec![ok_reply(json!({}))]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    assert!(client.call("ping", json!({})).await.success);
    client.close().await;
    assert!(!client.is_connected().await);

    assert!(client.call("ping", json!({})).await.success);
    client.close().await;

    let sessions = handle.await.expect("fixture");
    assert_eq!(sessions.len(), 2);
}

#[tokio::test]
async fn transport_fault_is_absorbed_and_the_channel_discarded() {
    // First session hangs up after reading the command, without replying.
    let (addr, handle) = scripted_editor(vec![vec![], vec![ok_reply(json!({}))]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let response = client.call("getScore", json!({})).await;
    assert!(!response.success);
    assert!(response.error.is_some());
    assert!(!client.is_connected().await);

    let response = client.call("ping", json!({})).await;
    assert!(response.success, "the next command must reconnect");

    client.close().await;
    handle.await.expect("fixture");
}

#[tokio::test]
async fn editor_rejection_passes_through_and_keeps_the_channel() {
    let (addr, handle) = scripted_editor(vec![vec![
        json!({"success": false, "error": "No measure 99"}),
        ok_reply(json!({})),
    ]])
    .await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let response = client.call("goToMeasure", json!({"measure": 99})).await;
    assert!(!response.success);
    assert_eq!(response.error.as_deref(), Some("No measure 99"));
    assert!(
        client.is_connected().await,
        "a rejection must not drop the channel"
    );

    let response = client.call("ping", json!({})).await;
    assert!(response.success);

    client.close().await;
    handle.await.expect("fixture");
}

#[tokio::test]
async fn unparseable_reply_is_reported_and_the_channel_discarded() {
    let (addr, handle) = scripted_editor(vec![vec![json!("scribble")]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let response = client.call("ping", json!({})).await;
    assert!(!response.success);
    let error = response.error.expect("failure carries an error");
    assert!(
        error.contains("malformed response"),
        "unexpected error: {error}"
    );
    assert!(!client.is_connected().await);

    handle.await.expect("fixture");
}

#[tokio::test]
async fn run_sequence_delivers_steps_verbatim_in_order() {
    let (addr, handle) = scripted_editor(vec![vec![ok_reply(json!({"processed": 3}))]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let sequence = vec![
        Action::GoToBeginningOfScore {},
        Action::AddNote {
            pitch: 60,
            duration: Fraction::new(1, 4),
            advance_cursor_after_action: true,
        },
        Action::AddRest {
            duration: Fraction::new(1, 4),
            advance_cursor_after_action: true,
        },
    ];
    let response = client.run_sequence(&sequence).await;
    assert!(response.success);

    client.close().await;
    let sessions = handle.await.expect("fixture");
    let frame = &sessions[0][0];
    assert_eq!(frame["action"], "processSequence");
    let steps = frame["params"]["sequence"].as_array().expect("step array");
    assert_eq!(steps.len(), 3);
    assert_eq!(steps[0], json!({"action": "goToBeginningOfScore", "params": {}}));
    assert_eq!(
        steps[1],
        json!({
            "action": "addNote",
            "params": {
                "pitch": 60,
                "duration": {"numerator": 1, "denominator": 4},
                "advanceCursorAfterAction": true
            }
        })
    );
    assert_eq!(steps[2]["action"], "addRest");
}

#[tokio::test]
async fn empty_sequence_is_still_sent_to_the_editor() {
    let (addr, handle) = scripted_editor(vec![vec![ok_reply(json!({"processed": 0}))]]).await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let response = client.run_sequence(&[]).await;
    assert!(response.success);

    client.close().await;
    let sessions = handle.await.expect("fixture");
    assert_eq!(
        sessions[0],
        vec![json!({"action": "processSequence", "params": {"sequence": []}})]
    );
}

#[tokio::test]
async fn stepwise_run_stops_at_the_first_failure() {
    let (addr, handle) = scripted_editor(vec![vec![
        ok_reply(json!({})),
        ok_reply(json!({})),
        json!({"success": false, "error": "no selection"}),
    ]])
    .await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let sequence = vec![
        Action::GoToMeasure { measure: 1 },
        Action::SelectCurrentMeasure {},
        Action::DeleteSelection { measure: None },
        Action::Undo {},
    ];
    let outcome = client.run_sequence_stepwise(&sequence).await;
    assert!(!outcome.succeeded());
    assert_eq!(outcome.failed_step, Some(2));
    assert_eq!(outcome.steps.len(), 3);
    assert_eq!(outcome.steps[2].error.as_deref(), Some("no selection"));

    client.close().await;
    let sessions = handle.await.expect("fixture");
    assert_eq!(sessions[0].len(), 3, "the step after the failure must never be sent");
    assert_eq!(sessions[0][2]["action"], "deleteSelection");
}

#[tokio::test]
async fn stepwise_run_collects_every_reply_on_success() {
    let (addr, handle) = scripted_editor(vec![vec![
        ok_reply(json!({"pong": true})),
        ok_reply(json!({"undone": true})),
    ]])
    .await;
    let client = EditorClient::new("127.0.0.1", addr.port());

    let outcome = client
        .run_sequence_stepwise(&[Action::Ping {}, Action::Undo {}])
        .await;
    assert!(outcome.succeeded());
    assert_eq!(outcome.steps.len(), 2);
    assert!(outcome.steps.iter().all(|step| step.success));
    assert_eq!(outcome.steps[1].data, Some(json!({"undone": true})));

    client.close().await;
    handle.await.expect("fixture");
}

#[tokio::test]
async fn concurrent_calls_are_serialized_on_the_channel() {
    // Echo the action name back so a crossed reply would be detected.
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = accept_async(stream).await.expect("handshake");
        while let Some(Ok(message)) = socket.next().await {
            match message {
                Message::Text(text) => {
                    let frame: Value = serde_json::from_str(&text).expect("frame");
                    let reply = json!({"success": true, "data": {"echo": frame["action"]}});
                    if socket
                        .send(Message::Text(reply.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Message::Close(_) => break,
                _ => continue,
            }
        }
    });

    let client = Arc::new(EditorClient::new("127.0.0.1", addr.port()));
    let mut tasks = Vec::new();
    for action in ["ping", "getScore", "undo", "nextElement"] {
        let client = Arc::clone(&client);
        tasks.push(tokio::spawn(async move {
            (action, client.call(action, json!({})).await)
        }));
    }
    for task in tasks {
        let (action, response) = task.await.expect("task");
        assert!(response.success);
        assert_eq!(
            response.data,
            Some(json!({"echo": action})),
            "reply crossed between commands"
        );
    }
    client.close().await;
}

#[tokio::test]
async fn control_frames_before_the_reply_are_skipped() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("address");
    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut socket = accept_async(stream).await.expect("handshake");
        if let Some(Ok(Message::Text(_))) = socket.next().await {
            socket
                .send(Message::Ping(Vec::new().into()))
                .await
                .expect("send ping");
            socket
                .send(Message::Text(ok_reply(json!({"pong": true})).to_string().into()))
                .await
                .expect("send reply");
        }
    });

    let client = EditorClient::new("127.0.0.1", addr.port());
    let response = client.call("ping", json!({})).await;
    assert!(response.success);
    assert_eq!(response.data, Some(json!({"pong": true})));
    client.close().await;
}
