//! Connection actor behavior against a scripted WebSocket server.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use crate::config::ConnectionConfig;
use crate::session::protocol;
use crate::session::{ConnectSettings, ConnectionHandle, ServerEvent};

/// Start a server that accepts one connection, forwards every received
/// text frame into `seen`, and answers any `response.create` with a fixed
/// event script.
async fn scripted_server(seen: mpsc::UnboundedSender<String>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        while let Some(Ok(msg)) = ws.next().await {
            let Message::Text(text) = msg else { continue };
            let _ = seen.send(text.to_string());

            let parsed: serde_json::Value = match serde_json::from_str(text.as_str()) {
                Ok(v) => v,
                Err(_) => continue,
            };
            if parsed["type"] == "response.create" {
                for frame in [
                    r#"{"type":"response.audio.delta","delta":"QUFB"}"#,
                    r#"{"type":"response.audio.delta","delta":"QkJC"}"#,
                    r#"{"type":"response.output_item.done"}"#,
                ] {
                    ws.send(Message::Text(frame.into())).await.unwrap();
                }
            }
        }
    });

    format!("ws://{addr}")
}

fn settings(url: String) -> ConnectSettings {
    ConnectSettings {
        url,
        api_key: "test-key".into(),
    }
}

async fn next(sub: &mut crate::session::EventSubscription) -> ServerEvent {
    tokio::time::timeout(Duration::from_secs(5), sub.next_event())
        .await
        .expect("event within deadline")
        .expect("subscription still attached")
}

#[tokio::test]
async fn events_reach_the_subscriber_in_order() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let url = scripted_server(seen_tx).await;
    let conn = ConnectionHandle::spawn("french", settings(url), ConnectionConfig::default());

    let mut sub = conn.subscribe().await.unwrap();
    conn.send(protocol::request_translation("french"))
        .await
        .unwrap();

    assert_eq!(
        next(&mut sub).await,
        ServerEvent::AudioDelta {
            delta: "QUFB".into()
        }
    );
    assert_eq!(
        next(&mut sub).await,
        ServerEvent::AudioDelta {
            delta: "QkJC".into()
        }
    );
    assert_eq!(next(&mut sub).await, ServerEvent::OutputItemDone);
}

#[tokio::test]
async fn dropped_subscription_does_not_steal_the_next_sessions_events() {
    let (seen_tx, _seen_rx) = mpsc::unbounded_channel();
    let url = scripted_server(seen_tx).await;
    let conn = ConnectionHandle::spawn("french", settings(url), ConnectionConfig::default());

    // First session attaches and detaches without consuming anything.
    let first = conn.subscribe().await.unwrap();
    drop(first);

    // Second session must receive the full script.
    let mut second = conn.subscribe().await.unwrap();
    conn.send(protocol::request_translation("french"))
        .await
        .unwrap();

    assert_eq!(
        next(&mut second).await,
        ServerEvent::AudioDelta {
            delta: "QUFB".into()
        }
    );
}

#[tokio::test]
async fn keep_alive_is_sent_without_session_activity() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let url = scripted_server(seen_tx).await;
    let config = ConnectionConfig {
        keep_alive_secs: 1,
        ..ConnectionConfig::default()
    };
    let _conn = ConnectionHandle::spawn("french", settings(url), config);

    // No session attached, no messages sent; the continuation must still
    // arrive on its own.
    let first = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
        .await
        .expect("keep-alive within deadline")
        .expect("server saw a frame");
    let parsed: serde_json::Value = serde_json::from_str(&first).unwrap();
    assert_eq!(parsed["type"], "session.update");
    assert_eq!(parsed["session"]["instructions"], "Continue translation.");
}
