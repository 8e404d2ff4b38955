use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use huddle_client::{ChannelEvent, ChannelState, SignalingChannel, websocket_url};
use huddle_core::{ChatMessage, ServerEvent};

use crate::integration::{fast_channel, identity, init_tracing};
use crate::utils::{TestServer, eventually};

#[tokio::test]
async fn test_raw_handlers_and_typed_events() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    server.set_auto_ack(false);
    let identity = identity("r1", "u1");
    let url = websocket_url(&server.base_url(), &identity).unwrap();

    let (handle, mut events) = SignalingChannel::connect(url, identity, fast_channel());

    let ai_hits = Arc::new(AtomicUsize::new(0));
    let chat_hits = Arc::new(AtomicUsize::new(0));
    {
        let ai_hits = ai_hits.clone();
        handle.on("ai_question", move |data| {
            if data["question"] == "Why Rust?" {
                ai_hits.fetch_add(1, Ordering::SeqCst);
            }
        });
        let chat_hits = chat_hits.clone();
        handle.on("receive_message", move |_| {
            chat_hits.fetch_add(1, Ordering::SeqCst);
        });
    }

    assert!(handle.wait_for_state(ChannelState::Open).await);

    server.send_raw(r#"{"event":"ai_question","data":{"question":"Why Rust?"}}"#);
    server.send_raw(r#"{"event":"user_joined","data":{"unexpected":true}}"#);
    server.send_raw("not json at all");
    server.send(&ServerEvent::ReceiveMessage(ChatMessage {
        user_id: "u2".into(),
        user_name: "Bob".into(),
        message: "hello".into(),
    }));

    assert!(eventually(2000, || chat_hits.load(Ordering::SeqCst) == 1).await);
    assert_eq!(ai_hits.load(Ordering::SeqCst), 1);

    let mut typed = Vec::new();
    let collected = tokio::time::timeout(Duration::from_secs(2), async {
        while let Some(event) = events.recv().await {
            if let ChannelEvent::Message(message) = event {
                let done = matches!(message, ServerEvent::ReceiveMessage(_));
                typed.push(message);
                if done {
                    return;
                }
            }
        }
    })
    .await;
    assert!(collected.is_ok());

    // The malformed user_joined reached its raw handlers only.
    assert_eq!(typed.len(), 1);
    assert!(matches!(&typed[0], ServerEvent::ReceiveMessage(chat) if chat.message == "hello"));

    handle.close();
}
