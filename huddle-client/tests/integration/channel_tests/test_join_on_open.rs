use huddle_client::{ChannelState, SignalingChannel, websocket_url};
use huddle_core::{
    ClientEvent, IceCandidate, IceEnvelope, OutgoingChat, SessionDescription, SessionEnvelope,
};
use serde_json::json;

use crate::integration::{fast_channel, identity, init_tracing};
use crate::utils::{EVENT_TIMEOUT_MS, TestServer, eventually};

#[tokio::test]
async fn test_join_room_is_first_frame_on_open() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let identity = identity("r1", "u1");
    let url = websocket_url(&server.base_url(), &identity).unwrap();

    let (handle, _events) = SignalingChannel::connect(url, identity.clone(), fast_channel());

    // Queued before the transport is up.
    handle.send(ClientEvent::SendMessage(OutgoingChat {
        room: "r1".into(),
        message: "early".into(),
        user_id: "u1".into(),
        user_name: "u1-name".into(),
    }));
    handle.emit("custom_event", json!({ "n": 1 }));

    assert!(handle.wait_for_state(ChannelState::Open).await);
    assert!(server.wait_for_frames("custom_event", 1, EVENT_TIMEOUT_MS).await);

    let received = server.received();
    let events: Vec<&str> = received.iter().map(|r| r.frame.event.as_str()).collect();
    assert_eq!(events, vec!["join_room", "send_message", "custom_event"]);

    let join = &received[0].frame.data;
    assert_eq!(join["room"], "r1");
    assert_eq!(join["user_id"], "u1");
    assert_eq!(join["user_name"], "u1-name");
    assert_eq!(join["is_interviewer"], false);

    let query = &server.queries()[0];
    assert!(query.contains("room=r1"));
    assert!(query.contains("user_id=u1"));

    handle.close();
    assert!(handle.wait_for_state(ChannelState::Closed).await);
}

#[tokio::test]
async fn test_outbound_buffer_drops_oldest() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    server.set_accepting(false);

    let identity = identity("r1", "u1");
    let url = websocket_url(&server.base_url(), &identity).unwrap();
    let mut config = fast_channel();
    config.outbound_buffer = 2;
    config.reconnect_attempts = 100;

    let (handle, _events) = SignalingChannel::connect(url, identity, config);

    for n in 0..5 {
        handle.emit("tick", json!({ "n": n }));
    }
    // Let the driver drain the commands into its backlog.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    server.set_accepting(true);

    assert!(server.wait_for_frames("tick", 2, EVENT_TIMEOUT_MS).await);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let ticks: Vec<i64> = server
        .frames_named("tick")
        .iter()
        .map(|r| r.frame.data["n"].as_i64().unwrap())
        .collect();
    assert_eq!(ticks, vec![3, 4]);

    handle.close();
}

#[tokio::test]
async fn test_negotiation_frames_are_not_replayed_after_reconnect() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let identity = identity("r1", "u1");
    let url = websocket_url(&server.base_url(), &identity).unwrap();
    let mut config = fast_channel();
    config.reconnect_attempts = 100;

    let (handle, _events) = SignalingChannel::connect(url, identity, config);
    assert!(handle.wait_for_state(ChannelState::Open).await);
    assert!(server.wait_for_frames("join_room", 1, EVENT_TIMEOUT_MS).await);

    server.set_accepting(false);
    server.drop_connections();
    assert!(eventually(EVENT_TIMEOUT_MS, || handle.state() != ChannelState::Open).await);

    handle.send(ClientEvent::Offer(SessionEnvelope {
        room: "r1".into(),
        from: Some("u1".into()),
        to: Some("u2".into()),
        description: SessionDescription::offer("stale-offer"),
    }));
    handle.send(ClientEvent::IceCandidate(IceEnvelope {
        room: "r1".into(),
        from: Some("u1".into()),
        to: Some("u2".into()),
        candidate: IceCandidate::new("stale-cand"),
    }));
    handle.emit("answer", json!({ "room": "r1" }));
    handle.send(ClientEvent::SendMessage(OutgoingChat {
        room: "r1".into(),
        message: "still here".into(),
        user_id: "u1".into(),
        user_name: "u1-name".into(),
    }));

    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    server.set_accepting(true);

    assert!(server.wait_for_frames("send_message", 1, EVENT_TIMEOUT_MS).await);
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let events: Vec<String> = server
        .received()
        .iter()
        .filter(|r| r.connection == 1)
        .map(|r| r.frame.event.clone())
        .collect();
    assert_eq!(events, vec!["join_room", "send_message"]);
    assert!(server.frames_named("offer").is_empty());
    assert!(server.frames_named("ice_candidate").is_empty());
    assert!(server.frames_named("answer").is_empty());

    handle.close();
}
