use std::time::Duration;

use huddle_client::{ChannelConfig, ChannelEvent, ChannelState, SignalingChannel, websocket_url};
use url::Url;

use crate::integration::{fast_channel, identity, init_tracing};
use crate::utils::{EVENT_TIMEOUT_MS, TestServer, unused_addr};

#[tokio::test]
async fn test_each_reopen_sends_exactly_one_join() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let identity = identity("r1", "u1");
    let url = websocket_url(&server.base_url(), &identity).unwrap();

    let (handle, mut events) = SignalingChannel::connect(url, identity, fast_channel());
    assert!(handle.wait_for_state(ChannelState::Open).await);
    // Open on our side does not mean the server has read the join yet.
    assert!(server.wait_for_frames("join_room", 1, EVENT_TIMEOUT_MS).await);

    for reopen in 2..=3 {
        server.drop_connections();
        assert!(server.wait_for_connections(reopen, EVENT_TIMEOUT_MS).await);
        assert!(server.wait_for_frames("join_room", reopen, EVENT_TIMEOUT_MS).await);
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let joins = server.frames_named("join_room");
    assert_eq!(joins.len(), 3);
    for (connection, join) in joins.iter().enumerate() {
        assert_eq!(join.connection, connection, "one join per connection");
        assert_eq!(join.frame.data, joins[0].frame.data, "same identity every time");
    }

    let mut opened = Vec::new();
    let mut closed = 0;
    while let Ok(event) = events.try_recv() {
        match event {
            ChannelEvent::Opened { connection } => opened.push(connection),
            ChannelEvent::Closed { .. } => closed += 1,
            _ => {}
        }
    }
    assert_eq!(opened.len(), 3);
    assert_eq!(closed, 2);
    assert_ne!(opened[0], opened[1], "a reconnect supersedes the connection");

    handle.close();
}

#[tokio::test]
async fn test_budget_exhaustion_reports_failure() {
    init_tracing();

    let base = Url::parse(&format!("http://{}/", unused_addr().await)).unwrap();
    let identity = identity("r1", "u1");
    let url = websocket_url(&base, &identity).unwrap();
    let config = ChannelConfig {
        reconnect_attempts: 2,
        reconnect_delay: Duration::from_millis(20),
        ..fast_channel()
    };

    let (handle, mut events) = SignalingChannel::connect(url, identity, config);

    let mut attempts = Vec::new();
    let failed = tokio::time::timeout(Duration::from_millis(EVENT_TIMEOUT_MS), async {
        while let Some(event) = events.recv().await {
            match event {
                ChannelEvent::ConnectError { attempt, .. } => attempts.push(attempt),
                ChannelEvent::Failed { attempts } => return Some(attempts),
                _ => {}
            }
        }
        None
    })
    .await
    .unwrap();

    assert_eq!(failed, Some(2));
    assert_eq!(attempts, vec![1, 2]);
    assert_eq!(handle.state(), ChannelState::Failed);
}

#[tokio::test]
async fn test_budget_resets_after_successful_open() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let identity = identity("r1", "u1");
    let url = websocket_url(&server.base_url(), &identity).unwrap();
    let config = ChannelConfig {
        reconnect_attempts: 2,
        ..fast_channel()
    };

    let (handle, mut events) = SignalingChannel::connect(url, identity, config);
    assert!(handle.wait_for_state(ChannelState::Open).await);

    // One failed attempt per outage stays under the budget every time.
    for outage in 0..3 {
        server.set_accepting(false);
        server.drop_connections();
        tokio::time::sleep(Duration::from_millis(60)).await;
        server.set_accepting(true);
        assert!(
            server
                .wait_for_connections(outage + 2, EVENT_TIMEOUT_MS)
                .await
        );
    }

    while let Ok(event) = events.try_recv() {
        assert!(!matches!(event, ChannelEvent::Failed { .. }));
    }
    handle.close();
}
