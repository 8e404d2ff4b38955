use std::time::Duration;

use huddle_client::{ChannelConfig, SessionConfig, SessionStatus};
use url::Url;

use super::create_test_session;
use crate::integration::{fast_channel, identity, init_tracing, session_config};
use crate::utils::{EVENT_TIMEOUT_MS, TestServer, eventually, unused_addr};

fn impatient(config: SessionConfig, max_restarts: Option<u32>) -> SessionConfig {
    SessionConfig {
        channel: ChannelConfig {
            reconnect_attempts: 2,
            reconnect_delay: Duration::from_millis(20),
            ..fast_channel()
        },
        restart_backoff: Duration::from_millis(100),
        max_restarts,
        ..config
    }
}

#[tokio::test]
async fn test_exhausted_restarts_end_in_failed() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let config = impatient(session_config(&server), Some(1));
    let (mut session, _connector, observer) = create_test_session(config);

    session.initialize(identity("r1", "u1")).await.unwrap();
    assert!(eventually(EVENT_TIMEOUT_MS, || session.membership().is_some()).await);

    server.set_accepting(false);
    server.drop_connections();

    assert!(eventually(EVENT_TIMEOUT_MS, || session.status() == SessionStatus::Failed).await);
    assert!(observer.saw_status(SessionStatus::Restarting { attempt: 1 }));
    // One retry notice, one final notice.
    assert_eq!(observer.notice_count(), 2);
    assert!(session.channel().is_none());

    // Terminal: no further restarts happen.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(session.status(), SessionStatus::Failed);
    assert!(session.renegotiate("u2".into()).is_err());

    session.shutdown().await;
    assert_eq!(session.status(), SessionStatus::Stopped);
}

#[tokio::test]
async fn test_restart_recovers_when_relay_returns() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let config = impatient(session_config(&server), Some(5));
    let (mut session, _connector, observer) = create_test_session(config);

    session.initialize(identity("r1", "u1")).await.unwrap();
    assert!(eventually(EVENT_TIMEOUT_MS, || session.membership().is_some()).await);

    server.set_accepting(false);
    server.drop_connections();

    assert!(eventually(EVENT_TIMEOUT_MS, || observer.notice_count() >= 1).await);
    server.set_accepting(true);

    assert!(eventually(EVENT_TIMEOUT_MS, || session.status() == SessionStatus::Connected).await);
    assert!(session.membership().is_some());
    assert!(
        observer
            .statuses
            .lock()
            .unwrap()
            .iter()
            .any(|s| matches!(s, SessionStatus::Restarting { .. }))
    );

    session.shutdown().await;
}

#[tokio::test]
async fn test_unreachable_relay_surfaces_notice() {
    init_tracing();

    let dead = Url::parse(&format!("http://{}/", unused_addr().await)).unwrap();
    let config = impatient(
        SessionConfig {
            endpoints: vec![dead],
            probe_timeout: Duration::from_millis(100),
            ..SessionConfig::default()
        },
        Some(0),
    );
    let (mut session, _connector, observer) = create_test_session(config);

    session.initialize(identity("r1", "u1")).await.unwrap();

    assert!(eventually(EVENT_TIMEOUT_MS, || session.status() == SessionStatus::Failed).await);
    assert_eq!(observer.notice_count(), 1);
    assert!(session.membership().is_none());
}

#[tokio::test]
async fn test_shutdown_during_backoff_stops_cleanly() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let config = SessionConfig {
        restart_backoff: Duration::from_secs(30),
        ..impatient(session_config(&server), None)
    };
    let (mut session, _connector, observer) = create_test_session(config);

    session.initialize(identity("r1", "u1")).await.unwrap();
    assert!(eventually(EVENT_TIMEOUT_MS, || session.membership().is_some()).await);

    server.set_accepting(false);
    server.drop_connections();
    assert!(eventually(EVENT_TIMEOUT_MS, || observer.notice_count() == 1).await);

    tokio::time::timeout(Duration::from_secs(2), session.shutdown())
        .await
        .unwrap();
    assert_eq!(session.status(), SessionStatus::Stopped);
}
