use huddle_core::{
    ClientEvent, IceCandidate, IceEnvelope, ServerEvent, SessionDescription, SessionEnvelope,
};

use crate::integration::{init_tracing, start_relay};
use crate::utils::TestPeer;

#[tokio::test]
async fn test_addressed_offer_reaches_only_its_target() {
    init_tracing();

    let (addr, _service) = start_relay().await;

    let mut a = TestPeer::join(addr, "r1", "u1").await.unwrap();
    let mut b = TestPeer::join(addr, "r1", "u2").await.unwrap();
    let mut c = TestPeer::join(addr, "r1", "u3").await.unwrap();
    a.recv().await.unwrap();
    a.recv().await.unwrap();
    b.recv().await.unwrap();

    a.send(&ClientEvent::Offer(SessionEnvelope {
        room: "r1".into(),
        from: None,
        to: Some("u2".into()),
        description: SessionDescription::offer("v=0"),
    }))
    .await
    .unwrap();

    let ServerEvent::Offer(offer) = b.recv().await.unwrap() else {
        panic!("expected offer");
    };
    assert_eq!(offer.from.as_ref().map(|f| f.as_str()), Some("u1"));
    assert_eq!(offer.description, SessionDescription::offer("v=0"));
    assert!(c.expect_silence(200).await);

    b.send(&ClientEvent::Answer(SessionEnvelope {
        room: "r1".into(),
        from: None,
        to: Some("u1".into()),
        description: SessionDescription::answer("v=0"),
    }))
    .await
    .unwrap();

    let ServerEvent::Answer(answer) = a.recv().await.unwrap() else {
        panic!("expected answer");
    };
    assert_eq!(answer.from.as_ref().map(|f| f.as_str()), Some("u2"));
}

#[tokio::test]
async fn test_unaddressed_candidate_is_broadcast_to_others() {
    init_tracing();

    let (addr, _service) = start_relay().await;

    let mut a = TestPeer::join(addr, "r1", "u1").await.unwrap();
    let mut b = TestPeer::join(addr, "r1", "u2").await.unwrap();
    let mut c = TestPeer::join(addr, "r1", "u3").await.unwrap();
    a.recv().await.unwrap();
    a.recv().await.unwrap();
    b.recv().await.unwrap();

    a.send(&ClientEvent::IceCandidate(IceEnvelope {
        room: "r1".into(),
        from: None,
        to: None,
        candidate: IceCandidate::new("candidate:1 1 udp 1 127.0.0.1 5000 typ host"),
    }))
    .await
    .unwrap();

    for peer in [&mut b, &mut c] {
        let ServerEvent::IceCandidate(ice) = peer.recv().await.unwrap() else {
            panic!("expected ice_candidate");
        };
        assert_eq!(ice.from.as_ref().map(|f| f.as_str()), Some("u1"));
    }
    assert!(a.expect_silence(200).await);
}
