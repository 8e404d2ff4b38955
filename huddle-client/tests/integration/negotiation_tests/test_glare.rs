use huddle_client::NegotiationPhase;
use huddle_core::{IceCandidate, SessionDescription, UserId};

use crate::integration::{create_test_coordinator, init_tracing};
use crate::utils::{PeerCall, RecordingOutput, Sent};

#[tokio::test]
async fn test_polite_side_drops_its_offer_and_answers() {
    init_tracing();

    // "a" < "b", so "a" yields.
    let (mut coordinator, _peer_rx, connector, _observer) = create_test_coordinator("a");
    let output = RecordingOutput::new();
    let peer = UserId::from("b");

    coordinator.on_negotiation_needed(&peer, &output).await;
    let first = connector.latest_key("b").unwrap();

    coordinator
        .on_remote_offer(&peer, SessionDescription::offer("remote"), &output)
        .await;

    let connections = connector.connections_for("b");
    assert_eq!(connections.len(), 2, "superseded by a fresh connection");
    assert!(
        connector
            .calls()
            .contains(&(first.clone(), PeerCall::Close))
    );
    assert_eq!(output.offers_to("b").len(), 1);
    assert_eq!(output.answers_to("b").len(), 1);
    assert_eq!(coordinator.phase(&peer), Some(NegotiationPhase::Stable));
    assert!(coordinator.peer(&peer).unwrap().key().generation > first.generation);
}

#[tokio::test]
async fn test_impolite_side_keeps_its_offer() {
    init_tracing();

    let (mut coordinator, _peer_rx, connector, _observer) = create_test_coordinator("z");
    let output = RecordingOutput::new();
    let peer = UserId::from("b");

    coordinator.on_negotiation_needed(&peer, &output).await;
    coordinator
        .on_remote_offer(&peer, SessionDescription::offer("remote"), &output)
        .await;

    assert_eq!(connector.connections_for("b").len(), 1);
    assert!(output.answers_to("b").is_empty());
    assert_eq!(coordinator.phase(&peer), Some(NegotiationPhase::HaveLocalOffer));

    // Its own offer still completes normally.
    coordinator
        .on_remote_answer(&peer, SessionDescription::answer("remote-answer"), &output)
        .await;
    assert_eq!(coordinator.phase(&peer), Some(NegotiationPhase::Stable));
}

#[tokio::test]
async fn test_candidates_of_an_ignored_offer_are_dropped() {
    init_tracing();

    let (mut coordinator, _peer_rx, connector, _observer) = create_test_coordinator("z");
    let output = RecordingOutput::new();
    let peer = UserId::from("b");

    coordinator.on_negotiation_needed(&peer, &output).await;
    coordinator
        .on_remote_offer(&peer, SessionDescription::offer("remote"), &output)
        .await;
    assert!(coordinator.peer(&peer).unwrap().is_ignoring_offer());

    // Gathered by the remote for the offer we ignored.
    for c in ["stale-1", "stale-2"] {
        coordinator
            .on_remote_ice_candidate(&peer, IceCandidate::new(c))
            .await;
    }
    assert_eq!(coordinator.peer(&peer).unwrap().pending_candidates(), 0);

    coordinator
        .on_remote_answer(&peer, SessionDescription::answer("remote-answer"), &output)
        .await;
    coordinator
        .on_remote_ice_candidate(&peer, IceCandidate::new("fresh-1"))
        .await;

    assert_eq!(connector.applied_candidates("b"), vec!["fresh-1"]);
    assert!(!coordinator.peer(&peer).unwrap().is_ignoring_offer());
    assert_eq!(coordinator.phase(&peer), Some(NegotiationPhase::Stable));
    assert!(matches!(output.sent().as_slice(), [Sent::Offer { .. }]));
}
