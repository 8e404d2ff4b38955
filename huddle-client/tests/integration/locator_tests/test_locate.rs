use std::time::Duration;

use huddle_client::TransportLocator;
use url::Url;

use crate::integration::init_tracing;
use crate::utils::{TestServer, unused_addr};

async fn dead_url() -> Url {
    Url::parse(&format!("http://{}/", unused_addr().await)).unwrap()
}

#[tokio::test]
async fn test_first_live_candidate_wins() {
    init_tracing();

    let server = TestServer::start().await.unwrap();
    let dead = dead_url().await;

    let locator = TransportLocator::new(
        vec![dead, server.base_url()],
        Duration::from_millis(500),
    );

    assert_eq!(locator.locate().await, Some(server.base_url()));
}

#[tokio::test]
async fn test_falls_back_to_primary_when_nothing_answers() {
    init_tracing();

    let first = dead_url().await;
    let second = dead_url().await;

    let locator = TransportLocator::new(
        vec![first.clone(), second],
        Duration::from_millis(200),
    );

    assert_eq!(locator.locate().await, Some(first));
}

#[tokio::test]
async fn test_no_candidates_locates_nothing() {
    let locator = TransportLocator::new(Vec::new(), Duration::from_millis(200));
    assert_eq!(locator.locate().await, None);
}

#[tokio::test]
async fn test_page_candidates_feed_the_locator() {
    let page = Url::parse("https://interviews.example.com/room/7").unwrap();
    let locator = TransportLocator::for_page(&page, 5002, Duration::from_millis(200));

    assert_eq!(locator.candidates().len(), 3);
    assert_eq!(locator.candidates()[2].as_str(), "http://localhost:5002/");
}
