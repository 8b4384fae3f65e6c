//! Helpers shared by the unit tests. Everything points at a wiremock server
//! with pacing and backoff collapsed so the suites stay fast.

use crate::client::UpstreamClient;
use crate::config::{Config, Limits, Pacing, Upstreams};
use crate::pipeline::Aggregator;
use serde_json::json;
use std::time::Duration;
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub fn test_client() -> UpstreamClient {
    UpstreamClient::new(Duration::from_secs(2), Duration::from_millis(1)).unwrap()
}

/// Every upstream host routed to the same mock server.
pub fn test_upstreams(mock_uri: &str) -> Upstreams {
    let base = Url::parse(mock_uri).unwrap();
    Upstreams {
        games: base.clone(),
        games_alternate: base.clone(),
        apis: base.clone(),
        economy: base.clone(),
        catalog: base.clone(),
        thumbnails: Url::parse("https://tr.rbxcdn.com").unwrap(),
    }
}

pub fn test_config(mock_uri: &str) -> Config {
    Config {
        listener: Default::default(),
        upstreams: test_upstreams(mock_uri),
        pacing: Pacing {
            page_interval_ms: 0,
            experience_interval_ms: 0,
            detail_interval_ms: 0,
        },
        limits: Limits {
            max_experiences: 20,
            request_timeout_secs: 2,
            max_attempts: 3,
            retry_base_ms: 1,
        },
    }
}

pub fn test_aggregator(mock_uri: &str) -> Aggregator {
    Aggregator::new(test_config(mock_uri)).unwrap()
}

/// Mounts a gamepass listing for one universe on the games resource.
pub async fn mount_listing(server: &MockServer, universe_id: u64, passes: &[(u64, &str)]) {
    let body = json!({
        "data": passes
            .iter()
            .map(|(id, name)| json!({"id": id, "name": name}))
            .collect::<Vec<_>>()
    });

    Mock::given(method("GET"))
        .and(path(format!("/v1/games/{universe_id}/game-passes")))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Mounts a product-info details response for one gamepass.
pub async fn mount_product_info(server: &MockServer, pass_id: u64, price: u64, for_sale: bool) {
    Mock::given(method("GET"))
        .and(path(format!(
            "/game-passes/v1/game-passes/{pass_id}/product-info"
        )))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"price": price, "isForSale": for_sale})),
        )
        .mount(server)
        .await;
}
