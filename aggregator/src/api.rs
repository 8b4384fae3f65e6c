use crate::config::Config;
use crate::errors::ApiError;
use crate::pipeline::Aggregator;
use crate::types::{EnrichedGamepass, ExperienceRef};
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Binds the listener from the config and serves the API until the process
/// stops.
pub async fn serve(config: Config) -> Result<(), ApiError> {
    let addr = format!("{}:{}", config.listener.host, config.listener.port);
    let aggregator = Aggregator::new(config)
        .map_err(|err| std::io::Error::other(format!("failed to build upstream client: {err}")))?;

    let app = router(Arc::new(aggregator));
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(aggregator: Arc<Aggregator>) -> Router {
    Router::new()
        .route("/", get(service_index))
        .route("/api/user/{user_id}/gamepasses", get(user_gamepasses))
        .route("/api/gamepasses/{universe_id}", get(universe_gamepasses))
        .route("/test/{user_id}", get(probe_experiences))
        .with_state(aggregator)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserGamepassesResponse {
    success: bool,
    gamepasses: Vec<EnrichedGamepass>,
    count: usize,
    games_count: usize,
    games_with_gamepasses: usize,
    games_analyzed: usize,
    truncated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    truncation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for UserGamepassesResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

async fn user_gamepasses(
    State(aggregator): State<Arc<Aggregator>>,
    Path(user_id): Path<String>,
) -> Result<UserGamepassesResponse, ApiError> {
    let user_id = parse_id(&user_id)?;

    tracing::info!(user_id, "aggregating gamepasses across user experiences");
    let result = aggregator.aggregate_user_gamepasses(user_id).await;

    let message = (result.games_count == 0)
        .then(|| "this user has no public experiences".to_string());

    Ok(UserGamepassesResponse {
        success: true,
        count: result.gamepasses.len(),
        gamepasses: result.gamepasses,
        games_count: result.games_count,
        games_with_gamepasses: result.games_with_gamepasses,
        games_analyzed: result.games_analyzed,
        truncated: result.truncated,
        truncation_reason: result.truncation_reason,
        message,
    })
}

#[derive(Serialize)]
struct UniverseGamepassesResponse {
    success: bool,
    gamepasses: Vec<EnrichedGamepass>,
    count: usize,
}

impl IntoResponse for UniverseGamepassesResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

async fn universe_gamepasses(
    State(aggregator): State<Arc<Aggregator>>,
    Path(universe_id): Path<String>,
) -> Result<UniverseGamepassesResponse, ApiError> {
    let universe_id = parse_id(&universe_id)?;

    tracing::info!(universe_id, "listing gamepasses for universe");
    let gamepasses = aggregator.aggregate_universe_gamepasses(universe_id).await;

    Ok(UniverseGamepassesResponse {
        success: true,
        count: gamepasses.len(),
        gamepasses,
    })
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeResponse {
    success: bool,
    user_id: u64,
    total_games: usize,
    truncated: bool,
    games: Vec<ExperienceRef>,
}

impl IntoResponse for ProbeResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Diagnostic: lists the discovered experiences without touching the
/// gamepass or detail resources.
async fn probe_experiences(
    State(aggregator): State<Arc<Aggregator>>,
    Path(user_id): Path<String>,
) -> Result<ProbeResponse, ApiError> {
    let user_id = parse_id(&user_id)?;
    let (games, aborted) = aggregator.list_experiences(user_id).await;

    Ok(ProbeResponse {
        success: true,
        user_id,
        total_games: games.len(),
        truncated: aborted,
        games,
    })
}

async fn service_index() -> Response {
    let body = json!({
        "name": "gamepass aggregation service",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "online",
        "endpoints": {
            "userGamepasses": {
                "url": "/api/user/{userId}/gamepasses",
                "method": "GET",
                "description": "All gamepasses across the user's public experiences",
            },
            "universeGamepasses": {
                "url": "/api/gamepasses/{universeId}",
                "method": "GET",
                "description": "Gamepasses of a single experience",
            },
            "probe": {
                "url": "/test/{userId}",
                "method": "GET",
                "description": "Discovered experiences, without enrichment",
            },
        },
    });

    (StatusCode::OK, Json(body)).into_response()
}

/// Upstream identifiers are numeric. A non-numeric path segment would have
/// been sent upstream and failed there; reject it at the edge instead, with
/// the same error shape callers get for any other failure.
fn parse_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse::<u64>()
        .map_err(|_| ApiError::InvalidIdentifier(raw.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{mount_listing, mount_product_info, test_aggregator};
    use serde_json::Value;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    // Serve the router on an ephemeral port and return its base URL.
    async fn start_api(upstream: &MockServer) -> String {
        let aggregator = Arc::new(test_aggregator(&upstream.uri()));
        let app = router(aggregator);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        format!("http://{addr}")
    }

    async fn get_json(url: &str) -> (u16, Value) {
        let response = reqwest::get(url).await.unwrap();
        let status = response.status().as_u16();
        (status, response.json::<Value>().await.unwrap())
    }

    #[tokio::test]
    async fn test_user_endpoint_aggregates() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/10/games"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": [{"id": 11, "name": "Shop", "rootPlace": {"id": 110}}], "nextPageCursor": null}"#,
            ))
            .mount(&upstream)
            .await;
        mount_listing(&upstream, 11, &[(12, "VIP")]).await;
        mount_product_info(&upstream, 12, 100, true).await;

        let api = start_api(&upstream).await;
        let (status, body) = get_json(&format!("{api}/api/user/10/gamepasses")).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 1);
        assert_eq!(body["gamesCount"], 1);
        assert_eq!(body["gamesWithGamepasses"], 1);
        assert_eq!(body["gamesAnalyzed"], 1);
        assert_eq!(body["truncated"], false);
        assert_eq!(body["gamepasses"][0]["priceInRobux"], 100);
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn test_user_endpoint_no_experiences_sets_message() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/10/games"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"data": [], "nextPageCursor": null}"#),
            )
            .mount(&upstream)
            .await;

        let api = start_api(&upstream).await;
        let (status, body) = get_json(&format!("{api}/api/user/10/gamepasses")).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);
        assert_eq!(body["gamesCount"], 0);
        assert_eq!(body["message"], "this user has no public experiences");
    }

    #[tokio::test]
    async fn test_universe_endpoint_listing_failures_are_empty_success() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&upstream)
            .await;

        let api = start_api(&upstream).await;
        let (status, body) = get_json(&format!("{api}/api/gamepasses/918484040462")).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["count"], 0);
        assert_eq!(body["gamepasses"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_invalid_identifier_returns_error_shape() {
        let upstream = MockServer::start().await;
        let api = start_api(&upstream).await;
        let (status, body) = get_json(&format!("{api}/api/user/not-a-number/gamepasses")).await;

        assert_eq!(status, 500);
        assert_eq!(body["success"], false);
        assert_eq!(body["count"], 0);
        assert!(body["error"].as_str().unwrap().contains("not-a-number"));
    }

    #[tokio::test]
    async fn test_probe_endpoint_lists_without_enrichment() {
        let upstream = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/users/10/games"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"data": [{"id": 11, "name": "Shop", "rootPlace": {"id": 110}}], "nextPageCursor": null}"#,
            ))
            .expect(1)
            .mount(&upstream)
            .await;

        let api = start_api(&upstream).await;
        let (status, body) = get_json(&format!("{api}/test/10")).await;

        assert_eq!(status, 200);
        assert_eq!(body["success"], true);
        assert_eq!(body["userId"], 10);
        assert_eq!(body["totalGames"], 1);
        assert_eq!(body["games"][0]["universeId"], 11);
        assert_eq!(body["games"][0]["placeId"], 110);
        assert_eq!(body["games"][0]["name"], "Shop");
    }

    #[tokio::test]
    async fn test_service_index() {
        let upstream = MockServer::start().await;
        let api = start_api(&upstream).await;
        let (status, body) = get_json(&api).await;

        assert_eq!(status, 200);
        assert_eq!(body["status"], "online");
        assert!(body["endpoints"]["userGamepasses"]["url"]
            .as_str()
            .unwrap()
            .contains("/api/user/"));
    }
}
