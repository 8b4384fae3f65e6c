use crate::client::UpstreamClient;
use crate::config::Upstreams;
use crate::counter;
use crate::errors::UpstreamError;
use crate::metrics_defs::{RESOLVER_EXHAUSTED, RESOLVER_FALLBACK_HIT};
use crate::types::{ExperienceRef, GamepassSummary};
use serde_json::Value;
use url::Url;

/// One way of asking the platform for an experience's gamepasses. The
/// upstream is unversioned and unreliable, so several resource variants
/// cover for each other; the order of a variant slice is the fallback order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListingVariant {
    /// Gamepass listing keyed by universe id on the primary games host
    GamesApi,
    /// Same resource on the alternate games host
    GamesApiAlternate,
    /// Asset details of the root place, which nest a `GamePasses` array
    PlaceAssetDetails,
    /// Catalog keyword search on the experience name. Heuristic: matches by
    /// name string and may return unrelated items.
    CatalogSearch,
}

impl ListingVariant {
    /// Whether this variant can be attempted for the given experience.
    fn applies_to(&self, experience: &ExperienceRef) -> bool {
        match self {
            ListingVariant::PlaceAssetDetails => experience.place_id.is_some(),
            ListingVariant::CatalogSearch => !experience.name.is_empty(),
            _ => true,
        }
    }
}

/// Fallback order when aggregating a user's experiences.
pub const USER_EXPERIENCE_VARIANTS: &[ListingVariant] = &[
    ListingVariant::GamesApi,
    ListingVariant::GamesApiAlternate,
    ListingVariant::PlaceAssetDetails,
    ListingVariant::CatalogSearch,
];

/// Fallback order when only a universe id is known: no root place or name
/// to drive the remaining variants.
pub const UNIVERSE_VARIANTS: &[ListingVariant] =
    &[ListingVariant::GamesApi, ListingVariant::GamesApiAlternate];

/// Resolves an experience's gamepass listing through an ordered variant
/// slice, first non-empty result wins.
pub struct PassResolver<'a> {
    client: &'a UpstreamClient,
    upstreams: &'a Upstreams,
}

impl<'a> PassResolver<'a> {
    pub fn new(client: &'a UpstreamClient, upstreams: &'a Upstreams) -> Self {
        PassResolver { client, upstreams }
    }

    /// Applies the variants in order until one yields a non-empty listing.
    /// Variant failures are logged and fall through; exhausting the slice
    /// yields an empty vec, indistinguishable from an experience that
    /// genuinely has no gamepasses.
    pub async fn list_gamepasses(
        &self,
        variants: &[ListingVariant],
        experience: &ExperienceRef,
    ) -> Vec<GamepassSummary> {
        for (position, variant) in variants.iter().enumerate() {
            if !variant.applies_to(experience) {
                continue;
            }

            match self.try_variant(*variant, experience).await {
                Ok(passes) if !passes.is_empty() => {
                    if position > 0 {
                        counter!(RESOLVER_FALLBACK_HIT).increment(1);
                    }
                    tracing::debug!(
                        universe_id = experience.universe_id,
                        variant = ?variant,
                        count = passes.len(),
                        "gamepass listing resolved"
                    );
                    return dedupe_by_id(passes);
                }
                Ok(_) => {
                    tracing::debug!(
                        universe_id = experience.universe_id,
                        variant = ?variant,
                        "listing variant returned no gamepasses"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        universe_id = experience.universe_id,
                        variant = ?variant,
                        "listing variant failed: {err}"
                    );
                }
            }
        }

        counter!(RESOLVER_EXHAUSTED).increment(1);
        Vec::new()
    }

    async fn try_variant(
        &self,
        variant: ListingVariant,
        experience: &ExperienceRef,
    ) -> Result<Vec<GamepassSummary>, UpstreamError> {
        let url = self.variant_url(variant, experience)?;
        // Single attempt per variant: the next variant is the retry.
        let body: Value = self.client.get_json(&url).await?;

        let raw = match variant {
            ListingVariant::GamesApi
            | ListingVariant::GamesApiAlternate
            | ListingVariant::CatalogSearch => body.get("data").and_then(Value::as_array),
            ListingVariant::PlaceAssetDetails => body.get("GamePasses").and_then(Value::as_array),
        };

        Ok(raw
            .map(|entries| entries.iter().filter_map(summary_from_value).collect())
            .unwrap_or_default())
    }

    fn variant_url(
        &self,
        variant: ListingVariant,
        experience: &ExperienceRef,
    ) -> Result<Url, UpstreamError> {
        let url = match variant {
            ListingVariant::GamesApi => {
                listing_url(&self.upstreams.games, experience.universe_id)
            }
            ListingVariant::GamesApiAlternate => {
                listing_url(&self.upstreams.games_alternate, experience.universe_id)
            }
            ListingVariant::PlaceAssetDetails => {
                let place_id = experience.place_id.ok_or_else(|| {
                    UpstreamError::UnexpectedPayload("experience has no root place".into())
                })?;
                let mut url = self.upstreams.economy.clone();
                url.set_path(&format!("/v2/assets/{place_id}/details"));
                url
            }
            ListingVariant::CatalogSearch => {
                let mut url = self.upstreams.catalog.clone();
                url.set_path("/v1/search/items");
                url.query_pairs_mut()
                    .append_pair("category", "GamePass")
                    .append_pair("keyword", &experience.name)
                    .append_pair("limit", "30");
                url
            }
        };

        Ok(url)
    }
}

fn listing_url(base: &Url, universe_id: u64) -> Url {
    let mut url = base.clone();
    url.set_path(&format!("/v1/games/{universe_id}/game-passes"));
    url.query_pairs_mut()
        .append_pair("limit", "100")
        .append_pair("sortOrder", "Asc");
    url
}

/// Normalizes one raw listing entry. The variants disagree on casing and
/// field names, so each field is read from every spelling the upstream has
/// been seen to use; entries without a usable id are dropped.
fn summary_from_value(value: &Value) -> Option<GamepassSummary> {
    let id = ["id", "Id", "TargetId"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_u64))?;

    let name = ["name", "Name"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let display_name = value
        .get("displayName")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| name.clone());

    let description = ["description", "Description"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .unwrap_or_default()
        .to_string();

    let icon_image_id = ["iconImageId", "IconImageAssetId"]
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_u64));

    Some(GamepassSummary {
        id,
        name,
        display_name,
        description,
        icon_image_id,
    })
}

/// First occurrence wins; the catalog search variant in particular can list
/// the same pass more than once.
fn dedupe_by_id(passes: Vec<GamepassSummary>) -> Vec<GamepassSummary> {
    let mut seen = std::collections::HashSet::new();
    passes
        .into_iter()
        .filter(|pass| seen.insert(pass.id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{test_client, test_upstreams};
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn experience() -> ExperienceRef {
        ExperienceRef {
            universe_id: 42,
            place_id: Some(420),
            name: "Obby".to_string(),
        }
    }

    const LISTING: &str = r#"{
        "data": [
            {"id": 7, "name": "VIP", "displayName": "VIP Pass", "description": "perks", "iconImageId": 555}
        ]
    }"#;

    async fn resolve(server: &MockServer, variants: &[ListingVariant]) -> Vec<GamepassSummary> {
        let client = test_client();
        let upstreams = test_upstreams(&server.uri());
        PassResolver::new(&client, &upstreams)
            .list_gamepasses(variants, &experience())
            .await
    }

    #[tokio::test]
    async fn test_primary_variant_wins() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/games/42/game-passes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let passes = resolve(&server, USER_EXPERIENCE_VARIANTS).await;
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].id, 7);
        assert_eq!(passes[0].display_name, "VIP Pass");
        assert_eq!(passes[0].icon_image_id, Some(555));
    }

    #[tokio::test]
    async fn test_empty_primary_falls_through_to_place_details() {
        let server = MockServer::start().await;
        // Both games hosts point at the same mock server here, so one mock
        // covers the primary and alternate variants.
        Mock::given(method("GET"))
            .and(path("/v1/games/42/game-passes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": []}"#))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/assets/420/details"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Name": "Obby",
                "GamePasses": [
                    {"Id": 9, "Name": "Speed", "Description": "go fast"}
                ]
            })))
            .mount(&server)
            .await;

        let passes = resolve(&server, USER_EXPERIENCE_VARIANTS).await;
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].id, 9);
        assert_eq!(passes[0].name, "Speed");
        // displayName falls back to name when the variant does not carry one
        assert_eq!(passes[0].display_name, "Speed");
        assert_eq!(passes[0].description, "go fast");
    }

    #[tokio::test]
    async fn test_errors_fall_through_to_catalog_search() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/games/42/game-passes"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/assets/420/details"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/search/items"))
            .and(query_param("keyword", "Obby"))
            .respond_with(ResponseTemplate::new(200).set_body_string(LISTING))
            .mount(&server)
            .await;

        let passes = resolve(&server, USER_EXPERIENCE_VARIANTS).await;
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].id, 7);
    }

    #[tokio::test]
    async fn test_exhausted_variants_yield_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let passes = resolve(&server, USER_EXPERIENCE_VARIANTS).await;
        assert!(passes.is_empty());
    }

    #[tokio::test]
    async fn test_universe_variants_skip_place_and_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/games/42/game-passes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data": []}"#))
            .expect(2)
            .mount(&server)
            .await;

        let passes = resolve(&server, UNIVERSE_VARIANTS).await;
        assert!(passes.is_empty());
    }

    #[tokio::test]
    async fn test_winning_listing_is_deduplicated_by_id() {
        let server = MockServer::start().await;
        let body = r#"{
            "data": [
                {"id": 7, "name": "VIP"},
                {"id": 7, "name": "VIP again"},
                {"id": 8, "name": "Speed"}
            ]
        }"#;
        Mock::given(method("GET"))
            .and(path("/v1/games/42/game-passes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let passes = resolve(&server, USER_EXPERIENCE_VARIANTS).await;
        assert_eq!(passes.len(), 2);
        assert_eq!(passes[0].name, "VIP");
        assert_eq!(passes[1].id, 8);
    }

    #[tokio::test]
    async fn test_entries_without_an_id_are_dropped() {
        let server = MockServer::start().await;
        let body = r#"{"data": [{"name": "orphan"}, {"id": 3, "name": "kept"}]}"#;
        Mock::given(method("GET"))
            .and(path("/v1/games/42/game-passes"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let passes = resolve(&server, USER_EXPERIENCE_VARIANTS).await;
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].id, 3);
    }
}
