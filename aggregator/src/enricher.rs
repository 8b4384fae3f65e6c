use crate::client::UpstreamClient;
use crate::config::Upstreams;
use crate::counter;
use crate::errors::UpstreamError;
use crate::metrics_defs::{DETAIL_DEFAULTED, DETAIL_FALLBACK_HIT};
use crate::types::{GamePassId, GamepassDetails};
use serde::Deserialize;
use url::Url;

/// Ordered price/sale-status sources. The two endpoints return the same
/// information under different field casings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DetailSource {
    ProductInfo,
    EconomyAsset,
}

const DETAIL_SOURCES: &[DetailSource] = &[DetailSource::ProductInfo, DetailSource::EconomyAsset];

#[derive(Deserialize)]
struct ProductInfo {
    price: Option<u64>,
    #[serde(rename = "isForSale")]
    is_for_sale: Option<bool>,
}

#[derive(Deserialize)]
struct EconomyAsset {
    #[serde(rename = "PriceInRobux")]
    price_in_robux: Option<u64>,
    #[serde(rename = "IsForSale")]
    is_for_sale: Option<bool>,
}

/// Looks up price and sale status for individual gamepasses.
pub struct DetailEnricher<'a> {
    client: &'a UpstreamClient,
    upstreams: &'a Upstreams,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(client: &'a UpstreamClient, upstreams: &'a Upstreams) -> Self {
        DetailEnricher { client, upstreams }
    }

    /// Total: tries the product-info endpoint, then the economy asset
    /// endpoint, and substitutes the unknown record when both fail. Callers
    /// never see an error from this function.
    pub async fn get_details(&self, pass_id: GamePassId) -> GamepassDetails {
        for source in DETAIL_SOURCES {
            match self.try_source(*source, pass_id).await {
                Ok(details) => {
                    if *source == DetailSource::EconomyAsset {
                        counter!(DETAIL_FALLBACK_HIT).increment(1);
                    }
                    return details;
                }
                Err(err) => {
                    tracing::debug!(pass_id, source = ?source, "detail source failed: {err}");
                }
            }
        }

        tracing::warn!(pass_id, "no detail source answered, recording unknown price");
        counter!(DETAIL_DEFAULTED).increment(1);
        GamepassDetails::unknown()
    }

    async fn try_source(
        &self,
        source: DetailSource,
        pass_id: GamePassId,
    ) -> Result<GamepassDetails, UpstreamError> {
        // Single attempt per source, the other source is the retry.
        match source {
            DetailSource::ProductInfo => {
                let url = self.product_info_url(pass_id);
                let info: ProductInfo = self.client.get_json(&url).await?;
                Ok(GamepassDetails {
                    price: info.price.unwrap_or(0),
                    is_for_sale: info.is_for_sale.unwrap_or(false),
                    known: true,
                })
            }
            DetailSource::EconomyAsset => {
                let url = self.economy_asset_url(pass_id);
                let asset: EconomyAsset = self.client.get_json(&url).await?;
                Ok(GamepassDetails {
                    price: asset.price_in_robux.unwrap_or(0),
                    is_for_sale: asset.is_for_sale.unwrap_or(false),
                    known: true,
                })
            }
        }
    }

    fn product_info_url(&self, pass_id: GamePassId) -> Url {
        let mut url = self.upstreams.apis.clone();
        url.set_path(&format!("/game-passes/v1/game-passes/{pass_id}/product-info"));
        url
    }

    fn economy_asset_url(&self, pass_id: GamePassId) -> Url {
        let mut url = self.upstreams.economy.clone();
        url.set_path(&format!("/v2/assets/{pass_id}/details"));
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutils::{test_client, test_upstreams};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn details_for(server: &MockServer, pass_id: u64) -> GamepassDetails {
        let client = test_client();
        let upstreams = test_upstreams(&server.uri());
        DetailEnricher::new(&client, &upstreams)
            .get_details(pass_id)
            .await
    }

    #[tokio::test]
    async fn test_product_info_is_preferred() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game-passes/v1/game-passes/7/product-info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"price": 100, "isForSale": true}"#),
            )
            .mount(&server)
            .await;

        let details = details_for(&server, 7).await;
        assert_eq!(
            details,
            GamepassDetails {
                price: 100,
                is_for_sale: true,
                known: true
            }
        );
    }

    #[tokio::test]
    async fn test_economy_asset_fields_are_normalized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game-passes/v1/game-passes/7/product-info"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v2/assets/7/details"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"PriceInRobux": 250, "IsForSale": true}"#),
            )
            .mount(&server)
            .await;

        let details = details_for(&server, 7).await;
        assert_eq!(details.price, 250);
        assert!(details.is_for_sale);
        assert!(details.known);
    }

    #[tokio::test]
    async fn test_both_sources_failing_yields_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let details = details_for(&server, 7).await;
        assert_eq!(details, GamepassDetails::unknown());
        assert!(!details.known);
    }

    #[tokio::test]
    async fn test_null_price_reads_as_zero_but_known() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/game-passes/v1/game-passes/7/product-info"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"price": null, "isForSale": false}"#),
            )
            .mount(&server)
            .await;

        let details = details_for(&server, 7).await;
        assert_eq!(details.price, 0);
        assert!(!details.is_for_sale);
        assert!(details.known);
    }
}
