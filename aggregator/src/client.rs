use crate::errors::UpstreamError;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::sleep;
use url::Url;

const USER_AGENT: &str = concat!("gamepassd/", env!("CARGO_PKG_VERSION"));

/// Thin GET client over the upstream platform hosts.
///
/// Two calling modes, deliberately kept separate: `get_json` makes one
/// bounded attempt and is what fallback chains compose, so fallback and
/// retry never nest; `get_json_with_retry` wraps it in a linear-backoff
/// loop for callers with no alternate resource to fall through to.
pub struct UpstreamClient {
    client: reqwest::Client,
    retry_base: Duration,
}

impl UpstreamClient {
    pub fn new(timeout: Duration, retry_base: Duration) -> Result<Self, UpstreamError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .build()?;

        Ok(UpstreamClient { client, retry_base })
    }

    /// Single bounded attempt: the request timeout is the only protection.
    pub async fn get_json<T: DeserializeOwned>(&self, url: &Url) -> Result<T, UpstreamError> {
        let response = self.client.get(url.clone()).send().await?;

        if !response.status().is_success() {
            return Err(UpstreamError::Status {
                url: url.to_string(),
                status: response.status(),
            });
        }

        Ok(response.json::<T>().await?)
    }

    /// Retries up to `max_attempts` with a linear backoff between attempts:
    /// delay = attempt index x retry base. The final attempt's error
    /// propagates unchanged. Every failure is retried the same way, there is
    /// no retryable/non-retryable distinction on this upstream.
    pub async fn get_json_with_retry<T: DeserializeOwned>(
        &self,
        url: &Url,
        max_attempts: u32,
    ) -> Result<T, UpstreamError> {
        let mut attempt = 0;

        loop {
            match self.get_json(url).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt >= max_attempts.max(1) {
                        return Err(err);
                    }
                    tracing::debug!(%url, attempt, "retrying upstream request after: {err}");
                    sleep(self.retry_base * attempt).await;
                }
            }
        }
    }
}
