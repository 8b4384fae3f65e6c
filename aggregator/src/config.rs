use serde::Deserialize;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Experience cap cannot be 0")]
    ZeroExperienceCap,

    #[error("Request timeout cannot be 0")]
    ZeroTimeout,

    #[error("Attempt budget cannot be 0")]
    ZeroAttempts,
}

/// Aggregation service configuration
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for incoming API requests
    #[serde(default)]
    pub listener: Listener,
    /// Base URLs of the upstream platform resources
    #[serde(default)]
    pub upstreams: Upstreams,
    /// Minimum intervals between consecutive upstream calls
    #[serde(default)]
    pub pacing: Pacing,
    /// Bounds on upstream traffic per aggregation run
    #[serde(default)]
    pub limits: Limits,
}

impl Config {
    /// Validates the service configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.listener.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        self.limits.validate()
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 3000,
        }
    }
}

/// Base URLs of the upstream resources composed by the pipeline
///
/// Note: Uses the `url::Url` type for compile-time URL validation.
/// Invalid URLs will be rejected during config deserialization.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Upstreams {
    /// Experience listing and primary gamepass listing host
    #[serde(default = "default_games")]
    pub games: Url,
    /// Alternate host serving the same gamepass listing resource
    #[serde(default = "default_games_alternate")]
    pub games_alternate: Url,
    /// Gamepass product-info host
    #[serde(default = "default_apis")]
    pub apis: Url,
    /// Economy asset details host, also the secondary price source
    #[serde(default = "default_economy")]
    pub economy: Url,
    /// Catalog keyword search host
    #[serde(default = "default_catalog")]
    pub catalog: Url,
    /// CDN host for derived thumbnail URLs
    #[serde(default = "default_thumbnails")]
    pub thumbnails: Url,
}

// Literal URLs, parse cannot fail.
fn default_games() -> Url {
    Url::parse("https://games.roproxy.com").expect("valid literal")
}

fn default_games_alternate() -> Url {
    Url::parse("https://games.roblox.com").expect("valid literal")
}

fn default_apis() -> Url {
    Url::parse("https://apis.roproxy.com").expect("valid literal")
}

fn default_economy() -> Url {
    Url::parse("https://economy.roproxy.com").expect("valid literal")
}

fn default_catalog() -> Url {
    Url::parse("https://catalog.roproxy.com").expect("valid literal")
}

fn default_thumbnails() -> Url {
    Url::parse("https://tr.rbxcdn.com").expect("valid literal")
}

impl Default for Upstreams {
    fn default() -> Self {
        Upstreams {
            games: default_games(),
            games_alternate: default_games_alternate(),
            apis: default_apis(),
            economy: default_economy(),
            catalog: default_catalog(),
            thumbnails: default_thumbnails(),
        }
    }
}

/// Minimum inter-call intervals, in milliseconds. The upstream publishes no
/// rate limits, so spacing calls out is the only available protection.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct Pacing {
    #[serde(default = "default_page_interval")]
    pub page_interval_ms: u64,
    #[serde(default = "default_experience_interval")]
    pub experience_interval_ms: u64,
    #[serde(default = "default_detail_interval")]
    pub detail_interval_ms: u64,
}

fn default_page_interval() -> u64 {
    300
}

fn default_experience_interval() -> u64 {
    200
}

fn default_detail_interval() -> u64 {
    100
}

impl Default for Pacing {
    fn default() -> Self {
        Pacing {
            page_interval_ms: default_page_interval(),
            experience_interval_ms: default_experience_interval(),
            detail_interval_ms: default_detail_interval(),
        }
    }
}

/// Bounds on upstream traffic per aggregation run
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct Limits {
    /// Hard cap on experiences analyzed per run, to bound request latency
    #[serde(default = "default_max_experiences")]
    pub max_experiences: usize,
    /// Per-request timeout applied to every upstream call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Attempt budget for retried requests
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Base delay of the linear retry backoff
    #[serde(default = "default_retry_base")]
    pub retry_base_ms: u64,
}

fn default_max_experiences() -> usize {
    20
}

fn default_request_timeout() -> u64 {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_base() -> u64 {
    1000
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_experiences: default_max_experiences(),
            request_timeout_secs: default_request_timeout(),
            max_attempts: default_max_attempts(),
            retry_base_ms: default_retry_base(),
        }
    }
}

impl Limits {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.max_experiences == 0 {
            return Err(ValidationError::ZeroExperienceCap);
        }
        if self.request_timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout);
        }
        if self.max_attempts == 0 {
            return Err(ValidationError::ZeroAttempts);
        }
        Ok(())
    }
}
