use serde::Serialize;
use url::Url;

pub type UniverseId = u64;
pub type GamePassId = u64;

/// One experience discovered from the user's public games listing.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceRef {
    pub universe_id: UniverseId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<u64>,
    pub name: String,
}

/// Raw gamepass listing entry, normalized from whichever listing variant
/// produced it. Field presence differs between variants, so missing fields
/// fall back to defaults during normalization.
#[derive(Clone, Debug, PartialEq)]
pub struct GamepassSummary {
    pub id: GamePassId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub icon_image_id: Option<u64>,
}

/// Price and sale status for one gamepass.
///
/// `known` records whether a details endpoint actually answered. The wire
/// shape stays price 0 / not for sale either way, matching the upstream
/// ambiguity between "free" and "details unavailable".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GamepassDetails {
    pub price: u64,
    pub is_for_sale: bool,
    pub known: bool,
}

impl GamepassDetails {
    pub fn unknown() -> Self {
        GamepassDetails {
            price: 0,
            is_for_sale: false,
            known: false,
        }
    }
}

/// Fully assembled record returned to API callers.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnrichedGamepass {
    pub id: GamePassId,
    pub name: String,
    pub display_name: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_image_id: Option<u64>,
    pub image: String,
    pub price: u64,
    pub price_in_robux: u64,
    pub is_for_sale: bool,
    pub game_id: UniverseId,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub game_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub place_id: Option<u64>,
}

impl EnrichedGamepass {
    pub fn assemble(
        summary: GamepassSummary,
        details: GamepassDetails,
        game_id: UniverseId,
        game_name: &str,
        place_id: Option<u64>,
        thumbnails: &Url,
    ) -> Self {
        let image = thumbnail_url(thumbnails, summary.id);
        EnrichedGamepass {
            id: summary.id,
            name: summary.name,
            display_name: summary.display_name,
            description: summary.description,
            icon_image_id: summary.icon_image_id,
            image,
            price: details.price,
            price_in_robux: details.price,
            is_for_sale: details.is_for_sale,
            game_id,
            game_name: game_name.to_string(),
            place_id,
        }
    }
}

/// Thumbnail URLs are derived from the gamepass id alone, no upstream call.
pub fn thumbnail_url(thumbnails: &Url, id: GamePassId) -> String {
    let base = thumbnails.as_str().trim_end_matches('/');
    format!("{base}/game-pass-thumbnail/image?width=150&height=150&gamePassId={id}")
}

/// Combined outcome of one aggregation run over a user's experiences.
#[derive(Clone, Debug, PartialEq)]
pub struct AggregationResult {
    pub gamepasses: Vec<EnrichedGamepass>,
    pub games_count: usize,
    pub games_with_gamepasses: usize,
    pub games_analyzed: usize,
    pub truncated: bool,
    pub truncation_reason: Option<String>,
}
