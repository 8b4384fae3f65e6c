use crate::client::UpstreamClient;
use crate::counter;
use crate::metrics_defs::{PAGES_FETCHED, PAGINATION_ABORTED};
use crate::pacing::Pacer;
use crate::types::ExperienceRef;
use serde::Deserialize;
use url::Url;

#[derive(Deserialize)]
struct GamesPage {
    // A response without a data array means no public games, not a failure.
    #[serde(default)]
    data: Vec<GameRecord>,
    #[serde(rename = "nextPageCursor")]
    next_page_cursor: Option<String>,
}

#[derive(Deserialize)]
struct GameRecord {
    id: u64,
    name: String,
    #[serde(rename = "rootPlace")]
    root_place: Option<RootPlace>,
}

#[derive(Deserialize)]
struct RootPlace {
    id: u64,
}

/// Walks the cursor-paginated public experience listing for one user.
pub struct Paginator<'a> {
    client: &'a UpstreamClient,
    games: &'a Url,
    max_attempts: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(client: &'a UpstreamClient, games: &'a Url, max_attempts: u32) -> Self {
        Paginator {
            client,
            games,
            max_attempts,
        }
    }

    /// Accumulates every page's items in encounter order, following the
    /// opaque continuation cursor until the upstream stops returning one.
    ///
    /// A page failure ends the loop rather than failing it: whatever was
    /// accumulated so far is returned, and the second element reports that
    /// the listing was cut short so callers can flag the truncation.
    pub async fn list_all_experiences(
        &self,
        user_id: u64,
        pacer: &mut Pacer,
    ) -> (Vec<ExperienceRef>, bool) {
        let mut experiences = Vec::new();
        let mut next_cursor: Option<String> = None;

        loop {
            let url = self.page_url(user_id, next_cursor.as_deref());

            let page: GamesPage = match self
                .client
                .get_json_with_retry(&url, self.max_attempts)
                .await
            {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(user_id, "experience listing aborted: {err}");
                    counter!(PAGINATION_ABORTED).increment(1);
                    return (experiences, true);
                }
            };

            counter!(PAGES_FETCHED).increment(1);

            for record in page.data {
                experiences.push(ExperienceRef {
                    universe_id: record.id,
                    place_id: record.root_place.map(|place| place.id),
                    name: record.name,
                });
            }

            next_cursor = page.next_page_cursor.filter(|cursor| !cursor.is_empty());
            if next_cursor.is_none() {
                break;
            }

            pacer.wait().await;
        }

        (experiences, false)
    }

    fn page_url(&self, user_id: u64, cursor: Option<&str>) -> Url {
        let mut url = self.games.clone();
        url.set_path(&format!("/v2/users/{user_id}/games"));
        url.query_pairs_mut()
            .append_pair("accessFilter", "Public")
            .append_pair("limit", "50")
            .append_pair("sortOrder", "Asc");

        if let Some(cursor) = cursor {
            url.query_pairs_mut().append_pair("cursor", cursor);
        }

        url
    }
}
