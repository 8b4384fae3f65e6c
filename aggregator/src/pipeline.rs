use crate::client::UpstreamClient;
use crate::config::Config;
use crate::enricher::DetailEnricher;
use crate::errors::UpstreamError;
use crate::histogram;
use crate::metrics_defs::{EXPERIENCES_PER_RUN, GAMEPASSES_PER_RUN, PIPELINE_DURATION};
use crate::pacing::Pacer;
use crate::paginator::Paginator;
use crate::resolver::{PassResolver, UNIVERSE_VARIANTS, USER_EXPERIENCE_VARIANTS};
use crate::types::{AggregationResult, EnrichedGamepass, ExperienceRef, UniverseId};
use std::time::Duration;
use tokio::time::Instant;

/// Drives the full fan-out: paginate the user's experiences, resolve each
/// experience's gamepass listing, enrich each gamepass with price details,
/// and merge everything into one best-effort result.
///
/// Every upstream call is issued sequentially. The only protections against
/// the upstream are the per-call timeout, the pacing intervals and the
/// experience cap; no failure below the top level aborts a run.
pub struct Aggregator {
    client: UpstreamClient,
    config: Config,
}

impl Aggregator {
    pub fn new(config: Config) -> Result<Self, UpstreamError> {
        let client = UpstreamClient::new(
            Duration::from_secs(config.limits.request_timeout_secs),
            Duration::from_millis(config.limits.retry_base_ms),
        )?;

        Ok(Aggregator { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Lists a user's public experiences without any enrichment. Backs the
    /// diagnostic endpoint.
    pub async fn list_experiences(&self, user_id: u64) -> (Vec<ExperienceRef>, bool) {
        let mut pacer = Pacer::from_millis(self.config.pacing.page_interval_ms);
        self.paginator().list_all_experiences(user_id, &mut pacer).await
    }

    /// Aggregates every gamepass across the user's experiences.
    pub async fn aggregate_user_gamepasses(&self, user_id: u64) -> AggregationResult {
        let started = Instant::now();
        let upstreams = &self.config.upstreams;

        let (experiences, listing_aborted) = self.list_experiences(user_id).await;
        let games_count = experiences.len();
        histogram!(EXPERIENCES_PER_RUN).record(games_count as f64);

        let cap = self.config.limits.max_experiences;
        let games_analyzed = games_count.min(cap);

        let resolver = PassResolver::new(&self.client, upstreams);
        let enricher = DetailEnricher::new(&self.client, upstreams);

        let mut gamepasses: Vec<EnrichedGamepass> = Vec::new();
        let mut games_with_gamepasses = 0;
        let mut experience_pacer = Pacer::from_millis(self.config.pacing.experience_interval_ms);

        for experience in experiences.iter().take(cap) {
            experience_pacer.wait().await;

            let passes = resolver
                .list_gamepasses(USER_EXPERIENCE_VARIANTS, experience)
                .await;
            if passes.is_empty() {
                continue;
            }
            games_with_gamepasses += 1;

            let mut detail_pacer = Pacer::from_millis(self.config.pacing.detail_interval_ms);
            for summary in passes {
                detail_pacer.wait().await;

                let details = enricher.get_details(summary.id).await;
                gamepasses.push(EnrichedGamepass::assemble(
                    summary,
                    details,
                    experience.universe_id,
                    &experience.name,
                    experience.place_id,
                    &upstreams.thumbnails,
                ));
            }
        }

        let truncation_reason = truncation_reason(listing_aborted, games_count, cap);

        tracing::info!(
            user_id,
            games_count,
            games_analyzed,
            games_with_gamepasses,
            count = gamepasses.len(),
            truncated = truncation_reason.is_some(),
            "aggregation run finished"
        );
        histogram!(GAMEPASSES_PER_RUN).record(gamepasses.len() as f64);
        histogram!(PIPELINE_DURATION).record(started.elapsed().as_secs_f64());

        AggregationResult {
            gamepasses,
            games_count,
            games_with_gamepasses,
            games_analyzed,
            truncated: truncation_reason.is_some(),
            truncation_reason,
        }
    }

    /// Resolves and enriches the gamepasses of a single universe. Only the
    /// universe id is known here, so the place and catalog variants do not
    /// participate. Resolver exhaustion is an empty success, not an error.
    pub async fn aggregate_universe_gamepasses(
        &self,
        universe_id: UniverseId,
    ) -> Vec<EnrichedGamepass> {
        let upstreams = &self.config.upstreams;
        let experience = ExperienceRef {
            universe_id,
            place_id: None,
            name: String::new(),
        };

        let resolver = PassResolver::new(&self.client, upstreams);
        let enricher = DetailEnricher::new(&self.client, upstreams);

        let passes = resolver
            .list_gamepasses(UNIVERSE_VARIANTS, &experience)
            .await;

        let mut gamepasses = Vec::new();
        let mut detail_pacer = Pacer::from_millis(self.config.pacing.detail_interval_ms);
        for summary in passes {
            detail_pacer.wait().await;

            let details = enricher.get_details(summary.id).await;
            gamepasses.push(EnrichedGamepass::assemble(
                summary,
                details,
                universe_id,
                "",
                None,
                &upstreams.thumbnails,
            ));
        }

        gamepasses
    }

    fn paginator(&self) -> Paginator<'_> {
        Paginator::new(
            &self.client,
            &self.config.upstreams.games,
            self.config.limits.max_attempts,
        )
    }
}

fn truncation_reason(listing_aborted: bool, games_count: usize, cap: usize) -> Option<String> {
    let mut reasons = Vec::new();

    if listing_aborted {
        reasons.push("experience listing cut short by an upstream failure".to_string());
    }
    if games_count > cap {
        reasons.push(format!("analysis capped at the first {cap} experiences"));
    }

    if reasons.is_empty() {
        None
    } else {
        Some(reasons.join("; "))
    }
}
