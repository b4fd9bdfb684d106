use crate::cache::MetricsCache;
use crate::config::EngineConfig;
use crate::domain::period::{self, Period};
use crate::domain::profile::UserProfile;
use crate::domain::recommendation::{Recommendation, RecommendationStatus};
use crate::domain::universe::{self, SUPPLEMENTAL_ASSET, SUPPLEMENTAL_REFERENCE_METRICS};
use crate::error::RecommendError;
use crate::market::MarketDataProvider;
use crate::metrics::MetricsFetcher;
use crate::rank::{self, RankInput, RankingPolicy, SupplementalAsset};
use futures::StreamExt;
use std::sync::Arc;
use uuid::Uuid;

/// Recommendation pipeline. Holds the shared metrics cache; construct once and share.
pub struct Advisor {
    cache: Arc<MetricsCache>,
    policy: RankingPolicy,
    fetch_concurrency: usize,
}

impl Advisor {
    pub fn new(cache: Arc<MetricsCache>, config: &EngineConfig) -> Self {
        Self {
            cache,
            policy: RankingPolicy::from(config),
            fetch_concurrency: config.fetch_concurrency.max(1),
        }
    }

    pub fn from_provider(provider: Arc<dyn MarketDataProvider>, config: &EngineConfig) -> Self {
        let fetcher = MetricsFetcher::new(provider, config);
        Self::new(Arc::new(MetricsCache::new(fetcher, config)), config)
    }

    pub fn cache(&self) -> &Arc<MetricsCache> {
        &self.cache
    }

    pub fn policy(&self) -> &RankingPolicy {
        &self.policy
    }

    pub async fn recommend(&self, profile: UserProfile) -> Result<Recommendation, RecommendError> {
        profile.validate()?;

        let request_id = Uuid::new_v4();
        let period = period::resolve(&profile.horizon);
        let universes = universe::select(profile.risk, &profile.horizon)?;
        let assets = universe::candidate_assets(&universes);
        let evaluated = assets.len();

        tracing::debug!(
            %request_id,
            %period,
            risk = profile.risk,
            age = profile.age,
            income_bracket = %profile.income_bracket,
            universes = ?universes,
            candidates = evaluated,
            "recommendation request"
        );

        // `buffered` keeps encounter order, which the ranking tie-break relies on.
        let cache = &self.cache;
        let candidates = futures::stream::iter(assets)
            .map(|asset| async move { (asset, cache.get_metrics(asset.ticker, period).await) })
            .buffered(self.fetch_concurrency)
            .collect::<Vec<_>>();
        let supplemental = async {
            if self.policy.includes_supplemental(profile.age) {
                self.supplemental_asset(period).await
            } else {
                SupplementalAsset::default()
            }
        };
        let (lookups, supplemental) = tokio::join!(candidates, supplemental);

        let mut inputs = Vec::with_capacity(lookups.len());
        let mut absent: usize = 0;
        for (asset, res) in lookups {
            match res {
                Ok(metrics) => inputs.push(RankInput::new(asset, metrics)),
                Err(err) => {
                    absent += 1;
                    tracing::debug!(
                        %request_id,
                        ticker = asset.ticker,
                        kind = err.kind(),
                        "candidate skipped; metrics absent"
                    );
                }
            }
        }

        let ranking = rank::rank(inputs, profile.age, &supplemental, &self.policy);

        if ranking.status == RecommendationStatus::NoResults {
            tracing::warn!(
                %request_id,
                %period,
                evaluated,
                absent,
                "no candidate produced metrics"
            );
        } else {
            tracing::info!(
                %request_id,
                %period,
                evaluated,
                absent,
                items = ranking.items.len(),
                "recommendation ranked"
            );
        }

        Ok(Recommendation {
            request_id,
            period,
            status: ranking.status,
            items: ranking.items,
            evaluated,
            absent,
        })
    }

    async fn supplemental_asset(&self, period: Period) -> SupplementalAsset {
        match self
            .cache
            .get_metrics(SUPPLEMENTAL_ASSET.ticker, period)
            .await
        {
            Ok(metrics) => SupplementalAsset::with_metrics(metrics),
            Err(err) => {
                tracing::debug!(
                    ticker = SUPPLEMENTAL_ASSET.ticker,
                    kind = err.kind(),
                    "using reference metrics for supplemental asset"
                );
                SupplementalAsset::with_metrics(SUPPLEMENTAL_REFERENCE_METRICS)
            }
        }
    }
}
