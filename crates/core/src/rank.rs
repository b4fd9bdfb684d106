use crate::config::EngineConfig;
use crate::domain::recommendation::{
    quote_url, AssetMetrics, Candidate, CandidateKind, RecommendationStatus,
};
use crate::domain::universe::{self, Asset};

#[derive(Debug, Clone)]
pub struct RankingPolicy {
    pub top_n: usize,
    pub volatility_floor: f64,
    pub supplemental_age_threshold: u32,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for RankingPolicy {
    fn from(config: &EngineConfig) -> Self {
        Self {
            top_n: config.top_n,
            volatility_floor: config.volatility_floor,
            supplemental_age_threshold: config.supplemental_age_threshold,
        }
    }
}

impl RankingPolicy {
    pub fn includes_supplemental(&self, age_years: u32) -> bool {
        age_years >= self.supplemental_age_threshold
    }

    /// Reward-to-risk ratio; volatility below the floor is treated as the floor.
    pub fn score(&self, metrics: &AssetMetrics) -> f64 {
        metrics.percent_return / metrics.annualized_volatility_pct.max(self.volatility_floor)
    }
}

#[derive(Debug, Clone)]
pub struct RankInput {
    pub display_name: String,
    pub ticker: String,
    pub metrics: AssetMetrics,
}

impl RankInput {
    pub fn new(asset: Asset, metrics: AssetMetrics) -> Self {
        Self {
            display_name: asset.display_name.to_string(),
            ticker: asset.ticker.to_string(),
            metrics,
        }
    }
}

/// The fixed asset appended for older investors, with whichever metrics the caller resolved.
#[derive(Debug, Clone)]
pub struct SupplementalAsset {
    pub asset: Asset,
    pub note: &'static str,
    pub metrics: AssetMetrics,
}

impl SupplementalAsset {
    pub fn with_metrics(metrics: AssetMetrics) -> Self {
        Self {
            asset: universe::SUPPLEMENTAL_ASSET,
            note: universe::SUPPLEMENTAL_NOTE,
            metrics,
        }
    }
}

impl Default for SupplementalAsset {
    fn default() -> Self {
        Self::with_metrics(universe::SUPPLEMENTAL_REFERENCE_METRICS)
    }
}

#[derive(Debug, Clone)]
pub struct Ranking {
    pub status: RecommendationStatus,
    pub items: Vec<Candidate>,
}

/// Scores, sorts (stable, descending) and truncates candidates, then appends the supplemental
/// asset last when the investor's age reaches the threshold.
///
/// The supplemental entry is appended even when no candidate qualified; the status still reports
/// `NoResults` in that case.
pub fn rank(
    inputs: Vec<RankInput>,
    age_years: u32,
    supplemental: &SupplementalAsset,
    policy: &RankingPolicy,
) -> Ranking {
    let mut scored: Vec<(f64, RankInput)> = inputs
        .into_iter()
        .map(|input| (policy.score(&input.metrics), input))
        .collect();

    // sort_by is stable, so equal scores keep encounter order.
    scored.sort_by(|a, b| b.0.total_cmp(&a.0));
    scored.truncate(policy.top_n);

    let status = if scored.is_empty() {
        RecommendationStatus::NoResults
    } else {
        RecommendationStatus::Ranked
    };

    let mut items: Vec<Candidate> = scored
        .into_iter()
        .enumerate()
        .map(|(idx, (score, input))| Candidate {
            rank: Some(idx as u32 + 1),
            score,
            quote_url: quote_url(&input.ticker),
            display_name: input.display_name,
            ticker: input.ticker,
            metrics: input.metrics,
            kind: CandidateKind::Ranked,
            note: None,
        })
        .collect();

    if policy.includes_supplemental(age_years) {
        items.push(Candidate {
            rank: None,
            score: policy.score(&supplemental.metrics),
            display_name: supplemental.asset.display_name.to_string(),
            ticker: supplemental.asset.ticker.to_string(),
            metrics: supplemental.metrics,
            kind: CandidateKind::Supplemental,
            note: Some(supplemental.note.to_string()),
            quote_url: quote_url(supplemental.asset.ticker),
        });
    }

    Ranking { status, items }
}
