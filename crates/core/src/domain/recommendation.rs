use crate::domain::period::Period;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Return and risk derived from one (ticker, period) closing-price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetMetrics {
    pub percent_return: f64,
    pub annualized_volatility_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Ranked,
    Supplemental,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// 1-based position among ranked candidates; `None` for the supplemental entry.
    pub rank: Option<u32>,
    pub score: f64,
    pub display_name: String,
    pub ticker: String,
    pub metrics: AssetMetrics,
    pub kind: CandidateKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub quote_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStatus {
    Ranked,
    /// Every candidate in the selected universes resolved to absent data.
    NoResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub request_id: Uuid,
    pub period: Period,
    pub status: RecommendationStatus,
    pub items: Vec<Candidate>,

    /// Candidate tickers looked up for this request.
    pub evaluated: usize,
    /// Candidate tickers skipped because their metrics were absent.
    pub absent: usize,
}

impl Recommendation {
    pub fn is_no_results(&self) -> bool {
        self.status == RecommendationStatus::NoResults
    }

    pub fn ranked(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter().filter(|c| c.kind == CandidateKind::Ranked)
    }

    pub fn supplemental(&self) -> Option<&Candidate> {
        self.items
            .last()
            .filter(|c| c.kind == CandidateKind::Supplemental)
    }
}

pub fn quote_url(ticker: &str) -> String {
    format!("https://finance.yahoo.com/quote/{ticker}")
}
