pub mod error;
pub mod yahoo;

use crate::domain::period::Period;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub use error::FetchError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Source of daily closing prices.
///
/// Implementations return the series oldest-first. An empty `Ok` and `Err(FetchError::NoData)`
/// are treated the same way by callers.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn fetch_closes(&self, ticker: &str, period: Period)
        -> Result<Vec<PricePoint>, FetchError>;
}
