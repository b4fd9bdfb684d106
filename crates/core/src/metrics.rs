use crate::config::EngineConfig;
use crate::domain::period::Period;
use crate::domain::recommendation::AssetMetrics;
use crate::market::{FetchError, MarketDataProvider};
use std::sync::Arc;
use std::time::Duration;

/// Pulls a closing-price series and turns it into [`AssetMetrics`].
///
/// Every failure (provider error, empty series, bad numbers, timeout) comes back as a
/// [`FetchError`]; nothing escapes as a panic.
#[derive(Clone)]
pub struct MetricsFetcher {
    provider: Arc<dyn MarketDataProvider>,
    timeout: Duration,
    trading_days_per_year: f64,
}

impl MetricsFetcher {
    pub fn new(provider: Arc<dyn MarketDataProvider>, config: &EngineConfig) -> Self {
        Self {
            provider,
            timeout: config.fetch_timeout,
            trading_days_per_year: config.trading_days_per_year,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    pub async fn fetch(&self, ticker: &str, period: Period) -> Result<AssetMetrics, FetchError> {
        let series = match tokio::time::timeout(
            self.timeout,
            self.provider.fetch_closes(ticker, period),
        )
        .await
        {
            Ok(res) => res,
            Err(_) => Err(FetchError::Timeout(self.timeout)),
        };

        let res = series.and_then(|points| {
            let closes: Vec<f64> = points.iter().map(|p| p.close).collect();
            compute_metrics(&closes, self.trading_days_per_year)
        });

        match &res {
            Ok(m) => tracing::debug!(
                %ticker,
                %period,
                percent_return = m.percent_return,
                volatility = m.annualized_volatility_pct,
                "computed metrics"
            ),
            Err(FetchError::NoData) => tracing::debug!(
                %ticker,
                %period,
                provider = self.provider_name(),
                "no market data for ticker"
            ),
            Err(err) => tracing::warn!(
                %ticker,
                %period,
                provider = self.provider_name(),
                kind = err.kind(),
                error = %err,
                "market data fetch failed"
            ),
        }

        res
    }
}

/// Total percent return and annualized volatility (sample std-dev of daily returns) of an
/// oldest-first close series, both rounded to two decimals.
pub fn compute_metrics(closes: &[f64], trading_days_per_year: f64) -> Result<AssetMetrics, FetchError> {
    let (Some(&first), Some(&last)) = (closes.first(), closes.last()) else {
        return Err(FetchError::NoData);
    };

    if let Some(bad) = closes.iter().find(|c| !c.is_finite() || **c <= 0.0) {
        return Err(FetchError::Malformed(format!("non-positive or non-finite close {bad}")));
    }

    let percent_return = (last - first) / first * 100.0;

    let daily_returns: Vec<f64> = closes.windows(2).map(|w| (w[1] - w[0]) / w[0]).collect();
    let volatility = sample_std_dev(&daily_returns) * trading_days_per_year.sqrt() * 100.0;

    let metrics = AssetMetrics {
        percent_return: round2(percent_return),
        annualized_volatility_pct: round2(volatility),
    };
    if !metrics.percent_return.is_finite() || !metrics.annualized_volatility_pct.is_finite() {
        return Err(FetchError::Malformed("metrics are not finite".to_string()));
    }
    Ok(metrics)
}

// Fewer than two observations has no dispersion to measure.
fn sample_std_dev(xs: &[f64]) -> f64 {
    if xs.len() < 2 {
        return 0.0;
    }
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    var.sqrt()
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}
