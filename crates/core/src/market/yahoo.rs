use crate::config::Settings;
use crate::domain::period::Period;
use crate::market::{FetchError, MarketDataProvider, PricePoint};
use anyhow::Context;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

const USER_AGENT: &str = concat!("advisor/", env!("CARGO_PKG_VERSION"));

/// Daily closes from the Yahoo Finance chart endpoint.
#[derive(Debug, Clone)]
pub struct YahooChartProvider {
    http: reqwest::Client,
    base_url: String,
    retries: u32,
}

impl YahooChartProvider {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.market_data_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("failed to build market data http client")?;

        Ok(Self {
            http,
            base_url: settings.market_data_base_url.clone(),
            retries: settings.market_data_retries.max(1),
        })
    }

    fn url(&self, ticker: &str) -> String {
        format!(
            "{}/v8/finance/chart/{}",
            self.base_url.trim_end_matches('/'),
            ticker
        )
    }

    async fn fetch_once(&self, ticker: &str, period: Period) -> Result<Vec<PricePoint>, FetchError> {
        let res = self
            .http
            .get(self.url(ticker))
            .query(&[
                ("range", period.range()),
                ("interval", "1d"),
                ("includeAdjustedClose", "true"),
            ])
            .send()
            .await
            .map_err(|e| FetchError::ProviderUnavailable(format!("request failed: {e}")))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| FetchError::ProviderUnavailable(format!("read body failed: {e}")))?;

        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NoData);
        }
        if !status.is_success() {
            return Err(FetchError::ProviderUnavailable(format!("HTTP {status}")));
        }

        parse_chart(&text)
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for YahooChartProvider {
    fn provider_name(&self) -> &'static str {
        "yahoo_chart"
    }

    async fn fetch_closes(
        &self,
        ticker: &str,
        period: Period,
    ) -> Result<Vec<PricePoint>, FetchError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(ticker, period).await {
                Ok(points) => return Ok(points),
                Err(err) if err.is_retryable() && attempt < self.retries => {
                    let backoff = Duration::from_secs(1 << (attempt - 1));
                    tracing::warn!(
                        attempt,
                        ?backoff,
                        %ticker,
                        %period,
                        error = %err,
                        "market data fetch failed; retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
    #[serde(default)]
    adjclose: Vec<AdjCloseSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseSeries {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

/// Extracts an oldest-first close series, preferring adjusted closes. Null closes are skipped.
fn parse_chart(text: &str) -> Result<Vec<PricePoint>, FetchError> {
    let envelope = serde_json::from_str::<ChartEnvelope>(text)
        .map_err(|e| FetchError::Malformed(format!("chart response: {e}")))?;

    if let Some(err) = envelope.chart.error {
        tracing::debug!(code = %err.code, description = %err.description, "provider reported chart error");
        return Err(FetchError::NoData);
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    let adjusted = result
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|s| s.adjclose)
        .filter(|c| !c.is_empty() && c.len() == result.timestamp.len());
    let closes = match adjusted {
        Some(c) => c,
        None => result
            .indicators
            .quote
            .into_iter()
            .next()
            .map(|q| q.close)
            .unwrap_or_default(),
    };

    if closes.len() != result.timestamp.len() {
        return Err(FetchError::Malformed(format!(
            "{} timestamps but {} closes",
            result.timestamp.len(),
            closes.len()
        )));
    }

    let mut out = Vec::with_capacity(closes.len());
    for (ts, close) in result.timestamp.into_iter().zip(closes) {
        let Some(close) = close else {
            continue;
        };
        let date = chrono::DateTime::from_timestamp(ts, 0)
            .ok_or_else(|| FetchError::Malformed(format!("invalid timestamp {ts}")))?
            .date_naive();
        out.push(PricePoint { date, close });
    }
    out.sort_by_key(|p| p.date);

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    #[test]
    fn prefers_adjusted_close_and_skips_nulls() {
        let body = json!({
            "chart": {
                "result": [{
                    "meta": {"symbol": "AAPL"},
                    "timestamp": [1767225600, 1767312000, 1767398400],
                    "indicators": {
                        "quote": [{"close": [101.0, null, 103.0]}],
                        "adjclose": [{"adjclose": [100.0, null, 102.0]}]
                    }
                }],
                "error": null
            }
        })
        .to_string();

        let points = parse_chart(&body).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 100.0);
        assert_eq!(points[1].close, 102.0);
        assert_eq!(points[0].date, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
    }

    #[test]
    fn falls_back_to_raw_close_and_sorts_by_date() {
        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": [1767312000, 1767225600],
                    "indicators": {"quote": [{"close": [11.0, 10.0]}]}
                }],
                "error": null
            }
        })
        .to_string();

        let points = parse_chart(&body).unwrap();
        assert_eq!(
            points.iter().map(|p| p.close).collect::<Vec<_>>(),
            vec![10.0, 11.0]
        );
    }

    #[test]
    fn provider_error_object_means_no_data() {
        let body = json!({
            "chart": {
                "result": null,
                "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}
            }
        })
        .to_string();
        assert_eq!(parse_chart(&body), Err(FetchError::NoData));
    }

    #[test]
    fn empty_result_is_empty_series() {
        let body = json!({"chart": {"result": [], "error": null}}).to_string();
        assert_eq!(parse_chart(&body), Ok(Vec::new()));
    }

    #[test]
    fn rejects_garbage_and_length_mismatch() {
        assert!(matches!(
            parse_chart("<html>rate limited</html>"),
            Err(FetchError::Malformed(_))
        ));

        let body = json!({
            "chart": {
                "result": [{
                    "timestamp": [1767225600, 1767312000],
                    "indicators": {"quote": [{"close": [10.0]}]}
                }]
            }
        })
        .to_string();
        assert!(matches!(parse_chart(&body), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn only_provider_unavailable_is_retried() {
        assert!(FetchError::ProviderUnavailable("x".into()).is_retryable());
        assert!(!FetchError::NoData.is_retryable());
        assert!(!FetchError::Malformed("x".into()).is_retryable());
        assert!(!FetchError::Timeout(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn client_takes_retries_and_base_url_from_settings() {
        let settings = Settings::from_lookup(|key: &str| match key {
            "MARKET_DATA_BASE_URL" => Some("http://127.0.0.1:9/".to_string()),
            "MARKET_DATA_RETRIES" => Some("5".to_string()),
            _ => None,
        })
        .unwrap();

        let provider = YahooChartProvider::from_settings(&settings).unwrap();
        assert_eq!(provider.retries, 5);
        assert_eq!(
            provider.url("BND"),
            "http://127.0.0.1:9/v8/finance/chart/BND"
        );
    }
}
