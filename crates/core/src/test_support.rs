use crate::domain::period::Period;
use crate::market::{FetchError, MarketDataProvider, PricePoint};
use chrono::{Days, NaiveDate};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

/// In-memory provider with canned series per ticker and per-ticker call counts.
/// Unknown tickers return `NoData`.
#[derive(Default)]
pub(crate) struct ScriptedProvider {
    responses: Mutex<HashMap<String, Result<Vec<PricePoint>, FetchError>>>,
    calls: Mutex<HashMap<String, usize>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_closes(&self, ticker: &str, closes: &[f64]) {
        let start = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let points = closes
            .iter()
            .enumerate()
            .map(|(i, &close)| PricePoint {
                date: start.checked_add_days(Days::new(i as u64)).unwrap(),
                close,
            })
            .collect();
        self.responses
            .lock()
            .unwrap()
            .insert(ticker.to_string(), Ok(points));
    }

    /// Two-point series whose score is exactly `percent_return` (zero volatility, floor 1).
    pub(crate) fn set_return(&self, ticker: &str, percent_return: f64) {
        self.set_closes(ticker, &[100.0, 100.0 + percent_return]);
    }

    pub(crate) fn fail(&self, ticker: &str, err: FetchError) {
        self.responses
            .lock()
            .unwrap()
            .insert(ticker.to_string(), Err(err));
    }

    pub(crate) fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub(crate) fn calls(&self, ticker: &str) -> usize {
        self.calls.lock().unwrap().get(ticker).copied().unwrap_or(0)
    }

    pub(crate) fn total_calls(&self) -> usize {
        self.calls.lock().unwrap().values().sum()
    }
}

#[async_trait::async_trait]
impl MarketDataProvider for ScriptedProvider {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    async fn fetch_closes(
        &self,
        ticker: &str,
        _period: Period,
    ) -> Result<Vec<PricePoint>, FetchError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(ticker.to_string())
            .or_default() += 1;

        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.responses
            .lock()
            .unwrap()
            .get(ticker)
            .cloned()
            .unwrap_or(Err(FetchError::NoData))
    }
}
