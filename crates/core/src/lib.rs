pub mod advisor;
pub mod cache;
pub mod domain;
pub mod error;
pub mod market;
pub mod metrics;
pub mod rank;

#[cfg(test)]
pub(crate) mod test_support;

pub mod config {
    use anyhow::Context;
    use std::time::Duration;

    const DEFAULT_MARKET_DATA_BASE_URL: &str = "https://query1.finance.yahoo.com";
    const DEFAULT_MARKET_DATA_TIMEOUT_SECS: u64 = 15;
    const DEFAULT_MARKET_DATA_RETRIES: u32 = 3;

    #[derive(Debug, Clone)]
    pub struct Settings {
        pub market_data_base_url: String,

        /// Per-request HTTP timeout for the market-data client.
        pub market_data_timeout: Duration,

        /// Attempts per provider call, at least 1.
        pub market_data_retries: u32,

        pub sentry_dsn: Option<String>,
    }

    impl Settings {
        pub fn from_env() -> anyhow::Result<Self> {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
            let market_data_base_url = lookup("MARKET_DATA_BASE_URL")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MARKET_DATA_BASE_URL.to_string());
            anyhow::ensure!(
                market_data_base_url.starts_with("http://")
                    || market_data_base_url.starts_with("https://"),
                "MARKET_DATA_BASE_URL must be an http(s) URL (got {market_data_base_url})"
            );

            let market_data_timeout = lookup("MARKET_DATA_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse::<u64>().ok())
                .filter(|&n| n > 0)
                .map(Duration::from_secs)
                .unwrap_or(Duration::from_secs(DEFAULT_MARKET_DATA_TIMEOUT_SECS));

            let market_data_retries = lookup("MARKET_DATA_RETRIES")
                .and_then(|s| s.trim().parse::<u32>().ok())
                .unwrap_or(DEFAULT_MARKET_DATA_RETRIES)
                .max(1);

            Ok(Self {
                market_data_base_url,
                market_data_timeout,
                market_data_retries,
                sentry_dsn: lookup("SENTRY_DSN").filter(|s| !s.trim().is_empty()),
            })
        }

        pub fn require_sentry_dsn(&self) -> anyhow::Result<&str> {
            self.sentry_dsn.as_deref().context("SENTRY_DSN is required")
        }
    }

    /// Tunables for the caching and ranking engine.
    #[derive(Debug, Clone)]
    pub struct EngineConfig {
        pub cache_ttl: Duration,

        /// Optional bound on cached (ticker, period) pairs. Evicted entries behave exactly like
        /// expired ones.
        pub cache_max_entries: Option<usize>,

        pub top_n: usize,
        pub volatility_floor: f64,
        pub trading_days_per_year: f64,
        pub supplemental_age_threshold: u32,

        /// Upper bound on a single provider call; a timeout counts as absent data.
        pub fetch_timeout: Duration,

        /// Max in-flight metric lookups per recommendation request.
        pub fetch_concurrency: usize,
    }

    impl Default for EngineConfig {
        fn default() -> Self {
            Self {
                cache_ttl: Duration::from_secs(24 * 60 * 60),
                cache_max_entries: None,
                top_n: 10,
                volatility_floor: 1.0,
                trading_days_per_year: 252.0,
                supplemental_age_threshold: 50,
                fetch_timeout: Duration::from_secs(20),
                fetch_concurrency: 8,
            }
        }
    }

    impl EngineConfig {
        pub fn from_env() -> Self {
            Self::from_lookup(|key| std::env::var(key).ok())
        }

        pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
            let mut out = Self::default();
            let parsed = |key: &str| lookup(key).map(|s| s.trim().to_string());

            if let Some(n) = parsed("CACHE_TTL_SECS").and_then(|s| s.parse::<u64>().ok()) {
                out.cache_ttl = Duration::from_secs(n);
            }
            if let Some(n) = parsed("CACHE_MAX_ENTRIES").and_then(|s| s.parse::<usize>().ok()) {
                out.cache_max_entries = Some(n);
            }
            if let Some(n) = parsed("RANK_TOP_N").and_then(|s| s.parse::<usize>().ok()) {
                out.top_n = n;
            }
            if let Some(n) = parsed("RANK_VOLATILITY_FLOOR").and_then(|s| s.parse::<f64>().ok()) {
                out.volatility_floor = n;
            }
            if let Some(n) = parsed("TRADING_DAYS_PER_YEAR").and_then(|s| s.parse::<f64>().ok()) {
                out.trading_days_per_year = n;
            }
            if let Some(n) =
                parsed("SUPPLEMENTAL_AGE_THRESHOLD").and_then(|s| s.parse::<u32>().ok())
            {
                out.supplemental_age_threshold = n;
            }
            if let Some(n) = parsed("FETCH_TIMEOUT_SECS").and_then(|s| s.parse::<u64>().ok()) {
                out.fetch_timeout = Duration::from_secs(n);
            }
            if let Some(n) = parsed("FETCH_CONCURRENCY").and_then(|s| s.parse::<usize>().ok()) {
                out.fetch_concurrency = n;
            }

            out
        }

        pub fn validate(&self) -> anyhow::Result<()> {
            anyhow::ensure!(!self.cache_ttl.is_zero(), "CACHE_TTL_SECS must be > 0");
            anyhow::ensure!(
                chrono::Duration::from_std(self.cache_ttl).is_ok(),
                "CACHE_TTL_SECS is too large (got {})",
                self.cache_ttl.as_secs()
            );
            if let Some(max) = self.cache_max_entries {
                anyhow::ensure!(max >= 1, "CACHE_MAX_ENTRIES must be >= 1");
            }
            anyhow::ensure!(self.top_n >= 1, "RANK_TOP_N must be >= 1");
            anyhow::ensure!(
                self.volatility_floor.is_finite() && self.volatility_floor > 0.0,
                "RANK_VOLATILITY_FLOOR must be > 0 (got {})",
                self.volatility_floor
            );
            anyhow::ensure!(
                self.trading_days_per_year.is_finite() && self.trading_days_per_year > 0.0,
                "TRADING_DAYS_PER_YEAR must be > 0 (got {})",
                self.trading_days_per_year
            );
            anyhow::ensure!(!self.fetch_timeout.is_zero(), "FETCH_TIMEOUT_SECS must be > 0");
            anyhow::ensure!(self.fetch_concurrency >= 1, "FETCH_CONCURRENCY must be >= 1");
            Ok(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::collections::HashMap;

        fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
            let map: HashMap<String, String> = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect();
            move |key: &str| map.get(key).cloned()
        }

        #[test]
        fn engine_defaults_match_documented_tunables() {
            let cfg = EngineConfig::from_lookup(lookup(&[]));
            assert_eq!(cfg.cache_ttl, Duration::from_secs(86_400));
            assert_eq!(cfg.top_n, 10);
            assert_eq!(cfg.volatility_floor, 1.0);
            assert_eq!(cfg.trading_days_per_year, 252.0);
            assert_eq!(cfg.supplemental_age_threshold, 50);
            assert!(cfg.cache_max_entries.is_none());
            cfg.validate().unwrap();
        }

        #[test]
        fn engine_overrides_and_ignores_garbage() {
            let cfg = EngineConfig::from_lookup(lookup(&[
                ("CACHE_TTL_SECS", "60"),
                ("RANK_TOP_N", " 5 "),
                ("CACHE_MAX_ENTRIES", "100"),
                ("RANK_VOLATILITY_FLOOR", "not-a-number"),
            ]));
            assert_eq!(cfg.cache_ttl, Duration::from_secs(60));
            assert_eq!(cfg.top_n, 5);
            assert_eq!(cfg.cache_max_entries, Some(100));
            assert_eq!(cfg.volatility_floor, 1.0);
        }

        #[test]
        fn engine_validate_rejects_zero_top_n() {
            let cfg = EngineConfig::from_lookup(lookup(&[("RANK_TOP_N", "0")]));
            assert!(cfg.validate().is_err());
        }

        #[test]
        fn engine_validate_rejects_unrepresentable_ttl() {
            let cfg = EngineConfig::from_lookup(lookup(&[(
                "CACHE_TTL_SECS",
                "18446744073709551615",
            )]));
            assert_eq!(cfg.cache_ttl, Duration::from_secs(u64::MAX));
            let err = cfg.validate().unwrap_err();
            assert!(err.to_string().contains("CACHE_TTL_SECS"));
        }

        #[test]
        fn settings_default_and_reject_non_http_base_url() {
            let s = Settings::from_lookup(lookup(&[])).unwrap();
            assert_eq!(s.market_data_base_url, DEFAULT_MARKET_DATA_BASE_URL);
            assert_eq!(s.market_data_timeout, Duration::from_secs(15));
            assert_eq!(s.market_data_retries, 3);
            assert!(s.require_sentry_dsn().is_err());

            let res = Settings::from_lookup(lookup(&[("MARKET_DATA_BASE_URL", "ftp://x")]));
            assert!(res.is_err());
        }

        #[test]
        fn settings_read_market_data_client_tunables() {
            let s = Settings::from_lookup(lookup(&[
                ("MARKET_DATA_TIMEOUT_SECS", " 4 "),
                ("MARKET_DATA_RETRIES", "0"),
            ]))
            .unwrap();
            assert_eq!(s.market_data_timeout, Duration::from_secs(4));
            assert_eq!(s.market_data_retries, 1);

            let s = Settings::from_lookup(lookup(&[
                ("MARKET_DATA_TIMEOUT_SECS", "0"),
                ("MARKET_DATA_RETRIES", "many"),
            ]))
            .unwrap();
            assert_eq!(s.market_data_timeout, Duration::from_secs(15));
            assert_eq!(s.market_data_retries, 3);
        }
    }
}
