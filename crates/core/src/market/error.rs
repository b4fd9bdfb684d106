use std::time::Duration;
use thiserror::Error;

/// Why metrics for a ticker are absent.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("market data provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("provider returned no data")]
    NoData,

    #[error("malformed market data: {0}")]
    Malformed(String),

    #[error("market data request timed out after {0:?}")]
    Timeout(Duration),
}

impl FetchError {
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::ProviderUnavailable(_) => "provider_unavailable",
            FetchError::NoData => "no_data",
            FetchError::Malformed(_) => "malformed",
            FetchError::Timeout(_) => "timeout",
        }
    }

    pub(crate) fn is_retryable(&self) -> bool {
        matches!(self, FetchError::ProviderUnavailable(_))
    }
}
