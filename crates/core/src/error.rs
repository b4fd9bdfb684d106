use thiserror::Error;

/// Caller-input errors, reported before any market data is requested.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecommendError {
    #[error("invalid profile: {field} {reason}")]
    InvalidProfile {
        field: &'static str,
        reason: String,
    },
}

impl RecommendError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidProfile {
            field,
            reason: reason.into(),
        }
    }
}
