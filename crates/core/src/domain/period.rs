use serde::{Deserialize, Serialize};
use std::fmt;

/// Historical lookback window requested from the market-data provider.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Period {
    #[serde(rename = "3mo")]
    ThreeMonths,
    #[serde(rename = "6mo")]
    SixMonths,
    #[serde(rename = "1y")]
    #[default]
    OneYear,
    #[serde(rename = "3y")]
    ThreeYears,
    #[serde(rename = "5y")]
    FiveYears,
    #[serde(rename = "10y")]
    TenYears,
}

impl Period {
    pub const ALL: [Period; 6] = [
        Period::ThreeMonths,
        Period::SixMonths,
        Period::OneYear,
        Period::ThreeYears,
        Period::FiveYears,
        Period::TenYears,
    ];

    /// Provider range code, e.g. `3mo` or `10y`.
    pub fn range(self) -> &'static str {
        match self {
            Period::ThreeMonths => "3mo",
            Period::SixMonths => "6mo",
            Period::OneYear => "1y",
            Period::ThreeYears => "3y",
            Period::FiveYears => "5y",
            Period::TenYears => "10y",
        }
    }

    /// Horizons short enough to exclude the growth universe.
    pub fn is_short(self) -> bool {
        matches!(self, Period::ThreeMonths | Period::SixMonths)
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.range())
    }
}

/// Maps a horizon label ("3 months", "2–3 years", "10+ years", ...) to a lookback period.
///
/// Labels are matched by substring in a fixed precedence order; anything unrecognised falls back
/// to one year. Ranges use an en dash, matching the labels offered to users.
pub fn resolve(horizon: &str) -> Period {
    if horizon.contains("3 months") {
        return Period::ThreeMonths;
    }
    if horizon.contains("6 months") {
        return Period::SixMonths;
    }
    if horizon.contains("1 year") {
        return Period::OneYear;
    }
    if horizon.contains("2–3") {
        return Period::ThreeYears;
    }
    if horizon.contains("4–5") {
        return Period::FiveYears;
    }
    if horizon.contains("6–10") || horizon.contains("10+") {
        return Period::TenYears;
    }
    Period::default()
}
