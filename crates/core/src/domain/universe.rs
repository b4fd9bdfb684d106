use crate::domain::period;
use crate::domain::recommendation::AssetMetrics;
use crate::error::RecommendError;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;

/// Named group of candidate tickers sharing a risk/style profile.
///
/// Declaration order is the evaluation order used when several universes are selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UniverseName {
    Defensive,
    Core,
    Growth,
    Cyclical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Asset {
    pub display_name: &'static str,
    pub ticker: &'static str,
}

const fn asset(display_name: &'static str, ticker: &'static str) -> Asset {
    Asset {
        display_name,
        ticker,
    }
}

const DEFENSIVE: &[Asset] = &[
    asset("Johnson & Johnson (JNJ)", "JNJ"),
    asset("Procter & Gamble (PG)", "PG"),
    asset("Coca-Cola (KO)", "KO"),
    asset("PepsiCo (PEP)", "PEP"),
    asset("Walmart (WMT)", "WMT"),
    asset("McDonald's (MCD)", "MCD"),
    asset("Duke Energy (DUK)", "DUK"),
];

const CORE: &[Asset] = &[
    asset("Apple (AAPL)", "AAPL"),
    asset("Microsoft (MSFT)", "MSFT"),
    asset("Alphabet (GOOGL)", "GOOGL"),
    asset("Berkshire Hathaway (BRK.B)", "BRK-B"),
    asset("Visa (V)", "V"),
    asset("JPMorgan Chase (JPM)", "JPM"),
    asset("UnitedHealth Group (UNH)", "UNH"),
];

const GROWTH: &[Asset] = &[
    asset("NVIDIA (NVDA)", "NVDA"),
    asset("Amazon (AMZN)", "AMZN"),
    asset("Meta Platforms (META)", "META"),
    asset("Tesla (TSLA)", "TSLA"),
    asset("Advanced Micro Devices (AMD)", "AMD"),
    asset("Netflix (NFLX)", "NFLX"),
    asset("Broadcom (AVGO)", "AVGO"),
    asset("ServiceNow (NOW)", "NOW"),
];

const CYCLICAL: &[Asset] = &[
    asset("Caterpillar (CAT)", "CAT"),
    asset("Exxon Mobil (XOM)", "XOM"),
    asset("Deere & Company (DE)", "DE"),
    asset("Freeport-McMoRan (FCX)", "FCX"),
    asset("General Motors (GM)", "GM"),
    asset("Home Depot (HD)", "HD"),
    asset("Nucor (NUE)", "NUE"),
];

/// Low-volatility income asset appended for older investors.
pub const SUPPLEMENTAL_ASSET: Asset = asset("Vanguard Total Bond ETF (BND)", "BND");
pub const SUPPLEMENTAL_NOTE: &str = "Lower volatility income-focused asset";

/// Shown for the supplemental asset when no live metrics are available.
pub const SUPPLEMENTAL_REFERENCE_METRICS: AssetMetrics = AssetMetrics {
    percent_return: 0.0,
    annualized_volatility_pct: 5.0,
};

impl UniverseName {
    pub const ALL: [UniverseName; 4] = [
        UniverseName::Defensive,
        UniverseName::Core,
        UniverseName::Growth,
        UniverseName::Cyclical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UniverseName::Defensive => "defensive",
            UniverseName::Core => "core",
            UniverseName::Growth => "growth",
            UniverseName::Cyclical => "cyclical",
        }
    }

    pub fn assets(self) -> &'static [Asset] {
        match self {
            UniverseName::Defensive => DEFENSIVE,
            UniverseName::Core => CORE,
            UniverseName::Growth => GROWTH,
            UniverseName::Cyclical => CYCLICAL,
        }
    }
}

impl fmt::Display for UniverseName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn validate_risk(risk: i32) -> Result<(), RecommendError> {
    if !(1..=10).contains(&risk) {
        return Err(RecommendError::invalid(
            "risk",
            format!("must be between 1 and 10 (got {risk})"),
        ));
    }
    Ok(())
}

/// Picks the universes to consider for a risk score and horizon label.
///
/// Short horizons (3 or 6 months) never include the growth universe.
pub fn select(risk: i32, horizon: &str) -> Result<BTreeSet<UniverseName>, RecommendError> {
    validate_risk(risk)?;

    let mut out = match risk {
        1..=3 => BTreeSet::from([UniverseName::Defensive, UniverseName::Core]),
        4..=6 => BTreeSet::from([UniverseName::Core, UniverseName::Growth]),
        _ => BTreeSet::from([UniverseName::Growth, UniverseName::Cyclical]),
    };

    if period::resolve(horizon).is_short() {
        out.remove(&UniverseName::Growth);
    }

    Ok(out)
}

/// Flattens selected universes into candidate assets, keeping the first occurrence of a ticker.
pub fn candidate_assets(universes: &BTreeSet<UniverseName>) -> Vec<Asset> {
    let mut seen = HashSet::new();
    universes
        .iter()
        .flat_map(|u| u.assets().iter().copied())
        .filter(|a| seen.insert(a.ticker))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn risk_tiers_pick_base_universes() {
        use UniverseName::*;
        assert_eq!(
            select(1, "1 year").unwrap(),
            BTreeSet::from([Defensive, Core])
        );
        assert_eq!(
            select(3, "1 year").unwrap(),
            BTreeSet::from([Defensive, Core])
        );
        assert_eq!(select(4, "10+ years").unwrap(), BTreeSet::from([Core, Growth]));
        assert_eq!(select(6, "").unwrap(), BTreeSet::from([Core, Growth]));
        assert_eq!(
            select(7, "4–5 years").unwrap(),
            BTreeSet::from([Growth, Cyclical])
        );
        assert_eq!(
            select(10, "1 year").unwrap(),
            BTreeSet::from([Growth, Cyclical])
        );
    }

    #[test]
    fn short_horizon_excludes_growth() {
        use UniverseName::*;
        assert_eq!(select(8, "3 months").unwrap(), BTreeSet::from([Cyclical]));
        assert_eq!(select(5, "6 months").unwrap(), BTreeSet::from([Core]));
        assert_eq!(
            select(2, "3 months").unwrap(),
            BTreeSet::from([Defensive, Core])
        );
    }

    #[test]
    fn out_of_range_risk_is_rejected() {
        for risk in [0, 11, -3] {
            let err = select(risk, "1 year").unwrap_err();
            assert!(matches!(
                err,
                RecommendError::InvalidProfile { field: "risk", .. }
            ));
        }
    }

    #[test]
    fn candidate_assets_follow_universe_order_without_duplicates() {
        let selected = BTreeSet::from([UniverseName::Growth, UniverseName::Core]);
        let assets = candidate_assets(&selected);
        assert_eq!(assets.len(), CORE.len() + GROWTH.len());
        assert_eq!(assets[0].ticker, "AAPL");
        assert_eq!(assets[CORE.len()].ticker, "NVDA");

        let mut tickers: Vec<_> = assets.iter().map(|a| a.ticker).collect();
        tickers.sort_unstable();
        tickers.dedup();
        assert_eq!(tickers.len(), assets.len());
    }

    #[test]
    fn supplemental_asset_is_not_in_any_universe() {
        for u in UniverseName::ALL {
            assert!(u.assets().iter().all(|a| a.ticker != SUPPLEMENTAL_ASSET.ticker));
        }
    }
}
