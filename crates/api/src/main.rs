use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_core::advisor::Advisor;
use advisor_core::config::{EngineConfig, Settings};
use advisor_core::domain::period::{self, Period};
use advisor_core::domain::profile::UserProfile;
use advisor_core::domain::recommendation::Recommendation;
use advisor_core::domain::universe::{Asset, UniverseName};
use advisor_core::error::RecommendError;
use advisor_core::market::yahoo::YahooChartProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let engine = EngineConfig::from_env();
    let engine = match engine.validate() {
        Ok(()) => engine,
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "invalid engine config; starting API with defaults");
            EngineConfig::default()
        }
    };

    let provider = YahooChartProvider::from_settings(&settings)?;
    let advisor = Advisor::from_provider(Arc::new(provider), &engine);
    let state = AppState {
        advisor: Arc::new(advisor),
    };

    let app = router(state).layer(TraceLayer::new_for_http());

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, ttl_secs = engine.cache_ttl.as_secs(), "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/recommendations", post(post_recommendation))
        .route("/universes", get(get_universes))
        .route("/periods", get(get_period))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    advisor: Arc<Advisor>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ErrorBody {
    error: String,
}

async fn post_recommendation(
    State(state): State<AppState>,
    Json(profile): Json<UserProfile>,
) -> Result<Json<Recommendation>, (StatusCode, Json<ErrorBody>)> {
    state
        .advisor
        .recommend(profile)
        .await
        .map(Json)
        .map_err(|e| match e {
            RecommendError::InvalidProfile { .. } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ErrorBody {
                    error: e.to_string(),
                }),
            ),
        })
}

#[derive(Debug, Serialize)]
struct UniverseView {
    name: UniverseName,
    assets: &'static [Asset],
}

async fn get_universes() -> Json<Vec<UniverseView>> {
    Json(
        UniverseName::ALL
            .into_iter()
            .map(|name| UniverseView {
                name,
                assets: name.assets(),
            })
            .collect(),
    )
}

#[derive(Debug, Deserialize)]
struct PeriodQuery {
    #[serde(default)]
    horizon: String,
}

#[derive(Debug, Serialize)]
struct PeriodView {
    horizon: String,
    period: Period,
}

async fn get_period(Query(q): Query<PeriodQuery>) -> Json<PeriodView> {
    let period = period::resolve(&q.horizon);
    Json(PeriodView {
        horizon: q.horizon,
        period,
    })
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.require_sentry_dsn().ok()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use advisor_core::domain::recommendation::RecommendationStatus;
    use advisor_core::market::{FetchError, MarketDataProvider, PricePoint};
    use chrono::NaiveDate;

    struct FlatProvider;

    #[async_trait::async_trait]
    impl MarketDataProvider for FlatProvider {
        fn provider_name(&self) -> &'static str {
            "flat"
        }

        async fn fetch_closes(
            &self,
            ticker: &str,
            _period: Period,
        ) -> Result<Vec<PricePoint>, FetchError> {
            if ticker == "KO" {
                return Err(FetchError::NoData);
            }
            let date = NaiveDate::from_ymd_opt(2026, 1, 2).unwrap();
            Ok(vec![
                PricePoint { date, close: 100.0 },
                PricePoint {
                    date: date.succ_opt().unwrap(),
                    close: 105.0,
                },
            ])
        }
    }

    fn state() -> AppState {
        let advisor = Advisor::from_provider(Arc::new(FlatProvider), &EngineConfig::default());
        AppState {
            advisor: Arc::new(advisor),
        }
    }

    fn profile(age: u32, risk: i32) -> UserProfile {
        serde_json::from_value(serde_json::json!({
            "age": age,
            "income": "100k–150k",
            "risk": risk,
            "horizon": "1 year",
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn recommendation_returns_ranked_items() {
        let Json(rec) = post_recommendation(State(state()), Json(profile(55, 2)))
            .await
            .unwrap();

        assert_eq!(rec.status, RecommendationStatus::Ranked);
        assert_eq!(rec.absent, 1);
        assert_eq!(rec.items.len(), 11);
        assert_eq!(rec.items.last().unwrap().ticker, "BND");
    }

    #[tokio::test]
    async fn invalid_risk_maps_to_unprocessable_entity() {
        let (status, Json(body)) = post_recommendation(State(state()), Json(profile(30, 12)))
            .await
            .unwrap_err();

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body.error.contains("risk"));
    }

    #[tokio::test]
    async fn period_lookup_resolves_horizon() {
        let Json(view) = get_period(Query(PeriodQuery {
            horizon: "6–10 years".to_string(),
        }))
        .await;
        assert_eq!(view.period, Period::TenYears);
    }

    #[tokio::test]
    async fn universes_lists_all_groups() {
        let Json(views) = get_universes().await;
        assert_eq!(views.len(), 4);
        assert!(views.iter().all(|v| !v.assets.is_empty()));
    }
}
