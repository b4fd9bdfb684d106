use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use advisor_core::advisor::Advisor;
use advisor_core::config::{EngineConfig, Settings};
use advisor_core::domain::profile::UserProfile;
use advisor_core::domain::recommendation::Recommendation;
use advisor_core::market::yahoo::YahooChartProvider;

#[derive(Debug, Parser)]
#[command(name = "advisor", about = "Rank assets for an investor profile")]
struct Args {
    #[arg(long)]
    age: u32,

    /// Risk tolerance, 1 (lowest) to 10 (highest).
    #[arg(long, allow_hyphen_values = true)]
    risk: i32,

    /// Holding period label, e.g. "3 months", "2–3 years", "10+ years".
    #[arg(long)]
    horizon: String,

    #[arg(long, default_value = "unspecified")]
    income: String,

    /// Print the full recommendation as JSON.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let engine = EngineConfig::from_env();
    engine.validate()?;

    let provider = YahooChartProvider::from_settings(&settings)?;
    let advisor = Advisor::from_provider(Arc::new(provider), &engine);

    let profile = UserProfile {
        age: args.age,
        income_bracket: args.income,
        risk: args.risk,
        horizon: args.horizon,
    };

    let rec = match advisor.recommend(profile).await {
        Ok(rec) => rec,
        Err(err) => {
            let err = anyhow::Error::new(err);
            sentry_anyhow::capture_anyhow(&err);
            return Err(err);
        }
    };

    if args.json {
        let out = serde_json::to_string_pretty(&rec).context("serialize recommendation failed")?;
        println!("{out}");
    } else {
        print!("{}", render_text(&rec));
    }

    Ok(())
}

fn render_text(rec: &Recommendation) -> String {
    let mut out = format!("Suggested assets (lookback {})\n", rec.period);

    if rec.is_no_results() {
        out.push_str(&format!(
            "  No assets qualified ({} of {} candidates had no market data).\n",
            rec.absent, rec.evaluated
        ));
    }

    for c in rec.ranked() {
        out.push_str(&format!(
            "{:>3}. {:<32} {:>8} return {:>8.2}%  volatility {:>7.2}%  score {:>6.2}\n",
            c.rank.unwrap_or_default(),
            c.display_name,
            c.ticker,
            c.metrics.percent_return,
            c.metrics.annualized_volatility_pct,
            c.score
        ));
    }

    if let Some(s) = rec.supplemental() {
        out.push_str(&format!(
            "  +  {:<32} {:>8} {}\n",
            s.display_name,
            s.ticker,
            s.note.as_deref().unwrap_or_default()
        ));
    }

    out
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
