//! CLI entry point for the coffee shop rater.
//!
//! Provides subcommands for collecting raw listings from the two directory
//! providers, running the reconcile/score/rank pipeline over them, and
//! showing the resulting leaderboard in the terminal.

mod infra;
mod services;

use std::ffi::OsStr;
use std::fs;
use std::path::Path;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};
use tracing::{error, info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use coffee_shop_rater::loader;
use coffee_shop_rater::merge::canonical_merge;
use coffee_shop_rater::output::{
    self, CANONICAL_FILE, RANKED_FILE, RunSummary, SCORED_REVIEWS_FILE, SUMMARY_FILE,
};
use coffee_shop_rater::rank::{leaderboard, rank_shops};
use coffee_shop_rater::reviews::collect_review_text;
use coffee_shop_rater::sentiment::SentimentScorer;

use crate::infra::google::client::GooglePlacesClient;
use crate::infra::yelp::client::YelpClient;
use crate::services::directory_api::{DirectoryApi, SearchQuery};

#[derive(Parser)]
#[command(name = "coffee_shop_rater")]
#[command(about = "Aggregate, reconcile, and rank coffee shop listings", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Collect raw listings from Google Places and Yelp
    Collect {
        /// Free-text location passed to Yelp
        #[arg(short, long, default_value = "Tulsa, OK")]
        location: String,

        /// Search radius in meters
        #[arg(short, long, default_value_t = 15_000)]
        radius: u32,

        /// Latitude of the Google Places search centroid
        #[arg(long, default_value_t = 36.15398)]
        center_lat: f64,

        /// Longitude of the Google Places search centroid
        #[arg(long, default_value_t = -95.99277)]
        center_lng: f64,

        /// Also fetch up to 3 Yelp review excerpts per business
        #[arg(long, default_value_t = false)]
        include_yelp_reviews: bool,

        /// Directory for the raw CSVs
        #[arg(short, long, default_value = "data/raw")]
        out_dir: String,
    },
    /// Reconcile raw listings, score review sentiment, and rank shops
    Analyze {
        /// Directory holding the raw CSVs
        #[arg(long, default_value = "data/raw")]
        raw_dir: String,

        /// Directory for the derived artifacts
        #[arg(short, long, default_value = "data/interim")]
        out_dir: String,
    },
    /// Show the current leaderboard from the ranked artifact
    Top {
        /// Directory holding the derived artifacts
        #[arg(long, default_value = "data/interim")]
        data_dir: String,

        /// Minimum average stars to include
        #[arg(long, default_value_t = 4.0)]
        min_stars: f64,

        /// Maximum rows to show
        #[arg(short, long, default_value_t = 15)]
        count: usize,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path = std::env::var("LOG_FILE_PATH")
        .unwrap_or_else(|_| "logs/coffee_shop_rater.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("coffee_shop_rater.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse().unwrap()));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse().unwrap()));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Collect {
            location,
            radius,
            center_lat,
            center_lng,
            include_yelp_reviews,
            out_dir,
        } => {
            let query = SearchQuery {
                location,
                center_lat,
                center_lng,
                radius_m: radius,
                term: "coffee".to_string(),
            };
            collect(&query, include_yelp_reviews, Path::new(&out_dir)).await?;
        }
        Commands::Analyze { raw_dir, out_dir } => {
            analyze(Path::new(&raw_dir), Path::new(&out_dir))?;
        }
        Commands::Top {
            data_dir,
            min_stars,
            count,
        } => {
            top(Path::new(&data_dir), min_stars, count)?;
        }
    }

    Ok(())
}

/// Fetches raw listings from both providers into `out_dir`. A provider
/// without an API key, or one whose fetch fails, is skipped with a
/// warning; the other still runs.
#[tracing::instrument(skip(query, out_dir), fields(radius_m = query.radius_m))]
async fn collect(query: &SearchQuery, include_yelp_reviews: bool, out_dir: &Path) -> Result<()> {
    fs::create_dir_all(out_dir)?;

    match nonempty_env("GOOGLE_PLACES_API_KEY") {
        Some(key) => {
            info!("collecting from google places");
            let client = GooglePlacesClient::new(key);
            match client.search(query).await {
                Ok(rows) => {
                    let path = out_dir.join(loader::GOOGLE_RAW_FILE);
                    output::write_csv(&path, &rows)?;
                    info!(rows = rows.len(), path = %path.display(), "google listings saved");
                }
                Err(e) => error!(error = %e, "google collection failed; skipping provider"),
            }
        }
        None => warn!("GOOGLE_PLACES_API_KEY missing; skipping google collection"),
    }

    match nonempty_env("YELP_API_KEY") {
        Some(key) => {
            info!(include_yelp_reviews, "collecting from yelp");
            let client = YelpClient::new(key, include_yelp_reviews);
            match client.search(query).await {
                Ok(rows) => {
                    let path = out_dir.join(loader::YELP_RAW_FILE);
                    output::write_csv(&path, &rows)?;
                    info!(rows = rows.len(), path = %path.display(), "yelp listings saved");
                }
                Err(e) => error!(error = %e, "yelp collection failed; skipping provider"),
            }
        }
        None => warn!("YELP_API_KEY missing; skipping yelp collection"),
    }

    Ok(())
}

/// Runs the full pipeline: load raw, merge canonical, bundle and score
/// reviews, rank, and write every artifact plus the run summary.
#[tracing::instrument(skip_all, fields(raw_dir = %raw_dir.display()))]
fn analyze(raw_dir: &Path, out_dir: &Path) -> Result<()> {
    let (google, yelp) = loader::load_raw(raw_dir)?;

    let (canonical, merge_report) = canonical_merge(&google, &yelp);
    output::write_csv(&out_dir.join(CANONICAL_FILE), &canonical)?;

    let bundles = collect_review_text(&yelp);
    if bundles.is_empty() {
        warn!("no usable review text; sentiment will be null for every shop");
    }
    let scorer = SentimentScorer::new();
    let scored = scorer.score_bundles(&bundles);
    output::write_csv(&out_dir.join(SCORED_REVIEWS_FILE), &scored)?;

    let ranked = rank_shops(&canonical, &scored);
    output::write_csv(&out_dir.join(RANKED_FILE), &ranked)?;

    let summary = RunSummary {
        generated_at: Utc::now(),
        canonical_shops: canonical.len(),
        review_bundles: bundles.len(),
        scored_reviews: scored.len(),
        ranked_shops: ranked.len(),
        merge: merge_report,
    };
    output::write_summary(&out_dir.join(SUMMARY_FILE), &summary)?;

    info!(
        canonical = canonical.len(),
        scored = scored.len(),
        ranked = ranked.len(),
        "analysis complete"
    );
    Ok(())
}

/// Renders the leaderboard: ranked shops at or above `min_stars`, capped
/// at `count` rows. Shops without coordinates are listed but marked
/// non-mappable.
fn top(data_dir: &Path, min_stars: f64, count: usize) -> Result<()> {
    let ranked = output::read_ranked(&data_dir.join(RANKED_FILE))?;
    let view = leaderboard(&ranked, min_stars, count);

    if view.is_empty() {
        println!("no shops at or above {min_stars} stars");
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            "#", "name", "stars", "volume", "sentiment", "score", "map", "address",
        ]);
    for (i, shop) in view.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            shop.canonical_name.clone().unwrap_or_default(),
            fmt_opt(shop.stars, 1),
            fmt_opt(shop.volume, 0),
            fmt_opt(shop.sentiment, 2),
            format!("{:.3}", shop.score),
            if shop.canonical_lat.is_some() && shop.canonical_lng.is_some() {
                "*".to_string()
            } else {
                String::new()
            },
            shop.address.clone().unwrap_or_default(),
        ]);
    }
    println!("{table}");
    Ok(())
}

fn fmt_opt(value: Option<f64>, precision: usize) -> String {
    match value {
        Some(v) => format!("{v:.precision$}"),
        None => "-".to_string(),
    }
}

fn nonempty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
