//! Artifact writing and reading for the derived pipeline outputs.
//!
//! Everything lands under the interim directory as headered UTF-8 CSV,
//! plus a JSON run summary with the operator-visible counts. Artifacts are
//! rewritten wholesale on every run.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use csv::WriterBuilder;
use serde::Serialize;
use tracing::debug;

use crate::merge::MergeReport;
use crate::rank::RankedShop;

pub const CANONICAL_FILE: &str = "canonical_shops.csv";
pub const SCORED_REVIEWS_FILE: &str = "reviews_scored.csv";
pub const RANKED_FILE: &str = "ranked_shops.csv";
pub const SUMMARY_FILE: &str = "run_summary.json";

/// Counts from one full pipeline run, written alongside the CSV artifacts.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub generated_at: DateTime<Utc>,
    pub canonical_shops: usize,
    pub review_bundles: usize,
    pub scored_reviews: usize,
    pub ranked_shops: usize,
    pub merge: MergeReport,
}

/// Serializes `rows` to a headered CSV at `path`, creating parent
/// directories as needed. The file is truncated first.
pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "csv written");
    Ok(())
}

/// Writes the run summary as pretty JSON.
pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_vec_pretty(summary)?)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

/// Reads the ranked artifact back for presentation. A missing file is the
/// downstream-artifact-missing case: the error tells the user to run the
/// pipeline, it does not crash the terminal view.
pub fn read_ranked(path: &Path) -> Result<Vec<RankedShop>> {
    if !path.exists() {
        bail!(
            "no ranked output at {}; run `coffee_shop_rater analyze` first",
            path.display()
        );
    }
    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for result in rdr.deserialize() {
        let row: RankedShop = result?;
        rows.push(row);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::path::PathBuf;

    fn temp_path(name: &str) -> PathBuf {
        env::temp_dir().join(name)
    }

    fn sample_ranked() -> RankedShop {
        RankedShop {
            canonical_name: Some("Blue Dome Coffee".to_string()),
            canonical_lat: Some(36.154),
            canonical_lng: Some(-95.990),
            rating_google: Some(4.5),
            user_ratings_total: Some(120.0),
            stars: Some(4.5),
            volume: Some(120.0),
            score: 0.5,
            ..Default::default()
        }
    }

    #[test]
    fn test_ranked_roundtrip() {
        let path = temp_path("coffee_shop_rater_test_ranked_roundtrip.csv");
        let _ = fs::remove_file(&path);

        let rows = vec![sample_ranked()];
        write_csv(&path, &rows).unwrap();
        let back = read_ranked(&path).unwrap();

        assert_eq!(back.len(), 1);
        assert_eq!(back[0].canonical_name.as_deref(), Some("Blue Dome Coffee"));
        assert_eq!(back[0].rating_yelp, None);
        assert_eq!(back[0].stars, Some(4.5));
        assert_eq!(back[0].score, 0.5);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_write_csv_headers_once() {
        let path = temp_path("coffee_shop_rater_test_headers.csv");
        let _ = fs::remove_file(&path);

        write_csv(&path, &[sample_ranked(), sample_ranked()]).unwrap();
        let content = fs::read_to_string(&path).unwrap();
        let header_count = content
            .lines()
            .filter(|l| l.starts_with("canonical_name"))
            .count();
        assert_eq!(header_count, 1);
        assert_eq!(content.lines().count(), 3);

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_read_ranked_missing_instructs_to_run_analyze() {
        let err = read_ranked(Path::new("/nonexistent/ranked_shops.csv")).unwrap_err();
        assert!(err.to_string().contains("analyze"));
    }

    #[test]
    fn test_write_summary_is_valid_json() {
        let path = temp_path("coffee_shop_rater_test_summary.json");
        let _ = fs::remove_file(&path);

        let summary = RunSummary {
            generated_at: Utc::now(),
            canonical_shops: 2,
            review_bundles: 1,
            scored_reviews: 1,
            ranked_shops: 2,
            merge: MergeReport::default(),
        };
        write_summary(&path, &summary).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed["canonical_shops"], 2);

        fs::remove_file(&path).unwrap();
    }
}
