//! Raw listing ingestion from the provider CSVs.
//!
//! Loading is best-effort: a missing source file yields an empty set with
//! a warning (the pipeline degrades downstream), and rows the CSV layer
//! cannot deserialize are skipped and counted rather than failing the run.

use std::path::Path;

use anyhow::Result;
use serde::de::DeserializeOwned;
use tracing::{info, warn};

use crate::listing::{GoogleListing, YelpListing};

pub const GOOGLE_RAW_FILE: &str = "google_places_coffee.csv";
pub const YELP_RAW_FILE: &str = "yelp_coffee.csv";

/// Loads both provider CSVs from `raw_dir`. Absence of either file is the
/// missing-source case, not an error.
pub fn load_raw(raw_dir: &Path) -> Result<(Vec<GoogleListing>, Vec<YelpListing>)> {
    let google = load_listing_file(&raw_dir.join(GOOGLE_RAW_FILE))?;
    let yelp = load_listing_file(&raw_dir.join(YELP_RAW_FILE))?;
    Ok((google, yelp))
}

fn load_listing_file<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        warn!(
            path = %path.display(),
            "raw source file missing; continuing with empty set"
        );
        return Ok(Vec::new());
    }

    let mut rdr = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    let mut skipped = 0usize;
    for result in rdr.deserialize() {
        match result {
            Ok(row) => rows.push(row),
            Err(e) => {
                skipped += 1;
                warn!(path = %path.display(), error = %e, "skipping undeserializable row");
            }
        }
    }
    info!(
        path = %path.display(),
        rows = rows.len(),
        skipped,
        "raw listings loaded"
    );
    Ok(rows)
}
