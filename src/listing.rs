//! Raw listing records as fetched from each directory provider.
//!
//! Column layouts match the provider CSVs under `data/raw/`. Every field a
//! provider may omit is an `Option`; numeric fields parse leniently so a
//! garbled value loads as `None` instead of failing the row.

use serde::{Deserialize, Deserializer, Serialize};

/// A single Google Places row from `google_places_coffee.csv`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleListing {
    pub provider: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub user_ratings_total: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub price_level: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub place_id: Option<String>,
    pub types: Option<String>,
    pub business_status: Option<String>,
}

/// A single Yelp row from `yelp_coffee.csv`, including up to three flattened
/// review excerpts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YelpListing {
    pub provider: Option<String>,
    pub name: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub review_count: Option<f64>,
    pub price: Option<String>,
    pub categories: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient_f64")]
    pub lng: Option<f64>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub yelp_id: Option<String>,
    pub url: Option<String>,
    pub review_1_text: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub review_1_rating: Option<f64>,
    pub review_1_time: Option<String>,
    pub review_2_text: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub review_2_rating: Option<f64>,
    pub review_2_time: Option<String>,
    pub review_3_text: Option<String>,
    #[serde(deserialize_with = "lenient_f64")]
    pub review_3_rating: Option<f64>,
    pub review_3_time: Option<String>,
}

impl YelpListing {
    /// Review text fields in fixed index order.
    pub fn review_texts(&self) -> [Option<&str>; 3] {
        [
            self.review_1_text.as_deref(),
            self.review_2_text.as_deref(),
            self.review_3_text.as_deref(),
        ]
    }

    /// True when the row carries the minimum fields needed for matching.
    pub fn has_match_fields(&self) -> bool {
        self.name.is_some() && self.lat.is_some() && self.lng.is_some()
    }
}

/// Deserializes a numeric field, mapping anything unparseable to `None`.
fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|s| s.trim().parse::<f64>().ok()))
}
