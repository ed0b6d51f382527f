//! Canonical merge: reconciles the two provider listing sets into one
//! deduplicated record per physical shop.
//!
//! The join is a full outer equi-join on [`NormalizedKey`], materialized as
//! a tagged GoogleOnly / YelpOnly / Both union per key, then resolved
//! field-by-field with first-non-null-wins and Google precedence. Listings
//! that cannot be keyed are excluded from matching and counted, never
//! silently dropped. When the Yelp side is empty or unusable the merge
//! degrades to a 1:1 mapping of the Google rows.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::listing::{GoogleListing, YelpListing};
use crate::normalize::NormalizedKey;

/// One canonical record per shop. Field names are the canonical CSV
/// contract, consumed downstream by the ranking engine and presentation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanonicalShop {
    pub canonical_name: Option<String>,
    pub canonical_lat: Option<f64>,
    pub canonical_lng: Option<f64>,
    pub address: Option<String>,
    pub rating_google: Option<f64>,
    pub user_ratings_total: Option<f64>,
    pub rating_yelp: Option<f64>,
    pub review_count: Option<f64>,
    pub place_id: Option<String>,
    pub yelp_id: Option<String>,
    pub url: Option<String>,
}

/// Operator-visible counts from one merge run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MergeReport {
    pub google_rows: usize,
    pub yelp_rows: usize,
    pub unkeyable_google: usize,
    pub unkeyable_yelp: usize,
    pub matched_both: usize,
    pub google_only: usize,
    pub yelp_only: usize,
    pub dedup_dropped: usize,
    pub google_fallback: bool,
}

/// Outcome of the outer join for one normalized key.
enum KeyedMatch<'a> {
    GoogleOnly(&'a GoogleListing),
    YelpOnly(&'a YelpListing),
    Both(&'a GoogleListing, &'a YelpListing),
}

/// Merges the two raw sets into canonical shops plus a merge report.
///
/// Output order is deterministic: Google keys in input order, then
/// unmatched Yelp keys in input order. The first listing per key per side
/// wins; after resolution the set is deduplicated by the
/// `(canonical_name, canonical_lat, canonical_lng)` triple, keeping the
/// first occurrence.
pub fn canonical_merge(
    google: &[GoogleListing],
    yelp: &[YelpListing],
) -> (Vec<CanonicalShop>, MergeReport) {
    let mut report = MergeReport {
        google_rows: google.len(),
        yelp_rows: yelp.len(),
        ..Default::default()
    };

    // Empty-collaborator case: no Yelp rows, or none carrying the minimum
    // match fields. Emit Google rows 1:1 with all Yelp-side fields null.
    let yelp_usable = yelp.iter().any(YelpListing::has_match_fields);
    if !yelp_usable {
        if !yelp.is_empty() {
            warn!(
                yelp_rows = yelp.len(),
                "yelp rows lack name/lat/lng; falling back to google-only canonical set"
            );
        }
        report.google_fallback = true;
        report.google_only = google.len();
        let shops = google.iter().map(resolve_google_only).collect();
        let shops = dedup_by_triple(shops, &mut report);
        return (shops, report);
    }

    // Index Yelp by key; the first listing per key wins.
    let mut yelp_by_key: HashMap<NormalizedKey, &YelpListing> = HashMap::new();
    let mut yelp_key_order: Vec<NormalizedKey> = Vec::new();
    for listing in yelp {
        match listing.normalized_key() {
            Some(key) => {
                if !yelp_by_key.contains_key(&key) {
                    yelp_by_key.insert(key.clone(), listing);
                    yelp_key_order.push(key);
                }
            }
            None => report.unkeyable_yelp += 1,
        }
    }

    // Walk Google keys in input order, pairing off Yelp matches as we go;
    // whatever remains in the index is Yelp-only.
    let mut matches: Vec<KeyedMatch<'_>> = Vec::new();
    let mut seen_google_keys: HashSet<NormalizedKey> = HashSet::new();
    for listing in google {
        match listing.normalized_key() {
            Some(key) => {
                if !seen_google_keys.insert(key.clone()) {
                    continue;
                }
                match yelp_by_key.remove(&key) {
                    Some(y) => {
                        report.matched_both += 1;
                        matches.push(KeyedMatch::Both(listing, y));
                    }
                    None => {
                        report.google_only += 1;
                        matches.push(KeyedMatch::GoogleOnly(listing));
                    }
                }
            }
            None => report.unkeyable_google += 1,
        }
    }
    for key in &yelp_key_order {
        if let Some(y) = yelp_by_key.remove(key) {
            report.yelp_only += 1;
            matches.push(KeyedMatch::YelpOnly(y));
        }
    }

    if report.unkeyable_google > 0 || report.unkeyable_yelp > 0 {
        warn!(
            unkeyable_google = report.unkeyable_google,
            unkeyable_yelp = report.unkeyable_yelp,
            "listings without name or coordinates were excluded from matching"
        );
    }

    let shops = matches.iter().map(resolve).collect();
    let shops = dedup_by_triple(shops, &mut report);
    (shops, report)
}

/// Applies the field precedence rule to one matched key: Google's value if
/// present, else Yelp's. Per-source rating/volume/id fields stay separate.
fn resolve(m: &KeyedMatch<'_>) -> CanonicalShop {
    match m {
        KeyedMatch::GoogleOnly(g) => resolve_google_only(g),
        KeyedMatch::YelpOnly(y) => CanonicalShop {
            canonical_name: y.name.clone(),
            canonical_lat: y.lat,
            canonical_lng: y.lng,
            address: y.address.clone(),
            rating_yelp: y.rating,
            review_count: y.review_count,
            yelp_id: y.yelp_id.clone(),
            url: y.url.clone(),
            ..Default::default()
        },
        KeyedMatch::Both(g, y) => CanonicalShop {
            canonical_name: g.name.clone().or_else(|| y.name.clone()),
            canonical_lat: g.lat.or(y.lat),
            canonical_lng: g.lng.or(y.lng),
            address: g.address.clone().or_else(|| y.address.clone()),
            rating_google: g.rating,
            user_ratings_total: g.user_ratings_total,
            rating_yelp: y.rating,
            review_count: y.review_count,
            place_id: g.place_id.clone(),
            yelp_id: y.yelp_id.clone(),
            url: y.url.clone(),
        },
    }
}

fn resolve_google_only(g: &GoogleListing) -> CanonicalShop {
    CanonicalShop {
        canonical_name: g.name.clone(),
        canonical_lat: g.lat,
        canonical_lng: g.lng,
        address: g.address.clone(),
        rating_google: g.rating,
        user_ratings_total: g.user_ratings_total,
        place_id: g.place_id.clone(),
        ..Default::default()
    }
}

/// Drops rows whose `(canonical_name, canonical_lat, canonical_lng)` triple
/// was already emitted. Guards against distinct join keys resolving to one
/// canonical triple through rounding collisions.
fn dedup_by_triple(shops: Vec<CanonicalShop>, report: &mut MergeReport) -> Vec<CanonicalShop> {
    let mut seen: HashSet<(Option<String>, Option<u64>, Option<u64>)> = HashSet::new();
    let mut out = Vec::with_capacity(shops.len());
    for shop in shops {
        let triple = (
            shop.canonical_name.clone(),
            shop.canonical_lat.map(f64::to_bits),
            shop.canonical_lng.map(f64::to_bits),
        );
        if seen.insert(triple) {
            out.push(shop);
        } else {
            report.dedup_dropped += 1;
        }
    }
    out
}
