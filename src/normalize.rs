//! Join-key derivation for cross-provider shop matching.
//!
//! Two raw listings are treated as the same physical shop iff their
//! [`NormalizedKey`]s are equal: a cleaned-up lowercase name plus
//! coordinates rounded to 3 decimal places (~100 m). This is a heuristic
//! equivalence, not exact identity; two different shops within ~100 m with
//! identical normalized names will collide.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::listing::{GoogleListing, YelpListing};

/// Rounded-coordinate scale: 3 decimal places, held as integer millidegrees
/// so the key is hashable.
const COORD_SCALE: f64 = 1000.0;

/// The derived match key for one raw listing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedKey {
    pub norm_name: String,
    pub lat_milli: i64,
    pub lng_milli: i64,
}

/// Lowercases a shop name, folds accented letters to their ASCII base via
/// NFD decomposition, and collapses every run of characters outside
/// `[a-z0-9]` into a single space, trimming the ends. "Foo Café" and
/// "foo cafe" normalize identically.
pub fn normalize_name(name: &str) -> String {
    let lowered = name.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut pending_space = false;
    for c in lowered.nfd() {
        if is_combining_mark(c) {
            continue;
        }
        if c.is_ascii_alphanumeric() {
            if pending_space && !out.is_empty() {
                out.push(' ');
            }
            pending_space = false;
            out.push(c);
        } else {
            pending_space = true;
        }
    }
    out
}

/// Rounds a coordinate half-to-even at 3 decimal places, returning integer
/// millidegrees.
pub fn round_millidegrees(coord: f64) -> i64 {
    (coord * COORD_SCALE).round_ties_even() as i64
}

/// Builds the match key from raw fields. Returns `None` when the listing
/// cannot be keyed (missing name or either coordinate); callers count such
/// listings rather than dropping them silently.
pub fn normalized_key(
    name: Option<&str>,
    lat: Option<f64>,
    lng: Option<f64>,
) -> Option<NormalizedKey> {
    Some(NormalizedKey {
        norm_name: normalize_name(name?),
        lat_milli: round_millidegrees(lat?),
        lng_milli: round_millidegrees(lng?),
    })
}

impl GoogleListing {
    pub fn normalized_key(&self) -> Option<NormalizedKey> {
        normalized_key(self.name.as_deref(), self.lat, self.lng)
    }
}

impl YelpListing {
    pub fn normalized_key(&self) -> Option<NormalizedKey> {
        normalized_key(self.name.as_deref(), self.lat, self.lng)
    }
}
