//! Composite ranking of canonical shops.
//!
//! Joins compound sentiment onto the canonical set, derives per-shop
//! stars/volume/sentiment metrics with null-tolerant aggregation, min-max
//! normalizes each metric independently, and blends them into a single
//! score. Missing metrics never zero a shop out; they normalize to a
//! neutral 0.5.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::merge::CanonicalShop;
use crate::sentiment::ScoredReview;

/// Fixed blend weights; stars dominate, then volume, then sentiment.
const STARS_WEIGHT: f64 = 0.6;
const VOLUME_WEIGHT: f64 = 0.3;
const SENTIMENT_WEIGHT: f64 = 0.1;
/// Keeps the min-max denominator non-zero when a column's values are all
/// equal.
const NORM_EPSILON: f64 = 1e-9;
/// Normalized value assigned to rows missing a metric, and to whole
/// columns with fewer than two non-null points.
const NEUTRAL_FILL: f64 = 0.5;

/// One row of the ranked CSV: the canonical columns plus the derived
/// metrics and composite score. Ordering by `score` descending is the
/// rank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankedShop {
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
    pub stars: Option<f64>,
    pub volume: Option<f64>,
    pub sentiment: Option<f64>,
    pub score: f64,
}

/// Ranks the canonical set against the scored reviews, descending by
/// composite score. Ties keep canonical input order. An empty canonical
/// set ranks to an empty sequence.
pub fn rank_shops(canon: &[CanonicalShop], scored: &[ScoredReview]) -> Vec<RankedShop> {
    if canon.is_empty() {
        warn!("no canonical shops to rank");
        return Vec::new();
    }

    let compound_by_id: HashMap<&str, f64> = scored
        .iter()
        .map(|r| (r.yelp_id.as_str(), r.compound))
        .collect();

    let stars: Vec<Option<f64>> = canon
        .iter()
        .map(|s| mean_non_null(&[s.rating_google, s.rating_yelp]))
        .collect();
    let volume: Vec<Option<f64>> = canon
        .iter()
        .map(|s| max_non_null(&[s.user_ratings_total, s.review_count]))
        .collect();
    let sentiment: Vec<Option<f64>> = canon
        .iter()
        .map(|s| {
            s.yelp_id
                .as_deref()
                .and_then(|id| compound_by_id.get(id).copied())
        })
        .collect();

    let norm_stars = min_max_normalize(&stars);
    let norm_volume = min_max_normalize(&volume);
    let norm_sentiment = min_max_normalize(&sentiment);

    let mut ranked: Vec<RankedShop> = canon
        .iter()
        .enumerate()
        .map(|(i, shop)| RankedShop {
            canonical_name: shop.canonical_name.clone(),
            canonical_lat: shop.canonical_lat,
            canonical_lng: shop.canonical_lng,
            address: shop.address.clone(),
            rating_google: shop.rating_google,
            user_ratings_total: shop.user_ratings_total,
            rating_yelp: shop.rating_yelp,
            review_count: shop.review_count,
            place_id: shop.place_id.clone(),
            yelp_id: shop.yelp_id.clone(),
            url: shop.url.clone(),
            stars: stars[i],
            volume: volume[i],
            sentiment: sentiment[i],
            score: STARS_WEIGHT * norm_stars[i]
                + VOLUME_WEIGHT * norm_volume[i]
                + SENTIMENT_WEIGHT * norm_sentiment[i],
        })
        .collect();

    // Stable: equal scores keep input order
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked
}

/// Selects the presentation view of a ranked sequence: shops at or above
/// `min_stars`, capped at `count` rows. Shops with null stars never pass
/// the threshold.
pub fn leaderboard(ranked: &[RankedShop], min_stars: f64, count: usize) -> Vec<&RankedShop> {
    ranked
        .iter()
        .filter(|r| r.stars.is_some_and(|s| s >= min_stars))
        .take(count)
        .collect()
}

/// Arithmetic mean over the non-null values; `None` when all are null.
fn mean_non_null(values: &[Option<f64>]) -> Option<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        None
    } else {
        Some(present.iter().sum::<f64>() / present.len() as f64)
    }
}

/// Maximum over the non-null values; `None` when all are null.
fn max_non_null(values: &[Option<f64>]) -> Option<f64> {
    values.iter().flatten().copied().reduce(f64::max)
}

/// Min-max scales a column to [0, 1] over its non-null values, mapping
/// nulls to [`NEUTRAL_FILL`]. A column with fewer than two non-null points
/// cannot be scaled meaningfully and becomes entirely neutral.
fn min_max_normalize(values: &[Option<f64>]) -> Vec<f64> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.len() <= 1 {
        return vec![NEUTRAL_FILL; values.len()];
    }
    let min = present.iter().copied().fold(f64::INFINITY, f64::min);
    let max = present.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    values
        .iter()
        .map(|v| match v {
            Some(x) => (x - min) / (max - min + NORM_EPSILON),
            None => NEUTRAL_FILL,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shop(name: &str, rating_google: Option<f64>, rating_yelp: Option<f64>) -> CanonicalShop {
        CanonicalShop {
            canonical_name: Some(name.to_string()),
            rating_google,
            rating_yelp,
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_ranks_to_empty() {
        assert!(rank_shops(&[], &[]).is_empty());
    }

    #[test]
    fn test_mean_non_null_skips_nulls() {
        assert_eq!(mean_non_null(&[Some(4.0), Some(5.0)]), Some(4.5));
        assert_eq!(mean_non_null(&[Some(4.5), None]), Some(4.5));
        assert_eq!(mean_non_null(&[None, None]), None);
    }

    #[test]
    fn test_max_non_null_skips_nulls() {
        assert_eq!(max_non_null(&[Some(10.0), Some(200.0)]), Some(200.0));
        assert_eq!(max_non_null(&[None, Some(120.0)]), Some(120.0));
        assert_eq!(max_non_null(&[None, None]), None);
    }

    #[test]
    fn test_normalize_bounds_and_null_fill() {
        let normed = min_max_normalize(&[Some(4.0), None, Some(5.0), Some(4.5)]);
        for v in &normed {
            assert!((0.0..=1.0).contains(v), "normalized value {v} out of bounds");
        }
        assert!(normed[0].abs() < 1e-6);
        assert_eq!(normed[1], 0.5);
        assert!((normed[2] - 1.0).abs() < 1e-6);
        assert!((normed[3] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_degenerate_columns_fill_neutral() {
        assert_eq!(min_max_normalize(&[None, None, None]), vec![0.5, 0.5, 0.5]);
        assert_eq!(min_max_normalize(&[Some(4.2), None]), vec![0.5, 0.5]);
    }

    #[test]
    fn test_normalize_equal_values_column() {
        // max == min: epsilon keeps the division defined
        let normed = min_max_normalize(&[Some(4.0), Some(4.0)]);
        for v in &normed {
            assert!((0.0..=1.0).contains(v));
        }
    }

    #[test]
    fn test_three_shop_ordering_by_stars() {
        let canon = vec![
            shop("low", Some(4.0), Some(4.0)),
            shop("mid", Some(4.5), Some(4.5)),
            shop("high", Some(5.0), Some(5.0)),
        ];
        let ranked = rank_shops(&canon, &[]);
        assert_eq!(ranked[0].canonical_name.as_deref(), Some("high"));
        assert_eq!(ranked[1].canonical_name.as_deref(), Some("mid"));
        assert_eq!(ranked[2].canonical_name.as_deref(), Some("low"));
        assert!((ranked[1].stars.unwrap() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounds() {
        let canon = vec![
            shop("a", Some(1.0), None),
            shop("b", Some(3.0), Some(5.0)),
            shop("c", None, None),
        ];
        for r in rank_shops(&canon, &[]) {
            assert!(
                (0.0..=1.0).contains(&r.score),
                "score {} out of bounds",
                r.score
            );
        }
    }

    #[test]
    fn test_single_shop_gets_neutral_score() {
        let canon = vec![shop("only", Some(4.5), None)];
        let ranked = rank_shops(&canon, &[]);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].stars, Some(4.5));
        assert_eq!(ranked[0].volume, None);
        // every column degenerates to 0.5, so the blend lands on 0.5 exactly
        assert!((ranked[0].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_sentiment_joins_by_yelp_id() {
        let mut matched = shop("matched", Some(4.0), None);
        matched.yelp_id = Some("y1".to_string());
        let mut unmatched = shop("unmatched", Some(4.0), None);
        unmatched.yelp_id = Some("y2".to_string());
        let no_id = shop("no-id", Some(4.0), None);

        let scored = vec![ScoredReview {
            yelp_id: "y1".to_string(),
            review_text: "great".to_string(),
            neg: 0.0,
            neu: 0.4,
            pos: 0.6,
            compound: 0.62,
        }];

        let ranked = rank_shops(&[matched, unmatched, no_id], &scored);
        let by_name = |n: &str| {
            ranked
                .iter()
                .find(|r| r.canonical_name.as_deref() == Some(n))
                .unwrap()
        };
        assert_eq!(by_name("matched").sentiment, Some(0.62));
        assert_eq!(by_name("unmatched").sentiment, None);
        assert_eq!(by_name("no-id").sentiment, None);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let canon = vec![
            shop("first", Some(4.0), None),
            shop("second", Some(4.0), None),
            shop("third", Some(4.0), None),
        ];
        let ranked = rank_shops(&canon, &[]);
        let names: Vec<_> = ranked
            .iter()
            .map(|r| r.canonical_name.as_deref().unwrap())
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_leaderboard_filters_below_min_stars() {
        let ranked = rank_shops(
            &[
                shop("good", Some(4.5), None),
                shop("bad", Some(3.0), None),
                shop("unknown", None, None),
            ],
            &[],
        );
        let view = leaderboard(&ranked, 4.0, 15);
        assert_eq!(view.len(), 1);
        assert_eq!(view[0].canonical_name.as_deref(), Some("good"));
    }

    #[test]
    fn test_leaderboard_caps_row_count() {
        let ranked = rank_shops(
            &[
                shop("a", Some(5.0), None),
                shop("b", Some(4.8), None),
                shop("c", Some(4.6), None),
            ],
            &[],
        );
        let view = leaderboard(&ranked, 4.0, 2);
        assert_eq!(view.len(), 2);
        assert_eq!(view[0].canonical_name.as_deref(), Some("a"));
        assert_eq!(view[1].canonical_name.as_deref(), Some("b"));
    }

    #[test]
    fn test_volume_uses_max_of_sources() {
        let mut s = shop("foo", Some(4.0), Some(5.0));
        s.user_ratings_total = Some(10.0);
        s.review_count = Some(200.0);
        let ranked = rank_shops(&[s], &[]);
        assert_eq!(ranked[0].volume, Some(200.0));
        assert_eq!(ranked[0].stars, Some(4.5));
    }
}
