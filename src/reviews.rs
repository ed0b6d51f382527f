//! Flattens per-listing review excerpts into one text blob per shop.

use serde::{Deserialize, Serialize};

use crate::listing::YelpListing;

/// The concatenated review text for one Yelp business, keyed by its
/// external id for the later sentiment join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewBundle {
    pub yelp_id: String,
    pub review_text: String,
}

/// Builds one [`ReviewBundle`] per listing that has at least one non-blank
/// review text field. Fields are scanned in fixed index order and joined
/// with a single space. Listings with no usable text, or without a
/// `yelp_id` to join on, produce no bundle.
pub fn collect_review_text(yelp: &[YelpListing]) -> Vec<ReviewBundle> {
    let mut bundles = Vec::new();
    for listing in yelp {
        let Some(yelp_id) = listing.yelp_id.as_deref() else {
            continue;
        };
        let texts: Vec<&str> = listing
            .review_texts()
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            continue;
        }
        bundles.push(ReviewBundle {
            yelp_id: yelp_id.to_string(),
            review_text: texts.join(" "),
        });
    }
    bundles
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str, texts: [Option<&str>; 3]) -> YelpListing {
        YelpListing {
            yelp_id: Some(id.to_string()),
            review_1_text: texts[0].map(String::from),
            review_2_text: texts[1].map(String::from),
            review_3_text: texts[2].map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_bundle_joins_texts_in_field_order() {
        let y = vec![listing("y1", [Some("  great  "), None, Some("would return")])];
        let bundles = collect_review_text(&y);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].yelp_id, "y1");
        assert_eq!(bundles[0].review_text, "great would return");
    }

    #[test]
    fn test_no_bundle_without_usable_text() {
        let y = vec![
            listing("y1", [None, None, None]),
            listing("y2", [Some("   "), Some(""), None]),
        ];
        assert!(collect_review_text(&y).is_empty());
    }

    #[test]
    fn test_bundle_iff_some_field_non_blank() {
        let y = vec![
            listing("y1", [Some("   "), Some("ok coffee"), None]),
            listing("y2", [None, None, None]),
        ];
        let bundles = collect_review_text(&y);
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].review_text, "ok coffee");
    }

    #[test]
    fn test_listing_without_yelp_id_is_skipped() {
        let mut l = listing("y1", [Some("fine"), None, None]);
        l.yelp_id = None;
        assert!(collect_review_text(&[l]).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(collect_review_text(&[]).is_empty());
    }
}
