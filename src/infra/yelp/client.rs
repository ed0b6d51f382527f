use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use coffee_shop_rater::fetch::auth::ApiKey;
use coffee_shop_rater::fetch::{BasicClient, fetch_json};
use coffee_shop_rater::listing::YelpListing;

use crate::services::directory_api::{DirectoryApi, SearchQuery};

const PAGE_LIMIT: usize = 50;
const MAX_PAGES: usize = 4;
/// Yelp rejects radii beyond ~40 km.
const MAX_RADIUS_M: u32 = 40_000;
const CATEGORIES: &str = "coffee,coffeeroasteries,cafes";
/// Gentle pauses between calls; Yelp rate limits are per-second.
const REVIEW_FETCH_PAUSE: Duration = Duration::from_millis(100);
const PAGE_PAUSE: Duration = Duration::from_millis(200);

/// Yelp Fusion search client. The API key is sent as an
/// `Authorization: Bearer` header via the [`ApiKey`] adapter. When
/// `include_reviews` is set, up to three review excerpts per business are
/// flattened onto the listing row.
pub struct YelpClient {
    http: ApiKey<BasicClient>,
    base_url: String,
    include_reviews: bool,
}

impl YelpClient {
    pub fn new(api_key: String, include_reviews: bool) -> Self {
        Self {
            http: ApiKey::bearer(BasicClient::new(), api_key),
            base_url: "https://api.yelp.com/v3".to_string(),
            include_reviews,
        }
    }

    async fn attach_reviews(&self, listing: &mut YelpListing) {
        let Some(id) = listing.yelp_id.clone() else {
            return;
        };
        let url = format!("{}/businesses/{id}/reviews", self.base_url);
        let json = match fetch_json(&self.http, &url).await {
            Ok(json) => json,
            Err(e) => {
                warn!(yelp_id = %id, error = %e, "review fetch failed; keeping listing without excerpts");
                return;
            }
        };
        let Some(reviews) = json["reviews"].as_array() else {
            return;
        };
        for (i, rv) in reviews.iter().take(3).enumerate() {
            let text = rv["text"].as_str().map(str::to_string);
            let rating = rv["rating"].as_f64();
            let time = rv["time_created"].as_str().map(str::to_string);
            match i {
                0 => {
                    listing.review_1_text = text;
                    listing.review_1_rating = rating;
                    listing.review_1_time = time;
                }
                1 => {
                    listing.review_2_text = text;
                    listing.review_2_rating = rating;
                    listing.review_2_time = time;
                }
                _ => {
                    listing.review_3_text = text;
                    listing.review_3_rating = rating;
                    listing.review_3_time = time;
                }
            }
        }
    }
}

#[async_trait]
impl DirectoryApi for YelpClient {
    type Listing = YelpListing;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<YelpListing>> {
        let radius = query.radius_m.min(MAX_RADIUS_M);
        let mut rows = Vec::new();

        for page in 0..MAX_PAGES {
            let mut url = reqwest::Url::parse(&format!("{}/businesses/search", self.base_url))?;
            url.query_pairs_mut()
                .append_pair("term", &query.term)
                .append_pair("location", &query.location)
                .append_pair("radius", &radius.to_string())
                .append_pair("limit", &PAGE_LIMIT.to_string())
                .append_pair("offset", &(page * PAGE_LIMIT).to_string())
                .append_pair("categories", CATEGORIES);

            let json = match fetch_json(&self.http, url.as_str()).await {
                Ok(json) => json,
                Err(e) => {
                    warn!(page, error = %e, "yelp search page failed; stopping pagination");
                    break;
                }
            };

            let businesses = match json["businesses"].as_array() {
                Some(b) if !b.is_empty() => b,
                _ => break,
            };
            debug!(page, page_rows = businesses.len(), "yelp page received");

            for b in businesses {
                let mut listing = listing_from_json(b);
                if self.include_reviews && listing.yelp_id.is_some() {
                    self.attach_reviews(&mut listing).await;
                    tokio::time::sleep(REVIEW_FETCH_PAUSE).await;
                }
                rows.push(listing);
            }

            tokio::time::sleep(PAGE_PAUSE).await;
        }

        // Offset pages can overlap; keep the first row per yelp_id
        let mut seen: HashSet<String> = HashSet::new();
        rows.retain(|l| match &l.yelp_id {
            Some(id) => seen.insert(id.clone()),
            None => true,
        });

        Ok(rows)
    }
}

fn listing_from_json(b: &serde_json::Value) -> YelpListing {
    YelpListing {
        provider: Some("yelp".to_string()),
        name: b["name"].as_str().map(str::to_string),
        rating: b["rating"].as_f64(),
        review_count: b["review_count"].as_f64(),
        price: b["price"].as_str().map(str::to_string),
        categories: b["categories"].as_array().map(|a| {
            a.iter()
                .filter_map(|c| c["title"].as_str())
                .collect::<Vec<_>>()
                .join(",")
        }),
        lat: b["coordinates"]["latitude"].as_f64(),
        lng: b["coordinates"]["longitude"].as_f64(),
        address: b["location"]["display_address"].as_array().map(|a| {
            a.iter()
                .filter_map(|p| p.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        }),
        phone: b["display_phone"].as_str().map(str::to_string),
        yelp_id: b["id"].as_str().map(str::to_string),
        url: b["url"].as_str().map(str::to_string),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_from_json_extracts_fields() {
        let raw = serde_json::json!({
            "id": "y1",
            "name": "foo cafe",
            "rating": 5.0,
            "review_count": 200,
            "price": "$$",
            "categories": [{"title": "Coffee & Tea"}, {"title": "Cafes"}],
            "coordinates": {"latitude": 36.1, "longitude": -95.9},
            "location": {"display_address": ["101 E 2nd St", "Tulsa, OK 74103"]},
            "display_phone": "(918) 555-0100",
            "url": "https://yelp.example/foo"
        });
        let listing = listing_from_json(&raw);
        assert_eq!(listing.yelp_id.as_deref(), Some("y1"));
        assert_eq!(listing.review_count, Some(200.0));
        assert_eq!(listing.categories.as_deref(), Some("Coffee & Tea,Cafes"));
        assert_eq!(
            listing.address.as_deref(),
            Some("101 E 2nd St Tulsa, OK 74103")
        );
        assert_eq!(listing.review_1_text, None);
    }

    #[test]
    fn test_listing_from_json_tolerates_missing_fields() {
        let listing = listing_from_json(&serde_json::json!({"id": "y2"}));
        assert_eq!(listing.yelp_id.as_deref(), Some("y2"));
        assert_eq!(listing.rating, None);
        assert_eq!(listing.lat, None);
        assert_eq!(listing.address, None);
    }
}
