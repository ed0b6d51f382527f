use std::collections::HashSet;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, warn};

use coffee_shop_rater::fetch::auth::UrlParam;
use coffee_shop_rater::fetch::{BasicClient, fetch_json};
use coffee_shop_rater::listing::GoogleListing;

use crate::services::directory_api::{DirectoryApi, SearchQuery};

/// Nearby Search only hands out a few pages; follow at most this many
/// `next_page_token`s.
const MAX_EXTRA_PAGES: usize = 3;
/// A freshly issued page token is not valid immediately.
const PAGE_TOKEN_DELAY: Duration = Duration::from_secs(2);

/// Google Places Nearby Search client. The API key rides along as a `key`
/// query parameter on every request via the [`UrlParam`] adapter.
pub struct GooglePlacesClient {
    http: UrlParam<BasicClient>,
    base_url: String,
}

impl GooglePlacesClient {
    pub fn new(api_key: String) -> Self {
        Self {
            http: UrlParam::new(BasicClient::new(), "key", api_key),
            base_url: "https://maps.googleapis.com/maps/api/place/nearbysearch/json".to_string(),
        }
    }
}

#[async_trait]
impl DirectoryApi for GooglePlacesClient {
    type Listing = GoogleListing;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<GoogleListing>> {
        let mut url = reqwest::Url::parse(&self.base_url)?;
        url.query_pairs_mut()
            .append_pair("keyword", &query.term)
            .append_pair("radius", &query.radius_m.to_string())
            .append_pair(
                "location",
                &format!("{},{}", query.center_lat, query.center_lng),
            );

        let mut rows = Vec::new();
        let mut next_url = url.to_string();
        let mut extra_pages = 0usize;

        loop {
            let json = fetch_json(&self.http, &next_url).await?;

            let status = json["status"].as_str().unwrap_or("");
            if status != "OK" && status != "ZERO_RESULTS" {
                warn!(
                    status,
                    error = json["error_message"].as_str().unwrap_or(""),
                    "google places returned a non-ok status"
                );
            }

            if let Some(results) = json["results"].as_array() {
                debug!(page_rows = results.len(), "google places page received");
                for r in results {
                    rows.push(listing_from_json(r));
                }
            }

            let Some(token) = json["next_page_token"].as_str() else {
                break;
            };
            extra_pages += 1;
            if extra_pages > MAX_EXTRA_PAGES {
                break;
            }

            tokio::time::sleep(PAGE_TOKEN_DELAY).await;
            let mut page_url = reqwest::Url::parse(&self.base_url)?;
            page_url.query_pairs_mut().append_pair("pagetoken", token);
            next_url = page_url.to_string();
        }

        // Pages can overlap; keep the first row per place_id
        let mut seen: HashSet<String> = HashSet::new();
        rows.retain(|l| match &l.place_id {
            Some(id) => seen.insert(id.clone()),
            None => true,
        });

        Ok(rows)
    }
}

fn listing_from_json(r: &serde_json::Value) -> GoogleListing {
    GoogleListing {
        provider: Some("google".to_string()),
        name: r["name"].as_str().map(str::to_string),
        rating: r["rating"].as_f64(),
        user_ratings_total: r["user_ratings_total"].as_f64(),
        price_level: r["price_level"].as_f64(),
        lat: r["geometry"]["location"]["lat"].as_f64(),
        lng: r["geometry"]["location"]["lng"].as_f64(),
        address: r["vicinity"].as_str().map(str::to_string),
        place_id: r["place_id"].as_str().map(str::to_string),
        types: r["types"].as_array().map(|a| {
            a.iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join(",")
        }),
        business_status: r["business_status"].as_str().map(str::to_string),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_from_json_extracts_nested_fields() {
        let raw = serde_json::json!({
            "name": "Blue Dome Coffee",
            "rating": 4.5,
            "user_ratings_total": 120,
            "geometry": {"location": {"lat": 36.154, "lng": -95.990}},
            "vicinity": "101 E 2nd St",
            "place_id": "p1",
            "types": ["cafe", "food"],
            "business_status": "OPERATIONAL"
        });
        let listing = listing_from_json(&raw);
        assert_eq!(listing.name.as_deref(), Some("Blue Dome Coffee"));
        assert_eq!(listing.rating, Some(4.5));
        assert_eq!(listing.user_ratings_total, Some(120.0));
        assert_eq!(listing.lat, Some(36.154));
        assert_eq!(listing.types.as_deref(), Some("cafe,food"));
    }

    #[test]
    fn test_listing_from_json_tolerates_missing_fields() {
        let listing = listing_from_json(&serde_json::json!({"name": "Bare"}));
        assert_eq!(listing.name.as_deref(), Some("Bare"));
        assert_eq!(listing.rating, None);
        assert_eq!(listing.lat, None);
        assert_eq!(listing.place_id, None);
    }
}
