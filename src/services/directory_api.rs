//! Trait and types for querying a business directory provider.

use anyhow::Result;

/// One search request against a directory: a free-text location (Yelp), a
/// coordinate centroid (Google Places), a radius, and the search term.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub location: String,
    pub center_lat: f64,
    pub center_lng: f64,
    pub radius_m: u32,
    pub term: String,
}

/// Abstraction over a listing source: given a location and radius, return
/// rows of raw listings. Pagination, rate limiting, and auth are the
/// implementor's concern; callers only see the final row set.
#[async_trait::async_trait]
pub trait DirectoryApi {
    type Listing;

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Self::Listing>>;
}
