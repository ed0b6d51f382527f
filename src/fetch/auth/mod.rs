//! Auth decoration for provider requests.
//!
//! [`ApiKey`] injects a key as an HTTP header (Yelp's `Authorization:
//! Bearer` scheme); [`UrlParam`] appends it as a query parameter (Google
//! Places' `key` scheme). Both wrap any inner
//! [`HttpClient`](crate::fetch::HttpClient).

mod api_key;
mod url_param;

pub use api_key::ApiKey;
pub use url_param::UrlParam;
