mod basic;
mod client;
pub mod auth;

pub use basic::BasicClient;
pub use client::HttpClient;

use anyhow::Result;

/// Fetches a URL through the given client and returns the raw body bytes.
/// Auth adapters in [`auth`] decorate the client when a provider needs an
/// API key on the request.
pub async fn fetch_bytes<C: HttpClient>(client: &C, url: &str) -> Result<Vec<u8>> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);

    let resp = client.execute(req).await?;
    let status = resp.status();
    let body = resp.bytes().await?.to_vec();
    if !status.is_success() {
        anyhow::bail!(
            "request failed with status {status}: {}",
            String::from_utf8_lossy(&body)
        );
    }
    Ok(body)
}

/// Fetches a URL and parses the body as JSON.
pub async fn fetch_json<C: HttpClient>(client: &C, url: &str) -> Result<serde_json::Value> {
    let bytes = fetch_bytes(client, url).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
