use async_trait::async_trait;
use reqwest::{Request, Response};

/// Minimal HTTP execution seam. Provider clients are generic over this so
/// auth decoration and test doubles slot in without touching request
/// construction.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
