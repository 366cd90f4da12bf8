use async_trait::async_trait;
use reqwest::{Request, Response};

/// Executes HTTP requests for dataset downloads. Implemented by
/// [`BasicClient`](super::BasicClient); tests and wrappers can swap it out.
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn execute(&self, req: Request) -> reqwest::Result<Response>;
}
