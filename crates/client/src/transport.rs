use async_trait::async_trait;

use polaris_result::{create_error, Result};

/// Raw response from the guild API, status plus unparsed body
#[derive(Clone, Debug)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

/// Transport to the guild coordination server
#[async_trait]
pub trait GuildsApi: Send + Sync {
    /// `GET /guilds`
    async fn fetch_guilds(&self) -> Result<ApiResponse>;
}

/// reqwest-backed transport
#[derive(Clone, Debug)]
pub struct HttpApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl GuildsApi for HttpApi {
    async fn fetch_guilds(&self) -> Result<ApiResponse> {
        let response = self
            .client
            .get(format!("{}/guilds", self.base_url))
            .send()
            .await
            .map_err(|error| {
                tracing::error!("guild request failed: {error:?}");
                create_error!(InternalError)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        Ok(ApiResponse { status, body })
    }
}
