use async_trait::async_trait;
use axum::http::{header::COOKIE, HeaderMap};
use reqwest::StatusCode;

use polaris_models::v0::AccessToken;
use polaris_result::{create_error, Result};

/// Issues the identity's current access token.
///
/// Consulted fresh on every admitted request. The gate rejects on cooldown
/// before this is ever called, a rejected request never pays the
/// token-resolution cost.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Resolve the access token for the session carried by `headers`
    async fn access_token(&self, headers: &HeaderMap) -> Result<Option<AccessToken>>;
}

/// Resolve and validate the identity token.
///
/// A token past its expiry instant is never presented upstream.
pub async fn require_token(
    provider: &dyn TokenProvider,
    headers: &HeaderMap,
) -> Result<AccessToken> {
    match provider.access_token(headers).await? {
        None => {
            tracing::warn!("missing or invalid access token");
            Err(create_error!(NotAuthenticated))
        }
        Some(token) if token.is_expired() => {
            tracing::warn!(
                "access token expired at {}",
                token.access_token_expires_at.format()
            );
            Err(create_error!(TokenExpired))
        }
        Some(token) => Ok(token),
    }
}

/// Token provider backed by the external auth service
#[derive(Clone, Debug)]
pub struct AuthService {
    client: reqwest::Client,
    host: String,
}

impl AuthService {
    pub async fn new() -> Self {
        let config = polaris_config::config().await;

        Self {
            client: reqwest::Client::new(),
            host: config.hosts.auth,
        }
    }
}

#[async_trait]
impl TokenProvider for AuthService {
    async fn access_token(&self, headers: &HeaderMap) -> Result<Option<AccessToken>> {
        let mut request = self.client.get(format!("{}/token/discord", self.host));

        if let Some(cookie) = headers.get(COOKIE) {
            request = request.header(COOKIE, cookie);
        }

        let response = request.send().await.map_err(|error| {
            tracing::error!("token provider unreachable: {error:?}");
            create_error!(InternalError)
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                response.json().await.map(Some).map_err(|error| {
                    tracing::error!("token provider body unreadable: {error:?}");
                    create_error!(InternalError)
                })
            }
            status => {
                tracing::error!("token provider answered {status}");
                Err(create_error!(InternalError))
            }
        }
    }
}
