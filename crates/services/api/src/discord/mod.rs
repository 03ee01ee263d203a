use std::{sync::Arc, time::Duration};

use futures::future::join_all;
use reqwest::{header::AUTHORIZATION, Client, StatusCode};
use urlencoding::encode as url_encode;

use polaris_models::v0::Guild;
use polaris_result::{create_error, Error, Result};

pub mod types;

use types::ProbeOutcome;

/// Fallback retry delay when a 429 body cannot be parsed, seconds
const DEFAULT_RETRY_AFTER: f32 = 1.0;

/// Client for the upstream Discord REST API
#[derive(Clone, Debug)]
pub struct Discord {
    client: Client,
    api_base: String,
    bot_token: Arc<str>,
}

impl Discord {
    pub async fn new() -> Self {
        let config = polaris_config::config().await;

        // Request and connect timeouts also bound how long the gate's
        // in-flight slot can stay occupied by one operation.
        let client = Client::builder()
            .user_agent(&config.api.discord.user_agent)
            .timeout(Duration::from_secs(config.api.gate.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.api.gate.connect_timeout_secs))
            .build()
            .expect("reqwest Client");

        Self {
            client,
            api_base: config.api.discord.api_base.clone(),
            bot_token: Arc::from(config.api.discord.bot_token.as_str()),
        }
    }

    /// List the identity's guilds, keeping those where the bot is present
    ///
    /// Pure apart from the network calls, the upstream listing order is
    /// preserved in the result.
    pub async fn fetch_manageable_guilds(&self, access_token: &str) -> Result<Vec<Guild>> {
        let response = self
            .client
            .get(format!("{}/users/@me/guilds", self.api_base))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|error| {
                tracing::error!("guild listing request failed: {error:?}");
                create_error!(InternalError)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_listing_failure(status.as_u16(), &body));
        }

        let guilds: Vec<Guild> = response.json().await.map_err(|error| {
            tracing::error!("guild listing body unreadable: {error:?}");
            create_error!(InternalError)
        })?;

        tracing::debug!("listed {} guilds, probing bot presence", guilds.len());

        let probes = join_all(guilds.iter().map(|guild| self.probe_presence(&guild.id))).await;

        // A rejected probe means the bot credential itself is broken,
        // not that the bot is absent from that particular guild.
        if probes.contains(&ProbeOutcome::Unauthorized) {
            tracing::error!("bot token rejected while probing guild presence");
            return Err(create_error!(UpstreamError { status: 401 }));
        }

        Ok(keep_present(guilds, &probes))
    }

    /// Fetch one guild with the bot credential, returning the raw upstream
    /// status and JSON body for verbatim proxying
    pub async fn fetch_guild_raw(&self, guild_id: &str) -> Result<(u16, String)> {
        let response = self
            .client
            .get(format!(
                "{}/guilds/{}?with_counts=true",
                self.api_base,
                url_encode(guild_id)
            ))
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .send()
            .await
            .map_err(|error| {
                tracing::error!("guild fetch request failed: {error:?}");
                create_error!(InternalError)
            })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| {
            tracing::error!("guild fetch body unreadable: {error:?}");
            create_error!(InternalError)
        })?;

        Ok((status, body))
    }

    async fn probe_presence(&self, guild_id: &str) -> ProbeOutcome {
        match self
            .client
            .get(format!("{}/guilds/{}", self.api_base, url_encode(guild_id)))
            .header(AUTHORIZATION, format!("Bot {}", self.bot_token))
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => ProbeOutcome::Present,
            Ok(response) if response.status() == StatusCode::UNAUTHORIZED => {
                ProbeOutcome::Unauthorized
            }
            Ok(_) => ProbeOutcome::Absent,
            Err(error) => {
                tracing::debug!("presence probe for {guild_id} failed: {error:?}");
                ProbeOutcome::Failed
            }
        }
    }
}

/// Map a non-success guild listing response onto our error taxonomy
fn classify_listing_failure(status: u16, body: &str) -> Error {
    match status {
        401 | 403 => create_error!(NotAuthenticated),
        429 => {
            let retry_after = serde_json::from_str::<types::RateLimitBody>(body)
                .map(|body| body.retry_after)
                .unwrap_or(DEFAULT_RETRY_AFTER);
            create_error!(RateLimited { retry_after })
        }
        status => create_error!(UpstreamError { status }),
    }
}

/// Subsequence of guilds whose probe succeeded, original order preserved
fn keep_present(guilds: Vec<Guild>, probes: &[ProbeOutcome]) -> Vec<Guild> {
    guilds
        .into_iter()
        .zip(probes)
        .filter(|(_, outcome)| matches!(outcome, ProbeOutcome::Present))
        .map(|(guild, _)| guild)
        .collect()
}
