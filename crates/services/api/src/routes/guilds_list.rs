use axum::{extract::State, http::HeaderMap, Json};

use polaris_models::v0::Guild;
use polaris_result::Result;

use crate::{token, AppState};

/// Resolve the guilds this identity can manage and where the bot is present
///
/// Requests overlapping an in-flight upstream operation share its outcome;
/// requests inside the cooldown window are rejected with a retry hint
/// before the token provider is even consulted.
#[utoipa::path(
    get,
    path = "/guilds",
    responses(
        (status = 200, description = "Manageable guilds", body = Vec<Guild>),
        (status = 401, description = "Missing or expired access token", body = polaris_result::Error),
        (status = 429, description = "Local cooldown or upstream rate limit", body = polaris_result::Error),
        (status = 500, description = "Upstream failure", body = polaris_result::Error)
    )
)]
pub async fn list(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<Vec<Guild>>> {
    let guilds = state
        .gate
        .execute(
            || async {
                token::require_token(state.tokens.as_ref(), &headers)
                    .await
                    .map(|token| token.access_token)
            },
            |access_token| {
                let discord = state.discord.clone();
                async move { discord.fetch_manageable_guilds(&access_token).await }
            },
        )
        .await?;

    Ok(Json(guilds.as_ref().clone()))
}
