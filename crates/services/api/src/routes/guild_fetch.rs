use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use polaris_result::Result;

use crate::{token, AppState};

/// Proxy one guild's upstream representation verbatim
///
/// After the token-expiry check, upstream's status and JSON body are
/// passed through untouched, the client decides what to do with
/// upstream's own 401/429/etc.
#[utoipa::path(
    get,
    path = "/guilds/{id}",
    responses(
        (status = 200, description = "Raw upstream guild object"),
        (status = 401, description = "Missing or expired access token", body = polaris_result::Error)
    ),
    params(
        ("id" = String, Path, description = "Guild id")
    )
)]
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> Result<Response> {
    token::require_token(state.tokens.as_ref(), &headers).await?;

    let (status, body) = state.discord.fetch_guild_raw(&id).await?;
    tracing::debug!("upstream answered {status} for guild {id}");

    Ok((
        StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
        [(header::CONTENT_TYPE, "application/json")],
        body,
    )
        .into_response())
}
