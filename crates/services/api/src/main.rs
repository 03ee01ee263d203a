use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
    time::Duration,
};

use axum::Router;
use tokio::net::TcpListener;
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable as ScalarServable};

use polaris_gate::{GateConfig, RequestGate};
use polaris_models::v0::Guild;

use crate::{discord::Discord, token::TokenProvider};

mod discord;
mod routes;
mod token;

#[derive(Clone)]
pub struct AppState {
    pub discord: Discord,
    /// One gate per process, every request handler goes through it
    pub gate: Arc<RequestGate<Vec<Guild>>>,
    pub tokens: Arc<dyn TokenProvider>,
}

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    // Configure logging and environment
    polaris_config::configure!(api);

    // Configure API schema
    #[derive(OpenApi)]
    #[openapi(
        paths(
            routes::root::root,
            routes::guilds_list::list,
            routes::guild_fetch::fetch
        ),
        components(
            schemas(
                routes::root::RootResponse,
                polaris_result::Error,
                polaris_result::ErrorType,
                polaris_models::v0::Guild
            )
        )
    )]
    struct ApiDoc;

    let config = polaris_config::config().await;

    // Without the bot credential no guild can ever be resolved, refuse
    // to boot rather than fail every request later.
    assert!(
        !config.api.discord.bot_token.is_empty(),
        "api.discord.bot_token must be configured"
    );

    let state = AppState {
        discord: Discord::new().await,
        gate: Arc::new(RequestGate::new(GateConfig {
            cooldown: Duration::from_millis(config.api.gate.cooldown_ms),
        })),
        tokens: Arc::new(token::AuthService::new().await),
    };

    // Configure Axum and router
    let app = Router::new()
        .merge(Scalar::with_url("/scalar", ApiDoc::openapi()))
        .merge(routes::router())
        .with_state(state);

    // Configure TCP listener and bind
    let address: SocketAddr = config
        .api
        .listen
        .parse()
        .unwrap_or_else(|_| SocketAddr::from((Ipv4Addr::UNSPECIFIED, 14710)));
    tracing::info!("Listening on {address}");
    tracing::info!("Play around with the API: http://localhost:{}/scalar", address.port());
    let listener = TcpListener::bind(&address).await?;
    axum::serve(listener, app.into_make_service()).await
}
