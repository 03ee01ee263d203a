use axum::{routing::get, Router};

use crate::AppState;

pub mod guild_fetch;
pub mod guilds_list;
pub mod root;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root::root))
        .route("/guilds", get(guilds_list::list))
        .route("/guilds/:id", get(guild_fetch::fetch))
}
