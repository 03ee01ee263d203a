use cached::proc_macro::cached;
use config::{Config, File, FileFormat};
use futures_locks::RwLock;
use once_cell::sync::Lazy;
use serde::Deserialize;

pub use tracing;

static CONFIG_BUILDER: Lazy<RwLock<Config>> = Lazy::new(|| {
    RwLock::new({
        let mut builder = Config::builder().add_source(File::from_str(
            include_str!("../Polaris.toml"),
            FileFormat::Toml,
        ));

        if std::path::Path::new("Polaris.toml").exists() {
            builder = builder.add_source(File::new("Polaris.toml", FileFormat::Toml));
        }

        builder.build().unwrap()
    })
});

#[derive(Deserialize, Debug, Clone)]
pub struct Hosts {
    pub auth: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiDiscord {
    pub api_base: String,
    pub user_agent: String,
    pub bot_token: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct ApiGate {
    pub cooldown_ms: u64,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Api {
    pub listen: String,
    pub discord: ApiDiscord,
    pub gate: ApiGate,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Client {
    pub cooldown_ms: u64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    pub hosts: Hosts,
    pub api: Api,
    pub client: Client,
}

pub async fn init() {
    println!(
        ":: Polaris Configuration ::\n\x1b[32m{:?}\x1b[0m",
        config().await
    );
}

pub async fn read() -> Config {
    CONFIG_BUILDER.read().await.clone()
}

#[cached(time = 30)]
pub async fn config() -> Settings {
    read().await.try_deserialize::<Settings>().unwrap()
}

/// Install the global tracing subscriber for a service binary
pub fn setup_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}

/// Configure logging and report configuration for a service
#[macro_export]
macro_rules! configure {
    ($service:ident) => {
        $crate::setup_logging();
        $crate::tracing::info!(
            "Starting {} [version {}]",
            stringify!($service),
            env!("CARGO_PKG_VERSION")
        );
        $crate::init().await;
    };
}

#[cfg(test)]
mod tests {
    use crate::config;

    #[tokio::test]
    async fn loads_embedded_defaults() {
        let settings = config().await;
        assert_eq!(settings.api.gate.cooldown_ms, 5000);
        assert_eq!(settings.client.cooldown_ms, 5000);
        assert!(settings.api.discord.api_base.starts_with("https://"));
    }
}
