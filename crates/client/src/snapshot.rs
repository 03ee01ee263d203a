use serde::{Deserialize, Serialize};

use polaris_models::v0::Guild;

/// Fixed key the snapshot is stored under
pub const SESSION_KEY: &str = "polaris_guilds_cache_v1";

/// Durable-per-session cached state of the last known result set
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub guilds: Vec<Guild>,
    pub active_guild_id: Option<String>,
    /// Epoch milliseconds before which no fetch should be attempted
    pub retry_after_ts: Option<u64>,
}
