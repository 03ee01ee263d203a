use serde::Deserialize;

/// Body Discord attaches to a 429 response
#[derive(Deserialize, Debug, Clone)]
pub struct RateLimitBody {
    /// Seconds to wait before retrying
    pub retry_after: f32,
}

/// Outcome of one per-guild presence probe
///
/// Captured independently per guild so a single failed probe never
/// aborts the batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Bot is a member of the guild
    Present,
    /// Bot is not in the guild (403/404 and friends)
    Absent,
    /// The bot credential itself was rejected
    Unauthorized,
    /// Transport-level failure, counted as absent
    Failed,
}
