use std::time::Duration;

#[derive(Clone, PartialEq, Eq, Debug)]
/// Config values for [`RequestGate`].
///
/// [`RequestGate`]: crate::RequestGate
pub struct GateConfig {
    /// Minimum delay between consecutive upstream bursts
    pub cooldown: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_millis(5000),
        }
    }
}
