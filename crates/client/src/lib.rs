//! Client tier for the guild coordination server: a session-scoped cache of
//! the last known guild set plus a fetch gate deciding when a network
//! round-trip is actually warranted.

mod controller;
mod snapshot;
mod store;
mod transport;

pub use controller::{FetchDecision, GuildsController};
pub use snapshot::{Snapshot, SESSION_KEY};
pub use store::{MemoryStore, SessionStore};
pub use transport::{ApiResponse, GuildsApi, HttpApi};
