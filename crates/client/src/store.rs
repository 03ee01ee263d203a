use std::{collections::HashMap, sync::Mutex};

use polaris_result::{create_error, Result};

use crate::snapshot::{Snapshot, SESSION_KEY};

/// Key-value store scoped to the browsing session.
///
/// Best effort: the controller logs and discards failures, caching is an
/// optimization rather than a correctness requirement.
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&self, snapshot: &Snapshot) -> Result<()>;
}

/// In-memory store living as long as the owning process
#[derive(Default, Debug)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| create_error!(StorageFailed))?;

        match entries.get(SESSION_KEY) {
            None => Ok(None),
            Some(raw) => serde_json::from_str(raw)
                .map(Some)
                .map_err(|_| create_error!(StorageFailed)),
        }
    }

    fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let raw = serde_json::to_string(snapshot).map_err(|_| create_error!(StorageFailed))?;

        self.entries
            .lock()
            .map_err(|_| create_error!(StorageFailed))?
            .insert(SESSION_KEY.to_string(), raw);

        Ok(())
    }
}
