//! ---
//! agrotel_section: "03-persistence"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Named JSON record persistence."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::collections::HashMap;

use parking_lot::Mutex;

use crate::{validate_key, RecordStore, Result};

/// Process-local store, used by tests and ephemeral CLI runs.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, serde_json::Value>>,
}

impl MemoryRecordStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load_value(&self, key: &str) -> Result<Option<serde_json::Value>> {
        validate_key(key)?;
        Ok(self.records.lock().get(key).cloned())
    }

    fn save_value(&self, key: &str, value: serde_json::Value) -> Result<()> {
        validate_key(key)?;
        self.records.lock().insert(key.to_owned(), value);
        Ok(())
    }
}
