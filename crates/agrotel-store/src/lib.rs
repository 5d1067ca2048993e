//! ---
//! agrotel_section: "03-persistence"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Named JSON record persistence."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
#![warn(missing_docs)]
//! Get/save of named JSON records (automation rules, alert configuration).
//! Last write wins; records carry no schema version.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Result alias used throughout the store crate.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Error type for the record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Wrapper for IO errors encountered while reading/writing record files.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Wrapper for JSON serialization issues.
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Keys are restricted to ASCII alphanumerics, `-` and `_`.
    #[error("invalid record key: {0:?}")]
    InvalidKey(String),
}

pub mod file;
pub mod memory;

pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;

/// Key under which the automation rule list is stored.
pub const RULES_KEY: &str = "farm-rules";
/// Key under which the alert configuration is stored.
pub const ALERT_CONFIG_KEY: &str = "alert-config";

/// Storage for named JSON records.
pub trait RecordStore: Send + Sync {
    /// Raw JSON stored under `key`, if any.
    fn load_value(&self, key: &str) -> Result<Option<serde_json::Value>>;

    /// Replace whatever is stored under `key`.
    fn save_value(&self, key: &str, value: serde_json::Value) -> Result<()>;

    /// Typed read of the record under `key`.
    fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>>
    where
        Self: Sized,
    {
        match self.load_value(key)? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Typed write of the record under `key`.
    fn save<T: Serialize>(&self, key: &str, record: &T) -> Result<()>
    where
        Self: Sized,
    {
        self.save_value(key, serde_json::to_value(record)?)
    }
}

/// Reject keys that could escape the store directory or collide on case-folding filesystems.
pub fn validate_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidKey(key.to_owned()))
    }
}
