//! ---
//! agrotel_section: "03-persistence"
//! agrotel_subsection: "module"
//! agrotel_type: "source"
//! agrotel_scope: "code"
//! agrotel_description: "Named JSON record persistence."
//! agrotel_version: "v0.1.0"
//! agrotel_owner: "tbd"
//! ---
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{validate_key, RecordStore, Result};

/// One pretty-printed `<key>.json` file per record inside `root`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    root: PathBuf,
}

impl FileRecordStore {
    /// Open a store rooted at `root`, creating the directory when missing.
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Directory holding the record files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// File backing `key`.
    pub fn record_path(&self, key: &str) -> Result<PathBuf> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.json")))
    }
}

impl RecordStore for FileRecordStore {
    fn load_value(&self, key: &str) -> Result<Option<serde_json::Value>> {
        let path = self.record_path(key)?;
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save_value(&self, key: &str, value: serde_json::Value) -> Result<()> {
        let path = self.record_path(key)?;
        let staging = self.root.join(format!(".{key}.json.tmp"));
        {
            let mut file = fs::File::create(&staging)?;
            serde_json::to_writer_pretty(&mut file, &value)?;
            file.write_all(b"\n")?;
            file.sync_all()?;
        }
        fs::rename(&staging, &path)?;
        debug!(record = key, path = %path.display(), "record saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn missing_record_reads_as_none() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileRecordStore::open(dir.path())?;
        assert!(store.load_value("farm-rules")?.is_none());
        Ok(())
    }

    #[test]
    fn save_overwrites_and_leaves_no_staging_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileRecordStore::open(dir.path().join("nested"))?;
        store.save("alert-config", &json!({"notify_email": true}))?;
        store.save("alert-config", &json!({"notify_email": false}))?;

        let value = store.load_value("alert-config")?.expect("record");
        assert_eq!(value["notify_email"], false);

        let names: Vec<String> = fs::read_dir(store.root())?
            .map(|entry| entry.map(|e| e.file_name().to_string_lossy().into_owned()))
            .collect::<std::io::Result<_>>()?;
        assert_eq!(names, vec!["alert-config.json".to_owned()]);
        Ok(())
    }

    #[test]
    fn corrupt_file_surfaces_json_error() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let store = FileRecordStore::open(dir.path())?;
        fs::write(store.record_path("farm-rules")?, "{not json")?;
        assert!(matches!(
            store.load_value("farm-rules"),
            Err(crate::StoreError::Json(_))
        ));
        Ok(())
    }
}
