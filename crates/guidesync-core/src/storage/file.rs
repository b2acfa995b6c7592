use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use super::KeyValueStore;
use crate::error::Result;

/// Extension of value files; anything else in the directory is ignored.
const VALUE_EXTENSION: &str = "json";

/// Stores each key as `<percent-encoded key>.json` inside one directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", urlencoding::encode(key), VALUE_EXTENSION))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.value_path(key);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(path)?))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let path = self.value_path(key);

        // Write atomically via temp file
        let temp_path = path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &path)?;

        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.value_path(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(VALUE_EXTENSION) {
                continue;
            }
            let decoded = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| urlencoding::decode(s).ok());
            if let Some(key) = decoded {
                keys.push(key.into_owned());
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_names_are_percent_encoded() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        store.set("cache:ns:guide_1", "1").unwrap();
        store.set("a/b.c", "2").unwrap();

        assert!(temp_dir.path().join("cache%3Ans%3Aguide_1.json").exists());
        assert!(temp_dir.path().join("a%2Fb.c.json").exists());
    }

    #[test]
    fn test_keys_decode_file_names() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        for key in ["sync:pending", "cache:travel_app:user_guides", "é/ü"] {
            store.set(key, "x").unwrap();
        }
        assert_eq!(
            store.keys().unwrap(),
            vec!["cache:travel_app:user_guides", "sync:pending", "é/ü"]
        );
    }

    #[test]
    fn test_set_get_remove() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().join("kv")).unwrap();

        assert_eq!(store.get("cache:ns:a").unwrap(), None);
        store.set("cache:ns:a", "{\"x\":1}").unwrap();
        assert_eq!(store.get("cache:ns:a").unwrap().as_deref(), Some("{\"x\":1}"));

        store.set("cache:ns:a", "2").unwrap();
        assert_eq!(store.get("cache:ns:a").unwrap().as_deref(), Some("2"));

        store.remove("cache:ns:a").unwrap();
        store.remove("cache:ns:a").unwrap();
        assert_eq!(store.get("cache:ns:a").unwrap(), None);
    }

    #[test]
    fn test_keys_ignores_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        store.set("sync:pending", "[]").unwrap();
        store.set("cache:ns:b", "1").unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "hello").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["cache:ns:b", "sync:pending"]);
    }

    #[test]
    fn test_values_survive_reopen() {
        let temp_dir = TempDir::new().unwrap();
        FileStore::new(temp_dir.path().to_path_buf())
            .unwrap()
            .set("sync:pending", "[1]")
            .unwrap();

        let reopened = FileStore::new(temp_dir.path().to_path_buf()).unwrap();
        assert_eq!(reopened.get("sync:pending").unwrap().as_deref(), Some("[1]"));
    }
}
