use super::{poisoned, write_json_atomic};
use crate::services::ConfigurationStore;
use anyhow::{Context, Result};
use serde_json::Value;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

#[derive(Debug)]
pub struct JsonConfigStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, Value>>,
}

impl JsonConfigStore {
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let values = if path.exists() {
            let raw = fs::read_to_string(path).context("read profile config")?;
            serde_json::from_str(&raw).context("parse profile config")?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            values: Mutex::new(values),
        })
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }
}

impl ConfigurationStore for JsonConfigStore {
    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock().map_err(|_| poisoned("profile config"))?;
        values.insert(key.to_string(), value);
        Ok(())
    }

    fn save(&self) -> Result<()> {
        let values = self.values.lock().map_err(|_| poisoned("profile config"))?;
        write_json_atomic(&self.path, &*values).context("save profile config")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values_survive_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = JsonConfigStore::load_or_create(&path).unwrap();
        store.set_value("ui.style", json!("Midnight")).unwrap();
        store.set_value("window.width", json!(1280)).unwrap();
        assert!(!path.exists());
        store.save().unwrap();

        let reloaded = JsonConfigStore::load_or_create(&path).unwrap();
        assert_eq!(reloaded.get("ui.style"), Some(json!("Midnight")));
        assert_eq!(reloaded.get("window.width"), Some(json!(1280)));
    }
}
