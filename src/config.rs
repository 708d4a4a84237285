use crate::services::TransferMode;
use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(skip)]
    pub data_dir: PathBuf,
    pub profiles_root: PathBuf,
    #[serde(default)]
    pub default_mode: TransferMode,
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_in(&base_data_dir()?)
    }

    pub fn load_or_create_in(data_dir: &Path) -> Result<Self> {
        fs::create_dir_all(data_dir).context("create app data dir")?;
        let path = data_dir.join("config.json");
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let mut config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            config.data_dir = data_dir.to_path_buf();
            if config.profiles_root.as_os_str().is_empty() {
                config.profiles_root = data_dir.join("profiles");
                config.save()?;
            }
            return Ok(config);
        }

        let config = AppConfig {
            data_dir: data_dir.to_path_buf(),
            profiles_root: data_dir.join("profiles"),
            default_mode: TransferMode::default(),
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).context("create app data dir")?;
        let path = self.data_dir.join("config.json");
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("modvault"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_defaults_then_reloads_them() {
        let dir = tempfile::tempdir().unwrap();
        let created = AppConfig::load_or_create_in(dir.path()).unwrap();
        assert_eq!(created.profiles_root, dir.path().join("profiles"));
        assert_eq!(created.default_mode, TransferMode::Copy);

        let mut changed = created.clone();
        changed.default_mode = TransferMode::Link;
        changed.save().unwrap();

        let loaded = AppConfig::load_or_create_in(dir.path()).unwrap();
        assert_eq!(loaded.default_mode, TransferMode::Link);
        assert_eq!(loaded.data_dir, dir.path());
    }
}
