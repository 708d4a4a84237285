use anyhow::{bail, Result};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct ProfileLayout {
    pub id: String,
    pub root: PathBuf,
}

impl ProfileLayout {
    pub fn new(profiles_root: &Path, id: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
            bail!("invalid profile id: {id:?}");
        }
        Ok(Self {
            id: id.to_string(),
            root: profiles_root.join(id),
        })
    }

    pub fn archives_dir(&self) -> PathBuf {
        self.root.join("archives")
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.root.join("previews")
    }

    pub fn redirected_previews_dir(&self) -> PathBuf {
        self.previews_dir().join("_redirected")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    pub fn report_path(&self) -> PathBuf {
        self.logs_dir().join("last_migration.json")
    }

    pub fn mods_path(&self) -> PathBuf {
        self.root.join("mods.json")
    }

    pub fn classifications_path(&self) -> PathBuf {
        self.root.join("classifications.json")
    }

    pub fn rules_path(&self) -> PathBuf {
        self.root.join("auto_detection.json")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.join("config.json")
    }
}
