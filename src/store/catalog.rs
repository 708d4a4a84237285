use super::{poisoned, write_json_atomic};
use crate::services::{CatalogOutcome, ModCatalog, ModRecord, ModSeed};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogFile {
    mods: Vec<ModRecord>,
}

#[derive(Debug)]
pub struct JsonModCatalog {
    path: PathBuf,
    state: Mutex<CatalogFile>,
}

impl JsonModCatalog {
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let raw = fs::read_to_string(path).context("read mods.json")?;
            serde_json::from_str(&raw).context("parse mods.json")?
        } else {
            let state = CatalogFile::default();
            write_json_atomic(path, &state)?;
            state
        };
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    pub fn find(&self, hash: &str) -> Option<ModRecord> {
        let state = self.state.lock().ok()?;
        state.mods.iter().find(|record| record.hash == hash).cloned()
    }

    pub fn records(&self) -> Vec<ModRecord> {
        self.state
            .lock()
            .map(|state| state.mods.clone())
            .unwrap_or_default()
    }
}

impl ModCatalog for JsonModCatalog {
    fn get_or_create(&self, hash: &str, seed: ModSeed) -> Result<CatalogOutcome> {
        let mut state = self.state.lock().map_err(|_| poisoned("mod catalog"))?;
        if let Some(existing) = state.mods.iter().find(|record| record.hash == hash) {
            return Ok(CatalogOutcome::Existing(existing.clone()));
        }

        let record = ModRecord {
            hash: hash.to_string(),
            name: seed.name,
            author: seed.author,
            description: seed.description,
            tags: seed.tags,
            category: seed.category,
            object: seed.object,
            archive_ext: seed.archive_ext,
            added_at: now_timestamp(),
        };
        state.mods.push(record.clone());
        if let Err(err) = write_json_atomic(&self.path, &*state) {
            state.mods.pop();
            return Err(err.context("persist mod catalog"));
        }
        Ok(CatalogOutcome::Created(record))
    }

    fn count(&self) -> Result<usize> {
        let state = self.state.lock().map_err(|_| poisoned("mod catalog"))?;
        Ok(state.mods.len())
    }
}

fn now_timestamp() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
