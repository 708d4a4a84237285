mod catalog;
mod classification;
mod images;
mod rules;
mod settings;
mod transfer;

pub use catalog::JsonModCatalog;
pub use classification::JsonClassificationTree;
pub use images::StandardImageFormats;
pub use rules::JsonAutoDetection;
pub use settings::JsonConfigStore;
pub use transfer::LocalFileTransfer;

use crate::{profile::ProfileLayout, services::MigrationServices};
use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use std::{fs, path::Path, sync::Arc};

pub fn open_local_services(layout: &ProfileLayout) -> Result<MigrationServices> {
    fs::create_dir_all(&layout.root).context("create profile dir")?;
    Ok(MigrationServices {
        catalog: Arc::new(JsonModCatalog::load_or_create(&layout.mods_path())?),
        transfer: Arc::new(LocalFileTransfer),
        images: Arc::new(StandardImageFormats::default()),
        classification: Arc::new(JsonClassificationTree::load_or_create(
            &layout.classifications_path(),
        )?),
        auto_detection: Arc::new(JsonAutoDetection::load_or_create(&layout.rules_path())?),
        configuration: Arc::new(JsonConfigStore::load_or_create(&layout.config_path())?),
    })
}

fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let parent = path.parent().context("store file parent")?;
    fs::create_dir_all(parent).context("create store dir")?;
    let raw = serde_json::to_string_pretty(value).context("serialize store")?;
    let temp = path.with_extension("json.tmp");
    fs::write(&temp, raw).with_context(|| format!("write {temp:?}"))?;
    fs::rename(&temp, path).with_context(|| format!("finalize {path:?}"))?;
    Ok(())
}

fn poisoned(what: &str) -> anyhow::Error {
    anyhow!("{what} lock poisoned")
}
