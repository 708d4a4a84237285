use super::{is_ignored_path, LegacyLayout, ParseOutcome};
use anyhow::{Context, Result};
use blake3::Hasher;
use serde::Deserialize;
use serde_json::Value;
use std::{
    fs, io,
    path::{Path, PathBuf},
};

const CATALOG_PREFIX: &str = "mods";
const DEFAULT_ARCHIVE_TYPE: &str = "zip";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyModEntry {
    pub hash: String,
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub object: Option<String>,
    pub archive_type: String,
    pub file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    #[serde(default, alias = "sha", alias = "id")]
    hash: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    tags: Option<RawTags>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default, alias = "character")]
    object: Option<String>,
    #[serde(default, rename = "type", alias = "archive_type")]
    archive_type: Option<String>,
    #[serde(default)]
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTags {
    List(Vec<String>),
    Joined(String),
}

impl RawTags {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            RawTags::List(list) => list,
            RawTags::Joined(joined) => joined.split(',').map(|tag| tag.to_string()).collect(),
        };
        let mut tags: Vec<String> = Vec::new();
        for tag in raw {
            let tag = tag.trim();
            if !tag.is_empty() && !tags.iter().any(|existing| existing == tag) {
                tags.push(tag.to_string());
            }
        }
        tags
    }
}

pub fn catalog_files(index_dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(index_dir) else {
        return Vec::new();
    };
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_ignored_path(path))
        .filter(|path| is_catalog_name(path))
        .collect();
    files.sort();
    files
}

fn is_catalog_name(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let lower = name.to_ascii_lowercase();
    lower.starts_with(CATALOG_PREFIX) && lower.ends_with(".json")
}

pub fn parse_environment(layout: &LegacyLayout, env: &str) -> ParseOutcome<Vec<LegacyModEntry>> {
    let index_dir = layout.index_dir(env);
    let mut entries = Vec::new();
    let mut warnings = Vec::new();
    let files = catalog_files(&index_dir);
    if files.is_empty() {
        warnings.push(format!(
            "no catalog files found for environment {env} in {}",
            index_dir.display()
        ));
    }
    for path in files {
        match parse_catalog_file(&path, &layout.mods_dir()) {
            Ok(mut outcome) => {
                entries.append(&mut outcome.value);
                warnings.append(&mut outcome.warnings);
            }
            Err(err) => warnings.push(format!("{err:#}")),
        }
    }
    ParseOutcome::new(entries, warnings)
}

pub fn parse_catalog_file(path: &Path, mods_dir: &Path) -> Result<ParseOutcome<Vec<LegacyModEntry>>> {
    let raw = fs::read_to_string(path).with_context(|| format!("read catalog {path:?}"))?;
    let label = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("catalog")
        .to_string();
    Ok(parse_catalog_str(&raw, &label, mods_dir))
}

pub(crate) fn parse_catalog_str(
    raw: &str,
    label: &str,
    mods_dir: &Path,
) -> ParseOutcome<Vec<LegacyModEntry>> {
    let mut warnings = Vec::new();
    let root: Value = match serde_json::from_str(super::strip_bom(raw)) {
        Ok(value) => value,
        Err(err) => {
            warnings.push(format!("{label}: not valid JSON ({err})"));
            return ParseOutcome::new(Vec::new(), warnings);
        }
    };

    let rows: Vec<(String, Option<String>, Value)> = match root {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| (format!("{label}[{index}]"), None, item))
            .collect(),
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| (format!("{label}[{key}]"), Some(key), item))
            .collect(),
        _ => {
            warnings.push(format!("{label}: expected an array or object of mod entries"));
            return ParseOutcome::new(Vec::new(), warnings);
        }
    };

    let mut entries = Vec::new();
    for (row_label, key, item) in rows {
        match entry_from_value(item, key.as_deref(), mods_dir) {
            Ok(entry) => entries.push(entry),
            Err(reason) => warnings.push(format!("{row_label}: {reason}")),
        }
    }
    ParseOutcome::new(entries, warnings)
}

fn entry_from_value(
    item: Value,
    key: Option<&str>,
    mods_dir: &Path,
) -> std::result::Result<LegacyModEntry, String> {
    if !item.is_object() {
        return Err("entry is not an object".to_string());
    }
    let raw: RawEntry = serde_json::from_value(item).map_err(|err| err.to_string())?;
    let file = non_empty(raw.file);

    let hash = match non_empty(raw.hash).or_else(|| key.and_then(|key| non_empty(Some(key.to_string())))) {
        Some(hash) => hash,
        None => {
            let Some(file) = &file else {
                return Err("entry has neither a hash nor an archive file".to_string());
            };
            let Some(relative) = super::contained_relative(file) else {
                return Err(format!("archive file {file:?} is outside the mods directory"));
            };
            let archive = mods_dir.join(relative);
            hash_archive(&archive)
                .map_err(|err| format!("cannot hash archive {}: {err}", archive.display()))?
        }
    };
    if !is_safe_hash(&hash) {
        return Err(format!("unusable content hash {hash:?}"));
    }

    let archive_type = non_empty(raw.archive_type)
        .or_else(|| {
            file.as_deref()
                .and_then(|file| Path::new(file).extension())
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_string())
        })
        .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_TYPE.to_string());

    let object = non_empty(raw.object);
    let name = non_empty(raw.name)
        .or_else(|| object.clone())
        .unwrap_or_else(|| hash.clone());

    Ok(LegacyModEntry {
        hash,
        name,
        author: non_empty(raw.author),
        description: non_empty(raw.description),
        tags: raw.tags.map(RawTags::into_vec).unwrap_or_default(),
        category: non_empty(raw.category),
        object,
        archive_type,
        file,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn is_safe_hash(hash: &str) -> bool {
    !hash.contains(['/', '\\']) && hash != "." && hash != ".." && !hash.contains('\0')
}

pub fn hash_archive(path: &Path) -> io::Result<String> {
    let mut file = fs::File::open(path)?;
    let mut hasher = Hasher::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher.finalize().to_hex().to_string())
}
