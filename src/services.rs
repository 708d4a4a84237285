use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeSet, fmt, path::Path, sync::Arc};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModRecord {
    pub hash: String,
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub object: Option<String>,
    pub archive_ext: String,
    pub added_at: i64,
}

#[derive(Debug, Clone, Default)]
pub struct ModSeed {
    pub name: String,
    pub author: Option<String>,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub category: Option<String>,
    pub object: Option<String>,
    pub archive_ext: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogOutcome {
    Created(ModRecord),
    Existing(ModRecord),
}

impl CatalogOutcome {
    pub fn record(&self) -> &ModRecord {
        match self {
            CatalogOutcome::Created(record) | CatalogOutcome::Existing(record) => record,
        }
    }

    pub fn was_created(&self) -> bool {
        matches!(self, CatalogOutcome::Created(_))
    }
}

pub trait ModCatalog: Send + Sync {
    /// Returns the record for `hash`, creating it from `seed` if absent.
    /// Existing records are never modified.
    fn get_or_create(&self, hash: &str, seed: ModSeed) -> Result<CatalogOutcome>;
    fn count(&self) -> Result<usize>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    #[default]
    Copy,
    Move,
    Link,
}

impl TransferMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "copy" => Some(TransferMode::Copy),
            "move" => Some(TransferMode::Move),
            "link" => Some(TransferMode::Link),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TransferMode::Copy => "copy",
            TransferMode::Move => "move",
            TransferMode::Link => "link",
        }
    }
}

impl fmt::Display for TransferMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferOutcome {
    Transferred,
    CopiedInsteadOfLink,
    Linked,
    AlreadyPresent,
}

/// File transfer primitive. Every operation is copy-if-absent unless
/// `overwrite` is set: an existing destination is left alone and reported as
/// [`TransferOutcome::AlreadyPresent`].
pub trait FileTransfer: Send + Sync {
    fn copy_file(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<TransferOutcome>;
    fn move_file(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<TransferOutcome>;
    fn link_file(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<TransferOutcome>;
}

pub trait ImageFormats: Send + Sync {
    fn supported_extensions(&self) -> BTreeSet<String>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    pub priority: i32,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NodeSpec<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub parent_id: Option<&'a str>,
    pub priority: i32,
    pub description: Option<&'a str>,
}

pub trait ClassificationService: Send + Sync {
    /// Creates the node unless one with the same id exists. Returns `None`
    /// when the node was already present. Check and insert are one step.
    fn create_node_if_absent(&self, spec: NodeSpec<'_>) -> Result<Option<ClassificationNode>>;
    fn node(&self, id: &str) -> Result<Option<ClassificationNode>>;
    fn node_exists(&self, id: &str) -> Result<bool>;
    fn associate_thumbnail(&self, node_id: &str, path: &Path) -> Result<bool>;
    fn top_level_count(&self) -> Result<usize>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoDetectionRule {
    pub name: String,
    pub pattern: String,
    pub category: String,
    pub priority: i32,
}

pub trait AutoDetectionService: Send + Sync {
    fn add_rule(&self, rule: AutoDetectionRule) -> Result<()>;
    fn save_rules(&self, path: &Path) -> Result<()>;
}

pub trait ConfigurationStore: Send + Sync {
    fn set_value(&self, key: &str, value: serde_json::Value) -> Result<()>;
    fn save(&self) -> Result<()>;
}

#[derive(Clone)]
pub struct MigrationServices {
    pub catalog: Arc<dyn ModCatalog>,
    pub transfer: Arc<dyn FileTransfer>,
    pub images: Arc<dyn ImageFormats>,
    pub classification: Arc<dyn ClassificationService>,
    pub auto_detection: Arc<dyn AutoDetectionService>,
    pub configuration: Arc<dyn ConfigurationStore>,
}
