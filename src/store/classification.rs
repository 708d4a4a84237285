use super::{poisoned, write_json_atomic};
use crate::services::{ClassificationNode, ClassificationService, NodeSpec};
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

#[derive(Debug, Default, Serialize, Deserialize)]
struct TreeFile {
    nodes: Vec<ClassificationNode>,
}

/// Existence check and insert share one lock, so `create_node_if_absent`
/// never produces duplicates even when called re-entrantly.
#[derive(Debug)]
pub struct JsonClassificationTree {
    path: PathBuf,
    state: Mutex<TreeFile>,
}

impl JsonClassificationTree {
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let state = if path.exists() {
            let raw = fs::read_to_string(path).context("read classifications.json")?;
            serde_json::from_str(&raw).context("parse classifications.json")?
        } else {
            let state = TreeFile::default();
            write_json_atomic(path, &state)?;
            state
        };
        Ok(Self {
            path: path.to_path_buf(),
            state: Mutex::new(state),
        })
    }

    pub fn nodes(&self) -> Vec<ClassificationNode> {
        self.state
            .lock()
            .map(|state| state.nodes.clone())
            .unwrap_or_default()
    }

    pub fn node_by_name(&self, name: &str) -> Option<ClassificationNode> {
        let state = self.state.lock().ok()?;
        state.nodes.iter().find(|node| node.name == name).cloned()
    }

    pub fn children_of(&self, parent_id: &str) -> Vec<ClassificationNode> {
        let mut children: Vec<ClassificationNode> = self
            .nodes()
            .into_iter()
            .filter(|node| node.parent_id.as_deref() == Some(parent_id))
            .collect();
        children.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        children
    }
}

impl ClassificationService for JsonClassificationTree {
    fn create_node_if_absent(&self, spec: NodeSpec<'_>) -> Result<Option<ClassificationNode>> {
        let mut state = self.state.lock().map_err(|_| poisoned("classification tree"))?;
        if state.nodes.iter().any(|node| node.id == spec.id) {
            return Ok(None);
        }
        if let Some(parent) = spec.parent_id {
            if !state.nodes.iter().any(|node| node.id == parent) {
                bail!("parent node {parent:?} does not exist for {:?}", spec.id);
            }
        }

        let node = ClassificationNode {
            id: spec.id.to_string(),
            name: spec.name.to_string(),
            parent_id: spec.parent_id.map(|parent| parent.to_string()),
            priority: spec.priority,
            thumbnail: None,
            description: spec.description.map(|text| text.to_string()),
        };
        state.nodes.push(node.clone());
        if let Err(err) = write_json_atomic(&self.path, &*state) {
            state.nodes.pop();
            return Err(err.context("persist classification tree"));
        }
        Ok(Some(node))
    }

    fn node(&self, id: &str) -> Result<Option<ClassificationNode>> {
        let state = self.state.lock().map_err(|_| poisoned("classification tree"))?;
        Ok(state.nodes.iter().find(|node| node.id == id).cloned())
    }

    fn node_exists(&self, id: &str) -> Result<bool> {
        Ok(self.node(id)?.is_some())
    }

    fn associate_thumbnail(&self, node_id: &str, path: &Path) -> Result<bool> {
        let mut state = self.state.lock().map_err(|_| poisoned("classification tree"))?;
        let Some(node) = state.nodes.iter_mut().find(|node| node.id == node_id) else {
            return Ok(false);
        };
        let value = path.to_string_lossy().to_string();
        if node.thumbnail.as_deref() == Some(value.as_str()) {
            return Ok(true);
        }
        node.thumbnail = Some(value);
        write_json_atomic(&self.path, &*state).context("persist thumbnail association")?;
        Ok(true)
    }

    fn top_level_count(&self) -> Result<usize> {
        let state = self.state.lock().map_err(|_| poisoned("classification tree"))?;
        Ok(state.nodes.iter().filter(|node| node.parent_id.is_none()).count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec<'a>(id: &'a str, parent: Option<&'a str>, priority: i32) -> NodeSpec<'a> {
        NodeSpec {
            id,
            name: id,
            parent_id: parent,
            priority,
            description: None,
        }
    }

    #[test]
    fn create_is_idempotent_and_requires_parent() {
        let dir = tempfile::tempdir().unwrap();
        let tree = JsonClassificationTree::load_or_create(&dir.path().join("tree.json")).unwrap();

        assert!(tree.create_node_if_absent(spec("Short", Some("Hair"), 50)).is_err());
        assert!(tree.create_node_if_absent(spec("Hair", None, 100)).unwrap().is_some());
        assert!(tree.create_node_if_absent(spec("Hair", None, 100)).unwrap().is_none());
        assert!(tree.create_node_if_absent(spec("Short", Some("Hair"), 50)).unwrap().is_some());
        assert!(tree.create_node_if_absent(spec("Long", Some("Hair"), 50)).unwrap().is_some());

        assert_eq!(tree.nodes().len(), 3);
        assert_eq!(tree.top_level_count().unwrap(), 1);
        let children: Vec<String> = tree.children_of("Hair").into_iter().map(|n| n.name).collect();
        assert_eq!(children, vec!["Long", "Short"]);
    }

    #[test]
    fn thumbnails_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.json");
        let tree = JsonClassificationTree::load_or_create(&path).unwrap();
        tree.create_node_if_absent(spec("Hair", None, 100)).unwrap();

        assert!(tree.associate_thumbnail("Hair", Path::new("/p/hair.png")).unwrap());
        assert!(!tree.associate_thumbnail("Eyes", Path::new("/p/eyes.png")).unwrap());

        let reopened = JsonClassificationTree::load_or_create(&path).unwrap();
        let node = reopened.node_by_name("Hair").unwrap();
        assert_eq!(node.thumbnail.as_deref(), Some("/p/hair.png"));
    }
}
