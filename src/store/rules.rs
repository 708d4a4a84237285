use super::{poisoned, write_json_atomic};
use crate::services::{AutoDetectionRule, AutoDetectionService};
use anyhow::{Context, Result};
use std::{fs, path::Path, sync::Mutex};

#[derive(Debug)]
pub struct JsonAutoDetection {
    rules: Mutex<Vec<AutoDetectionRule>>,
}

impl JsonAutoDetection {
    pub fn load_or_create(path: &Path) -> Result<Self> {
        let rules = if path.exists() {
            let raw = fs::read_to_string(path).context("read auto detection rules")?;
            serde_json::from_str(&raw).context("parse auto detection rules")?
        } else {
            Vec::new()
        };
        Ok(Self {
            rules: Mutex::new(rules),
        })
    }

    pub fn rules(&self) -> Vec<AutoDetectionRule> {
        self.rules.lock().map(|rules| rules.clone()).unwrap_or_default()
    }
}

impl AutoDetectionService for JsonAutoDetection {
    fn add_rule(&self, rule: AutoDetectionRule) -> Result<()> {
        let mut rules = self.rules.lock().map_err(|_| poisoned("auto detection"))?;
        match rules.iter_mut().find(|existing| existing.name == rule.name) {
            Some(existing) => *existing = rule,
            None => rules.push(rule),
        }
        Ok(())
    }

    fn save_rules(&self, path: &Path) -> Result<()> {
        let rules = self.rules.lock().map_err(|_| poisoned("auto detection"))?;
        write_json_atomic(path, rules.as_slice()).context("save auto detection rules")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(name: &str, priority: i32) -> AutoDetectionRule {
        AutoDetectionRule {
            name: name.to_string(),
            pattern: format!("*{name}*"),
            category: name.to_string(),
            priority,
        }
    }

    #[test]
    fn same_name_replaces_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.json");
        let service = JsonAutoDetection::load_or_create(&path).unwrap();
        service.add_rule(rule("Short", 10)).unwrap();
        service.add_rule(rule("Short", 100)).unwrap();
        service.add_rule(rule("Long", 100)).unwrap();
        service.save_rules(&path).unwrap();

        let reloaded = JsonAutoDetection::load_or_create(&path).unwrap();
        let rules = reloaded.rules();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].priority, 100);
    }
}
