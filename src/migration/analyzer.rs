use crate::legacy::{
    catalog, has_extension_in, is_ignored_path, settings, ArchiveIndex, LegacyConfig,
    LegacyLayout,
};
use serde::{Deserialize, Serialize};
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceCounts {
    pub mods: usize,
    pub catalog_entries: usize,
    /// Distinct catalog entries whose archive file can be located.
    #[serde(default)]
    pub archives: usize,
    pub previews: usize,
    pub categories: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub source: PathBuf,
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub counts: ResourceCounts,
    pub environments: Vec<String>,
    pub active_environment: Option<String>,
    pub legacy_config: Option<LegacyConfig>,
}

impl AnalysisResult {
    fn invalid(source: &Path, error: String) -> Self {
        Self {
            source: source.to_path_buf(),
            is_valid: false,
            errors: vec![error],
            warnings: Vec::new(),
            counts: ResourceCounts::default(),
            environments: Vec::new(),
            active_environment: None,
            legacy_config: None,
        }
    }

    pub fn source_missing(&self) -> bool {
        !self.is_valid && !self.source.exists()
    }
}

pub fn analyze(source: &Path, image_extensions: &BTreeSet<String>) -> AnalysisResult {
    if !source.exists() {
        return AnalysisResult::invalid(
            source,
            format!("source path does not exist: {}", source.display()),
        );
    }
    if !source.is_dir() {
        return AnalysisResult::invalid(
            source,
            format!("source path is not a directory: {}", source.display()),
        );
    }

    let layout = LegacyLayout::new(source);
    if !layout.resources_dir().is_dir() {
        return AnalysisResult::invalid(
            source,
            format!(
                "missing resources directory: {}",
                layout.resources_dir().display()
            ),
        );
    }
    let environments = layout.environments();
    if environments.is_empty() {
        return AnalysisResult::invalid(
            source,
            format!(
                "no environments found in {}",
                layout.environments_dir().display()
            ),
        );
    }

    let mut warnings = Vec::new();
    let counts_mods = count_files(&layout.mods_dir(), None, "mods", &mut warnings);
    let counts_previews = count_files(
        &layout.previews_dir(),
        Some(image_extensions),
        "previews",
        &mut warnings,
    );
    let counts_categories = count_category_files(&layout.categories_dir(), &mut warnings);

    let (active_environment, legacy_config) =
        resolve_environment(&layout, &environments, &mut warnings);
    let entries = catalog::parse_environment(&layout, &active_environment).value;
    let index = ArchiveIndex::scan(&layout.mods_dir());
    let mut hashes = BTreeSet::new();
    let mut located = BTreeSet::new();
    for entry in &entries {
        if !hashes.insert(entry.hash.as_str()) {
            continue;
        }
        if let Some(path) = index.locate(&entry.hash, &entry.archive_type, entry.file.as_deref()) {
            located.insert(path);
        }
    }
    let uncatalogued = index
        .files()
        .iter()
        .filter(|path| !located.contains(*path))
        .count();
    if uncatalogued > 0 {
        warnings.push(format!(
            "{uncatalogued} file(s) in {} have no catalog entry and will not be migrated",
            layout.mods_dir().display()
        ));
    }

    AnalysisResult {
        source: source.to_path_buf(),
        is_valid: true,
        errors: Vec::new(),
        warnings,
        counts: ResourceCounts {
            mods: counts_mods,
            catalog_entries: hashes.len(),
            archives: located.len(),
            previews: counts_previews,
            categories: counts_categories,
        },
        environments,
        active_environment: Some(active_environment),
        legacy_config,
    }
}

// Flagged environment, else the first; launch settings of all environments
// are merged into the active config.
fn resolve_environment(
    layout: &LegacyLayout,
    environments: &[String],
    warnings: &mut Vec<String>,
) -> (String, Option<LegacyConfig>) {
    let mut parsed: Vec<(String, Option<LegacyConfig>, Vec<String>)> = Vec::new();
    for env in environments {
        match settings::parse(&layout.settings_path(env), env) {
            Ok(outcome) => parsed.push((env.clone(), outcome.value, outcome.warnings)),
            Err(err) => {
                warnings.push(format!("legacy settings for {env}: {err:#}"));
                parsed.push((env.clone(), None, Vec::new()));
            }
        }
    }

    let flagged: Vec<&String> = parsed
        .iter()
        .filter(|(_, config, _)| config.as_ref().map(|c| c.active).unwrap_or(false))
        .map(|(env, _, _)| env)
        .collect();
    let active = match flagged.first() {
        Some(env) => (*env).clone(),
        None => environments[0].clone(),
    };
    if flagged.len() > 1 {
        warnings.push(format!(
            "{} environments are flagged active; using {active}",
            flagged.len()
        ));
    }

    let launches: BTreeMap<String, _> = parsed
        .iter()
        .filter_map(|(env, config, _)| {
            config
                .as_ref()
                .filter(|config| !config.launch.is_empty())
                .map(|config| (env.clone(), config.launch.clone()))
        })
        .collect();

    let mut legacy_config = None;
    for (env, config, env_warnings) in parsed {
        if env != active {
            continue;
        }
        warnings.extend(env_warnings);
        legacy_config = config.map(|mut config| {
            config.environments = launches.clone();
            config
        });
    }
    (active, legacy_config)
}

fn count_files(
    root: &Path,
    extensions: Option<&BTreeSet<String>>,
    what: &str,
    warnings: &mut Vec<String>,
) -> usize {
    if !root.is_dir() {
        warnings.push(format!("legacy {what} directory missing: {}", root.display()));
        return 0;
    }
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| !is_ignored_path(entry.path()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| extensions.map_or(true, |exts| has_extension_in(entry.path(), exts)))
        .count()
}

fn count_category_files(dir: &Path, warnings: &mut Vec<String>) -> usize {
    let Ok(entries) = fs::read_dir(dir) else {
        warnings.push(format!("legacy categories directory missing: {}", dir.display()));
        return 0;
    };
    entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_ignored_path(path))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("txt"))
                .unwrap_or(false)
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts() -> BTreeSet<String> {
        ["png"].iter().map(|ext| ext.to_string()).collect()
    }

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn missing_source_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let result = analyze(&dir.path().join("nope"), &exts());
        assert!(!result.is_valid);
        assert!(result.source_missing());
        assert_eq!(result.errors.len(), 1);
    }

    #[test]
    fn missing_resources_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("environments").join("Main")).unwrap();
        let result = analyze(dir.path(), &exts());
        assert!(!result.is_valid);
        assert!(!result.source_missing());
        assert!(result.errors[0].contains("resources"));
    }

    #[test]
    fn missing_environments_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("resources")).unwrap();
        let result = analyze(dir.path(), &exts());
        assert!(!result.is_valid);
        assert!(result.errors[0].contains("environments"));
    }

    #[test]
    fn counts_and_active_environment() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("resources/mods/a.zip"), "a");
        write(&root.join("resources/mods/nested/b.7z"), "b");
        write(&root.join("resources/previews/Hair/Short.png"), "p");
        write(&root.join("resources/previews/Hair/notes.txt"), "t");
        write(&root.join("resources/categories/Hair.txt"), "Short\n");
        write(&root.join("environments/Alpha/settings.ini"), "game.path = /alpha\n");
        write(
            &root.join("environments/Beta/settings.ini"),
            "active = true\nstyle = Dark\ngame.path = /beta\n",
        );
        write(
            &root.join("environments/Beta/index/mods_0.json"),
            r#"[{"hash": "a"}, {"hash": "b"}, 7]"#,
        );
        write(
            &root.join("environments/Beta/index/mods_1.json"),
            r#"[{"hash": "a", "name": "again"}, {"hash": "c"}]"#,
        );

        let result = analyze(root, &exts());
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.counts.mods, 2);
        assert_eq!(result.counts.previews, 1);
        assert_eq!(result.counts.categories, 1);
        assert_eq!(result.counts.catalog_entries, 3);
        assert_eq!(result.counts.archives, 2);
        assert_eq!(result.environments, vec!["Alpha", "Beta"]);
        assert_eq!(result.active_environment.as_deref(), Some("Beta"));

        let config = result.legacy_config.unwrap();
        assert_eq!(config.style.as_deref(), Some("Dark"));
        assert_eq!(config.environments.len(), 2);
        assert_eq!(
            config.environments["Alpha"].game_path.as_deref(),
            Some("/alpha")
        );
    }

    #[test]
    fn uncatalogued_archives_are_reported_not_expected() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        write(&root.join("resources/mods/a.zip"), "a");
        write(&root.join("resources/mods/stray.zip"), "s");
        write(&root.join("resources/mods/old/other.rar"), "o");
        write(
            &root.join("environments/Main/index/mods_0.json"),
            r#"[{"hash": "a"}]"#,
        );

        let result = analyze(root, &exts());
        assert!(result.is_valid, "{:?}", result.errors);
        assert_eq!(result.counts.mods, 3);
        assert_eq!(result.counts.archives, 1);
        assert!(result
            .warnings
            .iter()
            .any(|warning| warning.starts_with("2 file(s)") && warning.contains("no catalog entry")));
    }

    #[test]
    fn falls_back_to_first_environment_without_settings() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("resources")).unwrap();
        fs::create_dir_all(root.join("environments/Zed")).unwrap();
        fs::create_dir_all(root.join("environments/Main")).unwrap();

        let result = analyze(root, &exts());
        assert!(result.is_valid);
        assert_eq!(result.active_environment.as_deref(), Some("Main"));
        assert!(result.legacy_config.is_none());
        assert!(result
            .warnings
            .iter()
            .any(|warning| warning.contains("no legacy settings")));
    }
}
