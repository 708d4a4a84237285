pub mod archives;
pub mod catalog;
pub mod classification;
pub mod settings;

use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
};

pub use archives::{find_migrated_archive, ArchiveIndex};
pub use catalog::LegacyModEntry;
pub use classification::{CategoryGroup, LegacyClassification};
pub use settings::{EnvironmentLaunch, LegacyConfig, WindowGeometry};

// Parsers never fail on malformed content; only an unreadable input is an Err.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome<T> {
    pub value: T,
    pub warnings: Vec<String>,
}

impl<T> ParseOutcome<T> {
    pub fn new(value: T, warnings: Vec<String>) -> Self {
        Self { value, warnings }
    }
}

#[derive(Debug, Clone)]
pub struct LegacyLayout {
    pub root: PathBuf,
}

impl LegacyLayout {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn resources_dir(&self) -> PathBuf {
        self.root.join("resources")
    }

    pub fn mods_dir(&self) -> PathBuf {
        self.resources_dir().join("mods")
    }

    pub fn previews_dir(&self) -> PathBuf {
        self.resources_dir().join("previews")
    }

    pub fn categories_dir(&self) -> PathBuf {
        self.resources_dir().join("categories")
    }

    pub fn redirection_path(&self) -> PathBuf {
        self.resources_dir().join("redirection.ini")
    }

    pub fn environments_dir(&self) -> PathBuf {
        self.root.join("environments")
    }

    pub fn environment_dir(&self, env: &str) -> PathBuf {
        self.environments_dir().join(env)
    }

    pub fn settings_path(&self, env: &str) -> PathBuf {
        self.environment_dir(env).join("settings.ini")
    }

    pub fn index_dir(&self, env: &str) -> PathBuf {
        self.environment_dir(env).join("index")
    }

    pub fn environments(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.environments_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|ft| ft.is_dir()).unwrap_or(false))
            .filter(|entry| !is_ignored_path(&entry.path()))
            .filter_map(|entry| entry.file_name().to_str().map(|name| name.to_string()))
            .collect();
        names.sort();
        names
    }
}

pub fn is_ignored_path(path: &Path) -> bool {
    path.components().any(|component| {
        let part = component.as_os_str().to_string_lossy();
        part.eq_ignore_ascii_case("__MACOSX")
            || part.eq_ignore_ascii_case(".ds_store")
            || part.eq_ignore_ascii_case("thumbs.db")
            || part == ".git"
    })
}

pub fn has_extension_in(path: &Path, extensions: &BTreeSet<String>) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.contains(&ext.to_ascii_lowercase()))
        .unwrap_or(false)
}

pub fn normalize_relative(raw: &str) -> String {
    raw.trim()
        .trim_matches('"')
        .replace('\\', "/")
        .split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// `normalize_relative`, or `None` when the reference is empty or climbs out
/// of its base directory with `..`.
pub fn contained_relative(raw: &str) -> Option<String> {
    let relative = normalize_relative(raw);
    if relative.is_empty() || relative.split('/').any(|part| part == "..") {
        return None;
    }
    Some(relative)
}

pub(crate) fn strip_bom(raw: &str) -> &str {
    raw.strip_prefix('\u{feff}').unwrap_or(raw)
}

pub(crate) fn is_comment(line: &str) -> bool {
    line.starts_with('#') || line.starts_with(';')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_backslash_paths() {
        assert_eq!(normalize_relative(r"previews\Hair\Short.png"), "previews/Hair/Short.png");
        assert_eq!(normalize_relative(r#" ".\previews\\a.jpg" "#), "previews/a.jpg");
    }

    #[test]
    fn parent_references_are_not_contained() {
        assert_eq!(contained_relative(r"packs\a.zip").as_deref(), Some("packs/a.zip"));
        assert_eq!(contained_relative(r"..\outside.zip"), None);
        assert_eq!(contained_relative("packs/../../x.zip"), None);
        assert_eq!(contained_relative(" ./ "), None);
    }

    #[test]
    fn environments_are_sorted_directories() {
        let dir = tempfile::tempdir().unwrap();
        let layout = LegacyLayout::new(dir.path());
        fs::create_dir_all(layout.environment_dir("Zeta")).unwrap();
        fs::create_dir_all(layout.environment_dir("Alpha")).unwrap();
        fs::create_dir_all(layout.environment_dir("__MACOSX")).unwrap();
        fs::write(layout.environments_dir().join("notes.txt"), "x").unwrap();
        assert_eq!(layout.environments(), vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn extension_check_ignores_case() {
        let exts: BTreeSet<String> = ["png".to_string()].into_iter().collect();
        assert!(has_extension_in(Path::new("a/B.PNG"), &exts));
        assert!(!has_extension_in(Path::new("a/B.txt"), &exts));
        assert!(!has_extension_in(Path::new("a/png"), &exts));
    }
}
