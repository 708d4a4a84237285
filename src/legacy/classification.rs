use super::{
    has_extension_in, is_comment, is_ignored_path, normalize_relative, strip_bom, LegacyLayout,
    ParseOutcome,
};
use std::{
    collections::{btree_map::Entry, BTreeMap, BTreeSet},
    fs,
    path::Path,
};
use walkdir::WalkDir;

const WILDCARD_MARKER: &str = "[*]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryGroup {
    pub category: String,
    pub objects: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct LegacyClassification {
    pub groups: Vec<CategoryGroup>,
    pub thumbnails: BTreeMap<String, String>,
}

impl LegacyClassification {
    pub fn parse(layout: &LegacyLayout, image_extensions: &BTreeSet<String>) -> ParseOutcome<Self> {
        let groups = parse_categories(&layout.categories_dir());
        let thumbnails = parse_redirection(
            &layout.redirection_path(),
            &layout.resources_dir(),
            image_extensions,
        );
        let mut warnings = groups.warnings;
        warnings.extend(thumbnails.warnings);
        ParseOutcome::new(
            Self {
                groups: groups.value,
                thumbnails: thumbnails.value,
            },
            warnings,
        )
    }
}

pub fn parse_categories(dir: &Path) -> ParseOutcome<Vec<CategoryGroup>> {
    let mut warnings = Vec::new();
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => {
            warnings.push(format!("no category listings found in {}", dir.display()));
            return ParseOutcome::new(Vec::new(), warnings);
        }
    };

    let mut files: Vec<_> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && !is_ignored_path(path))
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.eq_ignore_ascii_case("txt"))
                .unwrap_or(false)
        })
        .collect();
    files.sort();

    let mut groups = Vec::new();
    for path in files {
        let Some(category) = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .map(|stem| stem.trim().to_string())
            .filter(|stem| !stem.is_empty())
        else {
            warnings.push(format!("skipping category file with unusable name: {}", path.display()));
            continue;
        };
        match fs::read(&path) {
            Ok(bytes) => {
                let raw = String::from_utf8_lossy(&bytes);
                groups.push(CategoryGroup {
                    category,
                    objects: parse_category_str(&raw),
                });
            }
            Err(err) => warnings.push(format!("read category file {}: {err}", path.display())),
        }
    }
    ParseOutcome::new(groups, warnings)
}

pub fn parse_category_str(raw: &str) -> Vec<String> {
    let mut objects: Vec<String> = Vec::new();
    for line in strip_bom(raw).lines() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        if !objects.iter().any(|existing| existing == line) {
            objects.push(line.to_string());
        }
    }
    objects
}

pub fn parse_redirection(
    path: &Path,
    resources_dir: &Path,
    image_extensions: &BTreeSet<String>,
) -> ParseOutcome<BTreeMap<String, String>> {
    match fs::read(path) {
        Ok(bytes) => {
            parse_redirection_str(&String::from_utf8_lossy(&bytes), resources_dir, image_extensions)
        }
        Err(_) => ParseOutcome::new(
            BTreeMap::new(),
            vec![format!("no redirection map at {}", path.display())],
        ),
    }
}

pub(crate) fn parse_redirection_str(
    raw: &str,
    resources_dir: &Path,
    image_extensions: &BTreeSet<String>,
) -> ParseOutcome<BTreeMap<String, String>> {
    let mut explicit = BTreeMap::new();
    let mut expanded = BTreeMap::new();
    let mut warnings = Vec::new();

    for (index, line) in strip_bom(raw).lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }
        if let Some(rest) = line.strip_prefix(WILDCARD_MARKER) {
            let folder = wildcard_folder(rest);
            let root = resources_dir.join(&folder);
            if !root.is_dir() {
                warnings.push(format!(
                    "redirection line {}: wildcard folder {folder:?} not found",
                    index + 1
                ));
                continue;
            }
            expand_wildcard(&root, resources_dir, image_extensions, &mut expanded);
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            warnings.push(format!("redirection line {}: expected `key = path`", index + 1));
            continue;
        };
        let key = key.trim();
        let value = normalize_relative(value);
        if key.is_empty() || value.is_empty() {
            warnings.push(format!("redirection line {}: empty key or path", index + 1));
            continue;
        }
        match explicit.entry(key.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(value);
            }
            Entry::Occupied(_) => {
                warnings.push(format!(
                    "redirection line {}: duplicate key {key:?} ignored",
                    index + 1
                ));
            }
        }
    }

    for (key, value) in expanded {
        explicit.entry(key).or_insert(value);
    }
    ParseOutcome::new(explicit, warnings)
}

fn wildcard_folder(rest: &str) -> String {
    let folder = normalize_relative(rest);
    folder
        .strip_suffix("/*")
        .or_else(|| folder.strip_suffix('*'))
        .unwrap_or(&folder)
        .trim_end_matches('/')
        .to_string()
}

fn expand_wildcard(
    root: &Path,
    resources_dir: &Path,
    image_extensions: &BTreeSet<String>,
    out: &mut BTreeMap<String, String>,
) {
    let walker = WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_path(entry.path()));
    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_file() || !has_extension_in(entry.path(), image_extensions) {
            continue;
        }
        let Some(stem) = entry.path().file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let Ok(rel) = entry.path().strip_prefix(resources_dir) else {
            continue;
        };
        let rel = normalize_relative(&rel.to_string_lossy());
        out.entry(stem.to_string()).or_insert(rel);
    }
}
