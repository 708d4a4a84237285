use super::{contained_relative, is_ignored_path};
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

/// Files under the legacy mods dir, looked up the way catalog entries refer
/// to them: declared file first, then `{hash}.{type}`, then any file whose
/// stem is the hash. The first file in sorted walk order wins a stem.
#[derive(Debug, Clone, Default)]
pub struct ArchiveIndex {
    mods_dir: PathBuf,
    files: Vec<PathBuf>,
    by_stem: BTreeMap<String, PathBuf>,
}

impl ArchiveIndex {
    pub fn scan(mods_dir: &Path) -> Self {
        let mut index = ArchiveIndex {
            mods_dir: mods_dir.to_path_buf(),
            ..ArchiveIndex::default()
        };
        if !mods_dir.is_dir() {
            return index;
        }
        for entry in WalkDir::new(mods_dir)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_ignored_path(entry.path()))
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let path = entry.path().to_path_buf();
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                index
                    .by_stem
                    .entry(stem.to_ascii_lowercase())
                    .or_insert_with(|| path.clone());
            }
            index.files.push(path);
        }
        index
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn locate(&self, hash: &str, archive_type: &str, file: Option<&str>) -> Option<PathBuf> {
        if let Some(relative) = file.and_then(contained_relative) {
            let candidate = self.mods_dir.join(relative);
            if candidate.is_file() {
                return Some(candidate);
            }
        }
        let by_name = self.mods_dir.join(format!("{hash}.{archive_type}"));
        if by_name.is_file() {
            return Some(by_name);
        }
        self.by_stem.get(&hash.to_ascii_lowercase()).cloned()
    }
}

pub fn find_migrated_archive(archives_dir: &Path, hash: &str) -> Option<PathBuf> {
    let entries = fs::read_dir(archives_dir).ok()?;
    let mut matches: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.file_stem().and_then(|stem| stem.to_str()) == Some(hash))
        .filter(|path| fs::symlink_metadata(path).map(|meta| !meta.is_dir()).unwrap_or(false))
        .collect();
    matches.sort();
    matches.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locates_declared_then_hash_named_archives() {
        let dir = tempfile::tempdir().unwrap();
        let mods_dir = dir.path();
        fs::create_dir_all(mods_dir.join("packs")).unwrap();
        fs::write(mods_dir.join("packs").join("Short Hair.7z"), "a").unwrap();
        fs::write(mods_dir.join("bbb.zip"), "b").unwrap();
        fs::write(mods_dir.join("CCC.rar"), "c").unwrap();
        let index = ArchiveIndex::scan(mods_dir);
        assert_eq!(index.files().len(), 3);

        let declared = index.locate("aaa", "zip", Some(r"packs\Short Hair.7z"));
        assert_eq!(declared, Some(mods_dir.join("packs/Short Hair.7z")));
        assert_eq!(index.locate("bbb", "zip", None), Some(mods_dir.join("bbb.zip")));
        assert_eq!(index.locate("ccc", "zip", None), Some(mods_dir.join("CCC.rar")));
        assert_eq!(index.locate("ddd", "zip", None), None);
    }

    #[test]
    fn declared_file_cannot_escape_mods_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mods_dir = dir.path().join("mods");
        fs::create_dir_all(&mods_dir).unwrap();
        fs::write(dir.path().join("outside.zip"), "x").unwrap();
        let index = ArchiveIndex::scan(&mods_dir);
        assert_eq!(index.locate("eee", "zip", Some("../outside.zip")), None);
    }

    #[test]
    fn finds_migrated_archive_by_exact_stem() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("aaa.7z"), "a").unwrap();
        fs::write(dir.path().join("bbb.zip.part"), "b").unwrap();
        fs::create_dir_all(dir.path().join("ccc.d")).unwrap();

        assert_eq!(find_migrated_archive(dir.path(), "aaa"), Some(dir.path().join("aaa.7z")));
        assert_eq!(find_migrated_archive(dir.path(), "bbb"), None);
        assert_eq!(find_migrated_archive(dir.path(), "ccc"), None);
        assert_eq!(find_migrated_archive(&dir.path().join("absent"), "aaa"), None);
    }
}
