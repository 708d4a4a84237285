use crate::services::{FileTransfer, TransferOutcome};
use anyhow::{bail, Context, Result};
use filetime::{set_file_mtime, FileTime};
use std::{
    fs, io,
    path::{Path, PathBuf},
    time::UNIX_EPOCH,
};

/// Plain filesystem transfers. Copies land in a `.part` file first so an
/// interrupted copy never looks like an already-migrated destination.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileTransfer;

impl FileTransfer for LocalFileTransfer {
    fn copy_file(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<TransferOutcome> {
        if !prepare_dest(source, dest, overwrite)? {
            return Ok(TransferOutcome::AlreadyPresent);
        }
        copy_via_part(source, dest)?;
        Ok(TransferOutcome::Transferred)
    }

    fn move_file(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<TransferOutcome> {
        if !prepare_dest(source, dest, overwrite)? {
            return Ok(TransferOutcome::AlreadyPresent);
        }
        match fs::rename(source, dest) {
            Ok(()) => {}
            Err(_) => {
                copy_via_part(source, dest)?;
                fs::remove_file(source)
                    .with_context(|| format!("remove moved source {source:?}"))?;
            }
        }
        Ok(TransferOutcome::Transferred)
    }

    fn link_file(&self, source: &Path, dest: &Path, overwrite: bool) -> Result<TransferOutcome> {
        if !prepare_dest(source, dest, overwrite)? {
            return Ok(TransferOutcome::AlreadyPresent);
        }
        if fs::hard_link(source, dest).is_ok() {
            return Ok(TransferOutcome::Linked);
        }
        let absolute = fs::canonicalize(source).unwrap_or_else(|_| source.to_path_buf());
        if create_symlink(&absolute, dest).is_ok() {
            return Ok(TransferOutcome::Linked);
        }
        copy_via_part(source, dest)?;
        Ok(TransferOutcome::CopiedInsteadOfLink)
    }
}

fn prepare_dest(source: &Path, dest: &Path, overwrite: bool) -> Result<bool> {
    if !source.is_file() {
        bail!("source file missing: {source:?}");
    }
    if let Ok(meta) = fs::symlink_metadata(dest) {
        if meta.file_type().is_dir() {
            bail!("destination exists as directory: {dest:?}");
        }
        if !overwrite {
            return Ok(false);
        }
        fs::remove_file(dest).with_context(|| format!("remove existing file {dest:?}"))?;
    }
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {parent:?}"))?;
    }
    Ok(true)
}

fn copy_via_part(source: &Path, dest: &Path) -> Result<()> {
    let part = part_path(dest);
    if let Err(err) = fs::copy(source, &part) {
        let _ = fs::remove_file(&part);
        return Err(err).with_context(|| format!("copy {source:?} -> {dest:?}"));
    }
    preserve_mtime(source, &part);
    fs::rename(&part, dest).with_context(|| format!("finalize copy {dest:?}"))?;
    Ok(())
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}

fn preserve_mtime(source: &Path, dest: &Path) {
    let Ok(meta) = fs::metadata(source) else {
        return;
    };
    let Ok(modified) = meta.modified() else {
        return;
    };
    let Ok(duration) = modified.duration_since(UNIX_EPOCH) else {
        return;
    };
    let mtime = FileTime::from_unix_time(duration.as_secs() as i64, 0);
    let _ = set_file_mtime(dest, mtime);
}

#[cfg(unix)]
fn create_symlink(source: &Path, dest: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, dest)
}

#[cfg(not(unix))]
fn create_symlink(_source: &Path, _dest: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Other,
        "symlink unavailable on this platform",
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_is_copy_if_absent() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.zip");
        let dest = dir.path().join("out").join("b.zip");
        fs::write(&source, b"one").unwrap();

        let transfer = LocalFileTransfer;
        assert_eq!(
            transfer.copy_file(&source, &dest, false).unwrap(),
            TransferOutcome::Transferred
        );
        fs::write(&source, b"two").unwrap();
        assert_eq!(
            transfer.copy_file(&source, &dest, false).unwrap(),
            TransferOutcome::AlreadyPresent
        );
        assert_eq!(fs::read(&dest).unwrap(), b"one");
        assert_eq!(
            transfer.copy_file(&source, &dest, true).unwrap(),
            TransferOutcome::Transferred
        );
        assert_eq!(fs::read(&dest).unwrap(), b"two");
        assert!(!part_path(&dest).exists());
    }

    #[test]
    fn move_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.7z");
        let dest = dir.path().join("archives").join("hash.7z");
        fs::write(&source, b"bytes").unwrap();

        LocalFileTransfer.move_file(&source, &dest, false).unwrap();
        assert!(!source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"bytes");
    }

    #[test]
    fn link_shares_content() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.zip");
        let dest = dir.path().join("links").join("a.zip");
        fs::write(&source, b"shared").unwrap();

        let outcome = LocalFileTransfer.link_file(&source, &dest, false).unwrap();
        assert_ne!(outcome, TransferOutcome::AlreadyPresent);
        assert!(source.exists());
        assert_eq!(fs::read(&dest).unwrap(), b"shared");
    }

    #[test]
    fn missing_source_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = LocalFileTransfer.copy_file(
            &dir.path().join("gone.zip"),
            &dir.path().join("dest.zip"),
            false,
        );
        assert!(result.is_err());
    }
}
