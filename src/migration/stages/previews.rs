use super::Stage;
use crate::{
    error::MigrationError,
    legacy::{has_extension_in, is_ignored_path},
    migration::{context::MigrationContext, progress::StageKind},
    services::TransferOutcome,
};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const PREVIEWS_PREFIX: &str = "previews/";

pub(crate) struct PreviewStage;

impl Stage for PreviewStage {
    fn kind(&self) -> StageKind {
        StageKind::Previews
    }

    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let legacy_previews = ctx.legacy().previews_dir();
        let images = collect_images(&legacy_previews, ctx);
        let parsed = ctx.legacy_classification();
        let total = images.len() + parsed.thumbnails.len();
        let mut done = 0;

        let transfer = &ctx.services().transfer;
        let dest_root = ctx.profile().previews_dir();
        for (source, relative) in &images {
            ctx.check_cancelled()?;
            ctx.report(done, total, Some(relative.display().to_string()));
            done += 1;

            match transfer.copy_file(source, &dest_root.join(relative), false) {
                Ok(TransferOutcome::AlreadyPresent) => {
                    ctx.skipped();
                    ctx.totals().previews_skipped += 1;
                }
                Ok(_) => {
                    ctx.copied();
                    ctx.totals().previews_copied += 1;
                }
                Err(err) => ctx.warn(format!("preview {}: {err:#}", relative.display())),
            }
        }

        for (node_id, relative) in &parsed.thumbnails {
            ctx.check_cancelled()?;
            ctx.report(done, total, Some(node_id.clone()));
            done += 1;
            associate(ctx, node_id, relative);
        }
        ctx.report(total, total, None);
        Ok(())
    }
}

fn collect_images(root: &Path, ctx: &mut MigrationContext<'_>) -> Vec<(PathBuf, PathBuf)> {
    if !root.is_dir() {
        ctx.warn(format!("no legacy previews at {}", root.display()));
        return Vec::new();
    }
    let extensions = ctx.image_extensions();
    WalkDir::new(root)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| !is_ignored_path(entry.path()))
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| has_extension_in(entry.path(), extensions))
        .filter_map(|entry| {
            let relative = entry.path().strip_prefix(root).ok()?.to_path_buf();
            Some((entry.path().to_path_buf(), relative))
        })
        .collect()
}

fn associate(ctx: &mut MigrationContext<'_>, node_id: &str, relative: &str) {
    let services = ctx.services();
    match services.classification.node_exists(node_id) {
        Ok(true) => {}
        Ok(false) => {
            ctx.warn(format!(
                "thumbnail {relative} names unknown node {node_id}; skipped"
            ));
            return;
        }
        Err(err) => {
            ctx.warn(format!("thumbnail for {node_id}: {err:#}"));
            return;
        }
    }
    if relative.split('/').any(|part| part == "..") {
        ctx.warn(format!("thumbnail path {relative} leaves the legacy tree; skipped"));
        return;
    }

    let source = ctx.legacy().resources_dir().join(relative);
    let dest = match relative.strip_prefix(PREVIEWS_PREFIX) {
        Some(inside) => ctx.profile().previews_dir().join(inside),
        None => ctx.profile().redirected_previews_dir().join(relative),
    };
    if !dest.exists() {
        if !source.is_file() {
            ctx.warn(format!(
                "thumbnail {relative} for {node_id} not found in the legacy tree"
            ));
            return;
        }
        match services.transfer.copy_file(&source, &dest, false) {
            Ok(TransferOutcome::AlreadyPresent) => {}
            Ok(_) => {
                ctx.copied();
                ctx.totals().thumbnails_copied += 1;
            }
            Err(err) => {
                ctx.warn(format!("thumbnail {relative}: {err:#}"));
                return;
            }
        }
    }

    match services.classification.associate_thumbnail(node_id, &dest) {
        Ok(true) => {
            ctx.created();
            ctx.totals().thumbnails_associated += 1;
        }
        Ok(false) => ctx.warn(format!("thumbnail for {node_id} was not associated")),
        Err(err) => ctx.warn(format!("associate thumbnail for {node_id}: {err:#}")),
    }
}
