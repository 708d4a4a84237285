use super::Stage;
use crate::{
    error::MigrationError,
    legacy::{find_migrated_archive, ArchiveIndex},
    migration::{
        context::{MigratedMod, MigrationContext},
        progress::StageKind,
    },
    services::{TransferMode, TransferOutcome},
};

pub(crate) struct ArchiveStage;

impl Stage for ArchiveStage {
    fn kind(&self) -> StageKind {
        StageKind::Archives
    }

    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let mods_dir = ctx.legacy().mods_dir();
        let archives_dir = ctx.profile().archives_dir();
        let mode = ctx.options().mode;
        let transfer = &ctx.services().transfer;
        let legacy_archives = ArchiveIndex::scan(&mods_dir);

        let mods: Vec<MigratedMod> = ctx.mods().to_vec();
        let total = mods.len();
        for (index, migrated) in mods.iter().enumerate() {
            ctx.check_cancelled()?;
            ctx.report(index, total, Some(migrated.name.clone()));

            if find_migrated_archive(&archives_dir, &migrated.hash).is_some() {
                ctx.skipped();
                ctx.totals().archives_skipped += 1;
                continue;
            }
            let Some(source) = legacy_archives.locate(
                &migrated.hash,
                &migrated.archive_type,
                migrated.file.as_deref(),
            ) else {
                ctx.warn(format!(
                    "archive missing for {} ({})",
                    migrated.hash, migrated.name
                ));
                ctx.totals().archives_missing += 1;
                continue;
            };

            let ext = source
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext.to_ascii_lowercase())
                .unwrap_or_else(|| migrated.archive_type.clone());
            let dest = archives_dir.join(format!("{}.{ext}", migrated.hash));

            let outcome = match mode {
                TransferMode::Copy => transfer.copy_file(&source, &dest, false),
                TransferMode::Move => transfer.move_file(&source, &dest, false),
                TransferMode::Link => transfer.link_file(&source, &dest, false),
            };
            match outcome {
                Ok(TransferOutcome::Transferred) => {
                    ctx.copied();
                    ctx.totals().archives_copied += 1;
                }
                Ok(TransferOutcome::Linked) => {
                    ctx.copied();
                    ctx.totals().archives_linked += 1;
                }
                Ok(TransferOutcome::CopiedInsteadOfLink) => {
                    ctx.copied();
                    ctx.totals().archives_copied += 1;
                    ctx.warn(format!(
                        "could not link {}; copied instead",
                        source.display()
                    ));
                }
                Ok(TransferOutcome::AlreadyPresent) => {
                    ctx.skipped();
                    ctx.totals().archives_skipped += 1;
                }
                Err(err) => ctx.warn(format!("archive {}: {err:#}", migrated.hash)),
            }
        }
        ctx.report(total, total, None);
        Ok(())
    }
}
