use super::Stage;
use crate::{
    error::MigrationError,
    legacy::{catalog, LegacyModEntry},
    migration::{
        context::{MigratedMod, MigrationContext},
        progress::StageKind,
    },
    services::ModSeed,
};
use std::collections::HashSet;

pub(crate) struct MetadataStage;

impl Stage for MetadataStage {
    fn kind(&self) -> StageKind {
        StageKind::Metadata
    }

    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let Some(env) = ctx
            .analysis()
            .and_then(|analysis| analysis.active_environment.clone())
        else {
            return Err(MigrationError::InvalidSource(
                "no active environment was detected".to_string(),
            ));
        };

        let parsed = catalog::parse_environment(ctx.legacy(), &env);
        for warning in parsed.warnings {
            ctx.warn(format!("catalog: {warning}"));
        }
        let entries = parsed.value;
        let total = entries.len();
        ctx.info(format!("{total} catalog entries in environment {env}"));

        let catalog = &ctx.services().catalog;
        let mut seen = HashSet::new();
        for (index, entry) in entries.into_iter().enumerate() {
            ctx.check_cancelled()?;
            ctx.report(index, total, Some(entry.name.clone()));

            if !seen.insert(entry.hash.clone()) {
                ctx.warn(format!(
                    "duplicate catalog entry for {} ({}) ignored",
                    entry.hash, entry.name
                ));
                ctx.skipped();
                continue;
            }

            let hash = entry.hash.clone();
            let migrated = MigratedMod {
                hash: entry.hash.clone(),
                name: entry.name.clone(),
                archive_type: entry.archive_type.clone(),
                file: entry.file.clone(),
            };
            match catalog.get_or_create(&hash, seed_from(entry)) {
                Ok(outcome) if outcome.was_created() => {
                    ctx.created();
                    ctx.totals().mods_created += 1;
                    ctx.push_mod(migrated);
                }
                Ok(_) => {
                    ctx.skipped();
                    ctx.totals().mods_existing += 1;
                    ctx.push_mod(migrated);
                }
                Err(err) => ctx.warn(format!("mod {hash}: {err:#}")),
            }
        }
        ctx.report(total, total, None);
        Ok(())
    }
}

fn seed_from(entry: LegacyModEntry) -> ModSeed {
    ModSeed {
        name: entry.name,
        author: entry.author,
        description: entry.description,
        tags: entry.tags,
        category: entry.category,
        object: entry.object,
        archive_ext: entry.archive_type,
    }
}
