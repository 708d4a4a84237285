use super::Stage;
use crate::{
    error::MigrationError,
    migration::{analyzer, context::MigrationContext, progress::StageKind},
};

pub(crate) struct AnalyzeStage;

impl Stage for AnalyzeStage {
    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    fn execute(&self, ctx: &mut MigrationContext<'_>) -> Result<(), MigrationError> {
        let source = ctx.options().source.as_path();
        let analysis = analyzer::analyze(source, ctx.image_extensions());
        for warning in &analysis.warnings {
            ctx.warn(format!("analysis: {warning}"));
        }

        let failure = if analysis.is_valid {
            None
        } else if analysis.source_missing() {
            Some(MigrationError::SourceMissing(source.to_path_buf()))
        } else {
            Some(MigrationError::InvalidSource(analysis.errors.join("; ")))
        };

        if failure.is_none() {
            let counts = &analysis.counts;
            ctx.info(format!(
                "Source holds {} archive(s), {} catalog entries, {} preview(s), {} category list(s); active environment {}",
                counts.mods,
                counts.catalog_entries,
                counts.previews,
                counts.categories,
                analysis.active_environment.as_deref().unwrap_or("-"),
            ));
        }
        ctx.set_analysis(analysis);
        ctx.report(1, 1, None);
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
